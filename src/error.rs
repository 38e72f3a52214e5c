use std::path::PathBuf;

/// 扫描过程中的致命错误
///
/// 只有这些错误会终止整个扫描；单个请求的失败见 [`TransportError`]。
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 参数不合法（主机、端口、并发数、延迟等），在任何网络活动之前抛出
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 字典文件无法打开或读取
    #[error("无法读取字典文件 {}: {source}", .path.display())]
    Wordlist {
        /// 字典文件路径
        path: PathBuf,
        #[source]
        /// 底层IO错误
        source: std::io::Error,
    },

    /// 无法确定目标主机的根域名
    #[error("无法确定主机 {host} 的域名: {reason}")]
    Resolution {
        /// 目标主机
        host: String,
        /// 失败原因
        reason: String,
    },

    /// HTTP客户端初始化失败
    #[error("HTTP客户端初始化失败: {0}")]
    Client(#[from] reqwest::Error),

    /// 结果导出失败
    #[error("结果导出失败: {0}")]
    Export(String),
}

impl ScanError {
    pub(crate) fn resolution(host: &str, reason: impl Into<String>) -> Self {
        ScanError::Resolution {
            host: host.to_string(),
            reason: reason.into(),
        }
    }
}

/// 单个HTTP请求的传输层错误（连接失败、超时、响应格式错误）
///
/// 在探测边界被转换为 `ProbeOutcome::Unresolved`，不会向上传播。
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "请求超时"
        } else if err.is_connect() {
            "连接失败"
        } else {
            "请求失败"
        };
        TransportError(format!("{}: {}", kind, err))
    }
}

/// 本库的结果类型
pub type Result<T> = std::result::Result<T, ScanError>;
