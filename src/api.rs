use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::apex::ApexResolver;
use crate::error::{Result, ScanError};
use crate::output::ConsoleReporter;
use crate::probe::{ProbeSink, ProbeTarget, ProbeWorker};
use crate::scheduler::{BatchScheduler, ScanStats};
use crate::transport::{DnsReverseLookup, HttpTransport, ReqwestTransport, ReverseLookup};
use crate::wordlist::Wordlist;

/// 默认浏览器User-Agent，部分服务器会根据客户端特征返回不同内容
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; U; Linux x86_64) Gecko/20100101 Firefox/74.8";

/// 虚拟主机扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 目标服务器IP或主机名
    pub target_host: String,
    /// 目标端口
    pub target_port: u16,
    /// 字典文件路径
    pub wordlist: PathBuf,
    /// 每批并发请求数
    pub batch_size: usize,
    /// 批次之间的延迟（秒）
    pub delay_secs: f64,
    /// 单个请求超时（秒）
    pub timeout_secs: u64,
    /// 手动指定根域名，跳过自动发现
    pub domain: Option<String>,
    /// 请求使用的User-Agent
    pub user_agent: String,
    /// 是否静默模式
    pub silent: bool,
    /// 发现结果是否着色
    pub color: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            target_host: String::new(),
            target_port: 80,
            wordlist: PathBuf::new(),
            batch_size: 10,
            delay_secs: 0.0,
            timeout_secs: 10,
            domain: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            silent: false,
            color: true,
        }
    }
}

impl ScanConfig {
    /// 校验参数，任何网络活动之前调用
    pub fn validate(&self) -> Result<()> {
        let host = self.target_host.trim();
        if host.is_empty() {
            return Err(ScanError::Configuration("目标主机不能为空".to_string()));
        }
        if host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(ScanError::Configuration(format!("无效的目标主机: {}", host)));
        }
        if self.target_port == 0 {
            return Err(ScanError::Configuration("端口必须在 1-65535 之间".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ScanError::Configuration("并发数必须大于0".to_string()));
        }
        self.delay()?;
        if self.timeout_secs == 0 {
            return Err(ScanError::Configuration("超时时间必须大于0".to_string()));
        }
        if self.wordlist.as_os_str().is_empty() {
            return Err(ScanError::Configuration("未指定字典文件".to_string()));
        }
        if let Some(ref domain) = self.domain {
            if normalize_domain(domain).is_empty() {
                return Err(ScanError::Configuration("指定的根域名为空".to_string()));
            }
        }
        Ok(())
    }

    /// 批间延迟，负数、NaN或超出 `Duration` 范围时返回配置错误
    pub fn delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.delay_secs)
            .map_err(|_| ScanError::Configuration(format!("无效的延迟: {}", self.delay_secs)))
    }
}

fn normalize_domain(domain: &str) -> &str {
    domain.trim().trim_matches('.')
}

/// 一次扫描的结果
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// 本次扫描使用的根域名
    pub apex_domain: String,
    /// 扫描统计
    pub stats: ScanStats,
}

/// 虚拟主机扫描引擎
pub struct VhostScanEngine<T: HttpTransport = ReqwestTransport, R: ReverseLookup = DnsReverseLookup> {
    config: ScanConfig,
    transport: Arc<T>,
    lookup: R,
}

impl VhostScanEngine {
    /// 使用reqwest和系统DNS配置创建引擎
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout_secs)?;
        Self::with_transport(config, transport, DnsReverseLookup::new())
    }
}

impl<T: HttpTransport, R: ReverseLookup> VhostScanEngine<T, R> {
    /// 使用自定义的网络实现创建引擎
    pub fn with_transport(config: ScanConfig, transport: T, lookup: R) -> Result<Self> {
        config.validate()?;
        Ok(VhostScanEngine {
            config,
            transport: Arc::new(transport),
            lookup,
        })
    }

    /// 当前使用的配置
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// 确定根域名，指定了 `domain` 时直接使用
    pub async fn resolve_apex(&self) -> Result<String> {
        if let Some(ref domain) = self.config.domain {
            return Ok(normalize_domain(domain).to_string());
        }
        ApexResolver::new(self.transport.as_ref(), &self.lookup, &self.config.user_agent)
            .resolve(&self.config.target_host, self.config.target_port)
            .await
    }

    /// 执行扫描
    ///
    /// 字典在网络活动之前打开；根域名只解析一次，之后作为只读信息
    /// 交给每个探测任务。
    pub async fn run(&self, sink: Arc<dyn ProbeSink>) -> Result<ScanReport> {
        let delay = self.config.delay()?;
        let wordlist = Wordlist::open(&self.config.wordlist)?;
        let path = wordlist.path().to_path_buf();

        let apex_domain = self.resolve_apex().await?;
        log::info!("根域名: {}", apex_domain);

        let target = Arc::new(ProbeTarget {
            host: self.config.target_host.clone(),
            port: self.config.target_port,
            apex_domain: apex_domain.clone(),
            user_agent: self.config.user_agent.clone(),
        });
        let worker = ProbeWorker::new(Arc::clone(&self.transport), target, sink);
        let scheduler = BatchScheduler::new(self.config.batch_size, delay);

        log::info!("开始探测虚拟主机...");
        let stats = scheduler
            .run(wordlist, |candidate| {
                let worker = worker.clone();
                async move { worker.probe(candidate).await }
            })
            .await
            .map_err(|source| ScanError::Wordlist { path, source })?;

        log::info!(
            "探测完成: {} 批, {} 个请求, 发现 {} 个, 未解析 {} 个",
            stats.batches,
            stats.probed,
            stats.found,
            stats.unresolved
        );
        Ok(ScanReport { apex_domain, stats })
    }
}

/// 便捷的扫描函数，结果打印到标准输出
pub async fn scan_vhosts(host: &str, port: u16, wordlist: impl Into<PathBuf>) -> Result<ScanReport> {
    let config = ScanConfig {
        target_host: host.to_string(),
        target_port: port,
        wordlist: wordlist.into(),
        ..Default::default()
    };
    let engine = VhostScanEngine::new(config)?;
    engine.run(Arc::new(ConsoleReporter::stdout(true))).await
}
