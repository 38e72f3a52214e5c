use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::transport::{target_url, HttpTransport, ProbeRequest};

/// 所有探测共享的只读目标信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// 目标服务器IP或主机名
    pub host: String,
    /// 目标端口
    pub port: u16,
    /// 根域名，扫描开始前解析一次，之后不再修改
    pub apex_domain: String,
    /// 每个请求携带的User-Agent
    pub user_agent: String,
}

impl ProbeTarget {
    /// 子域名完整名称 `{candidate}.{apex}`
    pub fn vhost_name(&self, candidate: &str) -> String {
        format!("{}.{}", candidate, self.apex_domain)
    }
}

/// 单次探测得到的HTTP响应分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 字典中的候选前缀
    pub candidate: String,
    /// 请求中使用的Host头
    pub target: String,
    /// 响应状态码
    pub status_code: u16,
    /// 状态码不是404即视为服务器识别该虚拟主机
    pub recognized: bool,
}

impl ProbeResult {
    /// 按状态码计算 `recognized`
    pub fn new(candidate: String, target: String, status_code: u16) -> Self {
        ProbeResult {
            candidate,
            target,
            status_code,
            recognized: status_code != 404,
        }
    }
}

/// 探测结果，传输失败也是一个值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 服务器返回了HTTP响应
    Responded(ProbeResult),
    /// 请求失败或超时
    Unresolved {
        /// 字典中的候选前缀
        candidate: String,
        /// 请求中使用的Host头
        target: String,
        /// 失败原因
        reason: String,
    },
}

impl ProbeOutcome {
    /// 对应的候选前缀
    pub fn candidate(&self) -> &str {
        match self {
            ProbeOutcome::Responded(result) => &result.candidate,
            ProbeOutcome::Unresolved { candidate, .. } => candidate,
        }
    }

    /// 是否为被识别的虚拟主机
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeOutcome::Responded(result) if result.recognized)
    }
}

/// 发现结果的输出端，多个探测任务会并发调用
pub trait ProbeSink: Send + Sync {
    /// 发现一个被识别的虚拟主机
    fn found(&self, result: &ProbeResult);

    /// 请求失败，该候选记为未解析
    fn unresolved(&self, target: &str, reason: &str) {
        log::warn!("未解析 {}: {}", target, reason);
    }
}

/// 对固定目标执行单个候选的探测
pub struct ProbeWorker<T: HttpTransport> {
    transport: Arc<T>,
    target: Arc<ProbeTarget>,
    sink: Arc<dyn ProbeSink>,
}

impl<T: HttpTransport> Clone for ProbeWorker<T> {
    fn clone(&self) -> Self {
        ProbeWorker {
            transport: Arc::clone(&self.transport),
            target: Arc::clone(&self.target),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T: HttpTransport> ProbeWorker<T> {
    /// 创建探测器，目标信息和输出端在所有任务间共享
    pub fn new(transport: Arc<T>, target: Arc<ProbeTarget>, sink: Arc<dyn ProbeSink>) -> Self {
        ProbeWorker {
            transport,
            target,
            sink,
        }
    }

    /// 共享的目标信息
    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }

    /// 以 `{candidate}.{apex}` 作为Host头请求目标
    ///
    /// 传输错误在这里被转换成 [`ProbeOutcome::Unresolved`]，不会传给调用方。
    pub async fn probe(&self, candidate: String) -> ProbeOutcome {
        let vhost = self.target.vhost_name(&candidate);
        let request = ProbeRequest {
            url: target_url(&self.target.host, self.target.port),
            host_header: Some(vhost.clone()),
            user_agent: self.target.user_agent.clone(),
        };

        match self.transport.get(request).await {
            Ok(reply) => {
                let result = ProbeResult::new(candidate, vhost, reply.status);
                log::debug!("{} -> {}", result.target, result.status_code);
                if result.recognized {
                    self.sink.found(&result);
                }
                ProbeOutcome::Responded(result)
            }
            Err(e) => {
                let reason = e.to_string();
                self.sink.unresolved(&vhost, &reason);
                ProbeOutcome::Unresolved {
                    candidate,
                    target: vhost,
                    reason,
                }
            }
        }
    }
}
