//! 根域名解析
//!
//! 先向目标发一次不跟随重定向的请求，从 `Location` 头中取根域名；
//! 没有重定向时退回到反向地址解析。

use reqwest::Url;

use crate::error::{Result, ScanError};
use crate::transport::{target_url, HttpTransport, ProbeRequest, ReverseLookup};

/// 根域名解析器
pub struct ApexResolver<'a, T: HttpTransport, R: ReverseLookup> {
    transport: &'a T,
    lookup: &'a R,
    user_agent: &'a str,
}

impl<'a, T: HttpTransport, R: ReverseLookup> ApexResolver<'a, T, R> {
    /// 请求使用给定的User-Agent
    pub fn new(transport: &'a T, lookup: &'a R, user_agent: &'a str) -> Self {
        ApexResolver {
            transport,
            lookup,
            user_agent,
        }
    }

    /// 确定 `host:port` 上虚拟主机共用的根域名
    ///
    /// 请求本身失败时直接返回错误，不重试。
    pub async fn resolve(&self, host: &str, port: u16) -> Result<String> {
        let request = ProbeRequest {
            url: target_url(host, port),
            host_header: None,
            user_agent: self.user_agent.to_string(),
        };
        let reply = self
            .transport
            .get(request)
            .await
            .map_err(|e| ScanError::resolution(host, e.to_string()))?;

        if let Some(location) = reply.location.as_deref() {
            log::debug!("{} 返回重定向: {}", host, location);
            if let Some(domain) = domain_from_location(location) {
                return Ok(domain);
            }
            log::warn!("无法从重定向地址 {} 中取得域名，尝试反向解析", location);
        }

        match self.lookup.reverse(host).await {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ScanError::resolution(host, "no domain for host")),
        }
    }
}

/// 取重定向地址中主机名的最后两段
///
/// 假定公共后缀只有一段，`a.example.co.uk` 会得到 `co.uk`。
/// 重定向地址中的端口被丢弃，探测请求仍然发往配置的目标端口。
pub fn domain_from_location(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let host = url.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(2);
    let domain = labels[start..].join(".");
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}
