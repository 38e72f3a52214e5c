//! 网络访问层
//!
//! 探测和根域名解析只通过这里的两个 trait 访问网络，
//! 测试时可以替换为不发包的实现。

use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{HOST, LOCATION, USER_AGENT};
use reqwest::{redirect, Client};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::TransportError;

/// trait方法返回的装箱Future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 一次GET请求的参数
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// 请求地址，固定为 `http://{host}:{port}/`
    pub url: String,
    /// 覆盖默认Host头；`None` 时由客户端按URL生成
    pub host_header: Option<String>,
    /// User-Agent头
    pub user_agent: String,
}

/// 分类所需的响应信息，响应体不读取
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// 响应状态码
    pub status: u16,
    /// `Location` 头，仅在存在且为合法字符串时有值
    pub location: Option<String>,
}

/// HTTP客户端抽象
pub trait HttpTransport: Send + Sync + 'static {
    /// 发送一次不跟随重定向的GET请求
    fn get(&self, request: ProbeRequest) -> BoxFuture<'_, Result<HttpReply, TransportError>>;
}

/// 基于reqwest的实现
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 不跟随重定向、每个请求带超时的客户端
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(timeout_secs))
            // 代理会按Host头转发，直接连接目标IP
            .no_proxy()
            .http1_only()
            .build()?;

        Ok(ReqwestTransport { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, request: ProbeRequest) -> BoxFuture<'_, Result<HttpReply, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .get(&request.url)
                .header(USER_AGENT, request.user_agent.as_str());
            if let Some(ref host) = request.host_header {
                builder = builder.header(HOST, host.as_str());
            }

            let response = builder.send().await?;
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            Ok(HttpReply {
                status: response.status().as_u16(),
                location,
            })
        })
    }
}

/// 反向地址解析抽象
pub trait ReverseLookup: Send + Sync + 'static {
    /// 返回主机的规范名称，查不到时返回 `None`
    fn reverse(&self, host: &str) -> BoxFuture<'_, Option<String>>;
}

/// 基于trust-dns的反向解析
pub struct DnsReverseLookup {
    resolver: TokioAsyncResolver,
}

impl DnsReverseLookup {
    /// 使用默认的上游DNS配置
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        DnsReverseLookup { resolver }
    }

    /// 主机名先正向解析出地址再做PTR查询
    async fn address_of(&self, host: &str) -> Option<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip);
        }
        match self.resolver.lookup_ip(host).await {
            Ok(response) => response.iter().next(),
            Err(e) => {
                log::debug!("正向解析 {} 失败: {}", host, e);
                None
            }
        }
    }
}

impl Default for DnsReverseLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseLookup for DnsReverseLookup {
    fn reverse(&self, host: &str) -> BoxFuture<'_, Option<String>> {
        let host = host.to_string();
        Box::pin(async move {
            let ip = self.address_of(&host).await?;
            match self.resolver.reverse_lookup(ip).await {
                Ok(response) => response
                    .iter()
                    .map(|name| name.to_utf8().trim_end_matches('.').to_string())
                    .find(|name| !name.is_empty()),
                Err(e) => {
                    log::debug!("反向解析 {} 失败: {}", ip, e);
                    None
                }
            }
        })
    }
}

/// 拼接探测地址，IPv6字面量加方括号
pub fn target_url(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("http://[{}]:{}/", ip, port),
        _ => format!("http://{}:{}/", host, port),
    }
}
