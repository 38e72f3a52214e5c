//! # rvhost
//!
//! 在同一个IP上发现基于名称的虚拟主机。
//!
//! 对固定的 `IP:端口` 发送带不同 `Host` 头的HTTP请求，
//! 根据状态码判断服务器是否识别该子域名（非404即视为存在）。
//!
//! ## 特性
//!
//! - 🚀 **分批并发**: 每批最多 `batch_size` 个请求，批次之间严格串行，可设置批间延迟
//! - 🔍 **自动根域名**: 从重定向地址或反向解析中得到根域名
//! - 🛡️ **容错**: 单个请求失败只记为未解析，不影响整个扫描
//! - 📊 **多格式输出**: 支持JSON、CSV、TXT三种导出格式
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rvhost::scan_vhosts;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = scan_vhosts("10.10.11.5", 80, "subdomains.txt").await?;
//!     println!("根域名 {}，发现 {} 个虚拟主机", report.apex_domain, report.stats.found);
//!     Ok(())
//! }
//! ```
//!
//! ## 高级配置
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rvhost::{ConsoleReporter, ScanConfig, VhostScanEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig {
//!         target_host: "10.10.11.5".to_string(),
//!         wordlist: "subdomains.txt".into(),
//!         batch_size: 20,
//!         delay_secs: 0.5,
//!         domain: Some("example.htb".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let engine = VhostScanEngine::new(config)?;
//!     let reporter = Arc::new(ConsoleReporter::stdout(true));
//!     let report = engine.run(reporter.clone()).await?;
//!
//!     for found in reporter.found_vhosts() {
//!         println!("{} {}", found.status_code, found.vhost);
//!     }
//!     println!("共 {} 批", report.stats.batches);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// 扫描配置与入口
pub mod api;
/// 根域名解析
pub mod apex;
/// 错误类型
pub mod error;
/// 命令行参数
pub mod input;
/// 日志初始化
pub mod logger;
/// 结果输出与导出
pub mod output;
/// 单个候选的探测
pub mod probe;
/// 分批并发调度
pub mod scheduler;
/// 网络访问层
pub mod transport;
/// 字典读取
pub mod wordlist;

// 重新导出主要的公共API
pub use api::{scan_vhosts, ScanConfig, ScanReport, VhostScanEngine, DEFAULT_USER_AGENT};
pub use error::{ScanError, TransportError};

// 导出其他有用的类型
pub use apex::ApexResolver;
pub use input::OutputFormat;
pub use output::{export_results, ConsoleReporter, FoundVhost};
pub use probe::{ProbeOutcome, ProbeResult, ProbeSink, ProbeTarget, ProbeWorker};
pub use scheduler::{BatchScheduler, ScanStats};
pub use transport::{DnsReverseLookup, HttpReply, HttpTransport, ProbeRequest, ReqwestTransport, ReverseLookup};
pub use wordlist::Wordlist;
