use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::api::{ScanConfig, DEFAULT_USER_AGENT};

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 带汇总统计的JSON
    Json,
    /// 每个发现一行的CSV
    Csv,
    /// 每行一个虚拟主机
    Txt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("不支持的输出格式: {}。支持的格式: json, csv, txt", s)),
        }
    }
}

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "rvhost")]
#[command(version)]
#[command(
    about = "Look for virtual-host subdomains on an HTTP server behind a single IP address",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Opts {
    /// IP (or hostname) of the HTTP web server
    #[arg(value_name = "HOST")]
    pub host: String,

    /// wordlist path, one subdomain label per line
    #[arg(short, long)]
    pub wordlist: PathBuf,

    /// target port
    #[arg(short, long, default_value_t = 80)]
    pub port: u16,

    /// number of simultaneous requests per batch
    #[arg(short, long, default_value_t = 10)]
    pub threads: usize,

    /// delay in seconds after each batch of requests
    #[arg(short, long, default_value_t = 0.0)]
    pub delay: f64,

    /// per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// apex domain to append, skips redirect/reverse-lookup discovery
    #[arg(long)]
    pub domain: Option<String>,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// output format (json, csv, txt)
    #[arg(long, default_value = "json")]
    pub format: String,

    /// silent: only print found subdomains
    #[arg(short, long)]
    pub silent: bool,

    /// disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// show summary statistics
    #[arg(long)]
    pub summary: bool,

    /// verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Opts {
    /// 转换为扫描配置（尚未校验）
    pub fn to_config(&self) -> ScanConfig {
        ScanConfig {
            target_host: self.host.trim().to_string(),
            target_port: self.port,
            wordlist: self.wordlist.clone(),
            batch_size: self.threads,
            delay_secs: self.delay,
            timeout_secs: self.timeout,
            domain: self.domain.clone(),
            user_agent: self.user_agent.clone(),
            silent: self.silent,
            color: !self.no_color,
        }
    }
}
