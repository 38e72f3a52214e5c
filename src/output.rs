use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::input::OutputFormat;
use crate::probe::{ProbeResult, ProbeSink};
use crate::scheduler::ScanStats;

/// 可序列化的发现记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundVhost {
    /// 完整的虚拟主机名
    pub vhost: String,
    /// 字典中的原始前缀
    pub candidate: String,
    /// HTTP状态码
    pub status_code: u16,
    /// 发现时的Unix时间戳（秒）
    pub timestamp: u64,
    /// 格式化后的发现时间
    pub formatted_time: String,
}

impl From<&ProbeResult> for FoundVhost {
    fn from(result: &ProbeResult) -> Self {
        let now = chrono::Utc::now();
        FoundVhost {
            vhost: result.target.clone(),
            candidate: result.candidate.clone(),
            status_code: result.status_code,
            timestamp: now.timestamp() as u64,
            formatted_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// 可序列化的汇总统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableStats {
    /// 批次数
    pub batches: usize,
    /// 探测总数
    pub probed: usize,
    /// 发现数
    pub found: usize,
    /// 返回404的数量
    pub not_found: usize,
    /// 未解析数
    pub unresolved: usize,
    /// 耗时（秒）
    pub elapsed_secs: f64,
}

impl From<&ScanStats> for SerializableStats {
    fn from(stats: &ScanStats) -> Self {
        SerializableStats {
            batches: stats.batches,
            probed: stats.probed,
            found: stats.found,
            not_found: stats.not_found,
            unresolved: stats.unresolved,
            elapsed_secs: stats.elapsed.as_secs_f64(),
        }
    }
}

/// 完整的导出数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    /// 扫描目标 `host:port`
    pub target: String,
    /// 根域名
    pub apex_domain: String,
    /// 发现的虚拟主机
    pub found: Vec<FoundVhost>,
    /// 汇总统计
    pub summary: SerializableStats,
    /// 导出时间
    pub export_time: String,
}

/// 控制台输出端
///
/// 发现结果立即写出；多个探测任务并发上报时由互斥锁保证整行输出。
pub struct ConsoleReporter {
    out: Mutex<Box<dyn Write + Send>>,
    found: Mutex<Vec<FoundVhost>>,
    color: bool,
}

impl ConsoleReporter {
    /// 写到标准输出
    pub fn stdout(color: bool) -> Self {
        Self::new(Box::new(io::stdout()), color)
    }

    /// 写到任意输出，`color` 控制状态码是否着色
    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        ConsoleReporter {
            out: Mutex::new(out),
            found: Mutex::new(Vec::new()),
            color,
        }
    }

    /// 到目前为止发现的虚拟主机
    pub fn found_vhosts(&self) -> Vec<FoundVhost> {
        match self.found.lock() {
            Ok(found) => found.clone(),
            Err(_) => Vec::new(),
        }
    }

    fn format_line(&self, result: &ProbeResult) -> String {
        let status = format!("[{}]", result.status_code);
        if self.color {
            format!("{} {}", status.green(), result.target)
        } else {
            format!("{} {}", status, result.target)
        }
    }
}

impl ProbeSink for ConsoleReporter {
    fn found(&self, result: &ProbeResult) {
        let line = self.format_line(result);
        if let Ok(mut out) = self.out.lock() {
            if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
                log::error!("写入输出失败: {}", e);
            }
        }
        if let Ok(mut found) = self.found.lock() {
            found.push(result.into());
        }
    }
}

/// 打印汇总统计
pub fn print_summary(stats: &ScanStats) {
    println!("\n{}", "=".repeat(60));
    println!("                    汇总统计");
    println!("{}", "=".repeat(60));
    println!("探测批次: {}", stats.batches);
    println!("探测总数: {}", stats.probed);
    println!("发现虚拟主机: {}", stats.found);
    println!("返回404: {}", stats.not_found);
    println!("未解析: {}", stats.unresolved);
    println!("耗时: {:.2} 秒", stats.elapsed.as_secs_f64());
    println!("{}", "=".repeat(60));
}

/// 导出结果到文件
pub fn export_results(
    target: &str,
    apex_domain: &str,
    found: Vec<FoundVhost>,
    stats: &ScanStats,
    output_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let export_data = ExportData {
        target: target.to_string(),
        apex_domain: apex_domain.to_string(),
        found,
        summary: stats.into(),
        export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };

    let contents = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&export_data)
            .map_err(|e| ScanError::Export(e.to_string()))?,
        OutputFormat::Csv => export_to_csv(&export_data),
        OutputFormat::Txt => export_to_txt(&export_data),
    };

    let mut file = File::create(output_path)
        .map_err(|e| ScanError::Export(format!("{}: {}", output_path.display(), e)))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| ScanError::Export(format!("{}: {}", output_path.display(), e)))?;

    log::info!("结果已导出到: {}", output_path.display());
    Ok(())
}

/// 导出为CSV格式
fn export_to_csv(data: &ExportData) -> String {
    let mut csv = String::new();
    csv.push_str("VHost,Candidate,StatusCode,Timestamp,FormattedTime\n");
    for found in &data.found {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            escape_csv(&found.vhost),
            escape_csv(&found.candidate),
            found.status_code,
            found.timestamp,
            escape_csv(&found.formatted_time)
        ));
    }
    csv
}

/// 导出为TXT格式
fn export_to_txt(data: &ExportData) -> String {
    let mut txt = String::new();

    txt.push_str("rvhost 扫描结果报告\n");
    txt.push_str(&format!("目标: {}\n", data.target));
    txt.push_str(&format!("根域名: {}\n", data.apex_domain));
    txt.push_str(&format!("导出时间: {}\n", data.export_time));
    txt.push_str(&format!("{}\n\n", "=".repeat(60)));

    txt.push_str("汇总统计:\n");
    txt.push_str(&format!("  探测总数: {}\n", data.summary.probed));
    txt.push_str(&format!("  发现虚拟主机: {}\n", data.summary.found));
    txt.push_str(&format!("  未解析: {}\n", data.summary.unresolved));
    txt.push('\n');

    txt.push_str("发现的虚拟主机:\n");
    txt.push_str(&format!("{:<40} {:<8} {:<20}\n", "虚拟主机", "状态码", "时间"));
    txt.push_str(&format!("{}\n", "-".repeat(70)));
    for found in &data.found {
        txt.push_str(&format!(
            "{:<40} {:<8} {:<20}\n",
            found.vhost, found.status_code, found.formatted_time
        ));
    }

    txt
}

/// CSV转义
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// 共享缓冲区，方便测试读取输出
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn result(candidate: &str, status: u16) -> ProbeResult {
        ProbeResult::new(candidate.to_string(), format!("{}.example.com", candidate), status)
    }

    #[test]
    fn test_found_line_format() {
        let buf = SharedBuf::default();
        let reporter = ConsoleReporter::new(Box::new(buf.clone()), false);

        reporter.found(&result("www", 200));
        reporter.found(&result("admin", 403));

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "[200] www.example.com\n[403] admin.example.com\n");
        assert_eq!(reporter.found_vhosts().len(), 2);
    }

    #[test]
    fn test_concurrent_lines_are_not_interleaved() {
        let buf = SharedBuf::default();
        let reporter = Arc::new(ConsoleReporter::new(Box::new(buf.clone()), false));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        reporter.found(&result(&format!("t{}-{}", i, j), 200));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        assert!(lines
            .iter()
            .all(|l| l.starts_with("[200] t") && l.ends_with(".example.com")));
    }

    #[test]
    fn test_export_formats() {
        let reporter = ConsoleReporter::new(Box::new(io::sink()), false);
        reporter.found(&result("www", 200));
        let stats = ScanStats {
            batches: 1,
            probed: 3,
            found: 1,
            not_found: 2,
            ..Default::default()
        };
        let dir = std::env::temp_dir();
        let pid = std::process::id();

        let json_path = dir.join(format!("rvhost-export-{}.json", pid));
        export_results("10.0.0.1:80", "example.com", reporter.found_vhosts(), &stats, &json_path, OutputFormat::Json).unwrap();
        let data: ExportData = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(data.apex_domain, "example.com");
        assert_eq!(data.found.len(), 1);
        assert_eq!(data.found[0].vhost, "www.example.com");
        assert_eq!(data.summary.probed, 3);

        let csv_path = dir.join(format!("rvhost-export-{}.csv", pid));
        export_results("10.0.0.1:80", "example.com", reporter.found_vhosts(), &stats, &csv_path, OutputFormat::Csv).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("www.example.com,www,200,"));

        let txt_path = dir.join(format!("rvhost-export-{}.txt", pid));
        export_results("10.0.0.1:80", "example.com", reporter.found_vhosts(), &stats, &txt_path, OutputFormat::Txt).unwrap();
        assert!(std::fs::read_to_string(&txt_path).unwrap().contains("www.example.com"));

        for path in [json_path, csv_path, txt_path] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
