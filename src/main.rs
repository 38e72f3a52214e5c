use std::process;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use rvhost::api::{ScanConfig, VhostScanEngine};
use rvhost::input::{Opts, OutputFormat};
use rvhost::output::{export_results, print_summary, ConsoleReporter};
use rvhost::{logger, ScanError};

const BANNER: &str = r"
                _               _
 _ ____   __   | |__   ___  ___| |_
| '__\ \ / /___| '_ \ / _ \/ __| __|
| |   \ V /____| | | | (_) \__ \ |_
|_|    \_/     |_| |_|\___/|___/\__|
";

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    logger::init_logger(logger::level_for(opts.verbose, opts.silent));

    if opts.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(opts).await {
        eprintln!("{} {}", "[ERROR]".red(), e);
        process::exit(1);
    }
}

/// 执行扫描主逻辑
async fn run(opts: Opts) -> Result<(), ScanError> {
    // 格式在扫描前检查，避免扫完才发现无法导出
    let format = opts
        .format
        .parse::<OutputFormat>()
        .map_err(ScanError::Configuration)?;

    let config = opts.to_config();
    config.validate()?;

    if !opts.silent {
        print_banner();
        print_config(&config);
    }

    let engine = VhostScanEngine::new(config)?;
    let reporter = Arc::new(ConsoleReporter::stdout(!opts.no_color));

    if !opts.silent {
        println!("{}", "[INFO] Searching domains by requests...".blue());
    }
    let report = engine.run(reporter.clone()).await?;

    if opts.summary {
        print_summary(&report.stats);
    }

    if let Some(ref output_path) = opts.output {
        let target = format!("{}:{}", engine.config().target_host, engine.config().target_port);
        export_results(
            &target,
            &report.apex_domain,
            reporter.found_vhosts(),
            &report.stats,
            output_path,
            format,
        )?;
    }

    Ok(())
}

fn print_banner() {
    println!("{}", BANNER.yellow());
}

/// 显示扫描参数
fn print_config(config: &ScanConfig) {
    println!("Host IP: {}", config.target_host);
    println!("Port: {}", config.target_port);
    println!("Wordlist: {}", config.wordlist.display());
    println!("Threads: {}", config.batch_size);
    println!("Delay: {}", config.delay_secs);
    if let Some(ref domain) = config.domain {
        println!("Domain: {}", domain);
    }
    println!();
}
