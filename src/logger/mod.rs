use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// 根据命令行参数选择日志级别
///
/// 静默模式只保留警告和错误，`-v` 打开调试日志，`-vv` 打开全部。
pub fn level_for(verbose: u8, silent: bool) -> LevelFilter {
    match (verbose, silent) {
        (0, true) => LevelFilter::Warn,
        (0, false) => LevelFilter::Info,
        (1, _) => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 初始化终端日志，输出到标准错误，不影响标准输出上的扫描结果
pub fn init_logger(level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .add_filter_allow_str("rvhost")
        .build();

    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("日志初始化失败: {}", e);
    }
}
