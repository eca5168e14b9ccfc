use clap::Parser;
use resumable_dl::{cli, config::LogConfig, logging, AppConfig};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

/// 先单独读取日志配置，失败时使用默认配置
///
/// 日志系统初始化之前无法记录配置加载的问题，完整配置在初始化之后再加载
async fn load_log_config(path: &Path) -> LogConfig {
    if let Ok(content) = tokio::fs::read_to_string(path).await {
        if let Ok(value) = toml::from_str::<toml::Value>(&content) {
            if let Some(log_table) = value.get("log") {
                if let Ok(log_config) = log_table.clone().try_into::<LogConfig>() {
                    return log_config;
                }
            }
        }
    }
    LogConfig::default()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let log_config = load_log_config(&cli.config).await;

    // 必须保持 log_guard 存活
    let log_guard = logging::init_logging(&log_config);

    info!("resumable-dl v{} 启动", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default(&cli.config).await;

    match cli::run(cli, config, log_guard.console()).await {
        Ok(code) => code,
        Err(e) => {
            error!("运行失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
