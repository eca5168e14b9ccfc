//! 命令行入口
//!
//! - `download`：把所有 URL 提交到同一个串行队列，显示进度条，并从 stdin 读取控制命令
//! - `history`：打印下载历史

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::AppConfig;
use crate::logging::ConsoleOutput;

mod control;
mod progress;
mod runner;
pub mod utils;

pub use control::{parse_command, resolve_target, ControlCommand, ParseCommandError};

/// 可断点续传的 HTTP 下载器
#[derive(Parser, Debug)]
#[command(name = "resumable-dl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, value_name = "PATH", default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 下载一个或多个文件（按顺序逐个下载）
    Download(DownloadArgs),
    /// 查看下载历史
    History,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// 下载 URL
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// 输出文件路径（只能用于单个 URL）
    #[arg(short, long, value_name = "PATH", conflicts_with = "dir")]
    pub output: Option<PathBuf>,

    /// 保存目录（默认使用配置中的 download_dir）
    #[arg(short, long, value_name = "DIRECTORY")]
    pub dir: Option<PathBuf>,

    /// 期望的 SHA-256 摘要（十六进制，只能用于单个 URL）
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// 静默模式（不显示进度条）
    #[arg(short, long)]
    pub quiet: bool,
}

/// 运行 CLI 程序
///
/// 有任务以 `Error` 结束时返回退出码 1
pub async fn run(cli: Cli, config: AppConfig, console: ConsoleOutput) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Download(args) => runner::execute_download(&args, &config, console).await,
        Command::History => runner::execute_history(&config),
    }
}
