//! 运行中的控制命令
//!
//! 从 stdin 逐行读取：`pause <n>`、`resume <n>`、`cancel <n>`、`status`。
//! `<n>` 为从 1 开始的任务序号，或任务 ID 的前缀。

use std::io::BufRead;

use tokio::sync::mpsc;

use crate::downloader::DownloadTask;

/// 控制命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Pause(String),
    Resume(String),
    Cancel(String),
    Status,
}

/// 命令解析错误
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("空命令")]
    Empty,

    #[error("未知命令: {0}（可用命令: pause <n>, resume <n>, cancel <n>, status）")]
    Unknown(String),

    #[error("命令 {0} 需要指定任务序号或 ID")]
    MissingTarget(&'static str),
}

/// 解析一行控制命令
pub fn parse_command(line: &str) -> Result<ControlCommand, ParseCommandError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err(ParseCommandError::Empty);
    };
    let target = parts.next().map(str::to_string);

    match verb.to_ascii_lowercase().as_str() {
        "pause" => target
            .map(ControlCommand::Pause)
            .ok_or(ParseCommandError::MissingTarget("pause")),
        "resume" => target
            .map(ControlCommand::Resume)
            .ok_or(ParseCommandError::MissingTarget("resume")),
        "cancel" => target
            .map(ControlCommand::Cancel)
            .ok_or(ParseCommandError::MissingTarget("cancel")),
        "status" => Ok(ControlCommand::Status),
        other => Err(ParseCommandError::Unknown(other.to_string())),
    }
}

/// 根据序号或 ID 前缀查找任务
///
/// ID 前缀匹配到多个任务时视为找不到
pub fn resolve_target<'a>(tasks: &'a [DownloadTask], target: &str) -> Option<&'a DownloadTask> {
    if let Ok(index) = target.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| tasks.get(i));
    }

    let mut matches = tasks.iter().filter(|t| t.id().starts_with(target));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

/// 在独立线程中读取 stdin
///
/// 阻塞读取不占用运行时线程，进程退出时也不需要等待它结束
pub(super) fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    rx
}
