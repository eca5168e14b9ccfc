use anyhow::{bail, Context, Result};
use std::process::ExitCode;
use tracing::{info, warn};

use super::control::{self, parse_command, resolve_target, ControlCommand};
use super::progress::{status_line, ProgressManager};
use super::utils::unique_output_paths;
use super::DownloadArgs;
use crate::common::format::format_size;
use crate::config::AppConfig;
use crate::downloader::{DownloadTask, TaskContext, TaskQueue, TaskStatus};
use crate::logging::ConsoleOutput;
use crate::persistence::{HistoryLog, JsonlHistoryLog};

/// 执行下载命令
///
/// 所有 URL 按参数顺序进入同一个队列，逐个下载
pub async fn execute_download(
    args: &DownloadArgs,
    config: &AppConfig,
    console: ConsoleOutput,
) -> Result<ExitCode> {
    if args.urls.len() > 1 && args.output.is_some() {
        bail!("--output 只能用于单个 URL，多个 URL 请使用 --dir");
    }
    if args.urls.len() > 1 && args.sha256.is_some() {
        bail!("--sha256 只能用于单个 URL");
    }

    let ctx = TaskContext::from_config(config).context("创建下载引擎失败")?;

    let retention_days = config.persistence.history_retention_days;
    if retention_days > 0 {
        ctx.history.remove_expired(retention_days);
    }

    let dir = args
        .dir
        .clone()
        .unwrap_or_else(|| config.download.download_dir.clone());

    // 同名 URL 不能写入同一个文件
    let outputs = match &args.output {
        Some(output) => vec![output.clone()],
        None => unique_output_paths(&args.urls, &dir),
    };

    let tasks: Vec<DownloadTask> = args
        .urls
        .iter()
        .zip(outputs)
        .map(|(url, output)| {
            let task = DownloadTask::new(url.clone(), output, ctx.clone());
            if let Some(digest) = &args.sha256 {
                task.set_expected_digest(digest.clone());
            }
            task
        })
        .collect();

    let progress = ProgressManager::new(args.quiet);
    if !args.quiet {
        console.attach(progress.multi());
    }

    // 先订阅事件再提交，避免错过早期状态变化
    let renderers: Vec<_> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| progress.track(i, task))
        .collect();

    let queue = TaskQueue::new();
    for task in &tasks {
        info!("提交下载任务 {}: {} -> {:?}", task.id(), task.url(), task.output_path());
        queue.submit(task.clone());
    }

    let mut commands = control::spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = queue.wait_idle() => break,
            line = commands.recv(), if stdin_open => match line {
                Some(line) => handle_command(&line, &tasks, &progress),
                None => stdin_open = false,
            },
        }
    }

    for renderer in renderers {
        if let Err(e) = renderer.await {
            warn!("进度显示任务异常退出: {}", e);
        }
    }
    console.detach();

    let mut failed = 0;
    for (i, task) in tasks.iter().enumerate() {
        println!("{}", status_line(i, task));
        if task.status() == TaskStatus::Error {
            failed += 1;
        }
    }

    if failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// 处理一行控制命令
fn handle_command(line: &str, tasks: &[DownloadTask], progress: &ProgressManager) {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(control::ParseCommandError::Empty) => return,
        Err(e) => {
            progress.println(e.to_string());
            return;
        }
    };

    let target = match &command {
        ControlCommand::Status => {
            for (i, task) in tasks.iter().enumerate() {
                progress.println(status_line(i, task));
            }
            return;
        }
        ControlCommand::Pause(target)
        | ControlCommand::Resume(target)
        | ControlCommand::Cancel(target) => target.as_str(),
    };

    let Some(task) = resolve_target(tasks, target) else {
        progress.println(format!("找不到任务: {}", target));
        return;
    };

    info!("控制命令 {:?} -> 任务 {}", command, task.id());
    match command {
        ControlCommand::Pause(_) => task.pause(),
        ControlCommand::Resume(_) => task.resume(),
        ControlCommand::Cancel(_) => task.cancel(),
        ControlCommand::Status => {}
    }
}

/// 执行历史命令
pub fn execute_history(config: &AppConfig) -> Result<ExitCode> {
    let history = JsonlHistoryLog::new(config.persistence.history_path());
    let records = history.load_all();

    if records.is_empty() {
        println!("暂无下载记录");
        return Ok(ExitCode::SUCCESS);
    }

    for record in records {
        let completed_at = record
            .completed_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S");
        println!(
            "{}  {:>10}  {}  {}  ({})",
            completed_at,
            format_size(record.size_bytes),
            record.file_name,
            record.output_path.display(),
            record.url
        );
    }

    Ok(ExitCode::SUCCESS)
}
