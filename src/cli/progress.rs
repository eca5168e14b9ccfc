use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::common::format::{format_eta, format_size, format_speed};
use crate::downloader::{DownloadTask, TaskStatus};
use crate::events::TaskEvent;

const BAR_TEMPLATE: &str =
    "{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}";
const SPINNER_TEMPLATE: &str = "{prefix} {spinner:.green} [{elapsed_precise}] {bytes} {msg}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// 进度条管理器
///
/// 每个任务一条进度条；总大小未知时显示为转圈 + 已下载字节数
pub struct ProgressManager {
    multi: MultiProgress,
}

impl ProgressManager {
    /// 创建进度条管理器，静默模式下不绘制
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self { multi }
    }

    pub fn multi(&self) -> MultiProgress {
        self.multi.clone()
    }

    /// 输出一行信息而不打断进度条
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() {
            eprintln!("{}", msg.as_ref());
        } else {
            let _ = self.multi.println(msg);
        }
    }

    /// 为任务创建进度条并跟踪其事件，直到任务进入终态
    ///
    /// 必须在任务启动之前调用，否则可能错过早期事件
    pub fn track(&self, index: usize, task: &DownloadTask) -> JoinHandle<()> {
        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(spinner_style());
        bar.set_prefix(format!("[{}] {}", index + 1, task.file_name()));
        bar.set_message(TaskStatus::Queued.to_string());

        let mut events = task.subscribe();
        let task = task.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        render_event(&bar, &task, &event);
                        if terminal {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => {
                        if task.status().is_terminal() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            finish_bar(&bar, &task);
        })
    }
}

/// 根据事件更新进度条
fn render_event(bar: &ProgressBar, task: &DownloadTask, event: &TaskEvent) {
    match event {
        TaskEvent::StatusChanged { new_status, .. } => {
            if *new_status == TaskStatus::Downloading {
                match task.total_size() {
                    Some(total) => {
                        bar.disable_steady_tick();
                        bar.set_style(bar_style());
                        bar.set_length(total);
                    }
                    None => bar.enable_steady_tick(Duration::from_millis(120)),
                }
                bar.set_position(task.bytes_transferred());
            }
            bar.set_message(new_status.to_string());
        }
        TaskEvent::Progress {
            bytes_transferred,
            speed,
            eta_secs,
            ..
        } => {
            bar.set_position(*bytes_transferred);
            bar.set_message(format!(
                "{} ETA {}",
                format_speed(*speed),
                format_eta(*eta_secs)
            ));
        }
        _ => {}
    }
}

fn finish_bar(bar: &ProgressBar, task: &DownloadTask) {
    bar.disable_steady_tick();
    let message = match task.status() {
        TaskStatus::Completed => format!(
            "{} ({})",
            TaskStatus::Completed,
            format_size(task.bytes_transferred())
        ),
        TaskStatus::Error => format!(
            "{}: {}",
            TaskStatus::Error,
            task.error().unwrap_or_default()
        ),
        other => other.to_string(),
    };

    if task.status() == TaskStatus::Completed {
        bar.finish_with_message(message);
    } else {
        bar.abandon_with_message(message);
    }
}

/// 任务状态行（`status` 命令与结束汇总使用）
pub fn status_line(index: usize, task: &DownloadTask) -> String {
    let snapshot = task.snapshot();
    let size = match snapshot.total_size {
        Some(total) => format!(
            "{}/{}",
            format_size(snapshot.bytes_transferred),
            format_size(total)
        ),
        None => format_size(snapshot.bytes_transferred),
    };
    let percent = snapshot
        .progress
        .map(|p| format!(" {:.1}%", p * 100.0))
        .unwrap_or_default();
    let short_id: String = snapshot.id.chars().take(8).collect();

    let mut line = format!(
        "[{}] {} {} {}{} {}",
        index + 1,
        short_id,
        snapshot.status,
        size,
        percent,
        task.file_name()
    );
    if let Some(error) = snapshot.error {
        line.push_str(&format!(" ({})", error));
    }
    line
}
