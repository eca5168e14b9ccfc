//! 下载队列
//!
//! 串行执行策略：同一时刻只有一个任务在传输，按提交顺序（FIFO）依次执行。
//! 前一个任务进入终态后立即启动下一个；尚未启动的任务保持 `Queued` 状态。
//!
//! 队列不提供优先级或公平性调度。取消一个尚未启动的任务只需调用该任务的 `cancel()`，
//! 轮到它时会直接进入 `Cancelled`，不会发起网络请求。

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use super::task::DownloadTask;

struct QueueState {
    /// 等待队列（FIFO）
    pending: VecDeque<DownloadTask>,
    /// 是否有任务正在执行
    running: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    /// 队列是否空闲（没有执行中的任务且等待队列为空）
    idle_tx: watch::Sender<bool>,
}

/// 串行下载队列
///
/// 克隆得到的是同一个队列的句柄
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (idle_tx, _) = watch::channel(true);
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    running: false,
                }),
                idle_tx,
            }),
        }
    }

    /// 提交任务
    ///
    /// 当前没有执行中的任务时立即开始执行队首任务。必须在 tokio 运行时内调用。
    pub fn submit(&self, task: DownloadTask) {
        let should_spawn = {
            let mut state = self.inner.state.lock();
            info!(
                "任务 {} 加入下载队列 (等待中: {})",
                task.id(),
                state.pending.len()
            );
            state.pending.push_back(task);
            self.inner.idle_tx.send_replace(false);

            let was_running = state.running;
            state.running = true;
            !was_running
        };

        if should_spawn {
            let inner = self.inner.clone();
            tokio::spawn(async move { drain(inner).await });
        }
    }

    /// 等待中的任务数量（不含执行中的任务）
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// 是否有任务正在执行
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().running
    }

    /// 等待队列全部执行完毕
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.idle_tx.subscribe();
        let _ = rx.wait_for(|idle| *idle).await;
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// 依次执行队列中的任务，直到队列为空
async fn drain(inner: Arc<QueueInner>) {
    loop {
        // 取出队首与"标记空闲"在同一把锁内完成，避免与 submit 竞争
        let next = {
            let mut state = inner.state.lock();
            match state.pending.pop_front() {
                Some(task) => Some(task),
                None => {
                    state.running = false;
                    inner.idle_tx.send_replace(true);
                    None
                }
            }
        };

        let Some(task) = next else {
            debug!("下载队列已清空");
            break;
        };

        info!("开始执行队列任务 {}: {}", task.id(), task.url());
        task.start().await;
        info!("队列任务 {} 结束: {}", task.id(), task.status());
    }
}
