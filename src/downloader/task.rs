//! 下载任务
//!
//! 单个下载的完整生命周期：
//!
//! ```text
//! Queued --start()--> Connecting --(收到响应)--> Downloading
//! Downloading --pause()--> Paused --resume()--> Downloading
//! Queued/Connecting/Downloading/Paused --cancel()--> Cancelled
//! Downloading --(数据流结束)--> Verifying（设置了期望摘要） | Completed
//! Verifying --(摘要一致)--> Completed
//! Verifying --(摘要不一致)--> ChecksumFailed
//! 任意状态 --(I/O 或协议错误)--> Error
//! ```
//!
//! 暂停、恢复、取消都是异步请求，由下载循环在每次读取之间检查；
//! 效果通过状态变化观察，而不是同步返回。任务本身从不向调用方抛出错误。

use std::fmt;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::engine::{body_reader, DownloadEngine};
use super::progress::{estimate_eta, progress_fraction, SpeedCalculator};
use crate::common::checksum::{digest_file, digest_matches};
use crate::common::format::format_eta;
use crate::config::AppConfig;
use crate::error::{DownloadError, StorageContext};
use crate::events::{ProgressThrottler, TaskEvent};
use crate::persistence::{
    FileResumeStore, HistoryLog, HistoryRecord, JsonlHistoryLog, ResumeStore,
};

/// 默认读取缓冲区大小
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// 默认进度事件节流间隔
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// 原子字段中表示"未知"的哨兵值
const UNKNOWN: u64 = u64::MAX;

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 下载任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待中
    Queued,
    /// 连接中
    Connecting,
    /// 下载中
    Downloading,
    /// 已暂停
    Paused,
    /// 校验中
    Verifying,
    /// 已完成
    Completed,
    /// 校验失败
    ChecksumFailed,
    /// 已取消
    Cancelled,
    /// 失败
    Error,
}

impl TaskStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::ChecksumFailed | Self::Cancelled | Self::Error
        )
    }

    /// 是否为活跃状态（占用网络连接）
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Downloading | Self::Paused)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Downloading => write!(f, "Downloading"),
            Self::Paused => write!(f, "Paused"),
            Self::Verifying => write!(f, "Verifying"),
            Self::Completed => write!(f, "Completed"),
            Self::ChecksumFailed => write!(f, "Checksum Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// 任务运行所需的协作组件
///
/// 断点存储和下载历史以 trait 对象注入，测试可替换为内存实现
#[derive(Clone)]
pub struct TaskContext {
    /// 下载引擎（共享 HTTP 客户端）
    pub engine: Arc<DownloadEngine>,
    /// 断点位置存储
    pub resume_store: Arc<dyn ResumeStore>,
    /// 下载历史
    pub history: Arc<dyn HistoryLog>,
    /// 读取缓冲区大小
    pub buffer_size: usize,
    /// 进度事件节流间隔
    pub progress_interval: Duration,
}

impl TaskContext {
    pub fn new(
        engine: Arc<DownloadEngine>,
        resume_store: Arc<dyn ResumeStore>,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        Self {
            engine,
            resume_store,
            history,
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// 根据应用配置创建（文件存储位于数据目录下）
    pub fn from_config(config: &AppConfig) -> Result<Self, DownloadError> {
        let engine = Arc::new(DownloadEngine::new(&config.download)?);
        let resume_store: Arc<dyn ResumeStore> =
            Arc::new(FileResumeStore::new(config.persistence.resume_path()));
        let history: Arc<dyn HistoryLog> =
            Arc::new(JsonlHistoryLog::new(config.persistence.history_path()));

        let mut ctx = Self::new(engine, resume_store, history);
        ctx.buffer_size = config.download.buffer_size.max(1);
        ctx.progress_interval = Duration::from_millis(config.download.progress_interval_ms);
        Ok(ctx)
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("engine", &self.engine)
            .field("buffer_size", &self.buffer_size)
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

/// 任务只读快照（供展示层使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub url: String,
    pub output_path: PathBuf,
    pub status: TaskStatus,
    pub bytes_transferred: u64,
    pub total_size: Option<u64>,
    /// 进度 (0.0 - 1.0)，总大小未知时为 None
    pub progress: Option<f64>,
    /// 速度 (bytes/s)
    pub speed: u64,
    /// 剩余时间（秒），未知时为 None
    pub eta_secs: Option<u64>,
    pub error: Option<String>,
    pub created_at: i64,
}

/// 下载循环的结束方式
enum TransferEnd {
    /// 数据流正常结束
    Finished { written: u64 },
    /// 用户取消
    Cancelled,
}

struct TaskInner {
    id: String,
    url: String,
    output_path: PathBuf,
    created_at: i64,
    expected_digest: Mutex<Option<String>>,
    ctx: TaskContext,

    started: AtomicBool,
    status_tx: watch::Sender<TaskStatus>,
    events: broadcast::Sender<TaskEvent>,

    bytes_transferred: AtomicU64,
    total_size: AtomicU64,
    speed: AtomicU64,
    eta_secs: AtomicU64,
    error: Mutex<Option<String>>,

    cancel_token: CancellationToken,
    pause_tx: watch::Sender<bool>,
}

/// 下载任务
///
/// 内部以 `Arc` 共享，克隆得到的是同一个任务的另一个句柄：
/// 一个句柄执行 `start()`，其他句柄可以并发地暂停/恢复/取消并读取进度。
#[derive(Clone)]
pub struct DownloadTask {
    inner: Arc<TaskInner>,
}

impl DownloadTask {
    /// 创建新任务，初始状态为 `Queued`
    pub fn new(url: impl Into<String>, output_path: impl Into<PathBuf>, ctx: TaskContext) -> Self {
        let (status_tx, _) = watch::channel(TaskStatus::Queued);
        let (pause_tx, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(TaskInner {
                id: Uuid::new_v4().to_string(),
                url: url.into(),
                output_path: output_path.into(),
                created_at: chrono::Utc::now().timestamp(),
                expected_digest: Mutex::new(None),
                ctx,
                started: AtomicBool::new(false),
                status_tx,
                events,
                bytes_transferred: AtomicU64::new(0),
                total_size: AtomicU64::new(UNKNOWN),
                speed: AtomicU64::new(0),
                eta_secs: AtomicU64::new(UNKNOWN),
                error: Mutex::new(None),
                cancel_token: CancellationToken::new(),
                pause_tx,
            }),
        }
    }

    /// 设置期望的 SHA-256 摘要（必须在 `start()` 之前调用）
    pub fn with_expected_digest(self, digest: impl Into<String>) -> Self {
        self.set_expected_digest(digest);
        self
    }

    /// 设置期望的 SHA-256 摘要（必须在 `start()` 之前调用）
    pub fn set_expected_digest(&self, digest: impl Into<String>) {
        if self.inner.started.load(Ordering::SeqCst) {
            warn!("任务 {} 已启动，忽略期望摘要设置", self.inner.id);
            return;
        }
        *self.inner.expected_digest.lock() = Some(digest.into());
    }

    // ========================================================================
    // 控制
    // ========================================================================

    /// 运行任务直到终态
    ///
    /// 每个任务只能启动一次，重复调用会被忽略
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("任务 {} 已启动过，忽略重复的 start 调用", self.inner.id);
            return;
        }

        if self.inner.cancel_token.is_cancelled() {
            info!("任务 {} 在启动前已被取消，不发起网络请求", self.inner.id);
            self.finish_cancelled().await;
            return;
        }

        if let Err(e) = self.run().await {
            self.fail(e);
        }
    }

    /// 在 tokio 运行时上启动任务
    pub fn spawn(&self) -> JoinHandle<()> {
        let task = self.clone();
        tokio::spawn(async move { task.start().await })
    }

    /// 请求暂停（在下一次读取之前生效）
    pub fn pause(&self) {
        if self.status().is_terminal() {
            return;
        }
        if !self.inner.pause_tx.send_replace(true) {
            debug!("任务 {} 请求暂停", self.inner.id);
        }
    }

    /// 请求恢复
    pub fn resume(&self) {
        if self.inner.pause_tx.send_replace(false) {
            debug!("任务 {} 请求恢复", self.inner.id);
        }
    }

    /// 请求取消（优先于暂停）
    pub fn cancel(&self) {
        if self.status().is_terminal() {
            return;
        }
        if !self.inner.cancel_token.is_cancelled() {
            debug!("任务 {} 请求取消", self.inner.id);
            self.inner.cancel_token.cancel();
        }
    }

    /// 等待任务进入终态并返回该状态
    pub async fn wait(&self) -> TaskStatus {
        let mut rx = self.inner.status_tx.subscribe();
        let result = rx.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        result.unwrap_or_else(|_| self.status())
    }

    // ========================================================================
    // 只读信号
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn output_path(&self) -> &Path {
        &self.inner.output_path
    }

    /// 输出文件名
    pub fn file_name(&self) -> String {
        self.inner
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn expected_digest(&self) -> Option<String> {
        self.inner.expected_digest.lock().clone()
    }

    /// 当前状态
    pub fn status(&self) -> TaskStatus {
        *self.inner.status_tx.borrow()
    }

    /// 订阅状态变化
    pub fn subscribe_status(&self) -> watch::Receiver<TaskStatus> {
        self.inner.status_tx.subscribe()
    }

    /// 订阅任务事件
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.events.subscribe()
    }

    /// 已写入输出文件的字节数
    pub fn bytes_transferred(&self) -> u64 {
        self.inner.bytes_transferred.load(Ordering::Acquire)
    }

    /// 文件总大小，未知时为 None
    pub fn total_size(&self) -> Option<u64> {
        known(self.inner.total_size.load(Ordering::Acquire))
    }

    /// 进度 (0.0 - 1.0)，总大小未知时为 None（不确定进度）
    pub fn progress(&self) -> Option<f64> {
        progress_fraction(self.total_size(), self.bytes_transferred())
    }

    /// 下载速度 (bytes/s)
    pub fn speed(&self) -> u64 {
        self.inner.speed.load(Ordering::Relaxed)
    }

    /// 剩余时间（秒），未知时为 None
    pub fn eta_secs(&self) -> Option<u64> {
        known(self.inner.eta_secs.load(Ordering::Relaxed))
    }

    /// 格式化的剩余时间，未知时为 "unknown"
    pub fn eta(&self) -> String {
        format_eta(self.eta_secs())
    }

    /// 失败原因（仅 `Error` 状态）
    pub fn error(&self) -> Option<String> {
        self.inner.error.lock().clone()
    }

    /// 获取只读快照
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.inner.id.clone(),
            url: self.inner.url.clone(),
            output_path: self.inner.output_path.clone(),
            status: self.status(),
            bytes_transferred: self.bytes_transferred(),
            total_size: self.total_size(),
            progress: self.progress(),
            speed: self.speed(),
            eta_secs: self.eta_secs(),
            error: self.error(),
            created_at: self.inner.created_at,
        }
    }

    // ========================================================================
    // 执行
    // ========================================================================

    /// 执行下载、校验与收尾
    async fn run(&self) -> Result<(), DownloadError> {
        let written = match self.transfer().await? {
            TransferEnd::Cancelled => {
                self.finish_cancelled().await;
                return Ok(());
            }
            TransferEnd::Finished { written } => written,
        };

        let ctx = &self.inner.ctx;
        let url = self.inner.url.as_str();
        let path = self.inner.output_path.as_path();

        ctx.resume_store.clear(url);

        if let Some(expected) = self.expected_digest() {
            self.transition(TaskStatus::Verifying);
            let actual = digest_file(path).await.map_err(DownloadError::Checksum)?;

            if !digest_matches(&actual, &expected) {
                warn!(
                    "任务 {} 校验失败: 期望 {}, 实际 {}，删除文件 {:?}",
                    self.inner.id, expected, actual, path
                );
                remove_output_file(path).await;
                if self.transition(TaskStatus::ChecksumFailed) {
                    self.emit(TaskEvent::ChecksumFailed {
                        task_id: self.inner.id.clone(),
                        expected,
                        actual,
                    });
                }
                return Ok(());
            }

            info!("任务 {} 校验通过: {}", self.inner.id, actual);
        }

        let size_bytes = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("读取输出文件大小失败: {:?}, 错误: {}", path, e);
                written
            }
        };

        let record = HistoryRecord::new(url, path, size_bytes);
        let completed_at = record.completed_at.timestamp();
        ctx.history.append(record);

        if self.transition(TaskStatus::Completed) {
            info!(
                "任务 {} 下载完成: {:?} ({} bytes)",
                self.inner.id, path, size_bytes
            );
            self.emit(TaskEvent::Completed {
                task_id: self.inner.id.clone(),
                size_bytes,
                completed_at,
            });
        }

        Ok(())
    }

    /// 连接服务器并把响应体写入输出文件
    ///
    /// 输出文件句柄在返回时关闭
    async fn transfer(&self) -> Result<TransferEnd, DownloadError> {
        let ctx = &self.inner.ctx;
        let url = self.inner.url.as_str();
        let path = self.inner.output_path.as_path();
        let cancel = &self.inner.cancel_token;

        self.transition(TaskStatus::Connecting);

        let stored_offset = ctx.resume_store.get(url);

        let existing_len = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(DownloadError::storage("读取输出文件信息失败", e)),
        };

        // 断点记录比实际文件还长时，记录不可信，从头开始
        let requested_offset = if stored_offset > existing_len {
            warn!(
                "任务 {} 断点记录 {} 超过文件实际长度 {}，从头下载",
                self.inner.id, stored_offset, existing_len
            );
            0
        } else {
            stored_offset
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(TransferEnd::Cancelled),
            opened = ctx.engine.open(url, requested_offset) => opened?,
        };

        // 收到可用的响应之后才创建输出文件
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .storage_context("创建父目录失败")?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .await
            .storage_context("打开输出文件失败")?;

        let start_offset = opened.start_offset;
        let total_size = opened.total_size;

        if start_offset == 0 && stored_offset > 0 {
            ctx.resume_store.clear(url);
        }

        // 丢弃断点之后的残留数据（包括服务器拒绝 Range 时的整个旧文件）
        file.set_len(start_offset)
            .await
            .storage_context("截断输出文件失败")?;
        file.seek(SeekFrom::Start(start_offset))
            .await
            .storage_context("文件定位失败")?;

        if let Some(total) = total_size {
            self.inner.total_size.store(total, Ordering::Release);
        }
        self.inner
            .bytes_transferred
            .store(start_offset, Ordering::Release);

        self.transition(TaskStatus::Downloading);

        let end = self
            .read_loop(&mut file, body_reader(opened.response), start_offset, total_size)
            .await?;

        file.flush().await.storage_context("刷新文件失败")?;
        Ok(end)
    }

    /// 读取循环：每次处理一个固定大小的缓冲区
    async fn read_loop<R>(
        &self,
        file: &mut File,
        mut reader: R,
        start_offset: u64,
        total_size: Option<u64>,
    ) -> Result<TransferEnd, DownloadError>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let ctx = &self.inner.ctx;
        let url = self.inner.url.as_str();
        let cancel = &self.inner.cancel_token;
        let read_timeout = ctx.engine.read_timeout();

        let mut pause_rx = self.inner.pause_tx.subscribe();
        let mut buffer = vec![0u8; ctx.buffer_size.max(1)];
        let mut speed_calc = SpeedCalculator::new(start_offset);
        let mut throttler = ProgressThrottler::new(ctx.progress_interval);
        let mut written = start_offset;

        loop {
            // 取消优先于暂停
            if cancel.is_cancelled() {
                info!("任务 {} 已取消 ({} bytes 已写入)", self.inner.id, written);
                return Ok(TransferEnd::Cancelled);
            }

            if *pause_rx.borrow_and_update() {
                self.inner.speed.store(0, Ordering::Relaxed);
                self.inner.eta_secs.store(UNKNOWN, Ordering::Relaxed);
                ctx.resume_store.flush();
                self.transition(TaskStatus::Paused);
                info!("任务 {} 已暂停 ({} bytes)", self.inner.id, written);

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = pause_rx.wait_for(|paused| !*paused) => {}
                }

                if !cancel.is_cancelled() {
                    self.transition(TaskStatus::Downloading);
                    info!("任务 {} 已恢复", self.inner.id);
                    speed_calc.restart(written);
                }
                continue;
            }

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => continue,
                read = tokio::time::timeout(read_timeout, reader.read(&mut buffer)) => read,
            };

            let n = match read {
                Ok(result) => result.map_err(DownloadError::StreamRead)?,
                Err(_) => {
                    return Err(DownloadError::StreamRead(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} 秒内未收到数据", read_timeout.as_secs()),
                    )))
                }
            };

            if n == 0 {
                break;
            }

            if let Some(total) = total_size {
                if written + n as u64 > total {
                    return Err(DownloadError::StreamRead(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("服务器返回的数据超过声明的长度 {}", total),
                    )));
                }
            }

            file.write_all(&buffer[..n])
                .await
                .storage_context("写入文件失败")?;
            // 断点位置只能在数据落盘之后更新
            file.flush().await.storage_context("刷新文件失败")?;

            written += n as u64;
            self.inner
                .bytes_transferred
                .store(written, Ordering::Release);
            ctx.resume_store.set(url, written);

            if let Some(speed) = speed_calc.sample(written) {
                self.inner.speed.store(speed, Ordering::Relaxed);
                let eta = estimate_eta(total_size, written, speed).unwrap_or(UNKNOWN);
                self.inner.eta_secs.store(eta, Ordering::Relaxed);
            }

            if throttler.should_emit() {
                self.emit_progress();
            }
        }

        if let Some(total) = total_size {
            if written < total {
                return Err(DownloadError::StreamRead(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("连接提前结束: 已收到 {} / {} bytes", written, total),
                )));
            }
        }

        self.inner.eta_secs.store(0, Ordering::Relaxed);
        throttler.force_emit();
        self.emit_progress();

        debug!("任务 {} 数据流结束: {} bytes", self.inner.id, written);
        Ok(TransferEnd::Finished { written })
    }

    /// 取消收尾：删除部分文件、清除断点记录
    async fn finish_cancelled(&self) {
        remove_output_file(&self.inner.output_path).await;
        self.inner.ctx.resume_store.clear(&self.inner.url);

        if self.transition(TaskStatus::Cancelled) {
            self.emit(TaskEvent::Cancelled {
                task_id: self.inner.id.clone(),
            });
        }
    }

    /// 失败收尾：保留部分文件和断点记录，以便之后续传
    fn fail(&self, e: DownloadError) {
        error!("任务 {} 下载失败: {} ({})", self.inner.id, e, self.inner.url);
        self.inner.ctx.resume_store.flush();
        self.inner.speed.store(0, Ordering::Relaxed);
        self.inner.eta_secs.store(UNKNOWN, Ordering::Relaxed);

        let message = e.to_string();
        *self.inner.error.lock() = Some(message.clone());

        if self.transition(TaskStatus::Error) {
            self.emit(TaskEvent::Failed {
                task_id: self.inner.id.clone(),
                error: message,
            });
        }
    }

    /// 状态迁移，终态之后不再发生任何迁移
    fn transition(&self, new_status: TaskStatus) -> bool {
        let mut old_status = None;
        let changed = self.inner.status_tx.send_if_modified(|status| {
            if status.is_terminal() || *status == new_status {
                return false;
            }
            old_status = Some(*status);
            *status = new_status;
            true
        });

        if let Some(old_status) = old_status {
            debug!(
                "任务 {} 状态变更: {} -> {}",
                self.inner.id, old_status, new_status
            );
            self.emit(TaskEvent::StatusChanged {
                task_id: self.inner.id.clone(),
                old_status,
                new_status,
            });
        }

        changed
    }

    fn emit_progress(&self) {
        self.emit(TaskEvent::Progress {
            task_id: self.inner.id.clone(),
            bytes_transferred: self.bytes_transferred(),
            total_size: self.total_size(),
            progress: self.progress(),
            speed: self.speed(),
            eta_secs: self.eta_secs(),
        });
    }

    fn emit(&self, event: TaskEvent) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.inner.events.send(event);
    }
}

impl fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadTask")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("output_path", &self.inner.output_path)
            .field("status", &self.status())
            .field("bytes_transferred", &self.bytes_transferred())
            .field("total_size", &self.total_size())
            .finish()
    }
}

fn known(value: u64) -> Option<u64> {
    (value != UNKNOWN).then_some(value)
}

/// 删除输出文件，文件不存在时忽略
async fn remove_output_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("已删除输出文件: {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("删除输出文件失败: {:?}, 错误: {}", path, e),
    }
}
