//! 进度事件节流器
//!
//! 用于控制进度事件的发布频率，避免事件风暴（建议 200-250ms）

use std::time::{Duration, Instant};

/// 默认节流间隔（毫秒）
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 200;

/// 进度事件节流器
///
/// 由下载循环独占使用：每次写入后调用 `should_emit()`，返回 true 时才发布进度事件
#[derive(Debug, Clone)]
pub struct ProgressThrottler {
    /// 上次发布事件的时间
    last_emit: Option<Instant>,
    /// 节流间隔
    interval: Duration,
}

impl ProgressThrottler {
    /// 创建新的节流器
    pub fn new(interval: Duration) -> Self {
        Self {
            last_emit: None,
            interval,
        }
    }

    /// 使用指定毫秒间隔创建节流器
    pub fn with_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    /// 检查是否应该发布事件
    ///
    /// 首次调用或距离上次发布已超过节流间隔时返回 true 并记录时间
    pub fn should_emit(&mut self) -> bool {
        self.should_emit_at(Instant::now())
    }

    fn should_emit_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// 强制发布（用于最后一次更新）
    pub fn force_emit(&mut self) -> bool {
        self.last_emit = Some(Instant::now());
        true
    }

    /// 重置节流器状态
    pub fn reset(&mut self) {
        self.last_emit = None;
    }
}

impl Default for ProgressThrottler {
    fn default() -> Self {
        Self::with_millis(DEFAULT_THROTTLE_INTERVAL_MS)
    }
}
