//! 速度与剩余时间计算
//!
//! 速度每秒最多重新计算一次：(自上次采样以来写入的字节数) / (自上次采样以来的秒数)。
//! 速度和剩余时间只用于展示，不参与任何控制决策。

use std::time::{Duration, Instant};

/// 采样间隔
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// 速度计算器
#[derive(Debug, Clone)]
pub struct SpeedCalculator {
    /// 上次采样时间
    last_sample_time: Instant,
    /// 上次采样时的累计字节数
    last_sample_bytes: u64,
    /// 最近一次计算出的速度 (bytes/s)
    speed: u64,
}

impl SpeedCalculator {
    /// 以当前时间和起始字节数创建计算器
    pub fn new(start_bytes: u64) -> Self {
        Self::starting_at(start_bytes, Instant::now())
    }

    fn starting_at(start_bytes: u64, now: Instant) -> Self {
        Self {
            last_sample_time: now,
            last_sample_bytes: start_bytes,
            speed: 0,
        }
    }

    /// 记录当前累计字节数
    ///
    /// 距上次采样不足一秒时返回 None，否则返回新的速度
    pub fn sample(&mut self, total_bytes: u64) -> Option<u64> {
        self.sample_at(total_bytes, Instant::now())
    }

    fn sample_at(&mut self, total_bytes: u64, now: Instant) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.last_sample_time);
        if elapsed < SAMPLE_INTERVAL {
            return None;
        }

        let delta = total_bytes.saturating_sub(self.last_sample_bytes);
        self.speed = (delta as f64 / elapsed.as_secs_f64()) as u64;
        self.last_sample_time = now;
        self.last_sample_bytes = total_bytes;

        Some(self.speed)
    }

    /// 重新开始计时（暂停恢复后调用，避免暂停时长拉低速度）
    pub fn restart(&mut self, total_bytes: u64) {
        self.last_sample_time = Instant::now();
        self.last_sample_bytes = total_bytes;
        self.speed = 0;
    }

    /// 最近一次计算出的速度 (bytes/s)
    pub fn speed(&self) -> u64 {
        self.speed
    }
}

/// 估算剩余时间（秒）
///
/// 总大小未知或速度为 0 时返回 None（未知/无穷大）
pub fn estimate_eta(total_size: Option<u64>, transferred: u64, speed: u64) -> Option<u64> {
    let total = total_size?;
    if speed == 0 {
        return None;
    }
    Some(total.saturating_sub(transferred) / speed)
}

/// 计算进度 (0.0 - 1.0)
///
/// 总大小未知或为 0 时返回 None（不确定进度），不会出现除零
pub fn progress_fraction(total_size: Option<u64>, transferred: u64) -> Option<f64> {
    match total_size {
        Some(total) if total > 0 => Some((transferred as f64 / total as f64).min(1.0)),
        _ => None,
    }
}
