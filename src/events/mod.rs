//! 任务事件与进度节流

pub mod throttle;
pub mod types;

pub use throttle::ProgressThrottler;
pub use types::TaskEvent;
