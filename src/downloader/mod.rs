pub mod engine;
pub mod progress;
pub mod queue;
pub mod task;

pub use engine::{body_reader, DownloadEngine, OpenedResponse, DEFAULT_USER_AGENT};
pub use progress::SpeedCalculator;
pub use queue::TaskQueue;
pub use task::{DownloadTask, TaskContext, TaskSnapshot, TaskStatus};
