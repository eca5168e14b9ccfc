//! 持久化模块
//!
//! - 断点存储：URL -> 已写入字节数，每次变更后立即落盘
//! - 下载历史：每个成功完成的下载追加一条 JSON Lines 记录
//!
//! ## 文件结构
//!
//! ```text
//! data/
//! ├── resume.json      # 断点记录（JSON 对象）
//! └── history.jsonl    # 下载历史（每行一条记录）
//! ```
//!
//! 存储层的读写失败只记录日志，不会中断下载。

pub mod history;
pub mod resume;
pub mod types;

pub use history::{HistoryLog, JsonlHistoryLog, MemoryHistoryLog};
pub use resume::{FileResumeStore, MemoryResumeStore, ResumeStore};
pub use types::HistoryRecord;
