// Resumable HTTP Download Library
// 可断点续传的 HTTP 下载核心库

// 错误类型
pub mod error;

// 公共模块（校验和、格式化）
pub mod common;

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 持久化模块（断点记录、下载历史）
pub mod persistence;

// 任务事件模块
pub mod events;

// 下载引擎模块
pub mod downloader;

// 命令行模块
pub mod cli;

// 导出常用类型
pub use config::AppConfig;
pub use downloader::{DownloadEngine, DownloadTask, TaskContext, TaskQueue, TaskSnapshot, TaskStatus};
pub use error::DownloadError;
pub use events::TaskEvent;
pub use persistence::{
    FileResumeStore, HistoryLog, HistoryRecord, JsonlHistoryLog, MemoryHistoryLog,
    MemoryResumeStore, ResumeStore,
};
