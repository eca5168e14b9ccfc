//! 任务事件类型定义
//!
//! 展示层通过 `DownloadTask::subscribe()` 订阅这些事件，核心不依赖任何具体的界面框架

use serde::{Deserialize, Serialize};

use crate::downloader::TaskStatus;

/// 下载任务事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// 状态变更
    StatusChanged {
        task_id: String,
        old_status: TaskStatus,
        new_status: TaskStatus,
    },
    /// 进度更新
    Progress {
        task_id: String,
        bytes_transferred: u64,
        total_size: Option<u64>,
        /// 进度 (0.0 - 1.0)，总大小未知时为 None
        progress: Option<f64>,
        /// 速度 (bytes/s)
        speed: u64,
        /// 剩余时间（秒），未知时为 None
        eta_secs: Option<u64>,
    },
    /// 任务完成
    Completed {
        task_id: String,
        size_bytes: u64,
        completed_at: i64,
    },
    /// 校验失败
    ChecksumFailed {
        task_id: String,
        expected: String,
        actual: String,
    },
    /// 任务取消
    Cancelled { task_id: String },
    /// 任务失败
    Failed { task_id: String, error: String },
}

impl TaskEvent {
    /// 事件所属任务 ID
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::StatusChanged { task_id, .. }
            | TaskEvent::Progress { task_id, .. }
            | TaskEvent::Completed { task_id, .. }
            | TaskEvent::ChecksumFailed { task_id, .. }
            | TaskEvent::Cancelled { task_id }
            | TaskEvent::Failed { task_id, .. } => task_id,
        }
    }

    /// 是否为终态事件
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::Completed { .. }
                | TaskEvent::ChecksumFailed { .. }
                | TaskEvent::Cancelled { .. }
                | TaskEvent::Failed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = TaskEvent::StatusChanged {
            task_id: "t1".to_string(),
            old_status: TaskStatus::Queued,
            new_status: TaskStatus::Connecting,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "status_changed");
        assert_eq!(json["old_status"], "queued");
        assert_eq!(json["new_status"], "connecting");
    }

    #[test]
    fn test_terminal_events() {
        let cancelled = TaskEvent::Cancelled {
            task_id: "t1".to_string(),
        };
        assert!(cancelled.is_terminal());
        assert_eq!(cancelled.task_id(), "t1");

        let progress = TaskEvent::Progress {
            task_id: "t2".to_string(),
            bytes_transferred: 10,
            total_size: None,
            progress: None,
            speed: 0,
            eta_secs: None,
        };
        assert!(!progress.is_terminal());
        assert_eq!(progress.task_id(), "t2");
    }
}
