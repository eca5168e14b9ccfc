//! 持久化数据类型

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 下载历史记录
///
/// 只在任务成功完成（且校验通过）时写入，写入后不可修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 下载链接
    pub url: String,
    /// 文件名
    pub file_name: String,
    /// 本地保存路径
    pub output_path: PathBuf,
    /// 文件大小（字节）
    pub size_bytes: u64,
    /// 完成时间
    pub completed_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// 以当前时间创建历史记录
    pub fn new(url: impl Into<String>, output_path: &Path, size_bytes: u64) -> Self {
        let file_name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            url: url.into(),
            file_name,
            output_path: output_path.to_path_buf(),
            size_bytes,
            completed_at: Utc::now(),
        }
    }
}
