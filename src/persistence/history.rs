//! 下载历史模块
//!
//! 负责记录已完成的下载：
//! - 任务成功完成时追加一条记录
//! - 加载全部历史记录（保持写入顺序）
//! - 支持定期清理过期记录
//!
//! ## 文件格式
//!
//! history.jsonl 使用 JSON Lines 格式，每行一条完整的 HistoryRecord：
//! ```text
//! {"url":"http://example.com/a.iso","file_name":"a.iso",...}
//! {"url":"http://example.com/b.zip","file_name":"b.zip",...}
//! ```
//!
//! 每次追加都会读取全部记录、追加后整体重写（临时文件 + 原子替换）。
//! 该操作没有内部加锁，多个写入方需要由调用方串行化（`TaskQueue` 保证同一时刻只有一个任务在写）。

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::types::HistoryRecord;

/// 计算保留期的截止时间
///
/// 天数超出时间范围时返回 None，表示全部保留
pub fn retention_cutoff(retention_days: u64) -> Option<DateTime<Utc>> {
    let days = i64::try_from(retention_days).ok()?;
    let window = Duration::try_days(days)?;
    Utc::now().checked_sub_signed(window)
}

/// 下载历史接口
pub trait HistoryLog: Send + Sync {
    /// 追加一条记录，失败时仅记录日志
    fn append(&self, record: HistoryRecord);

    /// 按写入顺序返回全部记录，读取失败时返回空列表
    fn load_all(&self) -> Vec<HistoryRecord>;

    /// 删除完成时间超过 `retention_days` 天的记录，返回删除数量
    fn remove_expired(&self, retention_days: u64) -> usize;
}

// ============================================================================
// 文件实现
// ============================================================================

/// 基于 JSON Lines 文件的下载历史
#[derive(Debug, Clone)]
pub struct JsonlHistoryLog {
    path: PathBuf,
}

impl JsonlHistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 历史文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录，损坏的行会被跳过
    fn read_records(&self) -> io::Result<Vec<HistoryRecord>> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut error_count = 0;
        let mut line = Vec::new();
        let mut line_num = 0;

        // 按字节读取，非 UTF-8 的行只影响自身
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_num += 1;
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    error_count += 1;
                    warn!("解析历史记录失败 (行 {}): {}", line_num, e);
                }
            }
        }

        if error_count > 0 {
            warn!("加载历史文件时有 {} 条记录解析失败", error_count);
        }

        Ok(records)
    }

    /// 使用临时文件 + 原子替换重写全部记录
    fn write_records(&self, records: &[HistoryRecord]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);

            for record in records {
                let json = serde_json::to_string(record)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(writer, "{}", json)?;
            }

            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)
    }
}

impl HistoryLog for JsonlHistoryLog {
    fn append(&self, record: HistoryRecord) {
        let mut records = self.load_all();
        debug!("追加历史记录: {} -> {:?}", record.url, record.output_path);
        records.push(record);

        if let Err(e) = self.write_records(&records) {
            warn!("写入历史文件失败: {:?}, 错误: {}", self.path, e);
        }
    }

    fn load_all(&self) -> Vec<HistoryRecord> {
        match self.read_records() {
            Ok(records) => records,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("历史文件不存在，返回空列表: {:?}", self.path);
                Vec::new()
            }
            Err(e) => {
                warn!("读取历史文件失败: {:?}, 错误: {}", self.path, e);
                Vec::new()
            }
        }
    }

    fn remove_expired(&self, retention_days: u64) -> usize {
        let Some(cutoff_time) = retention_cutoff(retention_days) else {
            debug!("保留天数 {} 超出范围，不清理历史记录", retention_days);
            return 0;
        };
        let records = self.load_all();

        let (kept, expired): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.completed_at >= cutoff_time);

        if expired.is_empty() {
            return 0;
        }

        if let Err(e) = self.write_records(&kept) {
            warn!("清理过期历史失败: {:?}, 错误: {}", self.path, e);
            return 0;
        }

        info!(
            "已清理 {} 条过期历史记录（超过 {} 天）",
            expired.len(),
            retention_days
        );

        expired.len()
    }
}

// ============================================================================
// 内存实现
// ============================================================================

/// 内存中的下载历史（测试或无需持久化的场景）
#[derive(Debug, Default)]
pub struct MemoryHistoryLog {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl HistoryLog for MemoryHistoryLog {
    fn append(&self, record: HistoryRecord) {
        self.records.lock().push(record);
    }

    fn load_all(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }

    fn remove_expired(&self, retention_days: u64) -> usize {
        let Some(cutoff_time) = retention_cutoff(retention_days) else {
            return 0;
        };
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.completed_at >= cutoff_time);
        before - records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_record(name: &str) -> HistoryRecord {
        HistoryRecord::new(
            format!("http://example.com/{}", name),
            Path::new(&format!("/downloads/{}", name)),
            1024,
        )
    }

    #[test]
    fn test_load_all_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let log = JsonlHistoryLog::new(temp_dir.path().join("history.jsonl"));
        assert!(log.load_all().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let log = JsonlHistoryLog::new(temp_dir.path().join("data").join("history.jsonl"));

        log.append(create_test_record("a.iso"));
        log.append(create_test_record("b.iso"));
        log.append(create_test_record("c.iso"));

        let names: Vec<_> = log.load_all().into_iter().map(|r| r.file_name).collect();
        assert_eq!(names, vec!["a.iso", "b.iso", "c.iso"]);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.jsonl");
        let log = JsonlHistoryLog::new(&path);

        log.append(create_test_record("a.iso"));
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("this is not json\n");
        fs::write(&path, content).unwrap();

        log.append(create_test_record("b.iso"));

        let records = log.load_all();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].file_name, "b.iso");
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.jsonl");
        let log = JsonlHistoryLog::new(&path);

        log.append(create_test_record("a.iso"));
        log.append(create_test_record("b.iso"));
        let mut content = fs::read(&path).unwrap();
        content.extend_from_slice(b"\xff\xfe{broken}\n");
        fs::write(&path, content).unwrap();

        log.append(create_test_record("c.iso"));

        let names: Vec<_> = log.load_all().into_iter().map(|r| r.file_name).collect();
        assert_eq!(names, vec!["a.iso", "b.iso", "c.iso"]);
    }

    #[test]
    fn test_retention_cutoff_out_of_range() {
        assert!(retention_cutoff(30).is_some());
        assert!(retention_cutoff(u64::MAX).is_none());
        assert!(retention_cutoff(200_000_000_000_000).is_none());
    }

    #[test]
    fn test_huge_retention_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let log = JsonlHistoryLog::new(temp_dir.path().join("history.jsonl"));
        log.append(create_test_record("a.iso"));
        log.append(create_test_record("b.iso"));

        assert_eq!(log.remove_expired(u64::MAX), 0);
        assert_eq!(log.load_all().len(), 2);

        let memory = MemoryHistoryLog::new();
        memory.append(create_test_record("a.iso"));
        assert_eq!(memory.remove_expired(200_000_000), 0);
        assert_eq!(memory.remove_expired(u64::MAX), 0);
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_remove_expired() {
        let temp_dir = TempDir::new().unwrap();
        let log = JsonlHistoryLog::new(temp_dir.path().join("history.jsonl"));

        let mut old = create_test_record("old.iso");
        old.completed_at = Utc::now() - Duration::days(60);
        log.append(old);
        log.append(create_test_record("new.iso"));

        assert_eq!(log.remove_expired(30), 1);

        let records = log.load_all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "new.iso");

        assert_eq!(log.remove_expired(30), 0);
    }

    #[test]
    fn test_memory_log() {
        let log = MemoryHistoryLog::new();
        assert!(log.is_empty());

        log.append(create_test_record("a.iso"));
        let mut old = create_test_record("old.iso");
        old.completed_at = Utc::now() - Duration::days(10);
        log.append(old);

        assert_eq!(log.len(), 2);
        assert_eq!(log.remove_expired(5), 1);
        assert_eq!(log.load_all()[0].file_name, "a.iso");
    }
}
