//! 断点位置存储
//!
//! 以下载链接为键，记录已经写入输出文件的字节数。进程重启后依然有效。
//!
//! ## 文件格式
//!
//! `resume.json` 为一个 JSON 对象，键为 URL，值为字节偏移：
//! ```json
//! {
//!   "http://example.com/a.iso": 4000
//! }
//! ```
//!
//! 所有操作都会吸收存储层的 I/O 错误（记录日志后继续），读取失败一律视为"没有进度"。
//!
//! `set` 先更新内存，按刷盘间隔合并写入文件；`clear`、`flush` 和析构时立即落盘。
//! 磁盘上的偏移量只会落后于实际写入量，不会超过。

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// 断点位置存储接口
///
/// 调用方保证 `set` 只在对应字节已写入输出文件之后调用
pub trait ResumeStore: Send + Sync {
    /// 获取已下载字节数，不存在或存储不可读时返回 0
    fn get(&self, key: &str) -> u64;

    /// 更新（或插入）已下载字节数
    fn set(&self, key: &str, offset: u64);

    /// 删除记录，不存在时无操作
    fn clear(&self, key: &str);

    /// 把尚未落盘的更新写入存储
    fn flush(&self) {}
}

// ============================================================================
// 文件存储
// ============================================================================

/// 默认刷盘间隔
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// 基于 JSON 文件的断点位置存储
///
/// 首次访问时加载文件内容到内存，之后以原子方式重写整个文件
#[derive(Debug)]
pub struct FileResumeStore {
    path: PathBuf,
    flush_interval: Duration,
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: Option<HashMap<String, u64>>,
    /// 内存中有未落盘的修改
    dirty: bool,
    last_save: Option<Instant>,
}

impl FileResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_flush_interval(path, DEFAULT_FLUSH_INTERVAL)
    }

    /// 指定刷盘间隔创建存储
    pub fn with_flush_interval(path: impl Into<PathBuf>, flush_interval: Duration) -> Self {
        Self {
            path: path.into(),
            flush_interval,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否存在指定键的记录
    pub fn contains_key(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        Self::loaded(&self.path, &mut state.entries).contains_key(key)
    }

    /// 确保缓存已加载
    fn loaded<'a>(
        path: &Path,
        entries: &'a mut Option<HashMap<String, u64>>,
    ) -> &'a mut HashMap<String, u64> {
        entries.get_or_insert_with(|| match load_entries(path) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("读取断点记录失败，视为无进度: {:?}, 错误: {}", path, e);
                }
                HashMap::new()
            }
        })
    }

    /// 把缓存写入文件，失败时保留脏标记等待下次重试
    fn save_locked(&self, state: &mut StoreState) -> io::Result<()> {
        state.last_save = Some(Instant::now());
        let entries = Self::loaded(&self.path, &mut state.entries);
        save_entries(&self.path, entries)?;
        state.dirty = false;
        Ok(())
    }
}

impl ResumeStore for FileResumeStore {
    fn get(&self, key: &str) -> u64 {
        let mut state = self.state.lock();
        Self::loaded(&self.path, &mut state.entries)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn set(&self, key: &str, offset: u64) {
        let mut state = self.state.lock();
        Self::loaded(&self.path, &mut state.entries).insert(key.to_string(), offset);
        state.dirty = true;

        let due = state
            .last_save
            .map_or(true, |t| t.elapsed() >= self.flush_interval);
        if !due {
            return;
        }

        if let Err(e) = self.save_locked(&mut state) {
            warn!("保存断点记录失败: {:?}, 错误: {}", self.path, e);
        }
    }

    fn clear(&self, key: &str) {
        let mut state = self.state.lock();
        let removed = Self::loaded(&self.path, &mut state.entries)
            .remove(key)
            .is_some();
        if !removed && !state.dirty {
            return;
        }

        if let Err(e) = self.save_locked(&mut state) {
            warn!("清除断点记录失败: {:?}, 错误: {}", self.path, e);
        } else {
            debug!("已清除断点记录: {}", key);
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        if !state.dirty {
            return;
        }

        if let Err(e) = self.save_locked(&mut state) {
            warn!("保存断点记录失败: {:?}, 错误: {}", self.path, e);
        }
    }
}

impl Drop for FileResumeStore {
    fn drop(&mut self) {
        self.flush();
    }
}

/// 从文件加载全部记录
fn load_entries(path: &Path) -> io::Result<HashMap<String, u64>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse resume store: {}", e),
        )
    })
}

/// 原子地保存全部记录（先写临时文件再重命名）
fn save_entries(path: &Path, entries: &HashMap<String, u64>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        let ordered: BTreeMap<&String, &u64> = entries.iter().collect();
        serde_json::to_writer_pretty(&mut writer, &ordered).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize resume store: {}", e),
            )
        })?;

        writer.flush()?;
    }

    fs::rename(&temp_path, path)
}

// ============================================================================
// 内存存储
// ============================================================================

/// 内存中的断点位置存储（测试或无需持久化的场景）
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    entries: Mutex<HashMap<String, u64>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ResumeStore for MemoryResumeStore {
    fn get(&self, key: &str) -> u64 {
        self.entries.lock().get(key).copied().unwrap_or(0)
    }

    fn set(&self, key: &str, offset: u64) {
        self.entries.lock().insert(key.to_string(), offset);
    }

    fn clear(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
