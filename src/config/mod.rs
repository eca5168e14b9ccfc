// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::downloader::DEFAULT_USER_AGENT;
use crate::persistence::history::retention_cutoff;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 下载配置
    #[serde(default)]
    pub download: DownloadConfig,
    /// 持久化配置
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 单个日志文件最大大小（字节，默认 50MB）
    #[serde(default = "default_log_max_file_size")]
    pub max_file_size: u64,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
            max_file_size: default_log_max_file_size(),
        }
    }
}

/// 下载配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// 默认下载目录（命令行未指定输出路径时使用）
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// 每次读取的缓冲区大小（字节）
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// 连接超时（秒）
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 单次读取超时（秒），超时视为连接中断
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// 请求使用的 User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// 进度事件最小间隔（毫秒）
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_buffer_size() -> usize {
    8192
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_progress_interval_ms() -> u64 {
    200
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            buffer_size: default_buffer_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            user_agent: default_user_agent(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// 持久化配置
///
/// 断点记录和下载历史都存放在 `data_dir` 下
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// 数据目录
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// 断点记录文件名
    #[serde(default = "default_resume_file")]
    pub resume_file: String,

    /// 下载历史文件名
    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// 历史记录保留天数（0 表示永久保留）
    #[serde(default)]
    pub history_retention_days: u64,
}

// PersistenceConfig 默认值函数
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_resume_file() -> String {
    "resume.json".to_string()
}

fn default_history_file() -> String {
    "history.jsonl".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            resume_file: default_resume_file(),
            history_file: default_history_file(),
            history_retention_days: 0,
        }
    }
}

impl PersistenceConfig {
    /// 断点记录文件路径
    pub fn resume_path(&self) -> PathBuf {
        self.data_dir.join(&self.resume_file)
    }

    /// 下载历史文件路径
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        if config.download.buffer_size == 0 {
            anyhow::bail!("配置错误：download.buffer_size 必须大于 0");
        }

        let retention_days = config.persistence.history_retention_days;
        if retention_cutoff(retention_days).is_none() {
            anyhow::bail!(
                "配置错误：persistence.history_retention_days = {} 超出可表示的时间范围",
                retention_days
            );
        }

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("✓ 配置已保存: {:?}", path);

        Ok(())
    }

    /// 加载或创建默认配置
    pub async fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {:#}", e);
                let default_config = Self::default();

                // 仅在配置文件不存在时写出默认配置，不覆盖用户写错的文件
                if !path.exists() {
                    if let Err(e) = default_config.save_to_file(path).await {
                        tracing::error!("保存默认配置失败: {:#}", e);
                    }
                }

                default_config
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.download.buffer_size, 8192);
        assert_eq!(config.download.read_timeout_secs, 60);
        assert_eq!(config.download.progress_interval_ms, 200);
        assert_eq!(config.download.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.persistence.history_retention_days, 0);
        assert!(config.log.enabled);
    }

    #[test]
    fn test_persistence_paths() {
        let config = PersistenceConfig {
            data_dir: PathBuf::from("/var/lib/dl"),
            ..Default::default()
        };
        assert_eq!(config.resume_path(), PathBuf::from("/var/lib/dl/resume.json"));
        assert_eq!(
            config.history_path(),
            PathBuf::from("/var/lib/dl/history.jsonl")
        );
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();

        let mut config = AppConfig::default();
        config.download.buffer_size = 16384;
        config.persistence.history_retention_days = 30;
        config.save_to_file(temp_file.path()).await.unwrap();

        let loaded = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(loaded.download.buffer_size, 16384);
        assert_eq!(loaded.persistence.history_retention_days, 30);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "[download]\nread_timeout_secs = 5\n\n[log]\nenabled = false\n",
        )
        .unwrap();

        let loaded = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(loaded.download.read_timeout_secs, 5);
        assert_eq!(loaded.download.buffer_size, 8192);
        assert!(!loaded.log.enabled);
        assert_eq!(loaded.persistence.resume_file, "resume.json");
    }

    #[tokio::test]
    async fn test_zero_buffer_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[download]\nbuffer_size = 0\n").unwrap();

        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_retention_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "[persistence]\nhistory_retention_days = 200000000\n",
        )
        .unwrap();

        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());

        std::fs::write(
            temp_file.path(),
            "[persistence]\nhistory_retention_days = 3650\n",
        )
        .unwrap();
        let loaded = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(loaded.persistence.history_retention_days, 3650);
    }

    #[tokio::test]
    async fn test_load_or_default_writes_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let config = AppConfig::load_or_default(&path).await;
        assert_eq!(config.download.buffer_size, 8192);
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.persistence.history_file, "history.jsonl");
    }

    #[tokio::test]
    async fn test_load_or_default_keeps_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let config = AppConfig::load_or_default(&path).await;
        assert_eq!(config.download.buffer_size, 8192);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not = [valid");
    }
}
