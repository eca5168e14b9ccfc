//! 下载错误类型
//!
//! 所有错误对任务而言都是终态：任务捕获错误后记录错误信息并进入 `Error` 状态，
//! 不会把错误抛出到公共接口之外。校验失败和用户取消不是错误，而是独立的终态。

use std::io;

use reqwest::StatusCode;

/// 下载错误
#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    /// 网络错误（连接失败、传输中断等）
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    /// 读取响应数据流失败（连接中断、读超时）
    #[error("读取数据流失败: {0}")]
    StreamRead(#[source] io::Error),

    /// 服务器返回了非预期的状态码
    #[error("HTTP错误: {0}")]
    HttpStatus(StatusCode),

    /// 输出文件读写失败
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// 计算文件摘要失败
    #[error("计算校验和失败: {0}")]
    Checksum(#[source] io::Error),
}

impl DownloadError {
    /// 构造带上下文的存储错误
    pub fn storage(context: &'static str, source: io::Error) -> Self {
        Self::Storage { context, source }
    }
}

/// 为 `io::Result` 附加存储错误上下文
pub trait StorageContext<T> {
    fn storage_context(self, context: &'static str) -> Result<T, DownloadError>;
}

impl<T> StorageContext<T> for io::Result<T> {
    fn storage_context(self, context: &'static str) -> Result<T, DownloadError> {
        self.map_err(|e| DownloadError::storage(context, e))
    }
}
