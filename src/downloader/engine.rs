//! HTTP 下载引擎
//!
//! 负责构建 HTTP 客户端、发起（可选的）Range 请求，并根据响应状态判断服务器是否支持断点续传：
//! - `206 Partial Content`：服务器接受了 Range 请求，沿用断点位置
//! - `200 OK`：服务器忽略了 Range 请求，断点位置作废，从 0 开始重写
//! - `416 Range Not Satisfiable`：断点位置无效，去掉 Range 头重新请求一次

use std::io;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, Response, StatusCode};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::error::DownloadError;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("resumable-dl/", env!("CARGO_PKG_VERSION"));

/// 已建立的下载响应
#[derive(Debug)]
pub struct OpenedResponse {
    /// HTTP 响应（尚未读取响应体）
    pub response: Response,
    /// 实际起始偏移（服务器拒绝 Range 时为 0）
    pub start_offset: u64,
    /// 文件总大小，服务器未提供长度时为 None
    pub total_size: Option<u64>,
    /// 服务器是否接受了 Range 请求
    pub range_honored: bool,
}

/// 下载引擎
///
/// 持有复用的 HTTP 客户端，可在多个任务间共享
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    client: Client,
    read_timeout: Duration,
}

impl DownloadEngine {
    /// 根据下载配置创建引擎
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self::with_client(
            client,
            Duration::from_secs(config.read_timeout_secs),
        ))
    }

    /// 使用已有的 HTTP 客户端创建引擎
    pub fn with_client(client: Client, read_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
        }
    }

    /// 单次读取的超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 发起下载请求
    ///
    /// `start_offset > 0` 时附带 `Range: bytes=<start_offset>-` 请求头
    pub async fn open(&self, url: &str, start_offset: u64) -> Result<OpenedResponse, DownloadError> {
        if start_offset == 0 {
            return self.open_full(url).await;
        }

        debug!("发起 Range 请求: {} (bytes={}-)", url, start_offset);
        let response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={}-", start_offset))
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::PARTIAL_CONTENT => {
                let total_size = response
                    .content_length()
                    .map(|len| len + start_offset)
                    .or_else(|| parse_content_range_total(&response));

                info!(
                    "服务器接受 Range 请求，从 {} 字节处继续: {} (总大小: {:?})",
                    start_offset, url, total_size
                );

                Ok(OpenedResponse {
                    response,
                    start_offset,
                    total_size,
                    range_honored: true,
                })
            }
            StatusCode::RANGE_NOT_SATISFIABLE => {
                warn!(
                    "服务器拒绝断点位置 {} (416)，重新下载完整文件: {}",
                    start_offset, url
                );
                self.open_full(url).await
            }
            s if s.is_success() => {
                warn!(
                    "服务器不支持 Range 请求 (状态码 {})，断点位置 {} 作废，从头下载: {}",
                    s, start_offset, url
                );
                Ok(OpenedResponse {
                    total_size: response.content_length(),
                    response,
                    start_offset: 0,
                    range_honored: false,
                })
            }
            s => Err(DownloadError::HttpStatus(s)),
        }
    }

    /// 发起不带 Range 的完整请求
    async fn open_full(&self, url: &str) -> Result<OpenedResponse, DownloadError> {
        debug!("发起完整下载请求: {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status));
        }

        let total_size = response.content_length();
        info!("开始下载: {} (总大小: {:?})", url, total_size);

        Ok(OpenedResponse {
            response,
            start_offset: 0,
            total_size,
            range_honored: false,
        })
    }
}

/// 将响应体转换为可按固定缓冲区读取的 `AsyncRead`
pub fn body_reader(response: Response) -> impl AsyncRead + Unpin + Send {
    let stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    StreamReader::new(Box::pin(stream))
}

/// 从 `Content-Range: bytes a-b/TOTAL` 中解析文件总大小
fn parse_content_range_total(response: &Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    parse_range_total(value)
}

fn parse_range_total(value: &str) -> Option<u64> {
    let total = value.rsplit('/').next()?.trim();
    if total == "*" {
        return None;
    }
    total.parse().ok()
}
