//! 集成测试公共组件：进程内 HTTP 测试服务器
//!
//! 路由 `/:mode/:name`，`mode` 决定服务器行为：
//! - `file`：支持 Range，一次性返回
//! - `norange`：忽略 Range，总是返回 200 和完整内容
//! - `nolength`：不返回 Content-Length（分块传输）
//! - `flaky`：同一个文件名的第一次请求在 4000 字节处断开，之后的请求同 `file`
//!   （`flaky-<cut>` 指定断开位置）
//! - `paced`：支持 Range，每 10ms 发送 1000 字节
//! - `slow`：支持 Range，较大的文件，每 10ms 发送 2000 字节
//! - 其他：404

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path as UrlPath, State};
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use resumable_dl::{
    DownloadEngine, HistoryLog, MemoryHistoryLog, MemoryResumeStore, ResumeStore, TaskContext,
};

/// 默认文件大小
pub const PAYLOAD_LEN: usize = 10_000;

/// `slow` 模式的文件大小
pub const SLOW_LEN: usize = 200_000;

/// `flaky` 模式第一次请求断开的位置
pub const FLAKY_CUT: usize = 4000;

/// 生成确定性的测试数据
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// 一次请求的记录
#[derive(Debug, Clone)]
pub struct RequestLog {
    pub path: String,
    pub range: Option<String>,
}

#[derive(Default)]
pub struct ServerState {
    /// 正在发送响应体的请求数
    active: AtomicUsize,
    /// 同时发送响应体的最大请求数
    max_active: AtomicUsize,
    requests: Mutex<Vec<RequestLog>>,
    flaky_hits: Mutex<HashMap<String, usize>>,
}

impl ServerState {
    pub fn requests(&self) -> Vec<RequestLog> {
        self.requests.lock().clone()
    }

    pub fn request_paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// 响应体存活期间计入并发数
struct ActiveGuard {
    state: Arc<ServerState>,
}

impl ActiveGuard {
    fn new(state: Arc<ServerState>) -> Self {
        let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_active.fetch_max(now, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 响应体发送方式
struct BodyPlan {
    data: Bytes,
    chunk_size: usize,
    delay: Duration,
    /// 发送到该位置后注入错误，断开连接
    fail_at: Option<usize>,
}

fn streamed_body(plan: BodyPlan, guard: ActiveGuard) -> Body {
    let stream = futures::stream::unfold(Some((0usize, plan, guard)), |state| async move {
        let (pos, plan, guard) = state?;

        if let Some(fail_at) = plan.fail_at {
            if pos >= fail_at {
                // 让客户端先读走已发送的数据
                tokio::time::sleep(Duration::from_millis(100)).await;
                drop(guard);
                return Some((
                    Err(io::Error::new(io::ErrorKind::ConnectionAborted, "injected failure")),
                    None,
                ));
            }
        }

        if pos >= plan.data.len() {
            return None;
        }

        if !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }

        let mut end = (pos + plan.chunk_size).min(plan.data.len());
        if let Some(fail_at) = plan.fail_at {
            end = end.min(fail_at);
        }
        let chunk = plan.data.slice(pos..end);

        // 最后一块发出前就结束计数，客户端读完时并发数已经归零
        if end >= plan.data.len() {
            drop(guard);
            return Some((Ok(chunk), None));
        }
        Some((Ok::<Bytes, io::Error>(chunk), Some((end, plan, guard))))
    });

    Body::from_stream(stream)
}

fn parse_range_start(headers: &HeaderMap) -> Option<usize> {
    let value = headers.get(RANGE)?.to_str().ok()?;
    let start = value.strip_prefix("bytes=")?.strip_suffix('-')?;
    start.parse().ok()
}

/// 构造支持 Range 的响应
fn ranged_response(
    state: Arc<ServerState>,
    headers: &HeaderMap,
    data: Bytes,
    chunk_size: usize,
    delay: Duration,
) -> Response {
    let len = data.len();
    let start = parse_range_start(headers).unwrap_or(0);

    if start >= len && start > 0 {
        return Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(CONTENT_RANGE, format!("bytes */{}", len))
            .body(Body::empty())
            .unwrap();
    }

    let status = if start > 0 {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut builder = Response::builder()
        .status(status)
        .header(ACCEPT_RANGES, "bytes")
        .header(CONTENT_LENGTH, len - start);
    if start > 0 {
        builder = builder.header(CONTENT_RANGE, format!("bytes {}-{}/{}", start, len - 1, len));
    }

    let plan = BodyPlan {
        data: data.slice(start..),
        chunk_size,
        delay,
        fail_at: None,
    };
    builder
        .body(streamed_body(plan, ActiveGuard::new(state)))
        .unwrap()
}

async fn serve(
    State(state): State<Arc<ServerState>>,
    UrlPath((mode, name)): UrlPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.requests.lock().push(RequestLog {
        path: format!("/{}/{}", mode, name),
        range: headers
            .get(RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let data = Bytes::from(payload(PAYLOAD_LEN));

    match mode.as_str() {
        "file" => ranged_response(state, &headers, data, PAYLOAD_LEN, Duration::ZERO),
        "paced" => ranged_response(state, &headers, data, 1000, Duration::from_millis(10)),
        "slow" => ranged_response(
            state,
            &headers,
            Bytes::from(payload(SLOW_LEN)),
            2000,
            Duration::from_millis(10),
        ),
        "norange" => {
            let plan = BodyPlan {
                data,
                chunk_size: PAYLOAD_LEN,
                delay: Duration::ZERO,
                fail_at: None,
            };
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_LENGTH, PAYLOAD_LEN)
                .body(streamed_body(plan, ActiveGuard::new(state)))
                .unwrap()
        }
        "nolength" => {
            let plan = BodyPlan {
                data,
                chunk_size: 1000,
                delay: Duration::ZERO,
                fail_at: None,
            };
            Response::builder()
                .status(StatusCode::OK)
                .body(streamed_body(plan, ActiveGuard::new(state)))
                .unwrap()
        }
        "flaky" => flaky_response(state, &headers, format!("/flaky/{}", name), FLAKY_CUT),
        m if m.starts_with("flaky-") => match m["flaky-".len()..].parse::<usize>() {
            Ok(cut) => flaky_response(state, &headers, format!("/{}/{}", m, name), cut),
            Err(_) => Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::from("bad cut"))
                .unwrap(),
        },
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("not found"))
            .unwrap(),
    }
}

/// 同一路径第一次请求在 `cut` 字节处断开，之后正常支持 Range
fn flaky_response(state: Arc<ServerState>, headers: &HeaderMap, key: String, cut: usize) -> Response {
    let data = Bytes::from(payload(PAYLOAD_LEN));
    let hit = {
        let mut hits = state.flaky_hits.lock();
        let count = hits.entry(key).or_insert(0);
        *count += 1;
        *count
    };
    if hit > 1 {
        return ranged_response(state, headers, data, PAYLOAD_LEN, Duration::ZERO);
    }

    let plan = BodyPlan {
        data,
        chunk_size: PAYLOAD_LEN,
        delay: Duration::ZERO,
        fail_at: Some(cut),
    };
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_LENGTH, PAYLOAD_LEN)
        .body(streamed_body(plan, ActiveGuard::new(state)))
        .unwrap()
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
}

impl TestServer {
    /// 在 127.0.0.1 的随机端口上启动测试服务器
    pub async fn spawn() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/:mode/:name", get(serve))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self, mode: &str, name: &str) -> String {
        format!("http://{}/{}/{}", self.addr, mode, name)
    }

    /// 第一次请求在 `cut` 字节处断开的地址
    pub fn flaky_url(&self, cut: usize, name: &str) -> String {
        format!("http://{}/flaky-{}/{}", self.addr, cut, name)
    }
}

/// 测试用的任务上下文（不走系统代理）
pub fn context(resume: Arc<dyn ResumeStore>, history: Arc<dyn HistoryLog>) -> TaskContext {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let engine = DownloadEngine::with_client(client, Duration::from_secs(10));
    TaskContext::new(Arc::new(engine), resume, history)
}

/// 内存存储的任务上下文
pub fn memory_context() -> (TaskContext, Arc<MemoryResumeStore>, Arc<MemoryHistoryLog>) {
    let resume = Arc::new(MemoryResumeStore::new());
    let history = Arc::new(MemoryHistoryLog::new());
    let ctx = context(resume.clone(), history.clone());
    (ctx, resume, history)
}

/// 轮询直到条件成立，超时则 panic
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn read_file(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}
