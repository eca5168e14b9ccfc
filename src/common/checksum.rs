//! 文件完整性校验
//!
//! 以固定大小的块流式读取文件并计算 SHA-256，输出小写十六进制字符串。
//! 与期望值比较时忽略大小写和首尾空白。

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

/// 读取块大小
const BLOCK_SIZE: usize = 8192;

/// 同步计算文件的 SHA-256
///
/// 文件无法打开或读取时返回 `io::Error`
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BLOCK_SIZE * 8, file);

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BLOCK_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    let digest = hex::encode(hasher.finalize());
    debug!("文件摘要计算完成: path={:?}, size={}, sha256={}", path, total, digest);

    Ok(digest)
}

/// 异步计算文件的 SHA-256（在阻塞线程池中执行文件 I/O）
pub async fn digest_file(path: &Path) -> io::Result<String> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha256_file(&path))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("摘要任务执行失败: {}", e)))?
}

/// 比较实际摘要与期望摘要（忽略大小写）
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}
