//! 公共模块
//!
//! 提供跨模块使用的通用组件

pub mod checksum;
pub mod format;

pub use checksum::{digest_file, digest_matches, sha256_file};
pub use format::{format_eta, format_size, format_speed};
