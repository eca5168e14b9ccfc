//! 展示层使用的格式化工具

/// 格式化文件大小为人类可读格式
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 格式化下载速度（MB/s）
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{:.2} MB/s", bytes_per_sec as f64 / 1024.0 / 1024.0)
}

/// 格式化剩余时间，未知时返回 "unknown"
pub fn format_eta(eta_secs: Option<u64>) -> String {
    match eta_secs {
        Some(secs) => {
            let hours = secs / 3600;
            let minutes = (secs % 3600) / 60;
            let seconds = secs % 60;
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
        None => "unknown".to_string(),
    }
}
