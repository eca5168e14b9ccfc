use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// URL 中没有文件名时使用的默认名称
const FALLBACK_FILE_NAME: &str = "download";

/// 从 URL 提取文件名（路径最后一段，去掉查询参数和片段）
///
/// # Example
/// ```
/// # use resumable_dl::cli::utils::file_name_from_url;
/// assert_eq!(file_name_from_url("https://example.com/path/file.zip?x=1"), "file.zip");
/// assert_eq!(file_name_from_url("https://example.com/"), "download");
/// ```
pub fn file_name_from_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    // 去掉 scheme 和主机部分，只看路径
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => without_query,
    };

    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name.to_string(),
        _ => FALLBACK_FILE_NAME.to_string(),
    }
}

/// 计算输出文件路径：保存目录 + URL 文件名
pub fn output_path_for(url: &str, dir: &Path) -> PathBuf {
    dir.join(file_name_from_url(url))
}

/// 为一组 URL 计算互不相同的输出路径
///
/// 同名文件依次追加 ` (2)`、` (3)` 等后缀；磁盘上已有的文件不参与去重（可能是待续传的部分文件）
pub fn unique_output_paths(urls: &[String], dir: &Path) -> Vec<PathBuf> {
    let mut used = HashSet::new();
    urls.iter()
        .map(|url| {
            let path = output_path_for(url, dir);
            let mut candidate = path.clone();
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = with_suffix(&path, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

fn with_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("http://example.com/files/data.bin"),
            "data.bin"
        );
        assert_eq!(
            file_name_from_url("http://example.com/a/b.tar.gz?token=1#frag"),
            "b.tar.gz"
        );
        assert_eq!(file_name_from_url("http://example.com"), "download");
        assert_eq!(file_name_from_url("http://example.com/dir/"), "download");
        assert_eq!(file_name_from_url("http://example.com/.."), "download");
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for("http://h/x.iso", Path::new("downloads")),
            PathBuf::from("downloads/x.iso")
        );
    }

    #[test]
    fn test_unique_output_paths() {
        let urls = vec![
            "http://a/x/data.bin".to_string(),
            "http://b/y/data.bin".to_string(),
            "http://c/other.iso".to_string(),
            "http://d/data.bin?v=3".to_string(),
            "http://e/".to_string(),
            "http://f/".to_string(),
        ];
        let paths = unique_output_paths(&urls, Path::new("dl"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("dl/data.bin"),
                PathBuf::from("dl/data (2).bin"),
                PathBuf::from("dl/other.iso"),
                PathBuf::from("dl/data (3).bin"),
                PathBuf::from("dl/download"),
                PathBuf::from("dl/download (2)"),
            ]
        );
    }
}
