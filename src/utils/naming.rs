use rand::Rng;
use std::path::{Path, PathBuf};

/// 清洗展示名：去掉换行，替换路径分隔符，主名超长时按字符截断（扩展名保留）
pub fn sanitize_display_name(name: &str, max_len: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    let (stem, ext) = split_extension(&cleaned);
    let stem: String = stem.chars().take(max_len).collect();
    format!("{}{}", stem, ext)
}

/// 生成落盘文件名，可选在前面加上 "{message_id} - " 前缀
pub fn resolve_display_name(
    message_id: &str,
    raw_name: &str,
    with_prefix: bool,
    max_len: usize,
) -> String {
    let sanitized = sanitize_display_name(raw_name, max_len);
    if with_prefix {
        format!("{} - {}", message_id, sanitized)
    } else {
        sanitized
    }
}

/// 目标路径已存在时生成带随机数字后缀的新路径，扩展名不变
pub fn with_random_suffix(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = split_extension(&file_name);
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    path.with_file_name(format!("{}_{}{}", stem, suffix, ext))
}

// 扩展名带点返回，没有扩展名时返回空串
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_newlines_and_separators() {
        assert_eq!(sanitize_display_name("a\nb\rc.mp4", 70), "abc.mp4");
        assert_eq!(sanitize_display_name("dir/file\\name.bin", 70), "dir_file_name.bin");
    }

    #[test]
    fn test_sanitize_truncates_stem_keeps_extension() {
        let name = format!("{}.mp4", "长".repeat(100));
        let out = sanitize_display_name(&name, 70);
        assert!(out.ends_with(".mp4"));
        assert_eq!(out.chars().count(), 74);
    }

    #[test]
    fn test_resolve_with_prefix() {
        assert_eq!(resolve_display_name("42", "video.mp4", true, 70), "42 - video.mp4");
        assert_eq!(resolve_display_name("42", "video.mp4", false, 70), "video.mp4");
    }

    #[test]
    fn test_random_suffix_keeps_extension() {
        let renamed = with_random_suffix(Path::new("/tmp/video.mp4"));
        let name = renamed.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("video_"));
        assert!(name.ends_with(".mp4"));
        let middle = &name["video_".len()..name.len() - ".mp4".len()];
        let n: u32 = middle.parse().unwrap();
        assert!(n < 1000);
    }

    #[test]
    fn test_no_extension() {
        assert_eq!(sanitize_display_name("README", 70), "README");
        let renamed = with_random_suffix(Path::new("/tmp/README"));
        assert!(renamed.file_name().unwrap().to_string_lossy().starts_with("README_"));
    }
}
