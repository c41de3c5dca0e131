//! 通用工具：日志初始化、文件命名、URL校验和散列/格式化辅助

pub mod logger;
pub mod naming;
pub mod validator;

use sha2::{Digest, Sha256};

/// 计算文本的 SHA-256 十六进制摘要，用于进度消息去重
pub fn text_to_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// 把字节数格式化为带单位的可读文本
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes < KB {
        format!("{:.2} B", bytes)
    } else if bytes < MB {
        format!("{:.2} KB", bytes / KB)
    } else if bytes < GB {
        format!("{:.2} MB", bytes / MB)
    } else {
        format!("{:.2} GB", bytes / GB)
    }
}
