use std::io;
use thiserror::Error;

/// 下载相关的统一错误类型
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("服务器错误: {0}")]
    ServerError(String),

    #[error("服务器不支持断点续传: {0}")]
    ResumeUnsupported(String),

    #[error("配置无效: {0}")]
    ConfigError(String),

    #[error("未知错误: {0}")]
    Unknown(String),
}

impl DownloadError {
    pub fn network(msg: impl Into<String>) -> Self {
        DownloadError::NetworkError(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        DownloadError::ServerError(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        DownloadError::Unknown(msg.into())
    }
}

impl From<String> for DownloadError {
    fn from(error: String) -> Self {
        DownloadError::Unknown(error)
    }
}

impl From<&str> for DownloadError {
    fn from(error: &str) -> Self {
        DownloadError::Unknown(error.to_string())
    }
}
