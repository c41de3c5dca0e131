//! 分块数据源抽象与 HTTP 实现
//!
//! 下载循环只依赖 [`ChunkSource`]：给定起始偏移量和请求大小，产出一个按序、
//! 可从任意偏移重新开始的字节块流。HTTP 之外的协议只要实现这个 trait
//! 就能接入队列和续传逻辑。

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use url::Url;

use crate::core::error::DownloadError;
use crate::utils::validator;

/// 有序字节块流。awc 的响应体不是 Send 的，因此不加 Send 约束，
/// 整个下载 future 通过 actix::spawn 跑在当前 Arbiter 上。
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, DownloadError>>>>;

#[async_trait(?Send)]
pub trait ChunkSource: Send + Sync {
    /// 文件总大小（字节），0 表示暂时未知
    fn total_size(&self) -> u64;

    /// 用于落盘命名的展示名（可能包含扩展名，未经清洗）
    fn display_name(&self) -> &str;

    /// 从 offset 开始打开块流；request_size 是单次请求大小的提示值
    async fn open(&self, offset: u64, request_size: usize) -> Result<ChunkStream, DownloadError>;
}

/// 基于 awc 的 HTTP 数据源，断点续传通过 Range 请求实现
pub struct HttpChunkSource {
    url: String,
    name: String,
    total: u64,
}

impl HttpChunkSource {
    /// 发送 HEAD 请求探测文件大小并从 URL 推断文件名
    pub async fn probe(url: &str) -> Result<Self, DownloadError> {
        if !validator::is_valid_url(url) {
            return Err(DownloadError::InvalidUrl(url.to_string()));
        }
        let client = awc::Client::default();
        let resp = client
            .head(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(format!("{:?}", e)))?;
        if !resp.status().is_success() {
            return Err(DownloadError::server(format!(
                "HEAD 请求失败: {}",
                resp.status()
            )));
        }

        let total = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Self {
            url: url.to_string(),
            name: file_name_from_url(url),
            total,
        })
    }
}

#[async_trait(?Send)]
impl ChunkSource for HttpChunkSource {
    fn total_size(&self) -> u64 {
        self.total
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn open(&self, offset: u64, _request_size: usize) -> Result<ChunkStream, DownloadError> {
        // HTTP 响应体的分块大小由服务端决定，request_size 在这里只是提示
        let client = awc::Client::default();
        let mut request = client.get(&self.url);
        if offset > 0 {
            request = request.insert_header(("Range", format!("bytes={}-", offset)));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| DownloadError::network(format!("{:?}", e)))?;

        if !resp.status().is_success() {
            return Err(DownloadError::server(format!("服务器错误: {}", resp.status())));
        }
        if offset > 0 && resp.status().as_u16() != 206 {
            // 服务端忽略了 Range，继续写会造成数据重复
            return Err(DownloadError::ResumeUnsupported(self.url.clone()));
        }

        let stream = resp.map(|chunk| chunk.map_err(|e| DownloadError::network(format!("{:?}", e))));
        Ok(Box::pin(stream))
    }
}

/// 从 URL 路径中提取文件名，提取不到就用时间戳兜底
fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("download_{}", chrono::Utc::now().timestamp()))
}
