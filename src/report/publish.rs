//! 发布通道抽象：进度报告器只认这个接口，不关心消息最终发到哪里

use async_trait::async_trait;
use thiserror::Error;

/// 发布失败的两种情况：限频需要等待指定秒数，其余一律归为普通失败
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("发送过于频繁，需要等待 {0} 秒")]
    FloodWait(u64),

    #[error("发送失败: {0}")]
    Failed(String),
}

/// 附在状态消息上的交互按钮，data 是回传给管理器的控制负载（JSON）
#[derive(Debug, Clone)]
pub struct ControlButton {
    pub label: String,
    pub data: String,
}

/// 状态消息的发布通道。
/// target 是目的地标识，message_id 标记要更新的那条消息。
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        target: &str,
        message_id: &str,
        text: &str,
        controls: &[ControlButton],
    ) -> Result<(), PublishError>;
}
