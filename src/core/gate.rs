//! 恢复门闸：每个下载任务持有一个，用于在分块边界协作式地暂停/继续/取消
//!
//! 暂停时会创建一个一次性信号，下载循环阻塞在信号上；继续（或取消）时触发
//! 信号唤醒循环。信号存在当且仅当处于暂停状态，每个任务同一时刻至多有一个
//! 等待者，所以一次性通道足够。

use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Default)]
struct GateInner {
    paused: bool,
    cancelled: bool,
    // 暂停时成对创建；resume/cancel 触发 sender，等待者取走 receiver
    notify: Option<oneshot::Sender<()>>,
    pending: Option<oneshot::Receiver<()>>,
}

/// 可克隆的门闸句柄，克隆之间共享状态
#[derive(Clone, Default)]
pub struct ResumeGate {
    inner: Arc<Mutex<GateInner>>,
}

impl ResumeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入暂停状态，并准备好供下载循环阻塞的一次性信号
    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.paused {
            return;
        }
        inner.paused = true;
        let (tx, rx) = oneshot::channel();
        inner.notify = Some(tx);
        inner.pending = Some(rx);
    }

    /// 解除暂停并唤醒等待者；未暂停时调用是安全的空操作
    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.paused = false;
        inner.pending = None;
        if let Some(tx) = inner.notify.take() {
            let _ = tx.send(());
        }
    }

    /// 标记取消。取消同时会触发暂停信号，避免一个已暂停的循环永远阻塞
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.cancelled = true;
        inner.pending = None;
        if let Some(tx) = inner.notify.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().unwrap().cancelled
    }

    /// 阻塞直到被 resume 或 cancel 唤醒。未处于暂停状态时立即返回。
    /// 醒来之后调用方必须重新检查 `is_cancelled`。
    pub async fn wait_for_resume(&self) {
        let rx = { self.inner.lock().unwrap().pending.take() };
        if let Some(rx) = rx {
            // sender 被丢弃也视为唤醒
            let _ = rx.await;
        }
    }
}
