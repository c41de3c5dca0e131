//! 异步节流：冷却期内到达的调用直接丢弃（返回 None），不排队

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 限制一个副作用操作在每个时间窗口内至多执行一次
pub struct Throttle {
    interval: Duration,
    pending: Arc<AtomicBool>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 执行 f 并在完成后 interval 时间内拒绝后续调用。
    /// 被节流丢弃时返回 None，调用方据此判断本次没有真正执行。
    pub async fn run<T, F, Fut>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.pending.swap(true, Ordering::SeqCst) {
            return None;
        }

        let out = f().await;

        // 冷却计时从执行完成算起
        let pending = self.pending.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            pending.store(false, Ordering::SeqCst);
        });

        Some(out)
    }
}
