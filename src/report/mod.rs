//! 进度播报管线：组装状态文本，经过节流、哈希去重和限频熔断后发布
//!
//! 去重窗口只保留最近 3 条真正发出去的文本哈希，窗口是任务本地的，任务之间
//! 互不影响。收到限频信号后全局停发指定时长，到期自动恢复；其它发布失败只
//! 记录日志（带上一条和当前这条消息正文，方便排查），绝不影响下载本身。

pub mod message;
pub mod publish;
pub mod speed;
pub mod throttle;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use message::DownloadStatus;
pub use publish::{ControlButton, PublishError, Publisher};
pub use speed::SpeedMeter;
pub use throttle::Throttle;

use crate::utils::text_to_hash;

/// 去重窗口大小：最近发布的 3 条文本哈希
const DEDUP_WINDOW: usize = 3;

/// 单个任务的进度报告器
pub struct StatusReporter {
    target: String,
    message_id: String,
    publisher: Arc<dyn Publisher>,
    status: Mutex<DownloadStatus>,
    speed: Mutex<SpeedMeter>,
    throttle: Throttle,
    // 最近发布的文本哈希，最新的在最前面
    hashes: Mutex<Vec<String>>,
    last_text: Mutex<String>,
    // 限频熔断：true 期间所有发布直接跳过
    suspended: Arc<AtomicBool>,
    pause_button: ControlButton,
    continue_button: ControlButton,
}

impl StatusReporter {
    pub fn new(
        target: impl Into<String>,
        message_id: impl Into<String>,
        total: u64,
        publisher: Arc<dyn Publisher>,
        interval: Duration,
    ) -> Self {
        let message_id = message_id.into();
        let pause_button = ControlButton {
            label: "暂停".to_string(),
            data: crate::core::manager::ControlPayload::pause(&message_id).to_json(),
        };
        let continue_button = ControlButton {
            label: "继续".to_string(),
            data: crate::core::manager::ControlPayload::resume(&message_id).to_json(),
        };
        Self {
            target: target.into(),
            status: Mutex::new(DownloadStatus::new(message_id.clone(), total)),
            message_id,
            publisher,
            speed: Mutex::new(SpeedMeter::new()),
            throttle: Throttle::new(interval),
            hashes: Mutex::new(Vec::new()),
            last_text: Mutex::new(String::new()),
            suspended: Arc::new(AtomicBool::new(false)),
            pause_button,
            continue_button,
        }
    }

    /// 任务刚入队时的首条消息，不走节流
    pub async fn announce_queued(&self) {
        let text = self.status.lock().unwrap().compose_without_progress();
        let controls = [self.pause_button.clone()];
        self.publish_raw(&text, &controls).await;
    }

    /// 重复入队时的提示
    pub async fn announce_duplicate(&self) {
        self.publish_raw("已有该任务在队列中，无需重复下载", &[]).await;
    }

    /// 进度回调入口：更新状态，按 节流 -> 去重 -> 发布 的顺序走管线
    pub async fn report_progress(&self, downloaded: u64, total: u64) {
        if self.suspended.load(Ordering::SeqCst) {
            return;
        }

        let text = {
            let speed = self.speed.lock().unwrap().update(downloaded);
            let mut status = self.status.lock().unwrap();
            status.set_pause(false);
            status.update(downloaded, total, speed);
            status.compose()
        };

        let hash = text_to_hash(&text);
        if self.hashes.lock().unwrap().contains(&hash) {
            return;
        }

        let controls = [self.pause_button.clone()];
        let published = self
            .throttle
            .run(|| {
                self.publisher
                    .publish(&self.target, &self.message_id, &text, &controls)
            })
            .await;

        // 返回 None 说明被节流丢弃了，不记录哈希
        let Some(result) = published else { return };

        match result {
            Ok(()) => {
                let mut hashes = self.hashes.lock().unwrap();
                hashes.insert(0, hash);
                hashes.truncate(DEDUP_WINDOW);
                drop(hashes);
                *self.last_text.lock().unwrap() = text;
            }
            Err(PublishError::FloodWait(secs)) => self.suspend(secs),
            Err(e) => self.log_failure(&e, &text),
        }
    }

    /// 进入暂停时立即播报一次（不节流），把按钮换成"继续"
    pub async fn report_paused(&self) {
        let text = {
            let mut status = self.status.lock().unwrap();
            status.set_pause(true);
            status.compose()
        };
        self.speed.lock().unwrap().reset();
        let controls = [self.continue_button.clone()];
        self.publish_raw(&text, &controls).await;
    }

    /// 终态播报：完成
    pub async fn report_finished(&self) {
        let text = self.status.lock().unwrap().finish();
        self.publish_raw(&text, &[]).await;
    }

    /// 终态播报：失败（与"完成"可区分）
    pub async fn report_failed(&self, reason: &str) {
        let text = format!("message id: {}\n下载失败: {}", self.message_id, reason);
        self.publish_raw(&text, &[]).await;
    }

    /// 终态播报：已取消
    pub async fn report_cancelled(&self) {
        let text = format!("message id: {}\n已取消下载", self.message_id);
        self.publish_raw(&text, &[]).await;
    }

    /// 绕过节流和去重的发布路径，仍然尊重限频熔断
    async fn publish_raw(&self, text: &str, controls: &[ControlButton]) {
        if self.suspended.load(Ordering::SeqCst) {
            return;
        }
        match self
            .publisher
            .publish(&self.target, &self.message_id, text, controls)
            .await
        {
            Ok(()) => {
                *self.last_text.lock().unwrap() = text.to_string();
            }
            Err(PublishError::FloodWait(secs)) => self.suspend(secs),
            Err(e) => self.log_failure(&e, text),
        }
    }

    /// 收到限频信号：全局停发 secs 秒后自动恢复
    fn suspend(&self, secs: u64) {
        log::warn!("消息发送被限频，暂停发送 {} 秒: {}", secs, self.message_id);
        self.suspended.store(true, Ordering::SeqCst);
        let suspended = self.suspended.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            suspended.store(false, Ordering::SeqCst);
        });
    }

    fn log_failure(&self, error: &PublishError, current: &str) {
        log::error!("发布状态消息失败: {}", error);
        log::error!("上一条消息:\n{}", self.last_text.lock().unwrap());
        log::error!("当前消息:\n{}", current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// 记录发布的文本，可按需返回错误
    struct MockPublisher {
        sent: Mutex<Vec<String>>,
        fail_flood: AtomicBool,
    }

    impl MockPublisher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail_flood: AtomicBool::new(false),
            })
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Publisher for MockPublisher {
        async fn publish(
            &self,
            _target: &str,
            _message_id: &str,
            text: &str,
            _controls: &[ControlButton],
        ) -> Result<(), PublishError> {
            if self.fail_flood.load(Ordering::SeqCst) {
                return Err(PublishError::FloodWait(30));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn reporter(publisher: Arc<MockPublisher>, interval_ms: u64) -> StatusReporter {
        StatusReporter::new(
            "console",
            "42",
            100 * 1024 * 1024,
            publisher,
            Duration::from_millis(interval_ms),
        )
    }

    #[actix_rt::test]
    async fn test_burst_in_window_publishes_once() {
        let publisher = MockPublisher::new();
        let rep = reporter(publisher.clone(), 200);

        for i in 1..=5u64 {
            rep.report_progress(i * 1024 * 1024, 0).await;
        }
        assert_eq!(publisher.sent_count(), 1);
    }

    #[actix_rt::test]
    async fn test_publishes_again_after_window() {
        let publisher = MockPublisher::new();
        let rep = reporter(publisher.clone(), 20);

        rep.report_progress(1024 * 1024, 0).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        rep.report_progress(2 * 1024 * 1024, 0).await;
        assert_eq!(publisher.sent_count(), 2);
    }

    #[actix_rt::test]
    async fn test_dedup_skips_identical_text() {
        let publisher = MockPublisher::new();
        // 节流窗口设为 0，隔离出去重行为
        let rep = reporter(publisher.clone(), 0);

        rep.report_progress(10 * 1024 * 1024, 0).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        // 状态文本相同（速度在报告器里会重新计算，用暂停清零保证一致）
        {
            rep.speed.lock().unwrap().reset();
            rep.status.lock().unwrap().speed = 0.0;
        }
        rep.report_progress(10 * 1024 * 1024, 0).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(publisher.sent_count(), 1);
    }

    #[actix_rt::test]
    async fn test_dedup_window_evicts_oldest() {
        let publisher = MockPublisher::new();
        let rep = reporter(publisher.clone(), 0);

        // 4 条互不相同的文本把第一条挤出窗口
        for mb in [10u64, 20, 30, 40] {
            {
                rep.speed.lock().unwrap().reset();
            }
            rep.report_progress(mb * 1024 * 1024, 0).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(publisher.sent_count(), 4);
        assert_eq!(rep.hashes.lock().unwrap().len(), DEDUP_WINDOW);

        // 第一条的哈希已被挤出，重发不会被去重拦截
        {
            rep.speed.lock().unwrap().reset();
        }
        rep.report_progress(10 * 1024 * 1024, 0).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(publisher.sent_count(), 5);
    }

    #[actix_rt::test]
    async fn test_flood_wait_suspends_publishing() {
        let publisher = MockPublisher::new();
        let rep = reporter(publisher.clone(), 0);

        publisher.fail_flood.store(true, Ordering::SeqCst);
        rep.report_progress(1024 * 1024, 0).await;
        assert_eq!(publisher.sent_count(), 0);

        // 熔断期间即使通道恢复也不发
        publisher.fail_flood.store(false, Ordering::SeqCst);
        rep.report_progress(2 * 1024 * 1024, 0).await;
        assert_eq!(publisher.sent_count(), 0);
    }

    #[actix_rt::test]
    async fn test_paused_report_bypasses_throttle() {
        let publisher = MockPublisher::new();
        let rep = reporter(publisher.clone(), 500);

        rep.report_progress(1024 * 1024, 0).await;
        // 节流窗口还没过，暂停播报仍然要立刻出去
        rep.report_paused().await;

        assert_eq!(publisher.sent_count(), 2);
        let sent = publisher.sent.lock().unwrap();
        assert!(sent[1].contains("已暂停"));
    }

    #[actix_rt::test]
    async fn test_finish_report_is_distinct_from_failure() {
        let publisher = MockPublisher::new();
        let rep = reporter(publisher.clone(), 0);

        rep.report_finished().await;
        rep.report_failed("网络错误").await;

        let sent = publisher.sent.lock().unwrap();
        assert!(sent[0].contains("下载完成"));
        assert!(sent[1].contains("下载失败"));
        assert!(!sent[1].contains("下载完成"));
    }
}
