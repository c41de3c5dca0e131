use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::report::{ControlButton, PublishError, Publisher};

pub fn print_success(message: &str) {
    println!("✓ {}", message);
}

pub fn print_error(message: &str) {
    println!("✗ {}", message);
}

/// 把状态消息打印到终端的发布器，从不限频
pub struct ConsolePublisher;

#[async_trait]
impl Publisher for ConsolePublisher {
    async fn publish(
        &self,
        _target: &str,
        message_id: &str,
        text: &str,
        controls: &[ControlButton],
    ) -> Result<(), PublishError> {
        println!("--------[{}]--------", message_id);
        println!("{}", text);
        if !controls.is_empty() {
            let labels: Vec<&str> = controls.iter().map(|c| c.label.as_str()).collect();
            println!("可用操作: {}", labels.join(" / "));
        }
        Ok(())
    }
}

pub struct DownloadSummary {
    pub total_tasks: usize,
    pub elapsed_time: Duration,
    pub finished_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n下载摘要:")?;
        writeln!(f, "总任务数: {}", self.total_tasks)?;
        writeln!(f, "耗时: {:.2}秒", self.elapsed_time.as_secs_f64())?;
        writeln!(f, "完成: {}", self.finished_count)?;
        writeln!(f, "失败: {}", self.failed_count)?;
        writeln!(f, "取消: {}", self.cancelled_count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = DownloadSummary {
            total_tasks: 3,
            elapsed_time: Duration::from_secs(5),
            finished_count: 2,
            failed_count: 1,
            cancelled_count: 0,
        };
        let text = summary.to_string();
        assert!(text.contains("总任务数: 3"));
        assert!(text.contains("完成: 2"));
        assert!(text.contains("失败: 1"));
    }

    #[actix_rt::test]
    async fn test_console_publisher_never_fails() {
        let publisher = ConsolePublisher;
        let controls = [ControlButton {
            label: "暂停".to_string(),
            data: "{}".to_string(),
        }];
        assert!(publisher.publish("console", "1", "下载中", &controls).await.is_ok());
    }
}
