//! 下载状态文本的组装：进度条、速度格式化、暂停/完成标记

use crate::utils::format_size;

/// 进度条宽度（格数）
pub const PROGRESS_WIDTH: usize = 15;

const BAR_FILLED: &str = "█";
const BAR_EMPTY: &str = "░";

/// 一个任务的可见下载状态，只由所属任务的进度回调修改
#[derive(Debug, Clone)]
pub struct DownloadStatus {
    pub message_id: String,
    /// 已下载字节数
    pub downloaded: u64,
    /// 总字节数，0 表示未知
    pub total: u64,
    /// 速度，字节/秒
    pub speed: f64,
    pub paused: bool,
    pub finished: bool,
}

impl DownloadStatus {
    pub fn new(message_id: impl Into<String>, total: u64) -> Self {
        Self {
            message_id: message_id.into(),
            downloaded: 0,
            total,
            speed: 0.0,
            paused: false,
            finished: false,
        }
    }

    pub fn update(&mut self, downloaded: u64, total: u64, speed: f64) {
        self.downloaded = downloaded;
        if total > 0 {
            self.total = total;
        }
        self.speed = speed;
    }

    pub fn set_pause(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.speed = 0.0;
        }
    }

    /// 三档速度格式化，固定两位小数
    pub fn format_speed(bytes_per_sec: f64) -> String {
        const KB: f64 = 1024.0;
        const MB: f64 = 1024.0 * 1024.0;
        if bytes_per_sec < KB {
            format!("{:.2} B/s", bytes_per_sec)
        } else if bytes_per_sec < MB {
            format!("{:.2} KB/s", bytes_per_sec / KB)
        } else {
            format!("{:.2} MB/s", bytes_per_sec / MB)
        }
    }

    /// 进度条加整数百分比，总大小未知时显示为空条
    pub fn progress_line(&self) -> String {
        let ratio = if self.total > 0 {
            (self.downloaded as f64 / self.total as f64).min(1.0)
        } else {
            0.0
        };
        let filled = ((PROGRESS_WIDTH as f64) * ratio).round() as usize;
        let filled = filled.min(PROGRESS_WIDTH);
        let percent = (ratio * 100.0).round() as u32;
        format!(
            "[{}{}] {}%",
            BAR_FILLED.repeat(filled),
            BAR_EMPTY.repeat(PROGRESS_WIDTH - filled),
            percent
        )
    }

    fn total_text(&self) -> String {
        if self.total == 0 {
            "未知大小".to_string()
        } else {
            format_size(self.total)
        }
    }

    /// 完整状态文本：标识、已下载/总量、进度条、速度、暂停标记
    pub fn compose(&self) -> String {
        if self.finished {
            return self.finished_text();
        }
        let mut lines = vec![
            format!("message id: {}", self.message_id),
            format!("{} / {}", format_size(self.downloaded), self.total_text()),
            self.progress_line(),
            Self::format_speed(self.speed),
        ];
        if self.paused {
            lines.push("已暂停".to_string());
        }
        lines.join("\n")
    }

    /// 刚入队还没有进度时的文本，没有进度条和速度
    pub fn compose_without_progress(&self) -> String {
        format!(
            "message id: {}\n{}\n下载中",
            self.message_id,
            self.total_text()
        )
    }

    /// 标记完成并返回完成文本
    pub fn finish(&mut self) -> String {
        self.finished = true;
        self.paused = false;
        self.finished_text()
    }

    fn finished_text(&self) -> String {
        format!(
            "message id: {}\n{}\n下载完成",
            self.message_id,
            self.total_text()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::text_to_hash;

    const MB: u64 = 1024 * 1024;

    fn status(downloaded: u64, speed: f64) -> DownloadStatus {
        let mut st = DownloadStatus::new("123", 100 * MB);
        st.update(downloaded, 100 * MB, speed);
        st
    }

    #[test]
    fn test_format_speed_tiers() {
        assert_eq!(
            DownloadStatus::format_speed(1.5 * 1024.0 * 1024.0),
            "1.50 MB/s"
        );
        assert_eq!(DownloadStatus::format_speed(500.0 * 1024.0), "500.00 KB/s");
        assert_eq!(DownloadStatus::format_speed(500.0), "500.00 B/s");
        assert_eq!(DownloadStatus::format_speed(0.5), "0.50 B/s");
    }

    #[test]
    fn test_progress_line_half() {
        let st = status(50 * MB, 0.0);
        let line = st.progress_line();
        assert!(line.contains("50%"));
        // round(15 * 0.5) = 8 格实心，7 格空心
        assert!(line.contains(&BAR_FILLED.repeat(8)));
        assert!(line.contains(&BAR_EMPTY.repeat(7)));
    }

    #[test]
    fn test_progress_line_unknown_total() {
        let mut st = DownloadStatus::new("123", 0);
        st.downloaded = 10 * MB;
        let line = st.progress_line();
        // 未知大小不等于已完成
        assert!(line.contains("0%"));
        assert!(line.contains(&BAR_EMPTY.repeat(PROGRESS_WIDTH)));
    }

    #[test]
    fn test_pause_marker() {
        let mut st = status(50 * MB, 1.5 * 1024.0 * 1024.0);
        assert!(st.compose().contains("1.50 MB/s"));

        st.set_pause(true);
        let paused = st.compose();
        assert!(paused.contains("已暂停"));

        st.set_pause(false);
        // 暂停清零了速度
        assert!(st.compose().contains("0.00 B/s"));
    }

    #[test]
    fn test_finish_text_has_no_bar_or_speed() {
        let mut st = status(100 * MB, 1.5 * 1024.0 * 1024.0);
        let normal = st.compose();
        assert!(normal.contains("message id: 123"));
        assert!(!normal.contains("下载完成"));

        let finished = st.finish();
        assert!(finished.contains("下载完成"));
        assert!(!finished.contains("/s"));
        assert!(!finished.contains('['));
    }

    #[test]
    fn test_compose_without_progress() {
        let st = DownloadStatus::new("123", 100 * MB);
        let text = st.compose_without_progress();
        assert!(text.contains("message id: 123"));
        assert!(text.contains("下载中"));
        assert!(!text.contains("/s"));
        assert!(!text.contains('['));
    }

    #[test]
    fn test_identical_status_same_hash() {
        let a = status(50 * MB, 1.5);
        let b = status(50 * MB, 1.5);
        assert_eq!(text_to_hash(&a.compose()), text_to_hash(&b.compose()));
    }

    #[test]
    fn test_hash_changes_with_each_field() {
        let base = status(50 * MB, 1.5 * 1024.0 * 1024.0);
        let base_hash = text_to_hash(&base.compose());

        let progressed = status(60 * MB, 1.5 * 1024.0 * 1024.0);
        assert_ne!(text_to_hash(&progressed.compose()), base_hash);

        let faster = status(50 * MB, 2.0 * 1024.0 * 1024.0);
        assert_ne!(text_to_hash(&faster.compose()), base_hash);

        let mut paused = status(50 * MB, 1.5 * 1024.0 * 1024.0);
        paused.set_pause(true);
        assert_ne!(text_to_hash(&paused.compose()), base_hash);

        let mut finished = status(50 * MB, 1.5 * 1024.0 * 1024.0);
        finished.finish();
        assert_ne!(text_to_hash(&finished.compose()), base_hash);
    }
}
