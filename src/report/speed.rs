//! 任务级下载速度统计：根据相邻两次进度采样的字节差和时间差估算

use std::time::Instant;

#[derive(Default)]
pub struct SpeedMeter {
    last: Option<(Instant, u64)>,
    current: f64, // B/s
}

impl SpeedMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次进度采样，返回当前估算速度（字节/秒）。
    /// 两次采样间隔过短时沿用上一次的估算值，避免数值抖动。
    pub fn update(&mut self, downloaded: u64) -> f64 {
        let now = Instant::now();
        if let Some((then, bytes)) = self.last {
            let elapsed = now.duration_since(then).as_secs_f64();
            if elapsed >= 0.001 && downloaded >= bytes {
                self.current = (downloaded - bytes) as f64 / elapsed;
            }
        }
        self.last = Some((now, downloaded));
        self.current
    }

    pub fn speed(&self) -> f64 {
        self.current
    }

    /// 暂停后重新开始统计，防止把暂停时长算进速度
    pub fn reset(&mut self) {
        self.last = None;
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_first_sample_yields_zero() {
        let mut meter = SpeedMeter::new();
        assert_eq!(meter.update(1024), 0.0);
    }

    #[test]
    fn test_speed_from_two_samples() {
        let mut meter = SpeedMeter::new();
        meter.update(0);
        thread::sleep(Duration::from_millis(50));
        let speed = meter.update(50_000);
        // 约 1MB/s，给足误差空间
        assert!(speed > 100_000.0 && speed < 5_000_000.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut meter = SpeedMeter::new();
        meter.update(0);
        thread::sleep(Duration::from_millis(20));
        meter.update(10_000);
        assert!(meter.speed() > 0.0);
        meter.reset();
        assert_eq!(meter.speed(), 0.0);
    }
}
