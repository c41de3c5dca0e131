use chrono::Local;
use log::LevelFilter;
use std::io::Write;

/// 初始化全局日志，带本地时间戳。重复调用会被忽略
pub fn init(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(LevelFilter::Info);
        // 第二次初始化不能 panic
        init(LevelFilter::Debug);
        log::info!("日志初始化测试");
    }
}
