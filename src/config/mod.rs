use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::DownloadError;

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// 最大并发下载数
    pub max_parallel_download: usize,
    /// 单次请求的数据块大小（字节）
    pub request_size: usize,
    /// 下载中的临时文件目录
    pub staging_dir: String,
    /// 下载完成后的保存目录
    pub save_path: String,
    /// 进度消息的最小发送间隔（毫秒）
    pub send_duration_ms: u64,
    /// 进度消息的发布目标
    pub publish_target: String,
    /// 文件名是否加上任务编号前缀
    pub prefix_message_id: bool,
    /// 文件名（不含扩展名）的最大字符数
    pub name_max_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_parallel_download: 5,
            request_size: 64 * 1024,
            staging_dir: "./temp".to_string(),
            save_path: "./downloads".to_string(),
            send_duration_ms: 2500,
            publish_target: "console".to_string(),
            prefix_message_id: true,
            name_max_len: 70,
        }
    }
}

impl Config {
    /// 加载配置文件，不存在或格式错误时落回默认配置并写回
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    eprintln!("配置文件格式错误: {}，将使用默认配置", e);
                    let config = Config::default();
                    config.save_with_tutorial(path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件（唯一写入方法）
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let tutorial_content = Config::generate_tutorial_content();
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Unknown(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n\n{}", tutorial_content, config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    /// 生成配置文件教程内容（静态方法）
    fn generate_tutorial_content() -> String {
        r#"# MediaDown 配置文件
# ====================
#
# 这是一个 TOML 格式的配置文件，用于配置 MediaDown 下载管理器的行为。
# 你可以根据需要修改这些设置，然后保存文件。
#
# 配置文件位置：
# - Windows: %APPDATA%/mediadown/mediadown.conf
# - macOS: ~/Library/Application Support/mediadown/mediadown.conf
# - Linux: ~/.config/mediadown/mediadown.conf
#
# 命令行参数会覆盖配置文件中的设置，优先级：命令行 > 配置文件 > 默认值
#
# ==================== 下载设置 ====================
#
# 最大并发下载数（同时进行的下载任务数）
# 超出的任务会排队等待，建议值：1-10
# max_parallel_download = 5
#
# 单次请求的数据块大小（字节）
# 建议值：65536-1048576，太小请求次数多，太大占用更多内存
# request_size = 65536
#
# 下载中的临时文件目录
# 断点续传依赖这里的临时文件，不要手动清空
# staging_dir = "./temp"
#
# 下载完成后的保存目录
# save_path = "./downloads"
#
# ==================== 进度播报设置 ====================
#
# 进度消息的最小发送间隔（毫秒）
# 间隔内的进度更新会被丢弃，避免刷屏和触发限频
# send_duration_ms = 2500
#
# ==================== 文件命名设置 ====================
#
# 文件名是否加上任务编号前缀，便于区分同名文件
# prefix_message_id = true
#
# 文件名（不含扩展名）的最大字符数，超出部分截断
# name_max_len = 70
#
# ==================== 使用说明 ====================
#
# 1. 基本使用：
#    mediadown https://example.com/file.zip
#
# 2. 批量下载：
#    mediadown -f urls.txt
#    # urls.txt 文件内容（每行一个URL，# 开头的行是注释）
#
# 3. 指定并发数：
#    mediadown -p 3 https://example.com/file.zip
#
# 4. 指定保存目录：
#    mediadown -d /path/to/downloads https://example.com/file.zip
#
# 5. 编辑配置文件：
#    mediadown -e
#
# ==================== 配置项说明 ====================
"#
        .to_string()
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_parallel_download == 0 {
            return Err(DownloadError::ConfigError("并发下载数必须大于0".to_string()));
        }

        if self.request_size == 0 {
            return Err(DownloadError::ConfigError("请求块大小必须大于0".to_string()));
        }

        if self.staging_dir.is_empty() {
            return Err(DownloadError::ConfigError("临时目录不能为空".to_string()));
        }

        if self.save_path.is_empty() {
            return Err(DownloadError::ConfigError("保存目录不能为空".to_string()));
        }

        if self.name_max_len == 0 {
            return Err(DownloadError::ConfigError("文件名长度上限必须大于0".to_string()));
        }

        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        // 命令行参数覆盖配置文件
        if let Some(parallel) = args.parallel {
            self.max_parallel_download = parallel;
        }

        if !args.save_dir.is_empty() {
            self.save_path = args.save_dir.clone();
        }
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 保存目录: {}\n\
            - 临时目录: {}\n\
            - 并发数: {}\n\
            - 请求块大小: {} 字节\n\
            - 播报间隔: {} 毫秒\n\
            - 编号前缀: {}",
            self.save_path,
            self.staging_dir,
            self.max_parallel_download,
            self.request_size,
            self.send_duration_ms,
            if self.prefix_message_id { "启用" } else { "禁用" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_parallel_download, 5);
        assert_eq!(config.request_size, 64 * 1024);
        assert_eq!(config.send_duration_ms, 2500);
        assert_eq!(config.name_max_len, 70);
        assert!(config.prefix_message_id);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.max_parallel_download = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.save_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let config = Config::default();
        let path = "./test_mediadown_config.toml";

        config.save_with_tutorial(path).expect("保存带教程的配置失败");
        let loaded_config = Config::load(path).expect("加载配置失败");

        assert_eq!(loaded_config.max_parallel_download, config.max_parallel_download);
        assert_eq!(loaded_config.send_duration_ms, config.send_duration_ms);

        // 清理测试文件
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_config_save_with_tutorial() {
        let config = Config::default();
        let path = "./test_mediadown_config_tutorial.toml";
        config.save_with_tutorial(path).expect("保存带教程的配置失败");
        let content = std::fs::read_to_string(path).expect("读取配置文件失败");
        assert!(content.contains("MediaDown 配置文件"));
        assert!(content.contains("使用说明"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_config_summary() {
        let config = Config::default();
        let summary = config.get_summary();

        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("保存目录"));
        assert!(summary.contains("并发数"));
    }
}
