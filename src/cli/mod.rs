//! CLI: 命令行接口和参数解析模块
//!
//! ## 主要功能
//!
//! - 命令行参数解析和验证
//! - 配置文件路径管理
//! - URL 列表处理（命令行参数和文件）
//! - 平台特定的路径处理
//! - 配置文件编辑器集成
//!
//! ## 支持的命令
//!
//! - 基本下载：`mediadown <url>`
//! - 批量下载：`mediadown -f urls.txt`
//! - 编辑配置：`mediadown -e`
//! - 指定配置：`mediadown -c config.conf <url>`
//! - 指定并发数：`mediadown -p 3 <url>`

use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::core::error::DownloadError;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/mediadown/mediadown.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/mediadown/mediadown.conf", home)
    }
    #[cfg(target_os = "linux")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/mediadown/mediadown.conf", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(target_os = "linux")]
    {
        // 优先 xdg-open，否则 nano
        if std::process::Command::new("xdg-open").arg(config_path).status().is_err() {
            let _ = std::process::Command::new("nano").arg(config_path).status();
        }
    }
}

/// MediaDown 命令行参数
///
/// 示例用法：
///   mediadown https://example.com/file.zip
///   mediadown -e  # 编辑配置文件
///   mediadown -f urls.txt
///   mediadown -p 3 https://example.com/file.zip
///
/// 更多用法请加 --help 查看
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mediadown",
    author = "johnhom",
    version = env!("CARGO_PKG_VERSION"),
    about = "一个用 Rust 编写的可暂停续传下载管理器",
    long_about = "支持并发上限排队、暂停/继续、断点续传和节流进度播报的下载管理器。\n\n示例：\n  mediadown https://example.com/file.zip\n  mediadown -e\n  mediadown -f urls.txt\n  mediadown -p 3 https://example.com/file.zip\n"
)]
pub struct Args {
    /// 要下载的URL列表（可同时指定多个）
    #[arg(required = false, help = "要下载的URL列表，可以同时指定多个URL。")]
    pub urls: Vec<String>,

    /// 包含URL列表的文件路径
    #[arg(short, long, help = "包含URL列表的文件路径，每行一个URL。")]
    pub file: Option<String>,

    /// 配置文件路径，默认为平台推荐路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件（-e 或 --edit）
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 指定保存目录（默认使用配置文件中的设置）
    #[arg(long = "dir", short = 'd', default_value = "", help = "指定保存目录，覆盖配置文件中的设置。")]
    pub save_dir: String,

    /// 指定最大并发下载数
    #[arg(long, short = 'p', help = "指定最大并发下载数，覆盖配置文件中的设置。")]
    pub parallel: Option<usize>,
}

impl Args {
    /// 解析命令行参数并加载配置，返回二者的合并结果
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();

        if args.edit_config {
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        if let Some(parallel) = args.parallel {
            crate::utils::validator::validate_limit(parallel)
                .map_err(|e| DownloadError::ConfigError(e.to_string()))?;
        }

        let mut config = Config::load(&args.config)?;

        // 合并命令行参数到配置
        config.merge_from_args(&args);
        config.validate()?;

        Ok((args, config))
    }

    /// 汇总命令行与文件中的URL，逐个校验
    pub fn get_urls(&self) -> Result<Vec<String>, DownloadError> {
        let mut urls = Vec::new();
        urls.extend_from_slice(&self.urls);

        if let Some(file_path) = &self.file {
            if !Path::new(file_path).exists() {
                return Err(DownloadError::ConfigError(format!(
                    "URL文件不存在: {}",
                    file_path
                )));
            }
            let content = fs::read_to_string(file_path)?;

            // 按行读取URL，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    urls.push(line.to_string());
                }
            }
        }

        crate::utils::validator::validate_urls(&urls)
            .map_err(|e| DownloadError::ConfigError(e.to_string()))?;

        Ok(urls)
    }
}
