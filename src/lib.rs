//! mediadown: 有并发上限、支持暂停/继续与断点续传、带进度播报的下载队列管理器
//!
//! 主要模块：
//! - `core`: 任务队列、恢复门闸、续传循环与任务管理 actor
//! - `report`: 进度文本的组装、节流、去重与发布
//! - `config` / `cli`: 配置文件与命令行入口
//! - `ui`: 终端输出与控制台发布通道

pub mod cli;
pub mod config;
pub mod core;
pub mod report;
pub mod ui;
pub mod utils;
