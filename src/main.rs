use actix::prelude::*;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode},
    execute, terminal,
};
use log::LevelFilter;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mediadown::cli;
use mediadown::core::source::HttpChunkSource;
use mediadown::core::{
    AddDownload, CancelTask, ChunkSource, Control, ControlPayload, DownloadManagerActor, GetStats,
    Stats,
};
use mediadown::ui::{self, ConsolePublisher, DownloadSummary};
use mediadown::utils::logger;

const STATS_POLL_INTERVAL: Duration = Duration::from_millis(500);
const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[actix::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init(LevelFilter::Info);
    log::info!("程序启动");

    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok((args, config)) => (args, config),
        Err(e) => {
            eprintln!("参数解析失败: {}", e);
            std::process::exit(1);
        }
    };

    let urls = match args.get_urls() {
        Ok(urls) => urls,
        Err(e) => {
            eprintln!("获取URL列表失败: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("配置文件路径: {}", args.config);
    println!("配置加载成功");
    println!("{}", config.get_summary());

    let manager = DownloadManagerActor::start_with(config, Arc::new(ConsolePublisher));
    log::info!("下载管理器已启动");

    // 逐个探测URL并入队，探测失败的跳过
    let mut keys = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        let key = (i + 1).to_string();
        match HttpChunkSource::probe(url).await {
            Ok(source) => {
                ui::print_success(&format!("添加下载任务: {}", source.display_name()));
                manager.do_send(AddDownload {
                    key: key.clone(),
                    source: Arc::new(source),
                });
                keys.push(key);
            }
            Err(e) => {
                ui::print_error(&format!("无法添加 {}: {}", url, e));
            }
        }
    }

    if keys.is_empty() {
        eprintln!("没有可下载的任务");
        return Ok(());
    }

    println!("\n开始下载... (按 'p' 暂停, 'r' 继续, 'c' 取消, 'q' 退出)");
    log::info!("开始下载 {} 个任务", keys.len());

    let started_at = Instant::now();
    run_download_loop(&manager, &keys).await?;

    let final_stats = manager.send(GetStats).await?;
    let summary = DownloadSummary {
        total_tasks: final_stats.total,
        elapsed_time: started_at.elapsed(),
        finished_count: final_stats.finished,
        failed_count: final_stats.failed,
        cancelled_count: final_stats.cancelled,
    };
    println!("{}", summary);
    log::info!(
        "下载结束 - 完成: {}, 失败: {}, 取消: {}",
        final_stats.finished,
        final_stats.failed,
        final_stats.cancelled
    );

    Ok(())
}

fn all_settled(stats: &Stats) -> bool {
    stats.total > 0 && stats.finished + stats.failed + stats.cancelled == stats.total
}

/// 主循环：处理键盘输入并轮询任务状态
async fn run_download_loop(
    manager: &Addr<DownloadManagerActor>,
    keys: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    terminal::enable_raw_mode()?;
    execute!(std::io::stdout(), cursor::Hide)?;

    let mut last_poll = Instant::now();
    loop {
        if let Ok(true) = event::poll(KEYBOARD_POLL_INTERVAL) {
            if let Ok(Event::Key(key_event)) = event::read() {
                match key_event.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => {
                        println!("\n用户退出");
                        log::info!("用户主动退出下载");
                        break;
                    }
                    KeyCode::Char('p') | KeyCode::Char('P') => {
                        for key in keys {
                            manager.do_send(Control {
                                data: ControlPayload::pause(key).to_json(),
                            });
                        }
                        println!("\n已暂停所有下载任务");
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        for key in keys {
                            manager.do_send(Control {
                                data: ControlPayload::resume(key).to_json(),
                            });
                        }
                        println!("\n已继续所有下载任务");
                    }
                    KeyCode::Char('c') | KeyCode::Char('C') => {
                        for key in keys {
                            manager.do_send(CancelTask { key: key.clone() });
                        }
                        println!("\n已取消所有下载任务");
                    }
                    _ => {}
                }
            }
        }

        if last_poll.elapsed() >= STATS_POLL_INTERVAL {
            let stats = manager.send(GetStats).await?;
            if all_settled(&stats) {
                break;
            }
            last_poll = Instant::now();
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    execute!(std::io::stdout(), cursor::Show)?;
    terminal::disable_raw_mode()?;
    Ok(())
}
