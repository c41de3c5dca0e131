//! 下载管理器 actor：队列、门闸和进度报告器的装配处
//!
//! 每个任务对应一把 [`ResumeGate`] 和一个 [`StatusReporter`]，都由管理器
//! 持有并在任务终结时清理。队列只负责名额记账，暂停/继续/取消的控制指令
//! 统一从这里下发：暂停先关门闸再通知队列让出名额，继续先排队等名额、
//! 拿到名额后队列回发 [`TaskResumed`] 才真正开闸。

use actix::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::gate::ResumeGate;
use crate::core::queue::{AddTask, ContinueTask, PauseTask, TaskQueueActor, TaskResumed};
use crate::core::source::ChunkSource;
use crate::core::transfer::{run_transfer, TransferObserver, TransferOutcome, TransferParams};
use crate::report::{Publisher, StatusReporter};
use crate::utils::naming;

/// 控制按钮回传的载荷，type 字段区分动作
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

impl ControlPayload {
    pub fn pause(message_id: &str) -> Self {
        Self {
            kind: "pause".to_string(),
            message_id: message_id.to_string(),
        }
    }

    pub fn resume(message_id: &str) -> Self {
        Self {
            kind: "continue".to_string(),
            message_id: message_id.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// 任务在管理器视角下的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Waiting,
    Running,
    Paused,
    Finished,
    Failed,
    Cancelled,
}

struct TaskStat {
    downloaded: u64,
    total: u64,
    state: TaskState,
}

/// 添加一个下载任务
pub struct AddDownload {
    pub key: String,
    pub source: Arc<dyn ChunkSource>,
}
impl Message for AddDownload {
    type Result = ();
}

/// 外部控制指令，data 是 [`ControlPayload`] 的 JSON
pub struct Control {
    pub data: String,
}
impl Message for Control {
    type Result = ();
}

/// 取消任务：开闸放行等待中的 future，让它走取消分支退出
pub struct CancelTask {
    pub key: String,
}
impl Message for CancelTask {
    type Result = ();
}

/// 传输循环上报的进度
struct ProgressUpdate {
    key: String,
    downloaded: u64,
    total: u64,
}
impl Message for ProgressUpdate {
    type Result = ();
}

enum TaskOutcome {
    Finished,
    Cancelled,
    Failed(String),
}

/// 某个任务的传输 future 结束了
struct TransferDone {
    key: String,
    outcome: TaskOutcome,
}
impl Message for TransferDone {
    type Result = ();
}

/// 查询各状态任务数量
pub struct GetStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub waiting: usize,
    pub running: usize,
    pub paused: usize,
    pub finished: usize,
    pub failed: usize,
    pub cancelled: usize,
}
impl Message for GetStats {
    type Result = Stats;
}

pub struct DownloadManagerActor {
    config: Config,
    queue: Addr<TaskQueueActor>,
    publisher: Arc<dyn Publisher>,
    // 活跃任务的门闸，任务终结后移除
    gates: HashMap<String, ResumeGate>,
    reporters: HashMap<String, Arc<StatusReporter>>,
    // 终态任务的条目不清理，进程结束前的摘要统计要读它们
    stats: HashMap<String, TaskStat>,
}

impl DownloadManagerActor {
    /// 创建管理器并启动配套的任务队列。
    /// 队列的"继续"通知回发到管理器自己的信箱。
    pub fn start_with(config: Config, publisher: Arc<dyn Publisher>) -> Addr<Self> {
        Actor::create(|ctx| {
            let queue = TaskQueueActor::new(
                config.max_parallel_download,
                ctx.address().recipient::<TaskResumed>(),
            )
            .start();
            Self {
                config,
                queue,
                publisher,
                gates: HashMap::new(),
                reporters: HashMap::new(),
                stats: HashMap::new(),
            }
        })
    }

    fn set_state(&mut self, key: &str, state: TaskState) {
        if let Some(stat) = self.stats.get_mut(key) {
            stat.state = state;
        }
    }
}

impl Actor for DownloadManagerActor {
    type Context = Context<Self>;
}

impl Handler<AddDownload> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: AddDownload, ctx: &mut Self::Context) {
        let AddDownload { key, source } = msg;

        // 门闸存在即任务仍活跃，重复添加只提示不排队
        if self.gates.contains_key(&key) {
            log::info!("任务已在队列中: {}", key);
            if let Some(reporter) = self.reporters.get(&key) {
                let reporter = reporter.clone();
                actix::spawn(async move { reporter.announce_duplicate().await });
            }
            return;
        }

        let file_name = naming::resolve_display_name(
            &key,
            source.display_name(),
            self.config.prefix_message_id,
            self.config.name_max_len,
        );
        let params = TransferParams {
            staging_path: std::path::Path::new(&self.config.staging_dir).join(&file_name),
            final_path: std::path::Path::new(&self.config.save_path).join(&file_name),
            request_size: self.config.request_size,
        };

        let gate = ResumeGate::new();
        let reporter = Arc::new(StatusReporter::new(
            self.config.publish_target.clone(),
            key.clone(),
            source.total_size(),
            self.publisher.clone(),
            Duration::from_millis(self.config.send_duration_ms),
        ));

        self.gates.insert(key.clone(), gate.clone());
        self.reporters.insert(key.clone(), reporter.clone());
        self.stats.insert(
            key.clone(),
            TaskStat {
                downloaded: 0,
                total: source.total_size(),
                state: TaskState::Waiting,
            },
        );

        log::info!("新增下载任务: {} -> {}", key, file_name);

        {
            let reporter = reporter.clone();
            actix::spawn(async move { reporter.announce_queued().await });
        }

        let manager = ctx.address();
        let task_key = key.clone();
        let work = Box::new(move || {
            let fut = async move {
                let observer = ReportObserver {
                    key: task_key.clone(),
                    reporter,
                    manager: manager.clone(),
                };
                let result = run_transfer(source.as_ref(), &params, &gate, &observer).await;
                let outcome = match &result {
                    Ok(TransferOutcome::Completed(_)) => TaskOutcome::Finished,
                    Ok(TransferOutcome::Cancelled) => TaskOutcome::Cancelled,
                    Err(e) => TaskOutcome::Failed(e.to_string()),
                };
                manager.do_send(TransferDone {
                    key: task_key,
                    outcome,
                });
                result.map(|_| ())
            };
            Box::pin(fut) as futures::future::LocalBoxFuture<'static, _>
        });

        self.queue.do_send(AddTask { key, work });
    }
}

impl Handler<Control> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: Control, ctx: &mut Self::Context) {
        let payload: ControlPayload = match serde_json::from_str(&msg.data) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("无法解析控制指令: {} ({})", msg.data, e);
                return;
            }
        };

        let key = payload.message_id;
        match payload.kind.as_str() {
            "pause" => {
                let Some(gate) = self.gates.get(&key).cloned() else {
                    log::warn!("暂停指令指向未知任务: {}", key);
                    return;
                };
                // 队列确认任务确实占着名额之后才关门闸。等待中的任务
                // 没有等待者，关了门闸它会在第一次被调度时永远卡住
                let fut = self
                    .queue
                    .send(PauseTask { key: key.clone() })
                    .into_actor(self)
                    .map(move |moved, act, _ctx| {
                        if matches!(moved, Ok(true)) && act.gates.contains_key(&key) {
                            gate.pause();
                            act.set_state(&key, TaskState::Paused);
                            log::info!("任务已暂停: {}", key);
                        } else {
                            log::info!("暂停指令未生效（任务尚未开始或已结束）: {}", key);
                        }
                    });
                ctx.spawn(fut);
            }
            "continue" => {
                if !self.gates.contains_key(&key) {
                    log::warn!("继续指令指向未知任务: {}", key);
                    return;
                }
                // 只是回到等待队列，真正开闸要等 TaskResumed
                self.queue.do_send(ContinueTask { key: key.clone() });
                self.set_state(&key, TaskState::Waiting);
                log::info!("任务已重新排队: {}", key);
            }
            "cancel" => ctx.address().do_send(CancelTask { key }),
            other => log::warn!("未知的控制指令类型: {}", other),
        }
    }
}

impl Handler<CancelTask> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: CancelTask, _ctx: &mut Self::Context) {
        let Some(gate) = self.gates.get(&msg.key) else {
            return;
        };
        // 取消同时会唤醒正在等门闸的任务，避免它永远挂着
        gate.cancel();
        self.set_state(&msg.key, TaskState::Cancelled);
        log::info!("任务已标记取消: {}", msg.key);
    }
}

impl Handler<TaskResumed> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: TaskResumed, _ctx: &mut Self::Context) {
        if let Some(gate) = self.gates.get(&msg.key) {
            gate.resume();
            self.set_state(&msg.key, TaskState::Running);
            log::info!("任务恢复下载: {}", msg.key);
        }
    }
}

impl Handler<ProgressUpdate> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: ProgressUpdate, _ctx: &mut Self::Context) {
        if let Some(stat) = self.stats.get_mut(&msg.key) {
            stat.downloaded = msg.downloaded;
            if msg.total > 0 {
                stat.total = msg.total;
            }
            if stat.state == TaskState::Waiting {
                stat.state = TaskState::Running;
            }
        }
    }
}

impl Handler<TransferDone> for DownloadManagerActor {
    type Result = ();

    fn handle(&mut self, msg: TransferDone, _ctx: &mut Self::Context) {
        let TransferDone { key, outcome } = msg;
        self.gates.remove(&key);
        let reporter = self.reporters.remove(&key);

        let state = match &outcome {
            TaskOutcome::Finished => TaskState::Finished,
            TaskOutcome::Cancelled => TaskState::Cancelled,
            TaskOutcome::Failed(reason) => {
                log::error!("任务下载失败: {} ({})", key, reason);
                TaskState::Failed
            }
        };
        self.set_state(&key, state);

        if let Some(reporter) = reporter {
            actix::spawn(async move {
                match outcome {
                    TaskOutcome::Finished => reporter.report_finished().await,
                    TaskOutcome::Cancelled => reporter.report_cancelled().await,
                    TaskOutcome::Failed(reason) => reporter.report_failed(&reason).await,
                }
            });
        }
    }
}

impl Handler<GetStats> for DownloadManagerActor {
    type Result = MessageResult<GetStats>;

    fn handle(&mut self, _msg: GetStats, _ctx: &mut Self::Context) -> Self::Result {
        let mut stats = Stats {
            total: self.stats.len(),
            ..Stats::default()
        };
        for stat in self.stats.values() {
            match stat.state {
                TaskState::Waiting => stats.waiting += 1,
                TaskState::Running => stats.running += 1,
                TaskState::Paused => stats.paused += 1,
                TaskState::Finished => stats.finished += 1,
                TaskState::Failed => stats.failed += 1,
                TaskState::Cancelled => stats.cancelled += 1,
            }
        }
        MessageResult(stats)
    }
}

/// 把传输循环的回调接到报告管线和管理器信箱上
struct ReportObserver {
    key: String,
    reporter: Arc<StatusReporter>,
    manager: Addr<DownloadManagerActor>,
}

#[async_trait::async_trait(?Send)]
impl TransferObserver for ReportObserver {
    async fn on_progress(&self, downloaded: u64, total: u64) {
        self.manager.do_send(ProgressUpdate {
            key: self.key.clone(),
            downloaded,
            total,
        });
        self.reporter.report_progress(downloaded, total).await;
    }

    async fn on_paused(&self) {
        self.reporter.report_paused().await;
    }
}
