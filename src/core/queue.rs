//! 任务队列 actor：限制同时可以下载任务的数量
//!
//! 任务在 wait（先进先出）/ running（有上限）/ paused 三个集合之间流转，
//! 同一个 key 同一时刻只会出现在一个集合中。暂停是纯记账操作：立刻让出
//! 并发名额，真正的停止由任务自己的 [`ResumeGate`](crate::core::gate::ResumeGate)
//! 协作完成。被继续的任务回到 wait 队尾，重新被调度时不再执行工作闭包，
//! 而是向构造时传入的接收者发送 [`TaskResumed`] 消息，由持有门闸的一方
//! 恢复下载。
//!
//! 所有状态只在 actor 的消息处理中修改，天然串行，无需额外加锁。

use actix::prelude::*;
use std::collections::VecDeque;

use crate::core::error::DownloadError;
use futures::future::LocalBoxFuture;

/// 任务的工作闭包：调用后返回实际执行的 future。
/// awc 等类型的 future 不是 Send 的，所以这里用 LocalBoxFuture。
pub type TaskFuture = LocalBoxFuture<'static, Result<(), DownloadError>>;
pub type TaskFn = Box<dyn FnOnce() -> TaskFuture + Send>;

struct QueueItem {
    key: String,
    // 任务启动后被取走；重新入队的暂停任务不再持有工作闭包
    work: Option<TaskFn>,
    was_paused: bool,
}

/// 某个暂停的任务重新获得了并发名额，可以继续下载了
pub struct TaskResumed {
    pub key: String,
}
impl Message for TaskResumed {
    type Result = ();
}

/// 添加下载任务。key 已存在时静默忽略
pub struct AddTask {
    pub key: String,
    pub work: TaskFn,
}
impl Message for AddTask {
    type Result = ();
}

/// 将正在运行的任务移入暂停集合，立即释放并发名额。
/// 返回是否真的发生了移动：还在等待队列里的任务不占名额，暂停被拒绝
pub struct PauseTask {
    pub key: String,
}
impl Message for PauseTask {
    type Result = bool;
}

/// 将暂停的任务移回等待队列队尾
pub struct ContinueTask {
    pub key: String,
}
impl Message for ContinueTask {
    type Result = ();
}

/// 任务的工作 future 结束（无论成败），由队列内部发给自己
pub struct TaskFinished {
    pub key: String,
}
impl Message for TaskFinished {
    type Result = ();
}

/// 查询某个 key 是否已在等待或运行中
pub struct HasTask {
    pub key: String,
}
impl Message for HasTask {
    type Result = bool;
}

/// 查询三个集合的当前大小
pub struct QueryCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueCounts {
    pub wait: usize,
    pub running: usize,
    pub paused: usize,
}
impl Message for QueryCounts {
    type Result = QueueCounts;
}

/// 有并发上限的任务队列
pub struct TaskQueueActor {
    wait: VecDeque<QueueItem>,
    running: Vec<QueueItem>,
    paused: Vec<QueueItem>,
    limit: usize,
    continue_to: Recipient<TaskResumed>,
}

impl Actor for TaskQueueActor {
    type Context = Context<Self>;
}

impl TaskQueueActor {
    pub fn new(limit: usize, continue_to: Recipient<TaskResumed>) -> Self {
        Self {
            wait: VecDeque::new(),
            running: Vec::new(),
            paused: Vec::new(),
            limit: if limit == 0 { 5 } else { limit },
            continue_to,
        }
    }

    fn has_key(&self, key: &str) -> bool {
        self.wait.iter().any(|item| item.key == key)
            || self.running.iter().any(|item| item.key == key)
            || self.paused.iter().any(|item| item.key == key)
    }

    /// 调度循环：只要有空闲名额就从等待队列头部取任务。
    /// 之前被暂停的任务不再重新执行，只发出继续通知并占回名额。
    fn schedule(&mut self, ctx: &mut Context<Self>) {
        while self.running.len() < self.limit {
            let Some(mut item) = self.wait.pop_front() else {
                break;
            };

            if item.was_paused {
                item.was_paused = false;
                log::info!("任务重新获得并发名额，通知继续下载: {}", item.key);
                self.continue_to.do_send(TaskResumed {
                    key: item.key.clone(),
                });
                self.running.push(item);
                continue;
            }

            let work = item.work.take();
            let key = item.key.clone();
            self.running.push(item);

            let addr = ctx.address();
            match work {
                Some(work) => {
                    actix::spawn(async move {
                        // 任务失败只记录日志，绝不影响队列自身的运转
                        if let Err(e) = work().await {
                            log::error!("任务执行出错: {} - {}", key, e);
                        }
                        addr.do_send(TaskFinished { key });
                    });
                }
                None => {
                    // 没有可执行的工作闭包，直接视为完成
                    addr.do_send(TaskFinished { key });
                }
            }
        }
    }
}

impl Handler<AddTask> for TaskQueueActor {
    type Result = ();
    fn handle(&mut self, msg: AddTask, ctx: &mut Self::Context) {
        if self.has_key(&msg.key) {
            log::info!("已有相同 key 的任务在队列中，忽略: {}", msg.key);
            return;
        }
        self.wait.push_back(QueueItem {
            key: msg.key,
            work: Some(msg.work),
            was_paused: false,
        });
        self.schedule(ctx);
    }
}

impl Handler<PauseTask> for TaskQueueActor {
    type Result = bool;
    fn handle(&mut self, msg: PauseTask, ctx: &mut Self::Context) -> bool {
        let Some(pos) = self.running.iter().position(|item| item.key == msg.key) else {
            log::info!("任务不在运行集合中，拒绝暂停: {}", msg.key);
            return false;
        };
        let mut item = self.running.remove(pos);
        item.was_paused = true;
        self.paused.push(item);
        log::info!("任务已移入暂停集合: {}", msg.key);
        // 名额已经空出来，马上调度下一个
        self.schedule(ctx);
        true
    }
}

impl Handler<ContinueTask> for TaskQueueActor {
    type Result = ();
    fn handle(&mut self, msg: ContinueTask, ctx: &mut Self::Context) {
        if let Some(pos) = self.paused.iter().position(|item| item.key == msg.key) {
            let item = self.paused.remove(pos);
            // 回到队尾，不插队
            self.wait.push_back(item);
        }
        self.schedule(ctx);
    }
}

impl Handler<TaskFinished> for TaskQueueActor {
    type Result = ();
    fn handle(&mut self, msg: TaskFinished, ctx: &mut Self::Context) {
        // 任务可能在运行中结束，也可能在暂停期间被取消而结束，
        // 无论在哪个集合都要清掉记账
        self.running.retain(|item| item.key != msg.key);
        self.paused.retain(|item| item.key != msg.key);
        self.wait.retain(|item| item.key != msg.key);
        self.schedule(ctx);
    }
}

impl Handler<HasTask> for TaskQueueActor {
    type Result = bool;
    fn handle(&mut self, msg: HasTask, _ctx: &mut Self::Context) -> bool {
        self.wait.iter().any(|item| item.key == msg.key)
            || self.running.iter().any(|item| item.key == msg.key)
    }
}

impl Handler<QueryCounts> for TaskQueueActor {
    type Result = MessageResult<QueryCounts>;
    fn handle(&mut self, _msg: QueryCounts, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(QueueCounts {
            wait: self.wait.len(),
            running: self.running.len(),
            paused: self.paused.len(),
        })
    }
}
