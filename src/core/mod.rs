//! Core: 下载任务的队列调度、暂停/继续门闸、续传循环与任务管理核心逻辑

pub mod error;
pub mod gate;
pub mod manager;
pub mod queue;
pub mod source;
pub mod transfer;

// 只导出主流程和其它模块实际用到的类型
pub use error::DownloadError;
pub use gate::ResumeGate;
pub use manager::{AddDownload, CancelTask, Control, ControlPayload, DownloadManagerActor, GetStats, Stats};
pub use queue::{AddTask, TaskQueueActor, TaskResumed};
pub use source::{ChunkSource, HttpChunkSource};
pub use transfer::{run_transfer, TransferOutcome, TransferParams};
