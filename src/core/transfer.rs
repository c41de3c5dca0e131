//! 可续传的分块下载循环
//!
//! 临时文件的长度就是权威的续传偏移量：重启后只要临时文件还在，就从它的
//! 末尾接着下。每写入一个块检查一次门闸——暂停就阻塞在门闸信号上，取消则
//! 直接退出且不清理临时文件（留给下次续传）。全部块写完后把临时文件移动
//! 到目标目录；目标已有同名文件时在扩展名前追加随机数字后缀。

use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::core::error::DownloadError;
use crate::core::gate::ResumeGate;
use crate::core::source::ChunkSource;
use crate::utils::naming;

/// 单个任务的路径与请求参数
#[derive(Debug, Clone)]
pub struct TransferParams {
    /// 下载中的临时文件路径
    pub staging_path: PathBuf,
    /// 下载完成后的目标路径
    pub final_path: PathBuf,
    /// 单次请求大小（字节），传给数据源作为提示
    pub request_size: usize,
}

/// 下载循环的两种正常结束方式。取消不是错误。
#[derive(Debug)]
pub enum TransferOutcome {
    /// 已移动到最终路径（可能带了防冲突后缀）
    Completed(PathBuf),
    /// 被取消，临时文件保留在磁盘上
    Cancelled,
}

/// 下载过程中的回调：每写入一块报告一次进度；进入暂停时报告一次。
/// 回调里的失败不应该让下载中断，由实现方自行消化。
#[async_trait(?Send)]
pub trait TransferObserver {
    async fn on_progress(&self, downloaded: u64, total: u64);
    async fn on_paused(&self);
}

/// 执行一次完整的下载（或续传）。
/// total 为 0 时表示大小未知，调用方不能把 0 当成"已完成"。
pub async fn run_transfer(
    source: &dyn ChunkSource,
    params: &TransferParams,
    gate: &ResumeGate,
    observer: &dyn TransferObserver,
) -> Result<TransferOutcome, DownloadError> {
    if let Some(parent) = params.staging_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if let Some(parent) = params.final_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 临时文件的当前长度就是续传偏移量
    let mut offset = match tokio::fs::metadata(&params.staging_path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };

    let mut writer = if offset > 0 {
        log::info!(
            "发现已下载的临时文件，从位置 {} 继续下载: {}",
            offset,
            params.staging_path.display()
        );
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(&params.staging_path)
            .await?
    } else {
        tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&params.staging_path)
            .await?
    };

    let total = source.total_size();
    let mut stream = source.open(offset, params.request_size).await?;

    while let Some(chunk) = stream.next().await {
        if gate.is_paused() {
            observer.on_paused().await;
            log::info!("暂停下载: {}", params.staging_path.display());
            gate.wait_for_resume().await;
        }
        if gate.is_cancelled() {
            log::info!("取消下载: {}", params.staging_path.display());
            writer.flush().await?;
            return Ok(TransferOutcome::Cancelled);
        }

        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        offset += chunk.len() as u64;
        observer.on_progress(offset, total).await;
    }

    writer.flush().await?;
    drop(writer);

    let dest = finalize(params).await?;
    Ok(TransferOutcome::Completed(dest))
}

/// 把临时文件移动到目标目录。
/// 存在性检查和移动之间没有锁保护，同名冲突的规避只是尽力而为。
async fn finalize(params: &TransferParams) -> Result<PathBuf, DownloadError> {
    let dest = if params.final_path.exists() {
        let renamed = naming::with_random_suffix(&params.final_path);
        log::info!(
            "目标目录已存在同名文件，已将文件重命名为: {}，请手动检查",
            renamed.display()
        );
        renamed
    } else {
        params.final_path.clone()
    };

    tokio::fs::rename(&params.staging_path, &dest).await?;
    Ok(dest)
}
