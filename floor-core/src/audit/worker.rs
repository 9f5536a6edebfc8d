//! 审计日志后台 Worker
//!
//! 从 mpsc 通道消费 AuditLogRequest，按顺序写入 redb。
//! 每次唤醒把已排队的请求（最多 [`MAX_BATCH`] 条）合并成一个写事务。
//! redb 只有一个写入槽，审计写入与订单、库存命令共用它；合并写入让
//! 审计占用写入槽的次数随唤醒次数而不是条目数增长，命令最多被一次短事务延后。
//! 收到关闭信号后先排空队列再退出。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::AuditLogRequest;
use crate::db::StoreExecutor;
use crate::utils::NotificationFailure;

/// 单个写事务最多包含的审计条目
pub const MAX_BATCH: usize = 64;

/// 审计日志后台 Worker
pub struct AuditWorker {
    store: StoreExecutor,
}

impl AuditWorker {
    pub fn new(store: StoreExecutor) -> Self {
        Self { store }
    }

    /// 运行 worker（直到通道关闭或收到关闭信号）
    pub async fn run(self, mut rx: mpsc::Receiver<AuditLogRequest>, shutdown: CancellationToken) {
        tracing::info!("📋 Audit log worker started");

        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(first) => {
                        let batch = take_batch(first, &mut rx);
                        self.write(batch).await;
                    }
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    rx.close();
                    let mut drained = 0usize;
                    while let Some(first) = rx.recv().await {
                        let batch = take_batch(first, &mut rx);
                        drained += batch.len();
                        self.write(batch).await;
                    }
                    tracing::info!(drained, "Audit queue drained");
                    break;
                }
            }
        }

        tracing::info!("Audit log worker stopping");
    }

    async fn write(&self, batch: Vec<AuditLogRequest>) {
        let count = batch.len();
        let result = self
            .store
            .write("audit.append", move |storage, txn| {
                let mut last_id = 0;
                for request in batch {
                    last_id = storage.append_audit(txn, request)?.id;
                }
                Ok(last_id)
            })
            .await;

        match result {
            Ok(last_id) => {
                tracing::debug!(count, last_id, "Audit entries recorded");
            }
            Err(e) => {
                let failure = NotificationFailure::AuditWrite(e.to_string());
                tracing::error!(error = %failure, count, "Failed to write audit entries");
            }
        }
    }
}

/// `first` plus whatever is already queued, in arrival order
fn take_batch(first: AuditLogRequest, rx: &mut mpsc::Receiver<AuditLogRequest>) -> Vec<AuditLogRequest> {
    let mut batch = vec![first];
    while batch.len() < MAX_BATCH {
        match rx.try_recv() {
            Ok(request) => batch.push(request),
            Err(_) => break,
        }
    }
    batch
}
