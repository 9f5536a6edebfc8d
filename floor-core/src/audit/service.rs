//! 审计日志服务
//!
//! `AuditService` 提供：
//! - 日志写入（try_send 到有界 mpsc 通道，非阻塞）
//! - 会话日志（登录 / 登出，由外部认证层调用）
//! - 日志查询（只读）

use std::sync::Arc;

use shared::models::Actor;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::*;
use crate::auth::{Command, authorize};
use crate::db::StoreExecutor;
use crate::utils::{AppError, AppResult, NotificationFailure};

/// 审计日志服务
#[derive(Debug)]
pub struct AuditService {
    store: StoreExecutor,
    tx: mpsc::Sender<AuditLogRequest>,
    query_cap: usize,
}

impl AuditService {
    /// 创建审计服务，返回需交给 [`AuditWorker`](super::AuditWorker) 的接收端
    pub fn new(
        store: StoreExecutor,
        buffer_size: usize,
        query_cap: usize,
    ) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let service = Arc::new(Self {
            store,
            tx,
            query_cap: query_cap.max(1),
        });
        (service, rx)
    }

    /// 异步记录审计日志（非阻塞，允许丢失）
    pub fn log(&self, request: AuditLogRequest) {
        if let Err(e) = self.try_log(request) {
            tracing::warn!(error = %e, "Audit entry dropped");
        }
    }

    /// Enqueue without logging the failure
    pub fn try_log(&self, request: AuditLogRequest) -> Result<(), NotificationFailure> {
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => NotificationFailure::AuditQueueFull,
            TrySendError::Closed(_) => NotificationFailure::AuditChannelClosed,
        })
    }

    /// 登录 / 登出日志
    pub fn record_session(&self, actor: &Actor, action: AuditAction) -> AppResult<()> {
        if !matches!(action, AuditAction::Login | AuditAction::Logout) {
            return Err(AppError::validation(format!(
                "{action} is not a session action"
            )));
        }
        self.log(
            AuditLogRequest::new(actor, action, AuditEntity::Users, actor.id.clone())
                .detail(actor.full_name.clone()),
        );
        Ok(())
    }

    /// 查询审计日志（最新在前）
    ///
    /// `limit` 默认且最多为配置的上限。
    pub async fn query(&self, actor: &Actor, query: AuditQuery) -> AppResult<Vec<AuditEntry>> {
        authorize(actor, Command::QueryAudit)?;
        let limit = query.limit.unwrap_or(self.query_cap).min(self.query_cap);
        let restaurant_id = actor.restaurant_id.clone();
        self.store
            .read("audit.query", move |storage, txn| {
                Ok(storage.query_audit(txn, &restaurant_id, &query, limit)?)
            })
            .await
    }

    pub fn query_cap(&self) -> usize {
        self.query_cap
    }
}
