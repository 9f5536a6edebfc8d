//! 统一错误处理
//!
//! - [`AppError`] - 返回给命令调用者的错误
//! - [`NotificationFailure`] - 审计 / 事件通知失败，仅记录日志，从不返回给调用者
//!
//! # 错误分类
//!
//! | 变体 | 说明 | 可重试 |
//! |------|------|--------|
//! | Validation | 输入不合法（空购物车、非正数量、未知商品） | 否 |
//! | StateConflict | 状态转换非法或调用方状态过期，附带当前状态 | 重新读取后 |
//! | NotFound | 订单 / 明细 / 商品 / 桌台不存在 | 否 |
//! | PermissionDenied | 角色不允许该命令 | 否 |
//! | PersistenceFailure | 存储不可用或超时 | 是 |

use shared::error::ErrorCode;
use shared::order::OrderStatus;

use crate::db::StorageError;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { code: ErrorCode, message: String },

    /// Carries the canonical current status so the caller can resynchronize
    #[error("{message} (order {entity_id} is {actual})")]
    StateConflict {
        code: ErrorCode,
        entity_id: String,
        actual: OrderStatus,
        message: String,
    },

    #[error("{}: {id}", .code.message())]
    NotFound { code: ErrorCode, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
        }
    }

    pub fn invalid(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(
        code: ErrorCode,
        entity_id: impl Into<String>,
        actual: OrderStatus,
        message: impl Into<String>,
    ) -> Self {
        Self::StateConflict {
            code,
            entity_id: entity_id.into(),
            actual,
            message: message.into(),
        }
    }

    pub fn not_found(code: ErrorCode, id: impl Into<String>) -> Self {
        Self::NotFound { code, id: id.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailure(message.into())
    }

    /// Shared error code for upstream layers
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. }
            | AppError::StateConflict { code, .. }
            | AppError::NotFound { code, .. } => *code,
            AppError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            AppError::PersistenceFailure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Only persistence failures are worth retrying unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::PersistenceFailure(_))
    }

    /// Current status attached to a state conflict
    pub fn actual_status(&self) -> Option<OrderStatus> {
        match self {
            AppError::StateConflict { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage error");
        AppError::PersistenceFailure(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// 通知失败：审计写入或事件发布。主操作已提交，只记录日志。
#[derive(Debug, thiserror::Error)]
pub enum NotificationFailure {
    #[error("audit queue full, entry dropped")]
    AuditQueueFull,

    #[error("audit channel closed, entry dropped")]
    AuditChannelClosed,

    #[error("audit write failed: {0}")]
    AuditWrite(String),

    #[error("no active subscribers")]
    NoSubscribers,
}
