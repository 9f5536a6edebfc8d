//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型
//! - [`KeyedLocks`] - 按实体 ID 串行化的异步锁
//! - 日志初始化

pub mod error;
pub mod keyed_lock;
pub mod logger;

pub use error::{AppError, AppResult, NotificationFailure};
pub use keyed_lock::KeyedLocks;
pub use shared::error::{ErrorCategory, ErrorCode};
