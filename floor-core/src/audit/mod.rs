//! 审计日志模块
//!
//! # 架构
//!
//! ```text
//! 命令提交后
//!   └─ AuditService::log() ─try_send─▶ mpsc (有界) ─▶ AuditWorker ─▶ redb (audit_log 表)
//! ```
//!
//! 审计通道是允许丢失的通道：队列满或关闭时丢弃条目并记录 warn，
//! 写入失败记录 error。主操作从不因审计失败而失败、回滚或等待。
//! 订单 / 库存数据走完全持久化的事务路径，与此通道相互独立。

pub mod service;
pub mod types;
pub mod worker;

pub use service::AuditService;
pub use types::{AuditAction, AuditEntity, AuditEntry, AuditLogRequest, AuditQuery};
pub use worker::AuditWorker;
