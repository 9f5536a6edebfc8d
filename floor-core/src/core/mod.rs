//! 核心模块 - 配置、状态和后台任务
//!
//! - [`Config`] - 核心配置
//! - [`FloorState`] - 服务组装与共享状态
//! - [`BackgroundTasks`] - 后台任务生命周期

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::FloorState;
pub use tasks::{BackgroundTasks, ShutdownReport, TaskKind};
