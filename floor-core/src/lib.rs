//! Floor Core - 餐厅前厅运营核心
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 订单状态机、明细账、合计重算
//! - **库存** (`stock`): 变动流水 + 余额缓存
//! - **审计** (`audit`): 有界队列 + 后台 worker 的只追加日志
//! - **事件总线** (`message`): 按餐厅 / 桌台 / 实体过滤的扇出
//! - **授权** (`auth`): 单一策略表
//! - **数据库** (`db`): 嵌入式 redb，所有调用带超时
//!
//! # 模块结构
//!
//! ```text
//! floor-core/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── auth/          # 策略表
//! ├── db/            # redb 存储层
//! ├── orders/        # 订单状态机、明细账
//! ├── stock/         # 库存账本
//! ├── audit/         # 审计日志
//! ├── message/       # 事件总线
//! └── utils/         # 错误、日志、按键加锁
//! ```

pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod message;
pub mod orders;
pub mod stock;
pub mod utils;

// Re-export 公共类型
pub use audit::{AuditAction, AuditEntity, AuditEntry, AuditQuery, AuditService};
pub use core::{BackgroundTasks, Config, FloorState};
pub use message::{Delivery, EventBroker, EventFilter, EventSubscription};
pub use orders::{ItemChange, OrdersManager};
pub use stock::StockLedger;
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode, NotificationFailure};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env、读取配置、初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    let log_dir = config.is_production().then(|| config.log_dir());
    init_logger_with_file(Some(&config.log_level), config.log_json, log_dir.as_deref())?;
    Ok(config)
}
