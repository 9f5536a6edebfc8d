//! 事件总线
//!
//! # 架构
//!
//! ```text
//! OrdersManager / StockLedger ──▶ EventBroker::publish() ──▶ broadcast::Sender<FloorEvent>
//!                                                                  │
//!                                ┌─────────────────────────────────┼──────────────────┐
//!                                ▼                                 ▼                  ▼
//!                        EventSubscription                 EventSubscription   EventSubscription
//!                        (kitchen, filter)                 (dashboard)         (waiter, table)
//! ```
//!
//! 事件在提交之后、释放实体锁之前发布；同一实体的事件顺序与提交顺序一致。
//! 投递语义为至少一次；订阅者落后时收到 [`Delivery::Resync`]，需重新读取全部状态。

pub mod bus;
pub mod filter;

pub use bus::{Delivery, EventBroker, EventSubscription, SubscriberInfo};
pub use filter::EventFilter;
