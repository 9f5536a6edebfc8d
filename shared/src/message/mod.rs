//! 事件总线消息类型定义
//!
//! 这些类型在 floor-core 和下游消费者（厨房显示、管理面板、服务员终端）之间共享。
//! 事件只是提示：消费者收到后应重新读取对应实体的权威状态。

pub mod event;
pub use event::*;
