//! Orders module - 订单状态机与明细账
//!
//! # 状态
//!
//! ```text
//! PENDING → PREPARING → READY → DELIVERED → PAID
//!    └──────────┴──────────┴────────┴─────────▲  closeOrder (快速结账)
//! ```
//!
//! PAID 为终态：明细修改、换桌、删单均返回 StateConflict。
//!
//! # 并发
//!
//! 同一订单的所有写命令在按订单 id 加锁的临界区内执行；
//! 状态推进额外要求调用方提供上次读取到的状态（乐观检查）。

mod items;
mod manager;
#[cfg(test)]
mod test_support;

pub use items::ItemChange;
pub use manager::OrdersManager;
