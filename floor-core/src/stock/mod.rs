//! 库存账本
//!
//! 以变动流水记录库存：每条流水的 `previous_quantity` 等于变动前的余额，
//! `new_quantity` 与流水插入在同一事务内写回商品余额缓存。
//! 同一商品的变动在按商品 id 加锁的临界区内串行执行。
//!
//! | 类型 | 新余额 |
//! |------|--------|
//! | IN | previous + requested |
//! | OUT | max(0, previous - requested) |
//! | ADJUSTMENT | requested |

mod ledger;

pub use ledger::StockLedger;
