//! 数据库层
//!
//! - [`FloorStorage`] - redb 表定义与事务内读写
//! - [`StoreExecutor`] - 阻塞线程池 + 超时的存储调用

mod audit;
mod catalog;
pub mod executor;
mod orders;
mod stock;
pub mod storage;

pub use executor::StoreExecutor;
pub use storage::{FloorStorage, StorageError, StorageResult, StoreRead};
