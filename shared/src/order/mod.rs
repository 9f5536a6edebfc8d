//! Order types
//!
//! - Status lifecycle and payment methods
//! - Order / OrderItem records as persisted and returned to readers
//! - Command inputs for creating orders

pub mod snapshot;
pub mod types;

// Re-exports
pub use snapshot::{Order, OrderDetail, OrderItem, items_total};
pub use types::*;
