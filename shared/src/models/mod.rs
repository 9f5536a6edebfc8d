//! Data models
//!
//! Reference data (actors, dining tables, products) and the stock movement
//! journal. Catalog and table provisioning live outside the core; these types
//! are what the core reads from them.
//! All IDs are UUID strings, all timestamps are Unix millis.

pub mod actor;
pub mod dining_table;
pub mod product;
pub mod stock;

// Re-exports
pub use actor::*;
pub use dining_table::*;
pub use product::*;
pub use stock::*;
