//! Unified error codes for the floor operations core
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 6xxx: Product / stock errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
