//! Error codes shared by the core and its callers
//!
//! 每个错误码在下面的表里只登记一次：数值、变体名和开发者可读的英文描述。
//! 数值一旦发布就不能改，新增错误码只能追加。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares [`ErrorCode`] together with its numeric lookup and messages
macro_rules! error_codes {
    ($( $(#[$meta:meta])* $name:ident = $value:literal => $message:literal, )+) => {
        /// Unified error code, serialized as its `u16` value
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u16", try_from = "u16")]
        #[repr(u16)]
        pub enum ErrorCode {
            $( $(#[$meta])* $name = $value, )+
        }

        impl ErrorCode {
            /// Every registered code, in declaration order
            pub const ALL: &'static [ErrorCode] = &[$( ErrorCode::$name, )+];

            /// Developer-facing English description
            pub const fn message(&self) -> &'static str {
                match self {
                    $( ErrorCode::$name => $message, )+
                }
            }
        }

        impl TryFrom<u16> for ErrorCode {
            type Error = InvalidErrorCode;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok(ErrorCode::$name), )+
                    _ => Err(InvalidErrorCode(value)),
                }
            }
        }
    };
}

error_codes! {
    // 0xxx general
    ValidationFailed = 2 => "Validation failed",
    NotFound = 3 => "Resource not found",
    ValueOutOfRange = 8 => "Value is out of range",

    // 2xxx permission
    PermissionDenied = 2001 => "Permission denied",

    // 4xxx order
    OrderNotFound = 4001 => "Order not found",
    OrderAlreadyPaid = 4002 => "Order has already been paid",
    OrderItemNotFound = 4006 => "Order item not found",
    OrderEmpty = 4007 => "Order is empty",
    /// 当前状态不允许该流转
    InvalidTransition = 4008 => "Status transition is not allowed",
    /// 调用方持有的状态已过期
    StaleState = 4009 => "Order was changed by another actor, reload and retry",

    // 6xxx product / stock
    ProductNotFound = 6001 => "Product not found",
    StockTrackingDisabled = 6004 => "Stock tracking is disabled for this product",

    // 7xxx table
    TableNotFound = 7001 => "Table not found",

    // 9xxx system
    /// Store unreachable, failed or timed out
    DatabaseError = 9002 => "Database error, please try again",
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether a caller may retry the same command unchanged
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::DatabaseError)
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// A `u16` that is not a registered [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unregistered error code {0}")]
pub struct InvalidErrorCode(pub u16);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_resolvable() {
        let mut seen = HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.code()), "duplicate value {}", code.code());
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
            assert!(!code.message().is_empty());
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&ErrorCode::OrderAlreadyPaid).unwrap();
        assert_eq!(json, "4002");
        assert_eq!(
            serde_json::from_str::<ErrorCode>("4009").unwrap(),
            ErrorCode::StaleState
        );
        assert!(serde_json::from_str::<ErrorCode>("1").is_err());
        assert_eq!(ErrorCode::ValidationFailed.to_string(), "E0002");
    }

    #[test]
    fn test_only_store_failures_are_retryable() {
        let retryable: Vec<_> = ErrorCode::ALL.iter().filter(|c| c.is_retryable()).collect();
        assert_eq!(retryable, [&ErrorCode::DatabaseError]);
    }
}
