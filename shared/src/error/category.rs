//! 按错误码区段划分的错误类别

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx
    General,
    /// 2xxx
    Permission,
    /// 4xxx
    Order,
    /// 6xxx
    Stock,
    /// 7xxx
    Table,
    /// 9xxx 及未分配区段
    System,
}

impl ErrorCategory {
    pub fn of(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            2 => Self::Permission,
            4 => Self::Order,
            6 => Self::Stock,
            7 => Self::Table,
            _ => Self::System,
        }
    }

    /// 调用方改正输入或重新读取后即可重试；System 类只能原样重试
    pub fn is_caller_fault(&self) -> bool {
        !matches!(self, Self::System)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Permission => "permission",
            Self::Order => "order",
            Self::Stock => "stock",
            Self::Table => "table",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::of(self.code())
    }
}
