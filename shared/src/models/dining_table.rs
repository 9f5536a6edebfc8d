//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Dining table entity (桌台)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: String,
    pub restaurant_id: String,
    /// Number shown to staff and printed in audit details
    pub table_number: i32,
    pub is_active: bool,
}

impl DiningTable {
    pub fn new(restaurant_id: impl Into<String>, table_number: i32) -> Self {
        Self {
            id: crate::util::new_id(),
            restaurant_id: restaurant_id.into(),
            table_number,
            is_active: true,
        }
    }
}
