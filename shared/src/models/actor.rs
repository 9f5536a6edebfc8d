//! Actor Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// 员工角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Waiter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Waiter => "WAITER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity performing a command
///
/// Produced by the authentication boundary and passed explicitly into every
/// core call. The core never verifies credentials itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub full_name: String,
    pub role: Role,
    pub restaurant_id: String,
}

impl Actor {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
        restaurant_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            role,
            restaurant_id: restaurant_id.into(),
        }
    }
}
