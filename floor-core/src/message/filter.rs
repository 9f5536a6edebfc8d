//! Subscriber filtering

use serde::{Deserialize, Serialize};
use shared::message::{EntityKind, FloorEvent};

/// Which events a subscriber receives
///
/// Restaurant is mandatory; entity kind and table narrow it further. Stock
/// events carry no table and never match a table filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub restaurant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_kind: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
}

impl EventFilter {
    /// Everything of one restaurant
    pub fn restaurant(restaurant_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            entity_kind: None,
            table_id: None,
        }
    }

    pub fn entity(mut self, kind: EntityKind) -> Self {
        self.entity_kind = Some(kind);
        self
    }

    pub fn table(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn matches(&self, event: &FloorEvent) -> bool {
        if event.restaurant_id() != self.restaurant_id {
            return false;
        }
        if self.entity_kind.is_some_and(|kind| kind != event.entity_kind()) {
            return false;
        }
        match &self.table_id {
            Some(table_id) => event.table_id() == Some(table_id.as_str()),
            None => true,
        }
    }
}
