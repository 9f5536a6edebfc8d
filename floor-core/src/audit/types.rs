//! 审计日志类型定义
//!
//! 所有条目不可变、不可删除。

use serde::{Deserialize, Serialize};
use shared::models::{Actor, Role};

/// 审计操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    /// 换桌
    Move,
    /// 结账
    Close,
    Login,
    Logout,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Move => "MOVE",
            AuditAction::Close => "CLOSE",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
        };
        f.write_str(name)
    }
}

/// 审计资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEntity {
    #[serde(rename = "ORDERS")]
    Orders,
    #[serde(rename = "ORDER ITEMS")]
    OrderItems,
    #[serde(rename = "PRODUCTS")]
    Products,
    #[serde(rename = "STOCK MOVEMENTS")]
    StockMovements,
    #[serde(rename = "USERS")]
    Users,
}

impl std::fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuditEntity::Orders => "ORDERS",
            AuditEntity::OrderItems => "ORDER ITEMS",
            AuditEntity::Products => "PRODUCTS",
            AuditEntity::StockMovements => "STOCK MOVEMENTS",
            AuditEntity::Users => "USERS",
        };
        f.write_str(name)
    }
}

/// 审计日志条目（不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 全局递增序列号（唯一标识）
    pub id: u64,
    pub restaurant_id: String,
    /// 操作人
    pub actor_id: String,
    pub actor_name: String,
    pub actor_role: Role,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: String,
    /// 可读名称：detail，缺省为 entity_id（用于搜索）
    pub entity_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_values: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_values: Option<serde_json::Value>,
    /// 时间戳（Unix 毫秒）
    pub created_at: i64,
}

/// 发送到审计 worker 的日志请求
#[derive(Debug, Clone)]
pub struct AuditLogRequest {
    pub restaurant_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub actor_role: Role,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: String,
    pub detail: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    /// 请求产生时间，而非写入时间
    pub created_at: i64,
}

impl AuditLogRequest {
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity_type: AuditEntity,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            restaurant_id: actor.restaurant_id.clone(),
            actor_id: actor.id.clone(),
            actor_name: actor.full_name.clone(),
            actor_role: actor.role,
            action,
            entity_type,
            entity_id: entity_id.into(),
            detail: None,
            old_values: None,
            new_values: None,
            created_at: shared::util::now_millis(),
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn old_values(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn into_entry(self, id: u64) -> AuditEntry {
        let entity_name = self.detail.clone().unwrap_or_else(|| self.entity_id.clone());
        AuditEntry {
            id,
            restaurant_id: self.restaurant_id,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            actor_role: self.actor_role,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            entity_name,
            detail: self.detail,
            old_values: self.old_values,
            new_values: self.new_values,
            created_at: self.created_at,
        }
    }
}

/// 审计日志查询参数（餐厅取自调用者）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    /// 操作类型过滤
    pub action: Option<AuditAction>,
    /// 资源类型过滤
    pub entity_type: Option<AuditEntity>,
    /// 操作人 / 资源名称模糊匹配（不区分大小写）
    pub search: Option<String>,
    /// 最新 N 条，默认且最多为配置上限
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn entity_type(mut self, entity_type: AuditEntity) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an entry of `restaurant_id` passes this filter
    pub fn matches(&self, restaurant_id: &str, entry: &AuditEntry) -> bool {
        if entry.restaurant_id != restaurant_id {
            return false;
        }
        if self.action.is_some_and(|action| action != entry.action) {
            return false;
        }
        if self.entity_type.is_some_and(|entity| entity != entry.entity_type) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                entry.actor_name.to_lowercase().contains(&needle)
                    || entry.entity_name.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}
