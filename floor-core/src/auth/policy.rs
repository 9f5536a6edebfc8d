//! Command policy table
//!
//! ## 设计原则
//! - 基础 POS 操作（下单、加菜、改数量、推进状态、换桌）所有角色可用
//! - 敏感操作（强制结账、删单、库存变动、审计查询）仅 OWNER / MANAGER
//! - 跨餐厅访问一律视为不存在（不泄露其他餐厅的数据）

use shared::error::ErrorCode;
use shared::models::{Actor, Role};
use std::fmt;

use crate::utils::{AppError, AppResult};

/// 核心命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    CreateOrder,
    AddItem,
    UpdateItemQuantity,
    DeleteItem,
    UpdateStatus,
    CloseOrder,
    MoveOrder,
    DeleteOrder,
    RecordMovement,
    ToggleStockTracking,
    QueryAudit,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::CreateOrder => "createOrder",
            Command::AddItem => "addItem",
            Command::UpdateItemQuantity => "updateItemQuantity",
            Command::DeleteItem => "deleteItem",
            Command::UpdateStatus => "updateStatus",
            Command::CloseOrder => "closeOrder",
            Command::MoveOrder => "moveOrder",
            Command::DeleteOrder => "deleteOrder",
            Command::RecordMovement => "recordMovement",
            Command::ToggleStockTracking => "toggleStockTracking",
            Command::QueryAudit => "queryAudit",
        }
    }

    /// Idempotency key namespaced by command and restaurant
    pub fn scoped_key(&self, restaurant_id: &str, key: &str) -> String {
        format!("{}:{}:{}", self.as_str(), restaurant_id, key)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL_ROLES: &[Role] = &[Role::Owner, Role::Manager, Role::Waiter];
const MANAGEMENT: &[Role] = &[Role::Owner, Role::Manager];

/// (command, roles allowed)
const POLICY: &[(Command, &[Role])] = &[
    (Command::CreateOrder, ALL_ROLES),
    (Command::AddItem, ALL_ROLES),
    (Command::UpdateItemQuantity, ALL_ROLES),
    (Command::DeleteItem, ALL_ROLES),
    (Command::UpdateStatus, ALL_ROLES),
    (Command::MoveOrder, ALL_ROLES),
    (Command::CloseOrder, MANAGEMENT),
    (Command::DeleteOrder, MANAGEMENT),
    (Command::RecordMovement, MANAGEMENT),
    (Command::ToggleStockTracking, MANAGEMENT),
    (Command::QueryAudit, MANAGEMENT),
];

/// Look up the policy table; commands missing from it are denied
pub fn is_allowed(command: Command, role: Role) -> bool {
    POLICY
        .iter()
        .find(|(c, _)| *c == command)
        .is_some_and(|(_, roles)| roles.contains(&role))
}

/// Consulted once per command, before any state is touched
pub fn authorize(actor: &Actor, command: Command) -> AppResult<()> {
    if is_allowed(command, actor.role) {
        Ok(())
    } else {
        tracing::warn!(
            actor_id = %actor.id,
            role = %actor.role,
            command = %command,
            "Command denied by policy"
        );
        Err(AppError::forbidden(format!(
            "{} may not {}",
            actor.role, command
        )))
    }
}

/// Entities of another restaurant are reported as missing
pub fn ensure_same_restaurant(
    actor: &Actor,
    restaurant_id: &str,
    code: ErrorCode,
    id: &str,
) -> AppResult<()> {
    if actor.restaurant_id == restaurant_id {
        Ok(())
    } else {
        Err(AppError::not_found(code, id))
    }
}
