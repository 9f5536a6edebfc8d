//! 授权模块
//!
//! 认证由外层完成；核心只接收已认证的 [`Actor`](shared::models::Actor)，
//! 按策略表判断角色是否允许执行命令，并把实体限定在调用者所属餐厅。

pub mod policy;

pub use policy::{Command, authorize, ensure_same_restaurant, is_allowed};
