//! OrdersManager - order lifecycle commands
//!
//! # Command Flow
//!
//! ```text
//! command(actor, ...)
//!     ├─ 1. Policy check (once per command)
//!     ├─ 2. Per-order lock
//!     ├─ 3. Write transaction: idempotency check, load + guard, mutate, recompute total
//!     ├─ 4. Commit
//!     ├─ 5. Publish event (lock still held)
//!     └─ 6. Enqueue audit entry (best effort)
//! ```

use std::sync::Arc;

use redb::WriteTransaction;
use serde_json::json;
use shared::error::ErrorCode;
use shared::message::{FloorEvent, OrderChange};
use shared::models::{Actor, DiningTable, Product};
use shared::order::{
    NewOrder, Order, OrderDetail, OrderItem, OrderStatus, PaymentMethod, items_total,
};
use shared::util::{new_id, now_millis};

use crate::audit::{AuditAction, AuditEntity, AuditLogRequest, AuditService};
use crate::auth::{Command, authorize, ensure_same_restaurant};
use crate::db::{FloorStorage, StoreExecutor, StoreRead};
use crate::message::EventBroker;
use crate::utils::{AppError, AppResult, KeyedLocks};

/// 订单命令处理器
///
/// Cloning is cheap; clones share the store, broker, audit queue and locks.
#[derive(Debug, Clone)]
pub struct OrdersManager {
    pub(super) store: StoreExecutor,
    pub(super) broker: EventBroker,
    pub(super) audit: Arc<AuditService>,
    pub(super) locks: KeyedLocks,
}

enum CreateOutcome {
    Created {
        detail: OrderDetail,
        table_number: i32,
    },
    Replayed(OrderDetail),
}

enum MoveOutcome {
    Unchanged(Order),
    Moved {
        order: Order,
        from_table_id: String,
        from_number: Option<i32>,
        to_number: i32,
    },
}

impl OrdersManager {
    pub fn new(store: StoreExecutor, broker: EventBroker, audit: Arc<AuditService>) -> Self {
        Self {
            store,
            broker,
            audit,
            locks: KeyedLocks::new(),
        }
    }

    // ========== Commands ==========

    /// Open a PENDING order for a table with its initial items
    pub async fn create_order(&self, actor: &Actor, new_order: NewOrder) -> AppResult<OrderDetail> {
        authorize(actor, Command::CreateOrder)?;
        if new_order.lines.is_empty() {
            return Err(AppError::invalid(ErrorCode::OrderEmpty, "cart is empty"));
        }
        new_order.validate().map_err(AppError::validation)?;

        let command_key = new_order
            .idempotency_key
            .as_deref()
            .map(|key| Command::CreateOrder.scoped_key(&actor.restaurant_id, key));
        let owner = actor.clone();

        let outcome = self
            .store
            .write("orders.create", move |storage, txn| {
                let replayed = match &command_key {
                    Some(key) => txn.processed::<String>(key)?,
                    None => None,
                };
                if let Some(order_id) = replayed {
                    let order = load_order(txn, &owner, &order_id)?;
                    let items = txn.order_items(&order.id)?;
                    return Ok(CreateOutcome::Replayed(OrderDetail { order, items }));
                }

                let table = load_table(txn, &owner, &new_order.table_id)?;
                let now = now_millis();
                let order_id = new_id();

                let mut items = Vec::with_capacity(new_order.lines.len());
                for line in &new_order.lines {
                    let product = load_product(txn, &owner, &line.product_id)?;
                    let item = OrderItem {
                        id: new_id(),
                        order_id: order_id.clone(),
                        product_id: product.id,
                        product_name: product.name,
                        quantity: line.quantity,
                        unit_price: product.price,
                        notes: line.notes.clone(),
                        created_at: now,
                    };
                    storage.insert_item(txn, &item)?;
                    items.push(item);
                }

                let order = Order {
                    id: order_id,
                    restaurant_id: owner.restaurant_id.clone(),
                    table_id: table.id.clone(),
                    actor_id: owner.id.clone(),
                    status: OrderStatus::Pending,
                    total_amount: items_total(&items),
                    payment_method: None,
                    created_at: now,
                    updated_at: now,
                };
                storage.put_order(txn, &order)?;
                if let Some(key) = &command_key {
                    storage.mark_processed(txn, key, &order.id)?;
                }

                Ok(CreateOutcome::Created {
                    detail: OrderDetail { order, items },
                    table_number: table.table_number,
                })
            })
            .await?;

        let (detail, table_number) = match outcome {
            CreateOutcome::Replayed(detail) => {
                tracing::debug!(order_id = %detail.order.id, "createOrder replayed");
                return Ok(detail);
            }
            CreateOutcome::Created {
                detail,
                table_number,
            } => (detail, table_number),
        };

        let order = &detail.order;
        tracing::info!(
            order_id = %order.id,
            table_number,
            items = detail.items.len(),
            total = %order.total_amount,
            "Order created"
        );
        self.broker.notify(order_changed(order, OrderChange::Upserted));
        self.audit.log(
            AuditLogRequest::new(actor, AuditAction::Create, AuditEntity::Orders, order.id.clone())
                .detail(format!("Table {table_number}"))
                .new_values(json!({
                    "table_number": table_number,
                    "total_amount": order.total_amount,
                })),
        );

        Ok(detail)
    }

    /// Advance an order along the status chain
    ///
    /// `expected` is the status the caller last read. A mismatch means another
    /// actor got there first; the error carries the actual status.
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: &str,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> AppResult<Order> {
        authorize(actor, Command::UpdateStatus)?;
        // skipping DELIVERED is a force-close
        if new_status == OrderStatus::Paid && expected != OrderStatus::Delivered {
            authorize(actor, Command::CloseOrder)?;
        }

        let _guard = self.locks.lock(order_id).await;
        let owner = actor.clone();
        let id = order_id.to_string();
        let (previous, order, table_number) = self
            .store
            .write("orders.update_status", move |storage, txn| {
                let mut order = load_order(txn, &owner, &id)?;
                let actual = order.status;
                if actual != expected {
                    return Err(AppError::conflict(
                        ErrorCode::StaleState,
                        &order.id,
                        actual,
                        format!("expected {expected}, found {actual}"),
                    ));
                }
                if !actual.can_transition_to(new_status) {
                    return Err(AppError::conflict(
                        ErrorCode::InvalidTransition,
                        &order.id,
                        actual,
                        format!("cannot move {actual} to {new_status}"),
                    ));
                }

                order.status = new_status;
                order.updated_at = now_millis();
                storage.put_order(txn, &order)?;
                let table_number = table_number(txn, &order.table_id)?;
                Ok((actual, order, table_number))
            })
            .await?;

        tracing::info!(order_id = %order.id, from = %previous, to = %order.status, "Order status updated");
        self.broker.notify(order_changed(&order, OrderChange::Upserted));
        self.audit.log(
            AuditLogRequest::new(actor, AuditAction::Update, AuditEntity::Orders, order.id.clone())
                .detail(format!("{}: {previous} -> {}", table_label(table_number, &order), order.status))
                .old_values(json!({ "status": previous }))
                .new_values(json!({ "status": order.status })),
        );

        Ok(order)
    }

    /// Settle a table: any open status goes straight to PAID
    pub async fn close_order(
        &self,
        actor: &Actor,
        order_id: &str,
        payment_method: PaymentMethod,
    ) -> AppResult<Order> {
        authorize(actor, Command::CloseOrder)?;

        let _guard = self.locks.lock(order_id).await;
        let owner = actor.clone();
        let id = order_id.to_string();
        let (previous, order, table_number) = self
            .store
            .write("orders.close", move |storage, txn| {
                let mut order = load_order(txn, &owner, &id)?;
                ensure_open(&order)?;
                let previous = order.status;
                order.status = OrderStatus::Paid;
                order.payment_method = Some(payment_method);
                order.updated_at = now_millis();
                storage.put_order(txn, &order)?;
                let table_number = table_number(txn, &order.table_id)?;
                Ok((previous, order, table_number))
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            from = %previous,
            payment_method = %payment_method,
            total = %order.total_amount,
            "Order closed"
        );
        self.broker.notify(order_changed(&order, OrderChange::Upserted));
        self.audit.log(
            AuditLogRequest::new(actor, AuditAction::Close, AuditEntity::Orders, order.id.clone())
                .detail(format!("{} - {}", table_label(table_number, &order), order.total_amount))
                .old_values(json!({ "status": previous }))
                .new_values(json!({
                    "status": order.status,
                    "table_number": table_number,
                    "total_amount": order.total_amount,
                    "payment_method": payment_method,
                })),
        );

        Ok(order)
    }

    /// Reassign an open order to another table of the same restaurant
    pub async fn move_order(&self, actor: &Actor, order_id: &str, new_table_id: &str) -> AppResult<Order> {
        authorize(actor, Command::MoveOrder)?;

        let _guard = self.locks.lock(order_id).await;
        let owner = actor.clone();
        let id = order_id.to_string();
        let target = new_table_id.to_string();
        let outcome = self
            .store
            .write("orders.move", move |storage, txn| {
                let mut order = load_order(txn, &owner, &id)?;
                ensure_open(&order)?;
                let table = load_table(txn, &owner, &target)?;
                if order.table_id == table.id {
                    return Ok(MoveOutcome::Unchanged(order));
                }

                let from_number = table_number(txn, &order.table_id)?;
                let from_table_id = std::mem::replace(&mut order.table_id, table.id);
                order.updated_at = now_millis();
                storage.put_order(txn, &order)?;
                Ok(MoveOutcome::Moved {
                    order,
                    from_table_id,
                    from_number,
                    to_number: table.table_number,
                })
            })
            .await?;

        let (order, from_table_id, from_number, to_number) = match outcome {
            MoveOutcome::Unchanged(order) => return Ok(order),
            MoveOutcome::Moved {
                order,
                from_table_id,
                from_number,
                to_number,
            } => (order, from_table_id, from_number, to_number),
        };

        tracing::info!(order_id = %order.id, from = %from_table_id, to = %order.table_id, "Order moved");
        // the old table's consumers need to see the order leave
        self.broker.notify(FloorEvent::OrderChanged {
            order_id: order.id.clone(),
            restaurant_id: order.restaurant_id.clone(),
            table_id: from_table_id.clone(),
            status: order.status,
            change: OrderChange::Upserted,
        });
        self.broker.notify(order_changed(&order, OrderChange::Upserted));

        let from_label = from_number.map_or(from_table_id, |n| format!("Table {n}"));
        self.audit.log(
            AuditLogRequest::new(actor, AuditAction::Move, AuditEntity::Orders, order.id.clone())
                .detail(format!("{from_label} -> Table {to_number}"))
                .old_values(json!({ "table_number": from_number }))
                .new_values(json!({ "table_number": to_number })),
        );

        Ok(order)
    }

    /// Delete an open order together with its items
    pub async fn delete_order(&self, actor: &Actor, order_id: &str) -> AppResult<()> {
        authorize(actor, Command::DeleteOrder)?;

        let _guard = self.locks.lock(order_id).await;
        let owner = actor.clone();
        let id = order_id.to_string();
        let (order, removed_items, table_number) = self
            .store
            .write("orders.delete", move |storage, txn| {
                let order = load_order(txn, &owner, &id)?;
                ensure_open(&order)?;
                let removed = storage.remove_order_items(txn, &order.id)?;
                storage.remove_order(txn, &order.id)?;
                let table_number = table_number(txn, &order.table_id)?;
                Ok((order, removed, table_number))
            })
            .await?;

        tracing::info!(order_id = %order.id, removed_items, "Order deleted");
        self.broker.notify(order_changed(&order, OrderChange::Deleted));
        self.audit.log(
            AuditLogRequest::new(actor, AuditAction::Delete, AuditEntity::Orders, order.id.clone())
                .detail(table_label(table_number, &order))
                .old_values(json!({
                    "table_number": table_number,
                    "total_amount": order.total_amount,
                })),
        );

        Ok(())
    }

    // ========== Reads ==========

    /// Current order and its items
    pub async fn get_order(&self, actor: &Actor, order_id: &str) -> AppResult<OrderDetail> {
        let owner = actor.clone();
        let id = order_id.to_string();
        self.store
            .read("orders.get", move |_, txn| {
                let order = load_order(txn, &owner, &id)?;
                let items = txn.order_items(&order.id)?;
                Ok(OrderDetail { order, items })
            })
            .await
    }

    /// Orders of the actor's restaurant, newest first; empty `statuses` means all
    pub async fn list_orders(&self, actor: &Actor, statuses: &[OrderStatus]) -> AppResult<Vec<Order>> {
        let restaurant_id = actor.restaurant_id.clone();
        let statuses = statuses.to_vec();
        self.store
            .read("orders.list", move |storage, txn| {
                let mut orders = storage.list_orders(txn, &restaurant_id)?;
                if !statuses.is_empty() {
                    orders.retain(|order| statuses.contains(&order.status));
                }
                Ok(orders)
            })
            .await
    }
}

// ========== Transaction helpers ==========

/// Load an order of the actor's restaurant
pub(super) fn load_order<R: StoreRead>(txn: &R, actor: &Actor, order_id: &str) -> AppResult<Order> {
    let order = txn
        .order(order_id)?
        .ok_or_else(|| AppError::not_found(ErrorCode::OrderNotFound, order_id))?;
    ensure_same_restaurant(actor, &order.restaurant_id, ErrorCode::OrderNotFound, order_id)?;
    Ok(order)
}

/// PAID orders are frozen
pub(super) fn ensure_open(order: &Order) -> AppResult<()> {
    if order.is_paid() {
        return Err(AppError::conflict(
            ErrorCode::OrderAlreadyPaid,
            &order.id,
            order.status,
            "order is already paid",
        ));
    }
    Ok(())
}

fn load_table<R: StoreRead>(txn: &R, actor: &Actor, table_id: &str) -> AppResult<DiningTable> {
    let table = txn
        .dining_table(table_id)?
        .filter(|table| table.restaurant_id == actor.restaurant_id)
        .ok_or_else(|| AppError::not_found(ErrorCode::TableNotFound, table_id))?;
    if !table.is_active {
        return Err(AppError::validation(format!(
            "table {} is not active",
            table.table_number
        )));
    }
    Ok(table)
}

/// A missing or foreign product is bad input, not a missing entity
pub(super) fn load_product<R: StoreRead>(txn: &R, actor: &Actor, product_id: &str) -> AppResult<Product> {
    let product = txn
        .product(product_id)?
        .filter(|product| product.restaurant_id == actor.restaurant_id)
        .ok_or_else(|| {
            AppError::invalid(
                ErrorCode::ProductNotFound,
                format!("unknown product {product_id}"),
            )
        })?;
    if !product.is_active {
        return Err(AppError::validation(format!(
            "product {} is not available",
            product.name
        )));
    }
    Ok(product)
}

fn table_number<R: StoreRead>(txn: &R, table_id: &str) -> AppResult<Option<i32>> {
    Ok(txn.dining_table(table_id)?.map(|table| table.table_number))
}

fn table_label(table_number: Option<i32>, order: &Order) -> String {
    match table_number {
        Some(n) => format!("Table {n}"),
        None => format!("Table {}", order.table_id),
    }
}

/// Sum the current items into the order and persist it
pub(super) fn recompute_total(
    storage: &FloorStorage,
    txn: &WriteTransaction,
    order: &mut Order,
) -> AppResult<()> {
    let items = txn.order_items(&order.id)?;
    order.total_amount = items_total(&items);
    order.updated_at = now_millis();
    storage.put_order(txn, order)?;
    Ok(())
}

pub(super) fn order_changed(order: &Order, change: OrderChange) -> FloorEvent {
    FloorEvent::OrderChanged {
        order_id: order.id.clone(),
        restaurant_id: order.restaurant_id.clone(),
        table_id: order.table_id.clone(),
        status: order.status,
        change,
    }
}
