//! Order item ledger
//!
//! Every item mutation and the trailing total recomputation run under the
//! order's lock and inside one write transaction, so `total_amount` always
//! equals the sum of the current lines.

use serde::Serialize;
use serde_json::json;
use shared::error::ErrorCode;
use shared::message::FloorEvent;
use shared::models::Actor;
use shared::order::{Order, OrderItem, OrderLineInput};
use shared::util::{new_id, now_millis};

use super::manager::{OrdersManager, ensure_open, load_order, load_product, recompute_total};
use crate::audit::{AuditAction, AuditEntity, AuditLogRequest};
use crate::auth::{Command, authorize};
use crate::db::StoreRead;
use crate::utils::{AppError, AppResult};

/// Result of an item mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemChange {
    /// Order with the recomputed total
    pub order: Order,
    /// Item after the change; `None` once removed
    pub item: Option<OrderItem>,
}

enum ItemEdit {
    Quantity { quantity: i32, notes: Option<String> },
    Remove,
}

enum AddOutcome {
    Added(ItemChange),
    Replayed(ItemChange),
}

enum EditOutcome {
    Updated {
        change: ItemChange,
        before: OrderItem,
    },
    Removed {
        change: ItemChange,
        removed: OrderItem,
    },
}

impl OrdersManager {
    /// Add a line; the product's current price is frozen into the item
    pub async fn add_item(
        &self,
        actor: &Actor,
        order_id: &str,
        line: OrderLineInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<ItemChange> {
        authorize(actor, Command::AddItem)?;
        line.validate().map_err(AppError::validation)?;

        let _guard = self.locks.lock(order_id).await;
        let command_key = idempotency_key.map(|key| Command::AddItem.scoped_key(&actor.restaurant_id, key));
        let owner = actor.clone();
        let id = order_id.to_string();

        let outcome = self
            .store
            .write("orders.add_item", move |storage, txn| {
                let replayed = match &command_key {
                    Some(key) => txn.processed::<(String, String)>(key)?,
                    None => None,
                };
                if let Some((first_order_id, item_id)) = replayed {
                    if first_order_id != id {
                        return Err(AppError::validation(format!(
                            "idempotency key already used for order {first_order_id}"
                        )));
                    }
                    let order = load_order(txn, &owner, &id)?;
                    let item = txn.order_items(&order.id)?.into_iter().find(|i| i.id == item_id);
                    return Ok(AddOutcome::Replayed(ItemChange { order, item }));
                }

                let mut order = load_order(txn, &owner, &id)?;
                ensure_open(&order)?;
                let product = load_product(txn, &owner, &line.product_id)?;
                let item = OrderItem {
                    id: new_id(),
                    order_id: order.id.clone(),
                    product_id: product.id,
                    product_name: product.name,
                    quantity: line.quantity,
                    unit_price: product.price,
                    notes: line.notes,
                    created_at: now_millis(),
                };
                storage.insert_item(txn, &item)?;
                recompute_total(storage, txn, &mut order)?;
                if let Some(key) = &command_key {
                    storage.mark_processed(txn, key, &(&order.id, &item.id))?;
                }
                Ok(AddOutcome::Added(ItemChange {
                    order,
                    item: Some(item),
                }))
            })
            .await?;

        let change = match outcome {
            AddOutcome::Replayed(change) => {
                tracing::debug!(order_id = %change.order.id, "addItem replayed");
                return Ok(change);
            }
            AddOutcome::Added(change) => change,
        };

        if let Some(item) = &change.item {
            tracing::info!(
                order_id = %change.order.id,
                item_id = %item.id,
                quantity = item.quantity,
                total = %change.order.total_amount,
                "Item added"
            );
            self.broker.notify(item_changed(&change.order));
            self.audit.log(
                AuditLogRequest::new(actor, AuditAction::Create, AuditEntity::OrderItems, item.id.clone())
                    .detail(format!("{} ({})", item.product_name, item.quantity))
                    .new_values(item_values(item)),
            );
        }

        Ok(change)
    }

    /// Change a line's quantity (and optionally notes)
    ///
    /// A quantity of zero or less removes the line.
    pub async fn update_item_quantity(
        &self,
        actor: &Actor,
        item_id: &str,
        quantity: i32,
        notes: Option<String>,
    ) -> AppResult<ItemChange> {
        authorize(actor, Command::UpdateItemQuantity)?;
        let edit = if quantity <= 0 {
            ItemEdit::Remove
        } else {
            ItemEdit::Quantity { quantity, notes }
        };
        self.edit_item(actor, item_id, edit).await
    }

    /// Remove a line
    pub async fn delete_item(&self, actor: &Actor, item_id: &str) -> AppResult<ItemChange> {
        authorize(actor, Command::DeleteItem)?;
        self.edit_item(actor, item_id, ItemEdit::Remove).await
    }

    /// Re-sum the order's items and store the result
    ///
    /// Takes the same critical section as the item commands.
    pub async fn recompute_order_total(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        let _guard = self.locks.lock(order_id).await;
        let owner = actor.clone();
        let id = order_id.to_string();
        let (order, previous) = self
            .store
            .write("orders.recompute_total", move |storage, txn| {
                let mut order = load_order(txn, &owner, &id)?;
                let previous = order.total_amount;
                let items = txn.order_items(&order.id)?;
                if shared::order::items_total(&items) != previous {
                    recompute_total(storage, txn, &mut order)?;
                }
                Ok((order, previous))
            })
            .await?;

        if order.total_amount != previous {
            tracing::warn!(
                order_id = %order.id,
                stored = %previous,
                recomputed = %order.total_amount,
                "Order total repaired"
            );
            self.broker.notify(item_changed(&order));
        }
        Ok(order)
    }

    async fn edit_item(&self, actor: &Actor, item_id: &str, edit: ItemEdit) -> AppResult<ItemChange> {
        let order_id = self.locate_item(item_id).await?;
        let _guard = self.locks.lock(&order_id).await;

        let owner = actor.clone();
        let item_id = item_id.to_string();
        let outcome = self
            .store
            .write("orders.edit_item", move |storage, txn| {
                // the item may have gone while we waited for the lock
                let (order_id, seq) = txn
                    .item_location(&item_id)?
                    .ok_or_else(|| AppError::not_found(ErrorCode::OrderItemNotFound, &item_id))?;
                let mut order = load_order(txn, &owner, &order_id).map_err(|e| match e {
                    AppError::NotFound { .. } => {
                        AppError::not_found(ErrorCode::OrderItemNotFound, &item_id)
                    }
                    other => other,
                })?;
                ensure_open(&order)?;
                let mut item = txn
                    .order_items(&order.id)?
                    .into_iter()
                    .find(|i| i.id == item_id)
                    .ok_or_else(|| AppError::not_found(ErrorCode::OrderItemNotFound, &item_id))?;

                match edit {
                    ItemEdit::Remove => {
                        storage.remove_item(txn, &order.id, seq, &item.id)?;
                        recompute_total(storage, txn, &mut order)?;
                        Ok(EditOutcome::Removed {
                            change: ItemChange { order, item: None },
                            removed: item,
                        })
                    }
                    ItemEdit::Quantity { quantity, notes } => {
                        let before = item.clone();
                        item.quantity = quantity;
                        if notes.is_some() {
                            item.notes = notes;
                        }
                        if item != before {
                            storage.put_item(txn, seq, &item)?;
                            recompute_total(storage, txn, &mut order)?;
                        }
                        Ok(EditOutcome::Updated {
                            change: ItemChange {
                                order,
                                item: Some(item),
                            },
                            before,
                        })
                    }
                }
            })
            .await?;

        match outcome {
            EditOutcome::Removed { change, removed } => {
                tracing::info!(
                    order_id = %change.order.id,
                    item_id = %removed.id,
                    total = %change.order.total_amount,
                    "Item removed"
                );
                self.broker.notify(item_changed(&change.order));
                self.audit.log(
                    AuditLogRequest::new(actor, AuditAction::Delete, AuditEntity::OrderItems, removed.id.clone())
                        .detail(format!("{} ({})", removed.product_name, removed.quantity))
                        .old_values(item_values(&removed)),
                );
                Ok(change)
            }
            EditOutcome::Updated { change, before } => {
                let item = match &change.item {
                    Some(item) if *item != before => item,
                    _ => return Ok(change),
                };
                tracing::info!(
                    order_id = %change.order.id,
                    item_id = %item.id,
                    from = before.quantity,
                    to = item.quantity,
                    total = %change.order.total_amount,
                    "Item updated"
                );
                self.broker.notify(item_changed(&change.order));
                // notes-only edits are not audited
                if item.quantity != before.quantity {
                    self.audit.log(
                        AuditLogRequest::new(actor, AuditAction::Update, AuditEntity::OrderItems, item.id.clone())
                            .detail(format!(
                                "{} ({} -> {})",
                                item.product_name, before.quantity, item.quantity
                            ))
                            .old_values(item_values(&before))
                            .new_values(item_values(item)),
                    );
                }
                Ok(change)
            }
        }
    }

    /// Order id of an item
    async fn locate_item(&self, item_id: &str) -> AppResult<String> {
        let id = item_id.to_string();
        self.store
            .read("orders.locate_item", move |_, txn| {
                match txn.item_location(&id)? {
                    Some((order_id, _)) => Ok(order_id),
                    None => Err(AppError::not_found(ErrorCode::OrderItemNotFound, id)),
                }
            })
            .await
    }
}

fn item_values(item: &OrderItem) -> serde_json::Value {
    json!({
        "product_name": item.product_name,
        "quantity": item.quantity,
        "price": item.unit_price,
    })
}

fn item_changed(order: &Order) -> FloorEvent {
    FloorEvent::OrderItemChanged {
        order_id: order.id.clone(),
        restaurant_id: order.restaurant_id.clone(),
        table_id: order.table_id.clone(),
    }
}
