//! StockLedger - movement commands and stock reads

use std::sync::Arc;

use serde_json::json;
use shared::error::ErrorCode;
use shared::message::FloorEvent;
use shared::models::{Actor, NewMovement, Product, StockLevel, StockMovement};
use shared::util::{new_id, now_millis};

use crate::audit::{AuditAction, AuditEntity, AuditLogRequest, AuditService};
use crate::auth::{Command, authorize, ensure_same_restaurant};
use crate::db::{StoreExecutor, StoreRead};
use crate::message::EventBroker;
use crate::utils::{AppError, AppResult, KeyedLocks};

/// Stock ledger
#[derive(Debug, Clone)]
pub struct StockLedger {
    store: StoreExecutor,
    broker: EventBroker,
    audit: Arc<AuditService>,
    locks: KeyedLocks,
    /// Default page size of `movement_history`
    history_limit: usize,
}

enum MovementOutcome {
    Recorded {
        movement: StockMovement,
        product: Product,
    },
    Replayed(StockMovement),
}

impl StockLedger {
    pub fn new(
        store: StoreExecutor,
        broker: EventBroker,
        audit: Arc<AuditService>,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            broker,
            audit,
            locks: KeyedLocks::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Apply one IN / OUT / ADJUSTMENT movement
    ///
    /// The balance read, the journal insert and the balance write commit
    /// together. OUT never takes the balance below zero; the requested
    /// quantity is kept on the movement as given.
    pub async fn record_movement(&self, actor: &Actor, request: NewMovement) -> AppResult<StockMovement> {
        authorize(actor, Command::RecordMovement)?;
        request
            .validate()
            .map_err(|msg| AppError::invalid(ErrorCode::ValueOutOfRange, msg))?;

        let _guard = self.locks.lock(&request.product_id).await;
        let command_key = request
            .idempotency_key
            .as_deref()
            .map(|key| Command::RecordMovement.scoped_key(&actor.restaurant_id, key));
        let owner = actor.clone();

        let outcome = self
            .store
            .write("stock.record_movement", move |storage, txn| {
                if let Some(key) = &command_key {
                    if let Some(movement) = txn.processed::<StockMovement>(key)? {
                        return Ok(MovementOutcome::Replayed(movement));
                    }
                }

                let mut product = load_product(txn, &owner, &request.product_id)?;
                if !product.stock_enabled {
                    return Err(AppError::invalid(
                        ErrorCode::StockTrackingDisabled,
                        format!("stock tracking is disabled for {}", product.name),
                    ));
                }

                let previous = product.stock_quantity;
                let movement = StockMovement {
                    id: new_id(),
                    product_id: product.id.clone(),
                    restaurant_id: product.restaurant_id.clone(),
                    actor_id: owner.id.clone(),
                    movement_type: request.movement_type,
                    requested_quantity: request.quantity,
                    previous_quantity: previous,
                    new_quantity: request.movement_type.apply(previous, request.quantity),
                    notes: request.notes,
                    created_at: now_millis(),
                };
                storage.append_movement(txn, &movement)?;
                product.stock_quantity = movement.new_quantity;
                storage.put_product(txn, &product)?;
                if let Some(key) = &command_key {
                    storage.mark_processed(txn, key, &movement)?;
                }
                Ok(MovementOutcome::Recorded { movement, product })
            })
            .await?;

        let (movement, product) = match outcome {
            MovementOutcome::Replayed(movement) => {
                tracing::debug!(movement_id = %movement.id, "recordMovement replayed");
                return Ok(movement);
            }
            MovementOutcome::Recorded { movement, product } => (movement, product),
        };

        tracing::info!(
            product_id = %movement.product_id,
            movement_type = %movement.movement_type,
            requested = movement.requested_quantity,
            previous = movement.previous_quantity,
            new = movement.new_quantity,
            "Stock movement recorded"
        );
        if product.is_low_stock() {
            tracing::warn!(
                product_id = %product.id,
                balance = product.stock_quantity,
                threshold = product.low_stock_threshold,
                "Low stock"
            );
        }

        self.broker.notify(stock_changed(&product));
        self.audit.log(
            AuditLogRequest::new(actor, AuditAction::Create, AuditEntity::StockMovements, movement.id.clone())
                .detail(format!(
                    "{}: {} {}",
                    product.name, movement.movement_type, movement.requested_quantity
                ))
                .new_values(json!({
                    "product_name": product.name,
                    "type": movement.movement_type,
                    "requested_quantity": movement.requested_quantity,
                    "previous_quantity": movement.previous_quantity,
                    "new_quantity": movement.new_quantity,
                    "notes": movement.notes,
                })),
        );

        Ok(movement)
    }

    /// Turn stock tracking on or off for a product
    pub async fn toggle_stock_tracking(
        &self,
        actor: &Actor,
        product_id: &str,
        enabled: bool,
    ) -> AppResult<StockLevel> {
        authorize(actor, Command::ToggleStockTracking)?;

        let _guard = self.locks.lock(product_id).await;
        let owner = actor.clone();
        let id = product_id.to_string();
        let (product, changed) = self
            .store
            .write("stock.toggle_tracking", move |storage, txn| {
                let mut product = load_product(txn, &owner, &id)?;
                if product.stock_enabled == enabled {
                    return Ok((product, false));
                }
                product.stock_enabled = enabled;
                storage.put_product(txn, &product)?;
                Ok((product, true))
            })
            .await?;

        if changed {
            tracing::info!(product_id = %product.id, enabled, "Stock tracking toggled");
            self.broker.notify(stock_changed(&product));
            self.audit.log(
                AuditLogRequest::new(actor, AuditAction::Update, AuditEntity::Products, product.id.clone())
                    .detail(product.name.clone())
                    .old_values(json!({ "stock_enabled": !enabled }))
                    .new_values(json!({ "stock_enabled": enabled })),
            );
        }

        Ok(StockLevel::from(&product))
    }

    pub async fn stock_level(&self, actor: &Actor, product_id: &str) -> AppResult<StockLevel> {
        let owner = actor.clone();
        let id = product_id.to_string();
        self.store
            .read("stock.level", move |_, txn| {
                let product = load_product(txn, &owner, &id)?;
                Ok(StockLevel::from(&product))
            })
            .await
    }

    /// Tracked products at or below their threshold, by name
    pub async fn low_stock_products(&self, actor: &Actor) -> AppResult<Vec<StockLevel>> {
        let restaurant_id = actor.restaurant_id.clone();
        self.store
            .read("stock.low_stock", move |storage, txn| {
                let products = storage.list_products(txn, &restaurant_id)?;
                Ok(products
                    .iter()
                    .filter(|product| product.is_low_stock())
                    .map(StockLevel::from)
                    .collect())
            })
            .await
    }

    /// Latest movements of a product, newest first
    pub async fn movement_history(
        &self,
        actor: &Actor,
        product_id: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<StockMovement>> {
        let owner = actor.clone();
        let id = product_id.to_string();
        let limit = limit.unwrap_or(self.history_limit);
        self.store
            .read("stock.history", move |storage, txn| {
                let product = load_product(txn, &owner, &id)?;
                Ok(storage.movement_history(txn, &product.id, limit)?)
            })
            .await
    }
}

fn load_product<R: StoreRead>(txn: &R, actor: &Actor, product_id: &str) -> AppResult<Product> {
    let product = txn
        .product(product_id)?
        .ok_or_else(|| AppError::not_found(ErrorCode::ProductNotFound, product_id))?;
    ensure_same_restaurant(actor, &product.restaurant_id, ErrorCode::ProductNotFound, product_id)?;
    Ok(product)
}

fn stock_changed(product: &Product) -> FloorEvent {
    FloorEvent::StockChanged {
        product_id: product.id.clone(),
        restaurant_id: product.restaurant_id.clone(),
    }
}
