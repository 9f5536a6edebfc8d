//! Shared fixture for order tests

use std::time::Duration;

use rust_decimal::Decimal;
use shared::models::{Actor, DiningTable, Product, Role};
use shared::order::{NewOrder, OrderDetail, OrderLineInput};
use tokio::sync::mpsc;

use super::OrdersManager;
use crate::audit::{AuditLogRequest, AuditService};
use crate::db::{FloorStorage, StoreExecutor};
use crate::message::EventBroker;

pub(super) struct Fixture {
    pub manager: OrdersManager,
    pub store: StoreExecutor,
    pub broker: EventBroker,
    pub audit_rx: mpsc::Receiver<AuditLogRequest>,
    pub waiter: Actor,
    pub owner: Actor,
    /// Table 5
    pub table: DiningTable,
    /// Table 7
    pub other_table: DiningTable,
    /// 10.00
    pub burger: Product,
    /// 15.00
    pub salad: Product,
}

pub(super) async fn fixture() -> Fixture {
    let store = StoreExecutor::new(
        FloorStorage::open_in_memory().unwrap(),
        Duration::from_secs(5),
    );
    let broker = EventBroker::new(64);
    let (audit, audit_rx) = AuditService::new(store.clone(), 64, 500);
    let manager = OrdersManager::new(store.clone(), broker.clone(), audit);

    let fixture = Fixture {
        manager,
        store,
        broker,
        audit_rx,
        waiter: Actor::new("w1", "Wanda Waiter", Role::Waiter, "r1"),
        owner: Actor::new("o1", "Omar Owner", Role::Owner, "r1"),
        table: DiningTable::new("r1", 5),
        other_table: DiningTable::new("r1", 7),
        burger: Product::new("r1", "Burger", Decimal::new(1000, 2)),
        salad: Product::new("r1", "Salad", Decimal::new(1500, 2)),
    };

    for table in [fixture.table.clone(), fixture.other_table.clone()] {
        fixture
            .store
            .write("seed.table", move |s, txn| Ok(s.upsert_table(txn, &table)?))
            .await
            .unwrap();
    }
    fixture.seed_product(fixture.burger.clone()).await;
    fixture.seed_product(fixture.salad.clone()).await;
    fixture
}

impl Fixture {
    pub async fn seed_product(&self, product: Product) {
        self.store
            .write("seed.product", move |s, txn| Ok(s.upsert_product(txn, &product)?))
            .await
            .unwrap();
    }

    /// Table 5: 2 × Burger + 1 × Salad = 35.00
    pub async fn create_default_order(&self) -> OrderDetail {
        let new_order = NewOrder::new(
            self.table.id.clone(),
            vec![
                OrderLineInput::new(self.burger.id.clone(), 2),
                OrderLineInput::new(self.salad.id.clone(), 1),
            ],
        );
        self.manager.create_order(&self.waiter, new_order).await.unwrap()
    }

    /// A manager over the same store and broker with its own timeout and audit queue
    pub fn rewired(
        &self,
        timeout: Duration,
        audit_buffer: usize,
    ) -> (OrdersManager, mpsc::Receiver<AuditLogRequest>) {
        let store = StoreExecutor::new(self.store.storage().clone(), timeout);
        let (audit, audit_rx) = AuditService::new(store.clone(), audit_buffer, 500);
        (OrdersManager::new(store, self.broker.clone(), audit), audit_rx)
    }

    /// Audit requests enqueued so far
    pub fn drain_audit(&mut self) -> Vec<AuditLogRequest> {
        let mut entries = Vec::new();
        while let Ok(request) = self.audit_rx.try_recv() {
            entries.push(request);
        }
        entries
    }
}
