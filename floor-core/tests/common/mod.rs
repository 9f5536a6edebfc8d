//! 集成测试公共夹具：基于临时目录的完整 FloorState

#![allow(dead_code)]

use std::time::Duration;

use floor_core::core::BackgroundTasks;
use floor_core::{AuditEntry, AuditQuery, Config, FloorState};
use rust_decimal::Decimal;
use shared::models::{Actor, DiningTable, Product, Role};
use shared::order::{NewOrder, OrderDetail, OrderLineInput};
use tempfile::TempDir;

pub const RESTAURANT: &str = "rest-1";

pub struct Harness {
    pub state: FloorState,
    pub tasks: BackgroundTasks,
    pub owner: Actor,
    pub manager: Actor,
    pub waiter: Actor,
    pub table5: DiningTable,
    pub table7: DiningTable,
    /// Product A, 10.00
    pub product_a: Product,
    /// Product B, 15.00
    pub product_b: Product,
    _dir: TempDir,
}

pub async fn setup() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = Config::with_work_dir(dir.path().to_string_lossy().to_string());
    let (state, tasks) = FloorState::initialize(&config).await.unwrap();

    let table5 = DiningTable::new(RESTAURANT, 5);
    let table7 = DiningTable::new(RESTAURANT, 7);
    state.upsert_table(table5.clone()).await.unwrap();
    state.upsert_table(table7.clone()).await.unwrap();

    let mut product_a = Product::new(RESTAURANT, "Product A", Decimal::new(1000, 2));
    product_a.stock_enabled = true;
    product_a.low_stock_threshold = 2;
    let product_a = state.upsert_product(product_a).await.unwrap();
    let product_b = state
        .upsert_product(Product::new(RESTAURANT, "Product B", Decimal::new(1500, 2)))
        .await
        .unwrap();

    Harness {
        state,
        tasks,
        owner: Actor::new("u-owner", "Olivia Owner", Role::Owner, RESTAURANT),
        manager: Actor::new("u-manager", "Marco Manager", Role::Manager, RESTAURANT),
        waiter: Actor::new("u-waiter", "Wendy Waiter", Role::Waiter, RESTAURANT),
        table5,
        table7,
        product_a,
        product_b,
        _dir: dir,
    }
}

impl Harness {
    /// Table 5: 2 × A + 1 × B
    pub async fn scenario_a_order(&self) -> OrderDetail {
        self.state
            .orders
            .create_order(
                &self.waiter,
                NewOrder::new(
                    self.table5.id.clone(),
                    vec![
                        OrderLineInput::new(self.product_a.id.clone(), 2),
                        OrderLineInput::new(self.product_b.id.clone(), 1),
                    ],
                ),
            )
            .await
            .unwrap()
    }

    /// Poll the audit log until at least `count` entries match
    pub async fn wait_for_audit(&self, query: AuditQuery, count: usize) -> Vec<AuditEntry> {
        for _ in 0..200 {
            let entries = self.state.audit.query(&self.owner, query.clone()).await.unwrap();
            if entries.len() >= count {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("audit log never reached {count} entries");
    }
}
