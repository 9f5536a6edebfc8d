use std::sync::Arc;

use shared::error::ErrorCode;
use shared::message::ServiceRequestType;
use shared::models::{DiningTable, Product};

use super::config::Config;
use super::tasks::{BackgroundTasks, TaskKind};
use crate::audit::{AuditService, AuditWorker};
use crate::db::{FloorStorage, StoreExecutor, StoreRead};
use crate::message::{EventBroker, EventFilter, EventSubscription};
use crate::orders::OrdersManager;
use crate::stock::StockLedger;
use crate::utils::{AppError, AppResult};

/// 核心状态 - 持有所有服务的共享引用
///
/// 克隆成本极低，所有克隆共享同一存储、事件总线和审计队列。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | store | StoreExecutor | redb + 超时执行器 |
/// | broker | EventBroker | 事件总线 |
/// | audit | Arc<AuditService> | 审计日志服务 |
/// | orders | OrdersManager | 订单状态机 / 明细账 |
/// | stock | StockLedger | 库存账本 |
#[derive(Debug, Clone)]
pub struct FloorState {
    pub config: Config,
    pub store: StoreExecutor,
    pub broker: EventBroker,
    pub audit: Arc<AuditService>,
    pub orders: OrdersManager,
    pub stock: StockLedger,
}

impl FloorState {
    /// 打开工作目录下的数据库并启动审计 worker
    ///
    /// 返回的 [`BackgroundTasks`] 由调用方在退出时 `shutdown()`，
    /// 关闭时审计队列会被排空。
    pub async fn initialize(config: &Config) -> AppResult<(Self, BackgroundTasks)> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            AppError::persistence(format!("cannot create work dir {}: {e}", config.work_dir))
        })?;
        let db_path = config.db_path();
        let storage = FloorStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Floor storage opened");
        Ok(Self::with_storage(config, storage))
    }

    /// 基于已打开的存储组装服务
    pub fn with_storage(config: &Config, storage: FloorStorage) -> (Self, BackgroundTasks) {
        let store = StoreExecutor::new(storage, config.store_timeout());
        let broker = EventBroker::new(config.event_channel_capacity);
        let (audit, audit_rx) =
            AuditService::new(store.clone(), config.audit_buffer_size, config.audit_query_cap);

        let mut tasks = BackgroundTasks::new();
        let worker = AuditWorker::new(store.clone());
        let shutdown = tasks.shutdown_token();
        tasks.spawn("audit_worker", TaskKind::Worker, worker.run(audit_rx, shutdown));

        let state = Self {
            config: config.clone(),
            orders: OrdersManager::new(store.clone(), broker.clone(), audit.clone()),
            stock: StockLedger::new(
                store.clone(),
                broker.clone(),
                audit.clone(),
                config.movement_history_limit,
            ),
            store,
            broker,
            audit,
        };
        (state, tasks)
    }

    // ========== Reference data (provisioning) ==========

    /// Seed or update a catalog product; the stock balance is left to the ledger
    pub async fn upsert_product(&self, product: Product) -> AppResult<Product> {
        self.store
            .write("catalog.upsert_product", move |storage, txn| {
                Ok(storage.upsert_product(txn, &product)?)
            })
            .await
    }

    pub async fn upsert_table(&self, table: DiningTable) -> AppResult<()> {
        self.store
            .write("catalog.upsert_table", move |storage, txn| {
                Ok(storage.upsert_table(txn, &table)?)
            })
            .await
    }

    // ========== Events ==========

    /// Customer call-waiter / request-bill from a table
    pub async fn request_service(
        &self,
        restaurant_id: &str,
        table_id: &str,
        request_type: ServiceRequestType,
    ) -> AppResult<()> {
        let restaurant = restaurant_id.to_string();
        let id = table_id.to_string();
        let table = self
            .store
            .read("tables.get", move |_, txn| {
                txn.dining_table(&id)?
                    .filter(|table| table.restaurant_id == restaurant && table.is_active)
                    .ok_or_else(|| AppError::not_found(ErrorCode::TableNotFound, id.clone()))
            })
            .await?;

        tracing::info!(table_number = table.table_number, request_type = ?request_type, "Service requested");
        self.broker
            .publish_service_request(table.restaurant_id, table.id, request_type);
        Ok(())
    }

    pub fn subscribe(&self, consumer: impl Into<String>, filter: EventFilter) -> EventSubscription {
        self.broker.subscribe(consumer, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Delivery;
    use shared::message::FloorEvent;

    #[tokio::test]
    async fn test_request_service_checks_table() {
        let config = Config::with_work_dir("unused");
        let (state, tasks) = FloorState::with_storage(&config, FloorStorage::open_in_memory().unwrap());
        let table = DiningTable::new("r1", 3);
        state.upsert_table(table.clone()).await.unwrap();
        let mut sub = state.subscribe("waiters", EventFilter::restaurant("r1"));

        state
            .request_service("r1", &table.id, ServiceRequestType::RequestBill)
            .await
            .unwrap();
        match sub.recv().await {
            Some(Delivery::Event(FloorEvent::ServiceRequestCreated { table_id, request_type, .. })) => {
                assert_eq!(table_id, table.id);
                assert_eq!(request_type, ServiceRequestType::RequestBill);
            }
            other => panic!("unexpected delivery: {other:?}"),
        }

        let err = state
            .request_service("r2", &table.id, ServiceRequestType::CallWaiter)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TableNotFound);

        tasks.shutdown().await;
    }
}
