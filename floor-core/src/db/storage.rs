//! redb-based storage for the floor operations core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records |
//! | `order_items` | `(order_id, sequence)` | `OrderItem` | Line items, insertion ordered |
//! | `item_index` | `item_id` | `(order_id, sequence)` | Item lookup |
//! | `products` | `product_id` | `Product` | Catalog reference + stock balance |
//! | `dining_tables` | `table_id` | `DiningTable` | Table reference |
//! | `stock_movements` | `(product_id, sequence)` | `StockMovement` | Stock journal (append-only) |
//! | `audit_log` | `sequence` | `AuditEntry` | Audit journal (append-only) |
//! | `processed_commands` | `command_key` | JSON | Idempotency replay |
//! | `sequence_counter` | name | `u64` | Sequences |
//!
//! Values are JSON. Every mutation runs inside a single write transaction;
//! dropping a transaction without commit aborts it.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{DiningTable, Product};
use shared::order::{Order, OrderItem};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = order_id, value = JSON-serialized Order
pub(crate) const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = (order_id, sequence), value = JSON-serialized OrderItem
pub(crate) const ORDER_ITEMS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("order_items");

/// key = item_id, value = (order_id, sequence) of the item row
pub(crate) const ITEM_INDEX_TABLE: TableDefinition<&str, (&str, u64)> =
    TableDefinition::new("item_index");

pub(crate) const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

pub(crate) const DINING_TABLES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("dining_tables");

/// key = (product_id, sequence), value = JSON-serialized StockMovement
pub(crate) const STOCK_MOVEMENTS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("stock_movements");

/// key = sequence, value = JSON-serialized AuditEntry
pub(crate) const AUDIT_LOG_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

/// key = namespaced idempotency key, value = JSON of the original result
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("processed_commands");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

pub(crate) const ITEM_SEQ_KEY: &str = "item_seq";
pub(crate) const MOVEMENT_SEQ_KEY: &str = "movement_seq";
pub(crate) const AUDIT_SEQ_KEY: &str = "audit_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Floor storage backed by redb
#[derive(Clone)]
pub struct FloorStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for FloorStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloorStorage").finish_non_exhaustive()
    }
}

impl FloorStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the data is on disk.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(ITEM_INDEX_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(DINING_TABLES_TABLE)?;
            let _ = write_txn.open_table(STOCK_MOVEMENTS_TABLE)?;
            let _ = write_txn.open_table(AUDIT_LOG_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            for key in [ITEM_SEQ_KEY, MOVEMENT_SEQ_KEY, AUDIT_SEQ_KEY] {
                if seq_table.get(key)?.is_none() {
                    seq_table.insert(key, 0u64)?;
                }
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// redb admits one writer at a time; this blocks until the previous
    /// write transaction finishes.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (MVCC snapshot)
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Sequence Operations ==========

    /// Increment and return the named sequence
    pub fn next_sequence(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    // ========== Idempotency ==========

    /// Record the result of an idempotent command
    pub fn mark_processed<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        command_key: &str,
        result: &T,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let value = serde_json::to_vec(result)?;
        table.insert(command_key, value.as_slice())?;
        Ok(())
    }
}

/// Read a JSON value by string key
pub(crate) fn get_json<T, R>(table: &R, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Read every JSON value of a string-keyed table
pub(crate) fn all_json<T, R>(table: &R) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut values = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        values.push(serde_json::from_slice(value.value())?);
    }
    Ok(values)
}

/// Typed point reads shared by read and write transactions
pub trait StoreRead {
    fn order(&self, id: &str) -> StorageResult<Option<Order>>;

    /// Items of an order in insertion order
    fn order_items(&self, order_id: &str) -> StorageResult<Vec<OrderItem>>;

    /// `(order_id, sequence)` of an item row
    fn item_location(&self, item_id: &str) -> StorageResult<Option<(String, u64)>>;

    fn product(&self, id: &str) -> StorageResult<Option<Product>>;

    fn dining_table(&self, id: &str) -> StorageResult<Option<DiningTable>>;

    /// Stored result of an already processed idempotent command
    fn processed<T: DeserializeOwned>(&self, command_key: &str) -> StorageResult<Option<T>>;
}

macro_rules! impl_store_read {
    ($txn:ty) => {
        impl StoreRead for $txn {
            fn order(&self, id: &str) -> StorageResult<Option<Order>> {
                let table = self.open_table(ORDERS_TABLE)?;
                get_json(&table, id)
            }

            fn order_items(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
                let table = self.open_table(ORDER_ITEMS_TABLE)?;
                let mut items = Vec::new();
                for entry in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
                    let (_, value) = entry?;
                    items.push(serde_json::from_slice(value.value())?);
                }
                Ok(items)
            }

            fn item_location(&self, item_id: &str) -> StorageResult<Option<(String, u64)>> {
                let table = self.open_table(ITEM_INDEX_TABLE)?;
                Ok(table.get(item_id)?.map(|guard| {
                    let (order_id, seq) = guard.value();
                    (order_id.to_string(), seq)
                }))
            }

            fn product(&self, id: &str) -> StorageResult<Option<Product>> {
                let table = self.open_table(PRODUCTS_TABLE)?;
                get_json(&table, id)
            }

            fn dining_table(&self, id: &str) -> StorageResult<Option<DiningTable>> {
                let table = self.open_table(DINING_TABLES_TABLE)?;
                get_json(&table, id)
            }

            fn processed<T: DeserializeOwned>(
                &self,
                command_key: &str,
            ) -> StorageResult<Option<T>> {
                let table = self.open_table(PROCESSED_COMMANDS_TABLE)?;
                get_json(&table, command_key)
            }
        }
    };
}

impl_store_read!(ReadTransaction);
impl_store_read!(WriteTransaction);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_are_independent() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_sequence(&txn, ITEM_SEQ_KEY).unwrap(), 1);
        assert_eq!(storage.next_sequence(&txn, ITEM_SEQ_KEY).unwrap(), 2);
        assert_eq!(storage.next_sequence(&txn, AUDIT_SEQ_KEY).unwrap(), 1);
        txn.commit().unwrap();
    }

    #[test]
    fn test_aborted_transaction_leaves_no_trace() {
        let storage = FloorStorage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage
                .mark_processed(&txn, "create_order:r1:k1", &"o1")
                .unwrap();
            // dropped without commit
        }
        let read = storage.begin_read().unwrap();
        let stored: Option<String> = read.processed("create_order:r1:k1").unwrap();
        assert!(stored.is_none());
    }

    #[test]
    fn test_processed_roundtrip() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .mark_processed(&txn, "add_item:r1:k1", &"item-1".to_string())
            .unwrap();
        let in_txn: Option<String> = txn.processed("add_item:r1:k1").unwrap();
        assert_eq!(in_txn.as_deref(), Some("item-1"));
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let stored: Option<String> = read.processed("add_item:r1:k1").unwrap();
        assert_eq!(stored.as_deref(), Some("item-1"));
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floor.redb");
        {
            let storage = FloorStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.next_sequence(&txn, MOVEMENT_SEQ_KEY).unwrap();
            txn.commit().unwrap();
        }
        let storage = FloorStorage::open(&path).unwrap();
        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_sequence(&txn, MOVEMENT_SEQ_KEY).unwrap(), 2);
    }
}
