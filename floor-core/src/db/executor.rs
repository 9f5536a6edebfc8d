//! Bounded store calls
//!
//! redb is synchronous; every call runs on the blocking pool and is bounded by
//! the configured store timeout. A timeout or storage error surfaces as
//! [`AppError::PersistenceFailure`].
//!
//! A write and its caller's timeout race for a [`CommitGate`]. Whichever claims
//! it first wins: a write that lost rolls back, and a caller whose write is
//! already committing waits for it. So a `PersistenceFailure` from a timeout
//! always means nothing was stored.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use redb::{ReadTransaction, WriteTransaction};

use super::storage::{FloorStorage, StorageError};
use crate::utils::{AppError, AppResult};

const RUNNING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Commit-or-abandon decision shared by a write and the caller awaiting it
#[derive(Debug, Default)]
struct CommitGate(AtomicU8);

impl CommitGate {
    /// Called by the write right before commit
    fn claim_commit(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Called by the caller on timeout
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Runs closures against [`FloorStorage`] off the async runtime
#[derive(Debug, Clone)]
pub struct StoreExecutor {
    storage: FloorStorage,
    timeout: Duration,
}

impl StoreExecutor {
    pub fn new(storage: FloorStorage, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    pub fn storage(&self) -> &FloorStorage {
        &self.storage
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `f` inside one write transaction
    ///
    /// Commits when `f` returns `Ok` and the caller is still waiting; any
    /// error, or a caller that already timed out, aborts the transaction.
    pub async fn write<T, F>(&self, op: &'static str, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&FloorStorage, &WriteTransaction) -> AppResult<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        let gate = Arc::new(CommitGate::default());
        let write_gate = gate.clone();
        self.bounded(op, gate, move || {
            let txn = storage.begin_write()?;
            let value = f(&storage, &txn)?;
            if !write_gate.claim_commit() {
                txn.abort().map_err(StorageError::from)?;
                tracing::warn!(op, "Write rolled back, caller timed out");
                return Err(AppError::persistence(format!("{op}: rolled back after timeout")));
            }
            txn.commit().map_err(StorageError::from)?;
            Ok(value)
        })
        .await
    }

    /// Run `f` against a read snapshot
    pub async fn read<T, F>(&self, op: &'static str, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&FloorStorage, &ReadTransaction) -> AppResult<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        self.bounded(op, Arc::default(), move || {
            let txn = storage.begin_read()?;
            f(&storage, &txn)
        })
        .await
    }

    async fn bounded<T, F>(&self, op: &'static str, gate: Arc<CommitGate>, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> AppResult<T> + Send + 'static,
    {
        let mut task = tokio::task::spawn_blocking(f);
        let joined = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) if gate.abandon() => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                return Err(AppError::persistence(format!(
                    "{op}: timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
            Err(_) => {
                // commit already under way; its outcome is the answer
                tracing::debug!(op, "Timed out during commit, waiting for it");
                task.await
            }
        };
        joined.unwrap_or_else(|join_err| {
            tracing::error!(op, error = %join_err, "Store task failed");
            Err(AppError::persistence(format!("{op}: store task failed")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreRead;
    use rust_decimal::Decimal;
    use shared::models::Product;
    use shared::order::OrderStatus;

    fn executor(timeout: Duration) -> StoreExecutor {
        StoreExecutor::new(FloorStorage::open_in_memory().unwrap(), timeout)
    }

    #[tokio::test]
    async fn test_write_commits_on_ok() {
        let store = executor(Duration::from_secs(5));
        let product = Product::new("r1", "Tea", Decimal::new(200, 2));
        let id = product.id.clone();
        store
            .write("seed", move |s, txn| Ok(s.upsert_product(txn, &product)?))
            .await
            .unwrap();

        let found = store
            .read("get", move |_, txn| Ok(txn.product(&id)?))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_write_aborts_on_err() {
        let store = executor(Duration::from_secs(5));
        let product = Product::new("r1", "Tea", Decimal::new(200, 2));
        let id = product.id.clone();
        let err = store
            .write("seed", move |s, txn| -> AppResult<()> {
                s.upsert_product(txn, &product)?;
                Err(AppError::conflict(
                    shared::ErrorCode::StaleState,
                    "o1",
                    OrderStatus::Ready,
                    "late",
                ))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        let found = store
            .read("get", move |_, txn| Ok(txn.product(&id)?))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_transient_persistence_failure() {
        let store = executor(Duration::from_millis(20));
        let err = store
            .read("slow", |_, _| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PersistenceFailure(_)));
        assert!(err.is_transient());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_write_is_rolled_back() {
        let slow = executor(Duration::from_secs(5));
        let store = StoreExecutor::new(slow.storage().clone(), Duration::from_millis(50));

        // hold the single writer long enough for the next write to time out
        let hog = tokio::spawn({
            let slow = slow.clone();
            async move {
                slow.write("hog", |_, _| {
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
                .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let product = Product::new("r1", "Tea", Decimal::new(200, 2));
        let id = product.id.clone();
        let err = store
            .write("late", move |s, txn| Ok(s.upsert_product(txn, &product)?))
            .await
            .unwrap_err();
        assert!(err.is_transient());

        hog.await.unwrap().unwrap();
        // let the abandoned write get the writer and roll back
        tokio::time::sleep(Duration::from_millis(100)).await;
        let found = slow
            .read("get", move |_, txn| Ok(txn.product(&id)?))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_commit_gate_has_one_winner() {
        let gate = CommitGate::default();
        assert!(gate.abandon());
        assert!(!gate.claim_commit());

        let gate = CommitGate::default();
        assert!(gate.claim_commit());
        assert!(!gate.abandon());
    }
}
