//! Stock movement journal

use redb::{ReadTransaction, WriteTransaction};
use shared::models::StockMovement;

use super::storage::{FloorStorage, MOVEMENT_SEQ_KEY, STOCK_MOVEMENTS_TABLE, StorageResult};

impl FloorStorage {
    /// Append a movement to the product's journal; returns its sequence
    pub fn append_movement(&self, txn: &WriteTransaction, movement: &StockMovement) -> StorageResult<u64> {
        let seq = self.next_sequence(txn, MOVEMENT_SEQ_KEY)?;
        let mut table = txn.open_table(STOCK_MOVEMENTS_TABLE)?;
        let value = serde_json::to_vec(movement)?;
        table.insert((movement.product_id.as_str(), seq), value.as_slice())?;
        Ok(seq)
    }

    /// Latest `limit` movements of a product, newest first
    pub fn movement_history(
        &self,
        txn: &ReadTransaction,
        product_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<StockMovement>> {
        let table = txn.open_table(STOCK_MOVEMENTS_TABLE)?;
        let mut movements = Vec::new();
        for entry in table
            .range((product_id, 0u64)..=(product_id, u64::MAX))?
            .rev()
            .take(limit)
        {
            let (_, value) = entry?;
            movements.push(serde_json::from_slice(value.value())?);
        }
        Ok(movements)
    }
}
