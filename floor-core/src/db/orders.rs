//! Order and order item persistence

use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use shared::order::{Order, OrderItem};

use super::storage::{
    FloorStorage, ITEM_INDEX_TABLE, ITEM_SEQ_KEY, ORDERS_TABLE, ORDER_ITEMS_TABLE, StorageResult,
    all_json,
};

impl FloorStorage {
    /// Insert or replace an order record
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Remove an order record (items are removed separately)
    pub fn remove_order(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Append a new item row; returns its sequence
    pub fn insert_item(&self, txn: &WriteTransaction, item: &OrderItem) -> StorageResult<u64> {
        let seq = self.next_sequence(txn, ITEM_SEQ_KEY)?;
        self.put_item(txn, seq, item)?;
        let mut index = txn.open_table(ITEM_INDEX_TABLE)?;
        index.insert(item.id.as_str(), (item.order_id.as_str(), seq))?;
        Ok(seq)
    }

    /// Overwrite an existing item row
    pub fn put_item(&self, txn: &WriteTransaction, seq: u64, item: &OrderItem) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let value = serde_json::to_vec(item)?;
        table.insert((item.order_id.as_str(), seq), value.as_slice())?;
        Ok(())
    }

    pub fn remove_item(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        seq: u64,
        item_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        table.remove((order_id, seq))?;
        let mut index = txn.open_table(ITEM_INDEX_TABLE)?;
        index.remove(item_id)?;
        Ok(())
    }

    /// Remove every item of an order; returns how many were removed
    pub fn remove_order_items(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<usize> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;

        // collect first: the range borrows the table
        let mut rows: Vec<(u64, String)> = Vec::new();
        for entry in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (key, value) = entry?;
            let item: OrderItem = serde_json::from_slice(value.value())?;
            rows.push((key.value().1, item.id));
        }

        let mut index = txn.open_table(ITEM_INDEX_TABLE)?;
        for (seq, item_id) in &rows {
            table.remove((order_id, *seq))?;
            index.remove(item_id.as_str())?;
        }
        Ok(rows.len())
    }

    /// All orders of a restaurant, newest first
    pub fn list_orders(&self, txn: &ReadTransaction, restaurant_id: &str) -> StorageResult<Vec<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let mut orders: Vec<Order> = all_json(&table)?;
        orders.retain(|order| order.restaurant_id == restaurant_id);
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::super::storage::StoreRead;
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::OrderStatus;

    fn order(id: &str, created_at: i64) -> Order {
        Order {
            id: id.to_string(),
            restaurant_id: "r1".into(),
            table_id: "t1".into(),
            actor_id: "a1".into(),
            status: OrderStatus::Pending,
            total_amount: Decimal::ZERO,
            payment_method: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn item(id: &str, order_id: &str) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            order_id: order_id.to_string(),
            product_id: "p1".into(),
            product_name: "Soup".into(),
            quantity: 1,
            unit_price: Decimal::new(450, 2),
            notes: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_items_are_scoped_to_their_order() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &order("o1", 1)).unwrap();
        storage.put_order(&txn, &order("o2", 2)).unwrap();
        storage.insert_item(&txn, &item("i1", "o1")).unwrap();
        storage.insert_item(&txn, &item("i2", "o2")).unwrap();
        storage.insert_item(&txn, &item("i3", "o1")).unwrap();
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let ids: Vec<String> = read
            .order_items("o1")
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["i1", "i3"]);
        assert_eq!(read.item_location("i2").unwrap().unwrap().0, "o2");
    }

    #[test]
    fn test_remove_order_items_cleans_index() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.insert_item(&txn, &item("i1", "o1")).unwrap();
        storage.insert_item(&txn, &item("i2", "o1")).unwrap();
        storage.insert_item(&txn, &item("i3", "o2")).unwrap();
        assert_eq!(storage.remove_order_items(&txn, "o1").unwrap(), 2);
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        assert!(read.order_items("o1").unwrap().is_empty());
        assert!(read.item_location("i1").unwrap().is_none());
        assert_eq!(read.order_items("o2").unwrap().len(), 1);
    }

    #[test]
    fn test_list_orders_newest_first() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &order("old", 10)).unwrap();
        storage.put_order(&txn, &order("new", 20)).unwrap();
        let mut foreign = order("foreign", 30);
        foreign.restaurant_id = "r2".into();
        storage.put_order(&txn, &foreign).unwrap();
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let ids: Vec<String> = storage
            .list_orders(&read, "r1")
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }
}
