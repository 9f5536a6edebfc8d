//! Catalog reference data: products and dining tables
//!
//! Provisioning is owned by an outer layer; these writes exist so that layer
//! (and tests) can seed the reference data the core reads.

use redb::{ReadTransaction, WriteTransaction};
use shared::models::{DiningTable, Product};

use super::storage::{
    DINING_TABLES_TABLE, FloorStorage, PRODUCTS_TABLE, StorageResult, StoreRead, all_json,
};

impl FloorStorage {
    /// Insert or replace a product record as-is
    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Provisioning upsert
    ///
    /// The stock balance belongs to the stock ledger: an existing product keeps
    /// its balance, a new product starts at zero.
    pub fn upsert_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<Product> {
        let mut stored = product.clone();
        stored.stock_quantity = txn
            .product(&product.id)?
            .map(|existing| existing.stock_quantity)
            .unwrap_or(0);
        self.put_product(txn, &stored)?;
        Ok(stored)
    }

    pub fn upsert_table(&self, txn: &WriteTransaction, dining_table: &DiningTable) -> StorageResult<()> {
        let mut table = txn.open_table(DINING_TABLES_TABLE)?;
        let value = serde_json::to_vec(dining_table)?;
        table.insert(dining_table.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Products of a restaurant, by name
    pub fn list_products(&self, txn: &ReadTransaction, restaurant_id: &str) -> StorageResult<Vec<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        let mut products: Vec<Product> = all_json(&table)?;
        products.retain(|p| p.restaurant_id == restaurant_id);
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_upsert_keeps_ledger_balance() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let mut product = Product::new("r1", "Beer", Decimal::new(400, 2));
        product.stock_quantity = 99;

        let txn = storage.begin_write().unwrap();
        let stored = storage.upsert_product(&txn, &product).unwrap();
        assert_eq!(stored.stock_quantity, 0);

        let mut ledgered = stored.clone();
        ledgered.stock_quantity = 12;
        storage.put_product(&txn, &ledgered).unwrap();

        let mut renamed = product.clone();
        renamed.name = "Lager".into();
        renamed.price = Decimal::new(450, 2);
        let stored = storage.upsert_product(&txn, &renamed).unwrap();
        assert_eq!(stored.stock_quantity, 12);
        assert_eq!(stored.name, "Lager");
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        assert_eq!(read.product(&product.id).unwrap().unwrap().price, Decimal::new(450, 2));
    }

    #[test]
    fn test_list_products_scoped_to_restaurant() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .upsert_product(&txn, &Product::new("r1", "Wine", Decimal::ONE))
            .unwrap();
        storage
            .upsert_product(&txn, &Product::new("r1", "Ale", Decimal::ONE))
            .unwrap();
        storage
            .upsert_product(&txn, &Product::new("r2", "Cider", Decimal::ONE))
            .unwrap();
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let names: Vec<String> = storage
            .list_products(&read, "r1")
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Ale", "Wine"]);
    }
}
