//! Audit journal persistence (append + filtered reverse scan)

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use super::storage::{AUDIT_LOG_TABLE, AUDIT_SEQ_KEY, FloorStorage, StorageResult};
use crate::audit::{AuditEntry, AuditLogRequest, AuditQuery};

impl FloorStorage {
    /// Append an entry; there is no update or delete path
    pub fn append_audit(&self, txn: &WriteTransaction, request: AuditLogRequest) -> StorageResult<AuditEntry> {
        let seq = self.next_sequence(txn, AUDIT_SEQ_KEY)?;
        let entry = request.into_entry(seq);
        let mut table = txn.open_table(AUDIT_LOG_TABLE)?;
        let value = serde_json::to_vec(&entry)?;
        table.insert(seq, value.as_slice())?;
        Ok(entry)
    }

    /// Latest `limit` entries of a restaurant matching `query`, newest first
    pub fn query_audit(
        &self,
        txn: &ReadTransaction,
        restaurant_id: &str,
        query: &AuditQuery,
        limit: usize,
    ) -> StorageResult<Vec<AuditEntry>> {
        let table = txn.open_table(AUDIT_LOG_TABLE)?;
        let mut entries = Vec::new();
        if limit == 0 {
            return Ok(entries);
        }
        for row in table.iter()?.rev() {
            let (_, value) = row?;
            let entry: AuditEntry = serde_json::from_slice(value.value())?;
            if query.matches(restaurant_id, &entry) {
                entries.push(entry);
                if entries.len() >= limit {
                    break;
                }
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditEntity};
    use shared::models::{Actor, Role};

    #[test]
    fn test_append_and_query_newest_first() {
        let storage = FloorStorage::open_in_memory().unwrap();
        let waiter = Actor::new("a1", "Ana", Role::Waiter, "r1");
        let other = Actor::new("a2", "Bo", Role::Owner, "r2");

        let txn = storage.begin_write().unwrap();
        for n in 0..5 {
            let request =
                AuditLogRequest::new(&waiter, AuditAction::Create, AuditEntity::Orders, format!("o{n}"));
            storage.append_audit(&txn, request).unwrap();
        }
        storage
            .append_audit(
                &txn,
                AuditLogRequest::new(&other, AuditAction::Login, AuditEntity::Users, "a2"),
            )
            .unwrap();
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let latest = storage
            .query_audit(&read, "r1", &AuditQuery::default(), 3)
            .unwrap();
        let ids: Vec<&str> = latest.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["o4", "o3", "o2"]);
        assert!(latest[0].id > latest[1].id);

        let r2 = storage
            .query_audit(&read, "r2", &AuditQuery::default(), 500)
            .unwrap();
        assert_eq!(r2.len(), 1);
        assert_eq!(r2[0].action, AuditAction::Login);

        assert!(storage
            .query_audit(&read, "r1", &AuditQuery::default(), 0)
            .unwrap()
            .is_empty());
    }
}
