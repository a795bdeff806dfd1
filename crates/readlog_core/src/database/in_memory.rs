use crate::database::store::{RecordStore, bump_revision};
use crate::database::types::{BookRecord, RecordError};
use std::collections::HashMap;
use tokio::sync::watch;

type RecordKey = (String, String);

/// A `RecordStore` kept entirely in memory, with the same semantics as the SQLite store. Listing
/// order for records registered on the same day follows insertion order.
pub struct InMemoryRecordStore {
    records: parking_lot::RwLock<HashMap<RecordKey, (u64, BookRecord)>>,
    insert_sequence: parking_lot::Mutex<u64>,
    revision: watch::Sender<u64>,
}

impl Default for InMemoryRecordStore {
    #[inline]
    fn default() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            records: parking_lot::RwLock::default(),
            insert_sequence: parking_lot::Mutex::new(0),
            revision,
        }
    }
}

fn key(book_id: &str, user_id: &str) -> RecordKey {
    (book_id.to_owned(), user_id.to_owned())
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_records(&self, user_id: &str) -> Result<Vec<BookRecord>, RecordError> {
        let mut records: Vec<(u64, BookRecord)> = self
            .records
            .read()
            .values()
            .filter(|entry| entry.1.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|left, right| {
            right
                .1
                .reg_date
                .cmp(&left.1.reg_date)
                .then(left.0.cmp(&right.0))
        });
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    async fn get_by_id(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<BookRecord>, RecordError> {
        Ok(self
            .records
            .read()
            .get(&key(book_id, user_id))
            .map(|entry| entry.1.clone()))
    }

    async fn insert(&self, record: &BookRecord) -> Result<(), RecordError> {
        let record_key = key(&record.book_id, &record.user_id);
        {
            let mut records = self.records.write();
            // a replaced record keeps its original position
            let sequence = match records.get(&record_key) {
                Some(entry) => entry.0,
                None => {
                    let mut next = self.insert_sequence.lock();
                    *next = next.wrapping_add(1);
                    *next
                }
            };
            records.insert(record_key, (sequence, record.clone()));
        }
        bump_revision(&self.revision);
        Ok(())
    }

    async fn update(&self, record: &BookRecord) -> Result<(), RecordError> {
        {
            let mut records = self.records.write();
            let Some(entry) = records.get_mut(&key(&record.book_id, &record.user_id)) else {
                return Err(RecordError::NotFound {
                    book_id: record.book_id.clone(),
                    user_id: record.user_id.clone(),
                });
            };
            entry.1.clone_from(record);
        }
        bump_revision(&self.revision);
        Ok(())
    }

    async fn delete(&self, record: &BookRecord) -> Result<(), RecordError> {
        self.records
            .write()
            .remove(&key(&record.book_id, &record.user_id));
        bump_revision(&self.revision);
        Ok(())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod in_memory_record_store_tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(book_id: &str, user_id: &str, reg_day: u32) -> BookRecord {
        BookRecord::new(
            book_id.to_owned(),
            user_id.to_owned(),
            format!("Title {book_id}"),
            None,
            None,
            NaiveDate::from_ymd_opt(2024, 2, reg_day).unwrap(),
        )
    }

    #[tokio::test]
    async fn same_day_records_keep_insertion_order() {
        let store = InMemoryRecordStore::default();
        store.insert(&record("A", "alice", 1)).await.unwrap();
        store.insert(&record("B", "alice", 4)).await.unwrap();
        store.insert(&record("C", "alice", 4)).await.unwrap();
        store.insert(&record("D", "bob", 4)).await.unwrap();

        let ids: Vec<String> = store
            .list_records("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.book_id)
            .collect();
        assert_eq!(ids, vec!["B".to_owned(), "C".to_owned(), "A".to_owned()]);
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let store = InMemoryRecordStore::default();
        let mut book = record("A", "alice", 1);
        assert!(matches!(
            store.update(&book).await,
            Err(RecordError::NotFound { .. })
        ));

        store.insert(&book).await.unwrap();
        book.thoughts = Some("Slow start".to_owned());
        store.update(&book).await.unwrap();
        assert_eq!(store.get_by_id("A", "alice").await.unwrap(), Some(book));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryRecordStore::default();
        let book = record("A", "alice", 1);
        store.insert(&book).await.unwrap();
        store.delete(&book).await.unwrap();
        store.delete(&book).await.unwrap();
        assert_eq!(store.get_by_id("A", "alice").await.unwrap(), None);
    }
}
