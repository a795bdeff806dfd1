use crate::database::types::{BookRecord, RecordError};
use tokio::sync::watch;

/// The persistence boundary for book records. Every operation is scoped to a single user; writes
/// follow "last write wins" and no operation spans more than one record.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists all records of the given user, most recently registered first
    async fn list_records(&self, user_id: &str) -> Result<Vec<BookRecord>, RecordError>;

    /// Fetches a single record, `None` if the user never saved that book
    async fn get_by_id(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<BookRecord>, RecordError>;

    /// Stores a record, replacing any existing record with the same `(book_id, user_id)`
    async fn insert(&self, record: &BookRecord) -> Result<(), RecordError>;

    /// Rewrites an existing record, fails with `RecordError::NotFound` if there is none
    async fn update(&self, record: &BookRecord) -> Result<(), RecordError>;

    /// Removes a record. Removing a record that does not exist is not an error.
    async fn delete(&self, record: &BookRecord) -> Result<(), RecordError>;

    /// A revision counter that increases after every successful write
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Bumps the revision counter shared by the store implementations
pub(crate) fn bump_revision(revision: &watch::Sender<u64>) {
    revision.send_modify(|value| *value = value.wrapping_add(1));
}
