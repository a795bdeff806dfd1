//! Per-screen view state
//!
//! Each holder owns the state of one screen in a `watch` channel and is its only writer. Readers
//! either take a snapshot through `state()` or follow changes through `subscribe()`. Operations
//! never return errors, failures end up in the state as status strings.
pub mod detail;
pub mod home;
pub mod reading;
pub mod record;
pub mod search;

pub use detail::{BookDetailViewState, DetailState, SaveStatus};
pub use home::{DeleteStatus, HomeState, HomeViewState};
pub use reading::{ReadingState, ReadingViewState};
pub use record::{RecordState, RecordViewState};
pub use search::{SearchState, SearchViewState};

/// Status line for operations that need a signed-in user
pub const NOT_SIGNED_IN: &str = "Not signed in";
/// Status line for records that belong to a different user
pub const NOT_IN_LIST: &str = "This book is not in your list";

#[cfg(test)]
pub(crate) mod tests {
    use crate::books_api::errors::BooksApiError;
    use crate::books_api::types::Volume;
    use crate::books_api::client::BookSearch;
    use crate::database::store::RecordStore;
    use crate::database::types::{BookRecord, RecordError};
    use tokio::sync::{Notify, watch};

    /// Returns one volume per query, titled after the query. The query `slow` blocks until
    /// `release` is notified, `broken` fails.
    #[derive(Default)]
    pub(crate) struct StubSearch {
        pub(crate) started: Notify,
        pub(crate) release: Notify,
        pub(crate) calls: parking_lot::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl BookSearch for StubSearch {
        async fn search(&self, query: &str) -> Result<Vec<Volume>, BooksApiError> {
            self.calls.lock().push(query.to_owned());
            match query {
                "broken" => Err(BooksApiError::Status {
                    status: 503,
                    body: "backend unavailable".to_owned(),
                }),
                "slow" => {
                    self.started.notify_one();
                    self.release.notified().await;
                    Ok(vec![Volume::new("slow-id".to_owned(), "slow".to_owned())])
                }
                "Dune" => Ok(vec![Volume::new("X".to_owned(), "Dune".to_owned())]),
                other => Ok(vec![Volume::new(format!("{other}-id"), other.to_owned())]),
            }
        }
    }

    /// A store where every operation fails
    pub(crate) struct FailingStore {
        revision: watch::Sender<u64>,
    }

    impl Default for FailingStore {
        fn default() -> Self {
            let (revision, _) = watch::channel(0);
            Self { revision }
        }
    }

    fn unavailable() -> RecordError {
        RecordError::Db(sqlx::Error::PoolClosed)
    }

    #[async_trait::async_trait]
    impl RecordStore for FailingStore {
        async fn list_records(&self, _user_id: &str) -> Result<Vec<BookRecord>, RecordError> {
            Err(unavailable())
        }

        async fn get_by_id(
            &self,
            _book_id: &str,
            _user_id: &str,
        ) -> Result<Option<BookRecord>, RecordError> {
            Err(unavailable())
        }

        async fn insert(&self, _record: &BookRecord) -> Result<(), RecordError> {
            Err(unavailable())
        }

        async fn update(&self, _record: &BookRecord) -> Result<(), RecordError> {
            Err(unavailable())
        }

        async fn delete(&self, _record: &BookRecord) -> Result<(), RecordError> {
            Err(unavailable())
        }

        fn changes(&self) -> watch::Receiver<u64> {
            self.revision.subscribe()
        }
    }
}
