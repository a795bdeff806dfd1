use crate::auth::session::Session;
use crate::database::store::RecordStore;
use crate::database::types::BookRecord;
use crate::sorting::{SortOrder, filter_records, sort_records};
use crate::view_state::{NOT_IN_LIST, NOT_SIGNED_IN};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStatus {
    Success,
    Error(String),
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeState {
    /// The user's records, filtered and in display order
    pub books: Vec<BookRecord>,
    pub sort_order: SortOrder,
    pub filter: String,
    pub is_loading: bool,
    pub delete_status: Option<DeleteStatus>,
    /// Set when the last listing failed
    pub error: Option<String>,
}

/// State of the home screen, the user's book list
pub struct HomeViewState {
    store: Arc<dyn RecordStore>,
    session: Arc<Session>,
    /// The last listing in store order, before sorting and filtering
    records: parking_lot::Mutex<Vec<BookRecord>>,
    state: watch::Sender<HomeState>,
}

impl HomeViewState {
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(HomeState::default());
        Self {
            store,
            session,
            records: parking_lot::Mutex::new(Vec::new()),
            state,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> HomeState {
        self.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HomeState> {
        self.state.subscribe()
    }

    /// Lists the signed-in user's records. Without a user the list is empty. A failed listing
    /// keeps the previous list and sets `error`.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn load(&self) {
        let Some(user_id) = self.session.current_user_id() else {
            self.records.lock().clear();
            self.state.send_modify(|state| {
                state.is_loading = false;
                state.error = None;
            });
            self.publish();
            return;
        };

        self.state.send_modify(|state| state.is_loading = true);
        match self.store.list_records(&user_id).await {
            Ok(records) => {
                info!("Loaded {} books for user {user_id}", records.len());
                *self.records.lock() = records;
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = None;
                });
                self.publish();
            }
            Err(err) => {
                error!("Failed to load books for user {user_id}: {err}");
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(format!("Failed to load books: {err}"));
                });
            }
        }
    }

    #[inline]
    pub fn set_sort_order(&self, order: SortOrder) {
        self.state.send_modify(|state| state.sort_order = order);
        self.publish();
    }

    #[inline]
    pub fn set_filter(&self, filter: &str) {
        let filter = filter.to_owned();
        self.state.send_modify(|state| state.filter = filter);
        self.publish();
    }

    /// Deletes a record and reloads the list
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn delete(&self, record: &BookRecord) {
        let status = match self.session.current_user_id() {
            None => DeleteStatus::Error(NOT_SIGNED_IN.to_owned()),
            Some(user_id) if user_id != record.user_id => {
                DeleteStatus::Error(NOT_IN_LIST.to_owned())
            }
            Some(_) => match self.store.delete(record).await {
                Ok(()) => {
                    info!("Deleted book {}", record.book_id);
                    DeleteStatus::Success
                }
                Err(err) => {
                    error!("Failed to delete book {}: {err}", record.book_id);
                    DeleteStatus::Error(format!("Failed to delete book: {err}"))
                }
            },
        };
        self.state
            .send_modify(|state| state.delete_status = Some(status));
        self.load().await;
    }

    #[inline]
    pub fn clear_delete_status(&self) {
        self.state.send_modify(|state| state.delete_status = None);
    }

    /// Waits until the store reports a write, then reloads. Returns `false` once the store is
    /// gone and no further changes can arrive.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn refresh_on_change(&self, changes: &mut watch::Receiver<u64>) -> bool {
        if changes.changed().await.is_err() {
            return false;
        }
        self.load().await;
        true
    }

    /// Recomputes the displayed list from the last listing
    fn publish(&self) {
        let records = self.records.lock().clone();
        self.state.send_modify(|state| {
            let mut books = filter_records(records, &state.filter);
            sort_records(&mut books, state.sort_order);
            state.books = books;
        });
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use crate::auth::session::tests::StubProvider;
    use crate::database::in_memory::InMemoryRecordStore;
    use crate::view_state::tests::FailingStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(book_id: &str, user_id: &str, title: &str, day: u32) -> BookRecord {
        BookRecord::new(
            book_id.to_owned(),
            user_id.to_owned(),
            title.to_owned(),
            None,
            None,
            NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
        )
    }

    fn ids(state: &HomeState) -> Vec<&str> {
        state
            .books
            .iter()
            .map(|book| book.book_id.as_str())
            .collect()
    }

    async fn seeded_store() -> Arc<InMemoryRecordStore> {
        let store = Arc::new(InMemoryRecordStore::default());
        for book in [
            record("a", "alice", "Hyperion", 1),
            record("b", "alice", "Dune", 3),
            record("c", "alice", "Neuromancer", 2),
            record("z", "bob", "Solaris", 9),
        ] {
            store.insert(&book).await.unwrap();
        }
        store
    }

    fn home(store: Arc<dyn RecordStore>, user_id: Option<&str>) -> HomeViewState {
        HomeViewState::new(
            store,
            Arc::new(Session::new(StubProvider::signed_in_as(user_id))),
        )
    }

    #[tokio::test]
    async fn empty_store_shows_empty_list_without_error() {
        let view = home(Arc::new(InMemoryRecordStore::default()), Some("alice"));
        view.load().await;
        assert_eq!(view.state(), HomeState::default());
    }

    #[tokio::test]
    async fn no_user_shows_empty_list() {
        let view = home(seeded_store().await, None);
        view.load().await;
        let state = view.state();
        assert!(state.books.is_empty());
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn lists_only_own_books_newest_first() {
        let view = home(seeded_store().await, Some("alice"));
        view.load().await;
        assert_eq!(ids(&view.state()), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn sort_and_filter_apply_to_loaded_list() {
        let view = home(seeded_store().await, Some("alice"));
        view.load().await;

        view.set_sort_order(SortOrder::TitleAsc);
        assert_eq!(ids(&view.state()), vec!["b", "a", "c"]);

        view.set_filter("n");
        assert_eq!(ids(&view.state()), vec!["b", "a", "c"]);
        view.set_filter("hyper");
        assert_eq!(ids(&view.state()), vec!["a"]);
        view.set_filter("");
        view.set_sort_order(SortOrder::OldestFirst);
        assert_eq!(ids(&view.state()), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn delete_reloads_list() {
        let store = seeded_store().await;
        let view = home(Arc::clone(&store) as _, Some("alice"));
        view.load().await;

        let dune = view.state().books[0].clone();
        view.delete(&dune).await;
        let state = view.state();
        assert_eq!(state.delete_status, Some(DeleteStatus::Success));
        assert_eq!(ids(&state), vec!["c", "a"]);
        assert_eq!(store.get_by_id("b", "alice").await.unwrap(), None);

        view.clear_delete_status();
        assert_eq!(view.state().delete_status, None);
    }

    #[tokio::test]
    async fn cannot_delete_other_users_record() {
        let store = seeded_store().await;
        let view = home(Arc::clone(&store) as _, Some("alice"));
        view.delete(&record("z", "bob", "Solaris", 9)).await;
        assert_eq!(
            view.state().delete_status,
            Some(DeleteStatus::Error("This book is not in your list".to_owned()))
        );
        assert!(store.get_by_id("z", "bob").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_without_user_reports_sign_in() {
        let store = seeded_store().await;
        let view = home(Arc::clone(&store) as _, None);
        view.delete(&record("a", "alice", "Hyperion", 1)).await;
        assert_eq!(
            view.state().delete_status,
            Some(DeleteStatus::Error("Not signed in".to_owned()))
        );
        assert!(store.get_by_id("a", "alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_listing_sets_error() {
        let view = home(Arc::new(FailingStore::default()), Some("alice"));
        view.load().await;
        let state = view.state();
        assert!(state.books.is_empty());
        assert!(!state.is_loading);
        assert!(state.error.unwrap().starts_with("Failed to load books"));
    }

    #[tokio::test]
    async fn store_writes_trigger_refresh() {
        let store = seeded_store().await;
        let view = home(Arc::clone(&store) as _, Some("alice"));
        view.load().await;
        let mut changes = store.changes();

        store
            .insert(&record("d", "alice", "Solaris", 4))
            .await
            .unwrap();
        assert!(view.refresh_on_change(&mut changes).await);
        assert_eq!(ids(&view.state()), vec!["d", "b", "c", "a"]);
    }
}
