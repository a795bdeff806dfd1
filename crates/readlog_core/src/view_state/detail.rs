use crate::auth::session::Session;
use crate::books_api::types::Volume;
use crate::database::store::RecordStore;
use crate::database::types::BookRecord;
use crate::view_state::NOT_SIGNED_IN;
use chrono::{Local, NaiveDate};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of the last save, shown once and then cleared
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Success,
    Error(String),
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailState {
    pub save_status: Option<SaveStatus>,
}

/// State of the book detail screen, which saves a search result to the user's list
pub struct BookDetailViewState {
    store: Arc<dyn RecordStore>,
    session: Arc<Session>,
    state: watch::Sender<DetailState>,
}

impl BookDetailViewState {
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            store,
            session,
            state,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    /// Saves `volume` to the signed-in user's list, registered today
    #[inline]
    pub async fn save(&self, volume: &Volume) {
        self.save_on(volume, Local::now().date_naive()).await;
    }

    /// Saves `volume` with an explicit registration date
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn save_on(&self, volume: &Volume, reg_date: NaiveDate) {
        let Some(user_id) = self.session.current_user_id() else {
            self.set_status(SaveStatus::Error(NOT_SIGNED_IN.to_owned()));
            return;
        };

        let record = BookRecord::from_volume(volume, &user_id, reg_date);
        let status = match self.store.insert(&record).await {
            Ok(()) => {
                info!("Saved book {} for user {user_id}", record.book_id);
                SaveStatus::Success
            }
            Err(err) => {
                error!("Failed to save book {}: {err}", record.book_id);
                SaveStatus::Error(format!("Failed to save book: {err}"))
            }
        };
        self.set_status(status);
    }

    #[inline]
    pub fn clear_save_status(&self) {
        self.state.send_modify(|state| state.save_status = None);
    }

    fn set_status(&self, status: SaveStatus) {
        self.state
            .send_modify(|state| state.save_status = Some(status));
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
    use crate::database::queries::Db;
    use crate::view_state::search::SearchViewState;
    use crate::view_state::tests::{FailingStore, StubSearch};
    use pretty_assertions::assert_eq;

    fn session(user_id: Option<&str>) -> Arc<Session> {
        Arc::new(Session::new(StubProvider::signed_in_as(user_id)))
    }

    #[tokio::test]
    async fn searched_volume_is_saved_once_for_today() {
        let store = Arc::new(Db::init_in_memory().await.unwrap());
        let search = SearchViewState::new(Arc::new(StubSearch::default()));
        search.search("Dune").await;
        let volume = search.state().results.first().cloned().unwrap();

        let detail = BookDetailViewState::new(Arc::clone(&store) as _, session(Some("alice")));
        detail.save(&volume).await;
        assert_eq!(detail.state().save_status, Some(SaveStatus::Success));

        let records = store.list_records("alice").await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.book_id, "X");
        assert_eq!(record.reg_date, Local::now().date_naive());
        assert_eq!(record.impressive_quote, None);
        assert_eq!(record.motivation, None);
        assert_eq!(record.thoughts, None);
        assert_eq!(record.read_start_date, None);
        assert_eq!(record.read_end_date, None);
    }

    #[tokio::test]
    async fn saving_requires_a_user() {
        let store = Arc::new(InMemoryRecordStore::default());
        let detail = BookDetailViewState::new(Arc::clone(&store) as _, session(None));
        detail
            .save(&Volume::new("X".to_owned(), "Dune".to_owned()))
            .await;

        assert_eq!(
            detail.state().save_status,
            Some(SaveStatus::Error(NOT_SIGNED_IN.to_owned()))
        );
        assert!(store.list_records("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_becomes_status_and_clears() {
        let detail =
            BookDetailViewState::new(Arc::new(FailingStore::default()), session(Some("alice")));
        detail
            .save(&Volume::new("X".to_owned(), "Dune".to_owned()))
            .await;
        let Some(SaveStatus::Error(message)) = detail.state().save_status else {
            panic!("expected an error status");
        };
        assert!(message.starts_with("Failed to save book"));

        detail.clear_save_status();
        assert_eq!(detail.state(), DetailState::default());
    }
}
