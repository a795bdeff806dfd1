use crate::auth::session::Session;
use crate::database::store::RecordStore;
use crate::database::types::{BookRecord, EditTarget};
use crate::view_state::NOT_SIGNED_IN;
use chrono::NaiveDate;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordState {
    /// The record being edited, `None` until loaded or if the user never saved the book
    pub record: Option<BookRecord>,
    /// Message of the last failed operation
    pub status: Option<String>,
}

/// State of the record screen, where quote, motivation, thoughts and the reading period of one
/// saved book are edited. Failures never replace the displayed record.
pub struct RecordViewState {
    store: Arc<dyn RecordStore>,
    session: Arc<Session>,
    state: watch::Sender<RecordState>,
}

impl RecordViewState {
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(RecordState::default());
        Self {
            store,
            session,
            state,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> RecordState {
        self.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RecordState> {
        self.state.subscribe()
    }

    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn load(&self, book_id: &str) {
        let Some(user_id) = self.session.current_user_id() else {
            self.set_status(NOT_SIGNED_IN.to_owned());
            return;
        };

        match self.store.get_by_id(book_id, &user_id).await {
            Ok(Some(record)) => self.state.send_modify(|state| {
                state.record = Some(record);
                state.status = None;
            }),
            Ok(None) => {
                warn!("No record of book {book_id} for user {user_id}");
                self.state.send_modify(|state| {
                    state.record = None;
                    state.status = Some(format!("Book {book_id} is not in your list"));
                });
            }
            Err(err) => {
                error!("Failed to load book {book_id}: {err}");
                self.set_status(format!("Failed to load book: {err}"));
            }
        }
    }

    /// Writes `record` to the store and displays it
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn update(&self, record: BookRecord) {
        match self.store.update(&record).await {
            Ok(()) => {
                info!("Updated book {}", record.book_id);
                self.state.send_modify(|state| {
                    state.record = Some(record);
                    state.status = None;
                });
            }
            Err(err) => {
                error!("Failed to update book {}: {err}", record.book_id);
                self.set_status(format!("Failed to update book: {err}"));
            }
        }
    }

    /// Replaces one free-text field of the loaded record, blank text clears it
    #[inline]
    pub async fn edit_text(&self, target: EditTarget, text: &str) {
        let Some(mut record) = self.loaded() else {
            return;
        };
        record.apply_text(target, text);
        self.update(record).await;
    }

    #[inline]
    pub async fn set_read_period(&self, start: NaiveDate, end: Option<NaiveDate>) {
        let Some(mut record) = self.loaded() else {
            return;
        };
        match record.set_read_period(start, end) {
            Ok(()) => self.update(record).await,
            Err(err) => self.set_status(err.to_string()),
        }
    }

    #[inline]
    pub async fn clear_read_period(&self) {
        let Some(mut record) = self.loaded() else {
            return;
        };
        record.clear_read_period();
        self.update(record).await;
    }

    /// A copy of the loaded record to edit, sets `status` if nothing is loaded
    fn loaded(&self) -> Option<BookRecord> {
        let record = self.state.borrow().record.clone();
        if record.is_none() {
            self.set_status("No book loaded".to_owned());
        }
        record
    }

    fn set_status(&self, status: String) {
        self.state.send_modify(|state| state.status = Some(status));
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
    use crate::database::queries::Db;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    async fn saved_dune() -> (Arc<Db>, RecordViewState) {
        let store = Arc::new(Db::init_in_memory().await.unwrap());
        store
            .insert(&BookRecord::new(
                "X".to_owned(),
                "alice".to_owned(),
                "Dune".to_owned(),
                Some("Frank Herbert".to_owned()),
                None,
                date(2024, 1, 1),
            ))
            .await
            .unwrap();
        let session = Arc::new(Session::new(StubProvider::signed_in_as(Some("alice"))));
        let view = RecordViewState::new(Arc::clone(&store) as _, session);
        (store, view)
    }

    #[tokio::test]
    async fn loads_own_record() {
        let (_store, view) = saved_dune().await;
        view.load("X").await;
        let state = view.state();
        assert_eq!(state.record.unwrap().title, "Dune");
        assert_eq!(state.status, None);

        view.load("missing").await;
        let state = view.state();
        assert_eq!(state.record, None);
        assert!(state.status.is_some());
    }

    #[tokio::test]
    async fn text_edits_are_persisted() {
        let (store, view) = saved_dune().await;
        view.load("X").await;
        view.edit_text(EditTarget::ImpressiveQuote, "Fear is the mind-killer.")
            .await;
        view.edit_text(EditTarget::Thoughts, "Dense but rewarding").await;

        let stored = store.get_by_id("X", "alice").await.unwrap().unwrap();
        assert_eq!(
            stored.impressive_quote.as_deref(),
            Some("Fear is the mind-killer.")
        );
        assert_eq!(stored.thoughts.as_deref(), Some("Dense but rewarding"));
        assert_eq!(view.state().record, Some(stored));

        view.edit_text(EditTarget::Thoughts, "").await;
        let stored = store.get_by_id("X", "alice").await.unwrap().unwrap();
        assert_eq!(stored.thoughts, None);
    }

    #[tokio::test]
    async fn reversed_period_is_rejected_and_not_stored() {
        let (store, view) = saved_dune().await;
        view.load("X").await;
        view.set_read_period(date(2024, 1, 15), Some(date(2024, 1, 10)))
            .await;

        let state = view.state();
        assert!(state.status.is_some());
        assert_eq!(state.record.unwrap().read_start_date, None);
        let stored = store.get_by_id("X", "alice").await.unwrap().unwrap();
        assert_eq!(stored.read_start_date, None);
        assert_eq!(stored.read_end_date, None);
    }

    #[tokio::test]
    async fn period_can_be_set_and_cleared() {
        let (store, view) = saved_dune().await;
        view.load("X").await;
        view.set_read_period(date(2024, 1, 10), Some(date(2024, 1, 15)))
            .await;
        let stored = store.get_by_id("X", "alice").await.unwrap().unwrap();
        assert_eq!(stored.read_start_date, Some(date(2024, 1, 10)));
        assert_eq!(stored.read_end_date, Some(date(2024, 1, 15)));

        view.clear_read_period().await;
        let stored = store.get_by_id("X", "alice").await.unwrap().unwrap();
        assert_eq!(stored.read_start_date, None);
        assert_eq!(stored.read_end_date, None);
    }

    #[tokio::test]
    async fn update_of_deleted_record_keeps_displayed_one() {
        let (store, view) = saved_dune().await;
        view.load("X").await;
        let shown = view.state().record.unwrap();
        store.delete(&shown).await.unwrap();

        view.edit_text(EditTarget::Motivation, "Saw the film").await;
        let state = view.state();
        assert_eq!(state.record, Some(shown));
        assert!(state.status.unwrap().starts_with("Failed to update book"));
    }

    #[tokio::test]
    async fn edits_need_a_loaded_record() {
        let (_store, view) = saved_dune().await;
        view.edit_text(EditTarget::Thoughts, "anything").await;
        assert_eq!(view.state().status.as_deref(), Some("No book loaded"));
    }
}
