use crate::auth::session::Session;
use crate::calendar::{CalendarDay, calendar_grid, shift_month};
use crate::database::store::RecordStore;
use crate::database::types::BookRecord;
use chrono::{Local, NaiveDate};
use log::{error, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingState {
    pub books: Vec<BookRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Any day of the displayed month
    pub current_date: NaiveDate,
    pub calendar_days: Vec<CalendarDay>,
}

impl ReadingState {
    fn new(current_date: NaiveDate) -> Self {
        Self {
            books: Vec::new(),
            is_loading: false,
            error: None,
            current_date,
            calendar_days: calendar_grid(current_date, &[]),
        }
    }

    fn recompute(&mut self) {
        self.calendar_days = calendar_grid(self.current_date, &self.books);
    }
}

/// State of the reading calendar, one month of the user's reading periods
pub struct ReadingViewState {
    store: Arc<dyn RecordStore>,
    session: Arc<Session>,
    state: watch::Sender<ReadingState>,
}

impl ReadingViewState {
    /// Starts on the current month
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, session: Arc<Session>) -> Self {
        Self::starting_at(store, session, Local::now().date_naive())
    }

    #[inline]
    #[must_use]
    pub fn starting_at(
        store: Arc<dyn RecordStore>,
        session: Arc<Session>,
        current_date: NaiveDate,
    ) -> Self {
        let (state, _) = watch::channel(ReadingState::new(current_date));
        Self {
            store,
            session,
            state,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ReadingState {
        self.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReadingState> {
        self.state.subscribe()
    }

    /// Fetches the user's records and marks their reading periods
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a database call, inlining gains nothing"
    )]
    pub async fn load(&self) {
        let Some(user_id) = self.session.current_user_id() else {
            self.state.send_modify(|state| {
                state.books.clear();
                state.is_loading = false;
                state.recompute();
            });
            return;
        };

        self.state.send_modify(|state| state.is_loading = true);
        match self.store.list_records(&user_id).await {
            Ok(books) => self.state.send_modify(|state| {
                state.books = books;
                state.is_loading = false;
                state.error = None;
                state.recompute();
            }),
            Err(err) => {
                error!("Failed to load books for user {user_id}: {err}");
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(format!("Failed to load books: {err}"));
                });
            }
        }
    }

    /// Moves the displayed month by `delta` months
    #[inline]
    pub fn update_month(&self, delta: i32) {
        self.state.send_modify(|state| {
            match shift_month(state.current_date, delta) {
                Some(date) => state.current_date = date,
                None => warn!("Cannot move calendar by {delta} months"),
            }
            state.recompute();
        });
    }

    #[inline]
    pub fn set_current_date(&self, date: NaiveDate) {
        self.state.send_modify(|state| {
            state.current_date = date;
            state.recompute();
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
    use crate::calendar::month_label;
    use crate::database::in_memory::InMemoryRecordStore;
    use crate::view_state::tests::FailingStore;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn marked_days(state: &ReadingState) -> Vec<u32> {
        state
            .calendar_days
            .iter()
            .filter(|day| day.has_reading && day.is_current_month)
            .map(|day| day.day)
            .collect()
    }

    async fn view_with_reading(user_id: Option<&str>) -> ReadingViewState {
        let store = Arc::new(InMemoryRecordStore::default());
        let mut record = BookRecord::new(
            "X".to_owned(),
            "alice".to_owned(),
            "Dune".to_owned(),
            None,
            None,
            date(2024, 1, 1),
        );
        record
            .set_read_period(date(2024, 1, 10), Some(date(2024, 1, 15)))
            .unwrap();
        store.insert(&record).await.unwrap();

        let session = Arc::new(Session::new(StubProvider::signed_in_as(user_id)));
        ReadingViewState::starting_at(store, session, date(2024, 1, 20))
    }

    #[tokio::test]
    async fn loaded_periods_are_marked() {
        let view = view_with_reading(Some("alice")).await;
        assert!(marked_days(&view.state()).is_empty());

        view.load().await;
        let state = view.state();
        assert_eq!(state.books.len(), 1);
        assert_eq!(state.calendar_days.len(), 42);
        assert_eq!(marked_days(&state), vec![10, 11, 12, 13, 14, 15]);
    }

    #[tokio::test]
    async fn changing_month_recomputes_grid() {
        let view = view_with_reading(Some("alice")).await;
        view.load().await;

        view.update_month(1);
        let state = view.state();
        assert_eq!(month_label(state.current_date), "2024/02");
        assert!(marked_days(&state).is_empty());

        view.update_month(-1);
        assert_eq!(marked_days(&view.state()), vec![10, 11, 12, 13, 14, 15]);

        view.set_current_date(date(2023, 12, 5));
        let state = view.state();
        assert_eq!(month_label(state.current_date), "2023/12");
        assert_eq!(state.calendar_days.len(), 42);
    }

    #[tokio::test]
    async fn other_users_reading_is_not_shown() {
        let view = view_with_reading(Some("bob")).await;
        view.load().await;
        assert!(view.state().books.is_empty());
        assert!(view.state().calendar_days.iter().all(|day| !day.has_reading));
    }

    #[tokio::test]
    async fn failed_load_sets_error() {
        let session = Arc::new(Session::new(StubProvider::signed_in_as(Some("alice"))));
        let view = ReadingViewState::starting_at(
            Arc::new(FailingStore::default()),
            session,
            date(2024, 1, 1),
        );
        view.load().await;
        let state = view.state();
        assert!(!state.is_loading);
        assert!(state.error.unwrap().starts_with("Failed to load books"));
    }
}
