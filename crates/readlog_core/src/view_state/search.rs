use crate::books_api::client::BookSearch;
use crate::books_api::types::Volume;
use core::sync::atomic::{AtomicU64, Ordering};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub results: Vec<Volume>,
    pub is_loading: bool,
    /// The query of the most recent search
    pub query: String,
}

/// State of the search screen. Only the most recent search may publish its results.
pub struct SearchViewState {
    search: Arc<dyn BookSearch>,
    generation: AtomicU64,
    state: watch::Sender<SearchState>,
}

impl SearchViewState {
    #[inline]
    #[must_use]
    pub fn new(search: Arc<dyn BookSearch>) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            search,
            generation: AtomicU64::new(0),
            state,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Runs a search. A blank query clears the results without contacting the catalog, a failed
    /// search shows no results.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Async fn with a remote call, inlining gains nothing"
    )]
    pub async fn search(&self, query: &str) {
        let generation = self
            .generation
            .fetch_add(1, Ordering::SeqCst)
            .wrapping_add(1);
        let query_text = query.to_owned();

        if query.trim().is_empty() {
            self.state.send_modify(|state| {
                state.results.clear();
                state.is_loading = false;
                state.query = query_text;
            });
            return;
        }

        self.state.send_modify(|state| {
            state.is_loading = true;
            state.query = query_text;
        });

        let results = self.search.search(query).await.unwrap_or_else(|err| {
            warn!("Search for '{query}' failed: {err}");
            Vec::new()
        });

        if self.generation.load(Ordering::SeqCst) != generation {
            info!("Dropping results of superseded search '{query}'");
            return;
        }
        self.state.send_modify(|state| {
            state.results = results;
            state.is_loading = false;
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
    use crate::view_state::tests::StubSearch;
    use pretty_assertions::assert_eq;

    fn titles(state: &SearchState) -> Vec<&str> {
        state
            .results
            .iter()
            .map(|volume| volume.volume_info.title.as_str())
            .collect()
    }

    #[tokio::test]
    async fn results_replace_previous_ones() {
        let view = SearchViewState::new(Arc::new(StubSearch::default()));
        view.search("Dune").await;
        assert_eq!(titles(&view.state()), vec!["Dune"]);
        assert!(!view.state().is_loading);

        view.search("Hyperion").await;
        let state = view.state();
        assert_eq!(titles(&state), vec!["Hyperion"]);
        assert_eq!(state.query, "Hyperion");
    }

    #[tokio::test]
    async fn blank_query_clears_without_a_call() {
        let stub = Arc::new(StubSearch::default());
        let search = Arc::clone(&stub);
        let view = SearchViewState::new(search);
        view.search("Dune").await;
        view.search("   ").await;

        assert!(view.state().results.is_empty());
        assert_eq!(*stub.calls.lock(), vec!["Dune".to_owned()]);
    }

    #[tokio::test]
    async fn failure_shows_no_results() {
        let view = SearchViewState::new(Arc::new(StubSearch::default()));
        view.search("Dune").await;
        view.search("broken").await;

        let state = view.state();
        assert!(state.results.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn superseded_result_is_not_displayed() {
        let stub = Arc::new(StubSearch::default());
        let search = Arc::clone(&stub);
        let view = Arc::new(SearchViewState::new(search));

        let slow = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.search("slow").await }
        });
        stub.started.notified().await;
        assert!(view.state().is_loading);

        view.search("fast").await;
        stub.release.notify_one();
        slow.await.unwrap();

        let state = view.state();
        assert_eq!(titles(&state), vec!["fast"]);
        assert_eq!(state.query, "fast");
    }
}
