//! debounced tag suggestions
//!
//! every keystroke supersedes the previous one: the pending request is aborted and a new one is
//! scheduled after the debounce window. results are tagged with the generation that asked for
//! them and dropped if a newer keystroke has arrived since
use {
    crate::{getopt, models::Tag, session::api::SearchApi},
    std::{sync::Arc, time::Duration},
    tokio::{sync::watch, task::JoinHandle},
    tracing::{debug, warn},
};

/// what the suggestion list is showing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Suggestions {
    /// nothing has been asked for
    #[default]
    Idle,
    /// waiting on the debounce window or the request
    Loading,
    /// the request finished without results (or failed)
    Empty,
    /// suggestions to choose from
    Ready(Vec<Tag>),
}

/// the observable state of an [`Autocompleter`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionState {
    /// bumped on every new query
    pub generation: u64,
    /// the suggestions for the latest query
    pub suggestions: Suggestions,
    /// the highlighted entry
    pub selected: usize,
}

impl SuggestionState {
    /// the ready suggestions, if any
    pub fn items(&self) -> &[Tag] {
        match &self.suggestions {
            Suggestions::Ready(items) => items,
            _ => &[],
        }
    }

    /// the highlighted suggestion
    pub fn highlighted(&self) -> Option<&Tag> {
        self.items().get(self.selected)
    }
}

/// fetches suggestions for the latest input, never for stale input
pub struct Autocompleter {
    /// where suggestions come from
    api: Arc<dyn SearchApi>,
    /// how long input has to settle before a lookup
    debounce: Duration,
    /// the published state
    state: Arc<watch::Sender<SuggestionState>>,
    /// the scheduled or in-flight lookup
    pending: Option<JoinHandle<()>>,
}

impl Autocompleter {
    /// a completer with the given debounce window
    pub fn new(api: Arc<dyn SearchApi>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SuggestionState::default());

        Self {
            api,
            debounce,
            state: Arc::new(state),
            pending: None,
        }
    }

    /// a completer using the configured debounce window
    pub fn from_config(api: Arc<dyn SearchApi>) -> Self {
        Self::new(api, Duration::from_millis(getopt!(session.debounce_ms)))
    }

    /// watch the state change
    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state.subscribe()
    }

    /// a copy of the current state
    pub fn snapshot(&self) -> SuggestionState {
        self.state.borrow().clone()
    }

    /// react to the input text changing
    ///
    /// input that is empty after trimming schedules nothing and leaves the current state alone
    pub fn input(&mut self, text: &str) {
        let query = text.trim().to_string();
        if query.is_empty() {
            return;
        }

        self.abort_pending();

        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.suggestions = Suggestions::Loading;
            s.selected = 0;
            generation = s.generation;
        });

        let api = self.api.clone();
        let state = self.state.clone();
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let next = match api.autocomplete(&query).await {
                Ok(tags) if tags.is_empty() => Suggestions::Empty,
                Ok(tags) => Suggestions::Ready(tags),
                Err(e) => {
                    warn!(%query, error = %e, "failed to fetch suggestions");
                    Suggestions::Empty
                }
            };

            state.send_if_modified(|s| {
                if s.generation != generation {
                    debug!(%query, "dropping stale suggestions");
                    return false;
                }

                s.suggestions = next;
                s.selected = 0;
                true
            });
        }));
    }

    /// highlight the next suggestion, wrapping to the first
    pub fn select_next(&mut self) {
        self.state.send_if_modified(|s| {
            let len = s.items().len();
            if len == 0 {
                return false;
            }
            s.selected = (s.selected + 1) % len;
            true
        });
    }

    /// highlight the previous suggestion, wrapping to the last
    pub fn select_prev(&mut self) {
        self.state.send_if_modified(|s| {
            let len = s.items().len();
            if len == 0 {
                return false;
            }
            s.selected = (s.selected + len - 1) % len;
            true
        });
    }

    /// the highlighted suggestion
    pub fn highlighted(&self) -> Option<Tag> {
        self.state.borrow().highlighted().cloned()
    }

    /// the suggestion at `index`
    pub fn get(&self, index: usize) -> Option<Tag> {
        self.state.borrow().items().get(index).cloned()
    }

    /// stop any pending request and go back to idle
    pub fn clear(&mut self) {
        self.abort_pending();
        self.state.send_modify(|s| {
            s.generation += 1;
            s.suggestions = Suggestions::Idle;
            s.selected = 0;
        });
    }

    /// abort the scheduled or in-flight lookup
    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Autocompleter {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::{error::*, models::SearchPage},
        async_trait::async_trait,
        std::sync::Mutex,
    };

    /// answers suggestions with one tag per query, slowly for queries starting with "slow"
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchApi for FakeApi {
        async fn autocomplete(&self, query: &str) -> Result<Vec<Tag>> {
            self.calls.lock().unwrap().push(query.to_string());

            if query.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            match query {
                "nothing" => Ok(Vec::new()),
                "broken" => Err(B34Error::from("boom")),
                _ => Ok(vec![
                    Tag::typed(format!("{} one", query)),
                    Tag::typed(format!("{} two", query)),
                    Tag::typed(format!("{} three", query)),
                ]),
            }
        }

        async fn search(&self, _query: &[String], _pid: Option<u32>) -> Result<SearchPage> {
            Ok(SearchPage::default())
        }
    }

    fn completer() -> (Autocompleter, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::default());
        (
            Autocompleter::new(api.clone(), Duration::from_millis(300)),
            api,
        )
    }

    async fn settled(completer: &Autocompleter) -> SuggestionState {
        let mut rx = completer.subscribe();
        rx.wait_for(|s| !matches!(s.suggestions, Suggestions::Loading))
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_only_fetches_the_last_query() {
        let (mut completer, api) = completer();

        completer.input("c");
        tokio::time::sleep(Duration::from_millis(100)).await;
        completer.input("ca");
        tokio::time::sleep(Duration::from_millis(100)).await;
        completer.input("cat");

        let state = settled(&completer).await;

        assert_eq!(*api.calls.lock().unwrap(), vec!["cat"]);
        assert_eq!(state.items()[0].label, "cat one");
        assert_eq!(state.generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_results_are_superseded() {
        let (mut completer, api) = completer();

        completer.input("slow");
        tokio::time::sleep(Duration::from_millis(400)).await;
        completer.input("fast");

        let state = settled(&completer).await;
        assert_eq!(state.items()[0].label, "fast one");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(completer.snapshot().items()[0].label, "fast one");
        assert_eq!(*api.calls.lock().unwrap(), vec!["slow", "fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_schedules_nothing() {
        let (mut completer, api) = completer();

        completer.input("   ");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(api.calls.lock().unwrap().is_empty());
        assert_eq!(completer.snapshot().suggestions, Suggestions::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_and_failed_lookups_show_empty() {
        let (mut completer, _) = completer();

        completer.input("nothing");
        assert_eq!(settled(&completer).await.suggestions, Suggestions::Empty);

        completer.input("broken");
        assert_eq!(settled(&completer).await.suggestions, Suggestions::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_wraps_around() {
        let (mut completer, _) = completer();
        completer.input("dog");
        settled(&completer).await;

        completer.select_prev();
        assert_eq!(completer.highlighted().unwrap().label, "dog three");

        completer.select_next();
        assert_eq!(completer.highlighted().unwrap().label, "dog one");

        completer.select_next();
        completer.select_next();
        completer.select_next();
        assert_eq!(completer.highlighted().unwrap().label, "dog one");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_lookups() {
        let (mut completer, api) = completer();

        completer.input("cat");
        completer.clear();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(api.calls.lock().unwrap().is_empty());
        assert_eq!(completer.snapshot().suggestions, Suggestions::Idle);
    }
}
