//! the last search, kept so a restart picks up where it left off
use {
    crate::{
        error::*,
        models::{Post, TagWithModifier},
        store::{PersistedStore, StateStorage},
    },
    serde::{Deserialize, Serialize},
    std::sync::Arc,
};

/// the name results are persisted under
pub const RESULTS_STORAGE: &str = "results-storage";

/// persisted search results
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultsState {
    /// the active query
    pub tags: Vec<TagWithModifier>,
    /// the accumulated posts, `None` until a search has finished
    pub posts: Option<Vec<Post>>,
    /// the total reported by the last search
    pub total_posts: u64,
}

/// the results store
pub type ResultsStore = PersistedStore<ResultsState>;

impl PersistedStore<ResultsState> {
    /// load the results from storage
    pub fn open(storage: Arc<dyn StateStorage>) -> Result<Self> {
        Self::load(RESULTS_STORAGE, storage)
    }

    /// replace the active query
    pub fn set_tags(&mut self, tags: Vec<TagWithModifier>) -> Result<()> {
        self.update(|r| r.tags = tags)
    }

    /// replace the accumulated posts
    pub fn set_posts(&mut self, posts: Option<Vec<Post>>) -> Result<()> {
        self.update(|r| r.posts = posts)
    }

    /// replace the total
    pub fn set_total_posts(&mut self, total: u64) -> Result<()> {
        self.update(|r| r.total_posts = total)
    }
}
