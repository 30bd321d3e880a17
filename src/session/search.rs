//! the active query, its results and pagination
use {
    crate::{
        error::*,
        models::{Modifier, Post, Tag, TagWithModifier},
        query::parse_tags,
        session::api::SearchApi,
        store::results::ResultsState,
    },
    hashbrown::HashSet,
    std::sync::Arc,
    tracing::{debug, error, info, instrument},
};

/// what the results area is showing
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PostsState {
    /// no results yet
    #[default]
    Loading,
    /// results, possibly empty
    Loaded(Vec<Post>),
    /// the last search failed
    Failed(String),
}

impl PostsState {
    /// the loaded posts, if any
    pub fn posts(&self) -> &[Post] {
        match self {
            Self::Loaded(posts) => posts,
            _ => &[],
        }
    }
}

/// how a load-more attempt went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// this many new posts were appended
    Appended(usize),
    /// the page held nothing new, there is nothing more to load
    End,
    /// nothing to extend, or already at the end
    Skipped,
    /// the request failed
    Failed,
}

/// append the posts from `page` that aren't in `existing` yet, returning how many were added
pub fn merge_unseen(existing: &mut Vec<Post>, page: Vec<Post>) -> usize {
    let mut seen: HashSet<u64> = existing.iter().map(|p| p.id).collect();
    let before = existing.len();

    existing.extend(page.into_iter().filter(|p| seen.insert(p.id)));
    existing.len() - before
}

/// a search session
pub struct SearchSession {
    /// where posts come from
    api: Arc<dyn SearchApi>,
    /// the active query
    tags: Vec<TagWithModifier>,
    /// blocked content from the preferences
    blocked: Vec<String>,
    /// the results area
    posts: PostsState,
    /// total matches reported by the last page fetched
    total: u64,
    /// the last page fetched
    pid: u32,
    /// set once a page brings nothing new
    is_end: bool,
}

impl SearchSession {
    /// an empty session
    pub fn new(api: Arc<dyn SearchApi>, blocked: Vec<String>) -> Self {
        Self {
            api,
            tags: Vec::new(),
            blocked,
            posts: PostsState::Loading,
            total: 0,
            pid: 0,
            is_end: false,
        }
    }

    /// pick up persisted results
    pub fn restore(&mut self, state: &ResultsState) {
        self.tags = state.tags.clone();
        self.total = state.total_posts;
        self.posts = match &state.posts {
            Some(posts) => PostsState::Loaded(posts.clone()),
            None => PostsState::Loading,
        };
    }

    /// the persistable part of the session
    pub fn snapshot(&self) -> ResultsState {
        ResultsState {
            tags: self.tags.clone(),
            posts: match &self.posts {
                PostsState::Loaded(posts) => Some(posts.clone()),
                _ => None,
            },
            total_posts: self.total,
        }
    }

    /// whether a search should run right after hydration
    pub fn needs_search(&self) -> bool {
        self.posts.posts().is_empty()
    }

    /// the active tags
    pub fn tags(&self) -> &[TagWithModifier] {
        &self.tags
    }

    /// the results
    pub fn posts(&self) -> &PostsState {
        &self.posts
    }

    /// the total reported by the last page fetched
    pub fn total(&self) -> u64 {
        self.total
    }

    /// the last page fetched
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// whether load-more has run out
    pub fn is_end(&self) -> bool {
        self.is_end
    }

    /// add a tag unless one with the same label is already active
    pub fn add_tag(&mut self, tag: TagWithModifier) -> bool {
        if self.tags.iter().any(|t| t.label() == tag.label()) {
            debug!(label = tag.label(), "tag already active");
            return false;
        }

        self.tags.push(tag);
        true
    }

    /// remove the tag with this label
    pub fn remove_tag(&mut self, label: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.label() != label);
        self.tags.len() != before
    }

    /// change the modifier of an active tag
    pub fn set_modifier(&mut self, label: &str, modifier: Modifier) -> bool {
        match self.tags.iter_mut().find(|t| t.label() == label) {
            Some(tag) => {
                tag.modifier = modifier;
                true
            }
            None => false,
        }
    }

    /// remove the tag if it's active, otherwise add it as required
    pub fn toggle_tag(&mut self, tag: Tag) {
        if !self.remove_tag(&tag.label) {
            self.tags.push(TagWithModifier::new(tag, Modifier::Include));
        }
    }

    /// the modifier-prefixed strings sent to the api
    pub fn query(&self) -> Vec<String> {
        parse_tags(&self.tags, &self.blocked)
    }

    /// run the query from the first page, replacing the results
    #[instrument(skip(self), fields(tags = self.tags.len()))]
    pub async fn search(&mut self) -> Result<()> {
        self.posts = PostsState::Loading;
        self.pid = 0;
        self.is_end = false;

        match self.api.search(&self.query(), None).await {
            Ok(page) => {
                info!(count = page.data.len(), total = page.total, "search finished");
                self.total = page.total;
                self.posts = PostsState::Loaded(page.data);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "search failed");
                self.total = 0;
                self.posts = PostsState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// fetch the next page and append whatever hasn't been seen yet
    #[instrument(skip(self), fields(pid = self.pid))]
    pub async fn load_more(&mut self) -> LoadMore {
        if self.is_end {
            return LoadMore::Skipped;
        }

        let PostsState::Loaded(posts) = &self.posts else {
            return LoadMore::Skipped;
        };
        if posts.is_empty() {
            return LoadMore::Skipped;
        }

        let next = self.pid + 1;
        let page = match self.api.search(&self.query(), Some(next)).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, pid = next, "loading more posts failed");
                self.total = 0;
                self.posts = PostsState::Failed(e.to_string());
                return LoadMore::Failed;
            }
        };

        let PostsState::Loaded(posts) = &mut self.posts else {
            return LoadMore::Skipped;
        };
        let added = merge_unseen(posts, page.data);
        self.total = page.total;

        if added == 0 {
            debug!(pid = next, "no unseen posts, reached the end");
            self.is_end = true;
            return LoadMore::End;
        }

        self.pid = next;
        LoadMore::Appended(added)
    }
}
