//! client sessions: the tag input, suggestions, and search results
pub mod api;
pub mod autocomplete;
pub mod input;
pub mod search;
