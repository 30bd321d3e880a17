//! base34 is a tag search client and same-origin media relay for rule34-style boorus
#![forbid(
    clippy::missing_docs_in_private_items,
    missing_docs,
    rustdoc::missing_crate_level_docs
)]

pub mod macros;

#[cfg(all(feature = "cli", feature = "server"))]
pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
#[cfg(feature = "server")]
pub mod serve;
pub mod session;
pub mod store;
pub mod utils;
