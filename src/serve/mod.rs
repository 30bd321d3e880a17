//! the relay: autocompletion, search and a media proxy behind one origin
pub mod cfg;
pub mod responses;
pub mod routes;
pub mod server;
