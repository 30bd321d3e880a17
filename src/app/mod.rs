//! the command line application
pub mod cli;
pub mod core;
pub mod interactive;
pub mod logging;
pub mod view;

pub use core::B34App;
