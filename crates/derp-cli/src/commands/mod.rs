//! Command implementations.

pub mod init;
pub mod search;
pub mod show_config;

pub use search::SearchOptions;
