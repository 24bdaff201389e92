//! Shared CLI helpers.

pub mod logging;

pub use logging::{color_disabled, initialize_logging};
