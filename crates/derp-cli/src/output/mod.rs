//! Terminal presentation helpers.

pub mod spinner;

pub use spinner::Spinner;
