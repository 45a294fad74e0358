//! Utility functions and helpers.
//!
//! - [`error`] - The shared error type and `Result` alias

pub mod error;
