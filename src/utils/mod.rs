//! Utility functions and helpers.

pub mod concurrency;
pub mod http;

pub use concurrency::run_all;
