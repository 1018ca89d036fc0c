// src/lib.rs

//! Status Harvester Library
//!
//! Crawls a remote document store for embedded `[system]` status blocks and
//! turns them into a ranked, deduplicated status snapshot.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
