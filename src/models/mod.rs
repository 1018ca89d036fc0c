// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod annotation;
mod config;
mod document;
mod snapshot;

// Re-export all public types
pub use annotation::{AnnotationBlock, DEFAULT_NAME, Severity, Source, Visibility, parse_flag};
pub use config::{ApiConfig, Config, HarvestConfig, OutputConfig};
pub use document::{ContentFormat, Document, Listing, Page, PageBody};
pub use snapshot::{OverallSeverity, RunSnapshot};

/// Counters for one harvest run, logged as the run summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    pub documents: usize,
    pub pages_listed: usize,
    pub pages_skipped: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub blocks_extracted: usize,
    pub messages: usize,
}
