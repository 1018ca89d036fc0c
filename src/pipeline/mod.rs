//! Pipeline stages for a harvest run.
//!
//! - `normalize`: page body to clean text
//! - `parse`: clean text to status entries
//! - `aggregate`: entries to a ranked snapshot
//! - `harvest`: the run itself, from enumeration to stored snapshot

pub mod aggregate;
pub mod harvest;
pub mod normalize;
pub mod parse;

pub use harvest::{harvest, run_harvester};
