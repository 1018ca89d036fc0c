// src/pipeline/aggregate.rs

//! Merge, dedupe and rank entries from a run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{AnnotationBlock, RunSnapshot, Severity};

/// Drop entries whose `(name, severity, message)` was already seen.
///
/// The first occurrence in iteration order wins.
pub fn dedup(entries: Vec<AnnotationBlock>) -> Vec<AnnotationBlock> {
    let mut seen: HashSet<(String, Severity, String)> = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let (name, severity, message) = entry.dedup_key();
            seen.insert((name.to_owned(), severity, message.to_owned()))
        })
        .collect()
}

/// Errors first, then warnings, then ok; newest page first within a rank.
///
/// Entries without a timestamp rank as oldest. The sort is stable so ties
/// keep iteration order.
pub fn rank(entries: &mut [AnnotationBlock]) {
    entries.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| b.source.updated_at.cmp(&a.source.updated_at))
    });
}

/// Build the run snapshot from every entry extracted in the run.
pub fn aggregate(entries: Vec<AnnotationBlock>, generated_at: DateTime<Utc>) -> RunSnapshot {
    let mut messages = dedup(entries);
    rank(&mut messages);
    RunSnapshot::new(messages, generated_at)
}
