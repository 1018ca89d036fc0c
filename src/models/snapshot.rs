//! Run snapshot: the published status feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AnnotationBlock, Severity};

/// Aggregate status of a whole run.
///
/// Note the serialized names: entries say `warning`, the aggregate says `warn`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverallSeverity {
    #[default]
    Ok,
    Warn,
    Error,
}

impl OverallSeverity {
    /// Worst severity among the entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a AnnotationBlock>) -> Self {
        let worst = entries.into_iter().map(|e| e.severity).min();
        match worst {
            Some(Severity::Error) => OverallSeverity::Error,
            Some(Severity::Warning) => OverallSeverity::Warn,
            Some(Severity::Ok) | None => OverallSeverity::Ok,
        }
    }
}

/// Output of one harvest run. Replaces any previous snapshot wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSnapshot {
    pub overall: OverallSeverity,

    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,

    #[serde(default)]
    pub messages: Vec<AnnotationBlock>,
}

impl RunSnapshot {
    /// Snapshot from already ordered messages.
    pub fn new(messages: Vec<AnnotationBlock>, generated_at: DateTime<Utc>) -> Self {
        Self {
            overall: OverallSeverity::from_entries(&messages),
            generated_at,
            messages,
        }
    }

    /// The safe fallback served when no snapshot can be read.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Utc::now())
    }
}
