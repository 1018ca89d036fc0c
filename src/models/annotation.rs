//! Status annotation data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name used when a block does not provide one.
pub const DEFAULT_NAME: &str = "System message";

/// Per-entry status classification.
///
/// Declaration order is display order: errors first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Ok,
}

impl Severity {
    /// Normalize an author-written token. Anything unrecognized is `Ok`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "error" | "err" | "red" | "down" | "critical" | "outage" | "major" => {
                Severity::Error
            }
            "warning" | "warn" | "yellow" | "orange" | "degraded" | "minor" | "maintenance" => {
                Severity::Warning
            }
            _ => Severity::Ok,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Ok => "ok",
        }
    }
}

/// How a block decided whether it is shown.
///
/// Two generations of markup exist: the current `display` field and the
/// legacy `solved` field. When `display` is present it wins outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// `display:` was given
    Explicit { visible: bool },
    /// No `display:`; fall back to `solved:` (absent means not resolved)
    Legacy { resolved: bool },
}

impl Visibility {
    /// Whether the block makes it into the feed.
    pub fn is_included(&self) -> bool {
        match *self {
            Visibility::Explicit { visible } => visible,
            Visibility::Legacy { resolved } => !resolved,
        }
    }

    /// Legacy resolution flag, as carried on the entry.
    pub fn resolved(&self) -> bool {
        match *self {
            Visibility::Explicit { .. } => false,
            Visibility::Legacy { resolved } => resolved,
        }
    }
}

/// Interpret a yes/no style token. `None` for anything else.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "on" | "show" | "visible" => Some(true),
        "no" | "n" | "false" | "0" | "off" | "hide" | "hidden" => Some(false),
        _ => None,
    }
}

/// Where an entry was found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub document: String,
    pub page: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A parsed, included status entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationBlock {
    /// Stable fingerprint of the dedup key
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub visible: bool,
    pub resolved: bool,
    /// Normalized hostnames; empty means global
    pub audience: Vec<String>,
    pub message: String,
    pub source: Source,
}

impl AnnotationBlock {
    pub fn new(
        name: String,
        severity: Severity,
        visibility: Visibility,
        audience: Vec<String>,
        message: String,
        source: Source,
    ) -> Self {
        let id = fingerprint(&name, severity, &message);
        Self {
            id,
            name,
            severity,
            visible: visibility.is_included(),
            resolved: visibility.resolved(),
            audience,
            message,
            source,
        }
    }

    /// Identity used to collapse duplicates.
    pub fn dedup_key(&self) -> (&str, Severity, &str) {
        (&self.name, self.severity, &self.message)
    }
}

fn fingerprint(name: &str, severity: Severity, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0]);
    hasher.update(severity.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(message.as_bytes());
    hex::encode(hasher.finalize())
}
