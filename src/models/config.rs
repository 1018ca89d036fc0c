//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ContentFormat;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote document API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Enumeration and fetch behavior
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Snapshot sink
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply process environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("HARVEST_API_TOKEN") {
            self.api.token = token;
        }
        if let Some(workspace) = lookup("HARVEST_WORKSPACE_ID") {
            self.api.workspace_id = workspace;
        }
        if let Some(base_url) = lookup("HARVEST_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Some(filter) = lookup("HARVEST_DOCUMENT_FILTER") {
            self.harvest.document_filter = Some(filter).filter(|f| !f.trim().is_empty());
        }
        if let Some(depth) = parse_override(&lookup, "HARVEST_MAX_DEPTH") {
            self.harvest.max_depth = depth;
        }
        if let Some(hours) = parse_override(&lookup, "HARVEST_SINCE_HOURS") {
            self.harvest.since_hours = Some(hours);
        }
        if let Some(full) = parse_override(&lookup, "HARVEST_FULL_RESYNC") {
            self.harvest.full_resync = full;
        }
        if let Some(concurrency) = parse_override(&lookup, "HARVEST_CONCURRENCY") {
            self.harvest.concurrency = concurrency;
        }
        if let Some(path) = lookup("HARVEST_SNAPSHOT_PATH") {
            self.output.snapshot_path = PathBuf::from(path);
        }
    }

    /// Validate configuration before any network call is made.
    pub fn validate(&self) -> Result<()> {
        if self.api.token.trim().is_empty() {
            return Err(AppError::config(
                "api.token is not set (or HARVEST_API_TOKEN)",
            ));
        }
        if self.api.workspace_id.trim().is_empty() {
            return Err(AppError::config(
                "api.workspace_id is not set (or HARVEST_WORKSPACE_ID)",
            ));
        }
        url::Url::parse(&self.api.base_url)?;
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.max_attempts == 0 {
            return Err(AppError::validation("api.max_attempts must be > 0"));
        }
        if self.harvest.concurrency == 0 {
            return Err(AppError::validation("harvest.concurrency must be > 0"));
        }
        if self.harvest.page_size == 0 {
            return Err(AppError::validation("harvest.page_size must be > 0"));
        }
        if self.harvest.content_formats.is_empty() {
            return Err(AppError::validation(
                "harvest.content_formats must list at least one format",
            ));
        }
        self.harvest.filter_regex()?;
        Ok(())
    }

    /// Delta-scan cutoff relative to `now`.
    ///
    /// `None` means every page body is re-scanned.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.harvest.full_resync {
            return None;
        }
        let hours = i64::try_from(self.harvest.since_hours?).ok()?;
        now.checked_sub_signed(TimeDelta::try_hours(hours)?)
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}

/// Remote document API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. `https://api.example.com/v1`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Bearer credential
    #[serde(default)]
    pub token: String,

    /// Workspace the documents live in
    #[serde(default)]
    pub workspace_id: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            token: String::new(),
            workspace_id: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
        }
    }
}

/// Enumeration and fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Case-insensitive pattern documents must match by name
    #[serde(default)]
    pub document_filter: Option<String>,

    /// Child document recursion bound (0 = top level only)
    #[serde(default)]
    pub max_depth: u32,

    /// Skip pages not updated within this many hours
    #[serde(default)]
    pub since_hours: Option<u64>,

    /// Ignore `since_hours` and re-scan everything
    #[serde(default = "defaults::full_resync")]
    pub full_resync: bool,

    /// Page bodies fetched in parallel
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,

    /// Content formats to try, in order
    #[serde(default = "defaults::content_formats")]
    pub content_formats: Vec<ContentFormat>,

    /// Listing page size
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,
}

impl HarvestConfig {
    /// Compile the document filter, if any.
    pub fn filter_regex(&self) -> Result<Option<Regex>> {
        match self.document_filter.as_deref().map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Ok(Some(
                RegexBuilder::new(pattern).case_insensitive(true).build()?,
            )),
            _ => Ok(None),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            document_filter: None,
            max_depth: 0,
            since_hours: None,
            full_resync: defaults::full_resync(),
            concurrency: defaults::concurrency(),
            content_formats: defaults::content_formats(),
            page_size: defaults::page_size(),
        }
    }
}

/// Snapshot output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the run snapshot is written
    #[serde(default = "defaults::snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_path: defaults::snapshot_path(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::ContentFormat;

    // Api defaults
    pub fn base_url() -> String {
        "https://api.example.com/v1".into()
    }
    pub fn user_agent() -> String {
        concat!("status-harvester/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_attempts() -> u32 {
        5
    }
    pub fn base_delay() -> u64 {
        500
    }
    pub fn max_delay() -> u64 {
        8_000
    }

    // Harvest defaults
    pub fn full_resync() -> bool {
        true
    }
    pub fn concurrency() -> usize {
        6
    }
    pub fn content_formats() -> Vec<ContentFormat> {
        ContentFormat::FALLBACK_ORDER.to_vec()
    }
    pub fn page_size() -> u32 {
        100
    }

    // Output defaults
    pub fn snapshot_path() -> PathBuf {
        PathBuf::from("data/status.json")
    }
}
