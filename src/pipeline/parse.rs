// src/pipeline/parse.rs

//! Status block parser.
//!
//! Authors embed status entries in page bodies:
//!
//! ```text
//! [system]
//! name: API degraded
//! status: warn
//! display: yes
//! domain: example.com, www.foo.org
//! message: Partial outages expected.
//!   Continuation lines are kept verbatim.
//! [/system]
//! ```
//!
//! Blocks are matched non-greedily and never nest. Inside a block each line
//! is either a `key: value` (or `key = value`) field, a blank line, or a
//! continuation of the `message` field.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{AnnotationBlock, DEFAULT_NAME, Severity, Source, Visibility, parse_flag};

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[\s*system\s*\](.*?)\[\s*/\s*system\s*\]").expect("valid block regex")
});

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_-]*)\s*[:=]\s*(.*?)\s*$").expect("valid field regex")
});

/// Fields a block may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Severity,
    Display,
    Solved,
    Audience,
    Message,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "name" | "title" => Some(Field::Name),
            "status" | "severity" | "level" => Some(Field::Severity),
            "display" | "visible" | "visibility" | "show" => Some(Field::Display),
            "solved" | "resolved" => Some(Field::Solved),
            "domain" | "domains" | "audience" | "hosts" => Some(Field::Audience),
            "message" | "text" | "description" | "msg" => Some(Field::Message),
            _ => None,
        }
    }
}

/// Where the line scanner is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    AwaitingField,
    AccumulatingMessage,
}

/// Field values as written, before normalization.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub name: Option<String>,
    pub severity: Option<String>,
    pub display: Option<String>,
    pub solved: Option<String>,
    pub audience: Option<String>,
    pub message: String,
}

impl RawBlock {
    /// Scan a block interior. `None` when the interior is blank.
    pub fn scan(interior: &str) -> Option<Self> {
        if interior.trim().is_empty() {
            return None;
        }

        let mut raw = RawBlock::default();
        let mut state = ScanState::AwaitingField;

        for line in interior.lines() {
            if line.trim().is_empty() {
                if state == ScanState::AccumulatingMessage {
                    raw.message.push('\n');
                }
                continue;
            }

            let field = FIELD_RE
                .captures(line)
                .and_then(|caps| Some((Field::from_key(&caps[1])?, caps[2].to_string())));

            match (field, state) {
                (Some((field, value)), _) => state = raw.set(field, value),
                (None, ScanState::AccumulatingMessage) => {
                    if !raw.message.is_empty() && !raw.message.ends_with('\n') {
                        raw.message.push('\n');
                    }
                    raw.message.push_str(line);
                }
                (None, ScanState::AwaitingField) => {
                    log::debug!("Ignoring stray line in status block: {line:?}");
                }
            }
        }

        Some(raw)
    }

    fn set(&mut self, field: Field, value: String) -> ScanState {
        match field {
            Field::Name => self.name = Some(value),
            Field::Severity => self.severity = Some(value),
            Field::Display => self.display = Some(value),
            Field::Solved => self.solved = Some(value),
            Field::Audience => self.audience = Some(value),
            Field::Message => {
                self.message = value;
                return ScanState::AccumulatingMessage;
            }
        }
        ScanState::AwaitingField
    }

    /// Visibility decision; `display` takes precedence over `solved`.
    pub fn visibility(&self) -> Visibility {
        match &self.display {
            Some(display) => Visibility::Explicit {
                visible: parse_flag(display) == Some(true),
            },
            None => Visibility::Legacy {
                resolved: self
                    .solved
                    .as_deref()
                    .and_then(parse_flag)
                    .unwrap_or(false),
            },
        }
    }

    /// Normalize into an entry, or `None` if the block is hidden.
    pub fn into_entry(self, source: &Source) -> Option<AnnotationBlock> {
        let visibility = self.visibility();
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_NAME)
            .to_string();

        if !visibility.is_included() {
            log::debug!("Dropping hidden status block {name:?} ({visibility:?})");
            return None;
        }

        let severity = self
            .severity
            .as_deref()
            .map(Severity::parse)
            .unwrap_or_default();
        let audience = self
            .audience
            .as_deref()
            .map(normalize_audience)
            .unwrap_or_default();

        Some(AnnotationBlock::new(
            name,
            severity,
            visibility,
            audience,
            self.message.trim().to_string(),
            source.clone(),
        ))
    }
}

/// Extract all included status entries from normalized page text.
pub fn parse_blocks(text: &str, source: &Source) -> Vec<AnnotationBlock> {
    BLOCK_RE
        .captures_iter(text)
        .filter_map(|caps| RawBlock::scan(caps.get(1)?.as_str()))
        .filter_map(|raw| raw.into_entry(source))
        .collect()
}

/// Normalize a comma-separated host list. Any `@` means global (empty).
pub fn normalize_audience(raw: &str) -> Vec<String> {
    if raw.contains('@') {
        return Vec::new();
    }
    let mut hosts: Vec<String> = Vec::new();
    for host in raw.split(',').filter_map(normalize_host) {
        if !hosts.contains(&host) {
            hosts.push(host);
        }
    }
    hosts
}

/// Reduce a URL or hostname to a bare lower-case host.
pub fn normalize_host(token: &str) -> Option<String> {
    let lowered = token.trim().to_lowercase();
    let without_scheme = match lowered.find("://") {
        Some(idx) => &lowered[idx + 3..],
        None => lowered.as_str(),
    };
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host).trim_end_matches('.');
    (!host.is_empty()).then(|| host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Source {
        Source {
            document: "Status".into(),
            page: "Incidents".into(),
            updated_at: None,
        }
    }

    #[test]
    fn parses_documented_example() {
        let body = "intro\n[system]\nname: API degraded\nstatus: warn\ndisplay: yes\ndomain: Example.com, www.Foo.org\nmessage: Partial outages expected.\n[/system]\noutro";
        let entries = parse_blocks(body, &source());

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name, "API degraded");
        assert_eq!(entry.severity, Severity::Warning);
        assert!(entry.visible);
        assert_eq!(entry.audience, vec!["example.com", "foo.org"]);
        assert_eq!(entry.message, "Partial outages expected.");
        assert_eq!(entry.source, source());
    }

    #[test]
    fn parses_multiple_blocks_non_greedy() {
        let body = "[system]\nname: One\n[/system]\nbetween\n[SYSTEM]\nname = Two\nstatus = error\n[/SYSTEM]";
        let entries = parse_blocks(body, &source());
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two"]);
        assert_eq!(entries[1].severity, Severity::Error);
    }

    #[test]
    fn empty_block_emits_nothing() {
        assert!(parse_blocks("[system]   \n\n [/system]", &source()).is_empty());
    }

    #[test]
    fn defaults_apply() {
        let entries = parse_blocks("[system]\nmessage: hello\n[/system]", &source());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, DEFAULT_NAME);
        assert_eq!(entries[0].severity, Severity::Ok);
        assert!(entries[0].audience.is_empty());
        assert!(!entries[0].resolved);
    }

    #[test]
    fn unknown_severity_is_ok() {
        let entries = parse_blocks("[system]\nstatus: purple\n[/system]", &source());
        assert_eq!(entries[0].severity, Severity::Ok);
    }

    #[test]
    fn legacy_resolution_rule() {
        let open = "[system]\nname: X\nsolved: no\n[/system]";
        let closed = "[system]\nname: X\nsolved: yes\n[/system]";
        assert_eq!(parse_blocks(open, &source()).len(), 1);
        assert!(parse_blocks(closed, &source()).is_empty());
    }

    #[test]
    fn display_no_hides_regardless_of_solved() {
        let body = "[system]\nname: X\ndisplay: no\nsolved: no\n[/system]";
        assert!(parse_blocks(body, &source()).is_empty());
    }

    #[test]
    fn display_takes_precedence_over_solved() {
        let body = "[system]\nname: X\nsolved: yes\ndisplay: yes\n[/system]";
        let entries = parse_blocks(body, &source());
        assert_eq!(entries.len(), 1);
        assert!(entries[0].visible);
        assert!(!entries[0].resolved);
    }

    #[test]
    fn unrecognized_display_value_hides() {
        let body = "[system]\nname: X\ndisplay: maybe\n[/system]";
        assert!(parse_blocks(body, &source()).is_empty());
    }

    #[test]
    fn message_continuation_lines() {
        let interior = "name: X\nmessage: first line\n  indented second\n\nafter blank\n[note]: bracketed\nNote: not a field\nstatus: error\ntrailing ignored";
        let raw = RawBlock::scan(interior).unwrap();
        assert_eq!(
            raw.message,
            "first line\n  indented second\nafter blank\n[note]: bracketed\nNote: not a field"
        );
        assert_eq!(raw.severity.as_deref(), Some("error"));
    }

    #[test]
    fn message_may_start_on_next_line() {
        let raw = RawBlock::scan("message:\n  body text\nname: X").unwrap();
        assert_eq!(raw.message, "  body text");
        assert_eq!(raw.name.as_deref(), Some("X"));

        let entry = raw.into_entry(&source()).unwrap();
        assert_eq!(entry.message, "body text");
    }

    #[test]
    fn stray_lines_outside_message_are_ignored() {
        let raw = RawBlock::scan("just prose\nname: X").unwrap();
        assert_eq!(raw.message, "");
        assert_eq!(raw.name.as_deref(), Some("X"));
    }

    #[test]
    fn audience_at_collapses_to_global() {
        assert!(normalize_audience("@").is_empty());
        assert!(normalize_audience("example.com, @").is_empty());
        assert!(normalize_audience("@, example.com").is_empty());
        assert!(normalize_audience("user@example.com").is_empty());
    }

    #[test]
    fn audience_normalizes_hosts() {
        assert_eq!(
            normalize_audience("https://WWW.Example.com/status?x=1, foo.org/, , example.com"),
            vec!["example.com", "foo.org"]
        );
        assert_eq!(normalize_host("http://www."), None);
        assert_eq!(
            normalize_host("shop.example.com:8443/path"),
            Some("shop.example.com:8443".to_string())
        );
    }
}
