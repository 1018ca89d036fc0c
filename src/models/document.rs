//! Remote document store data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named container of pages in the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

/// A content unit inside a document.
///
/// Listings may nest pages under `children` when depth expansion is requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Remote modification time, used only for the delta-scan cutoff
    #[serde(default, alias = "updated_at", alias = "lastUpdatedAt")]
    pub last_updated_at: Option<DateTime<Utc>>,

    /// Owning document (filled in by the enumerator when the API omits it)
    #[serde(default, alias = "documentId")]
    pub parent_document_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Page>,
}

impl Page {
    /// Flatten this page and its nested children, depth-first, parents first.
    pub fn flatten(self) -> Vec<Page> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(mut page) = stack.pop() {
            let children = std::mem::take(&mut page.children);
            out.push(page);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Whether this page changed since `cutoff`.
    ///
    /// Pages without a timestamp are always considered changed.
    pub fn updated_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_updated_at.is_none_or(|at| at >= cutoff)
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    #[serde(default = "Vec::new", alias = "data", alias = "results")]
    pub items: Vec<T>,

    #[serde(default, alias = "nextCursor", alias = "cursor")]
    pub next_cursor: Option<String>,
}

impl<T> Listing<T> {
    /// The cursor to follow, if the listing continues.
    pub fn continuation(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Content representations the API can return for a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Text,
    Json,
    Html,
}

impl ContentFormat {
    /// Default order formats are tried in.
    pub const FALLBACK_ORDER: [ContentFormat; 4] = [
        ContentFormat::Markdown,
        ContentFormat::Text,
        ContentFormat::Json,
        ContentFormat::Html,
    ];

    /// Query parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Markdown => "markdown",
            ContentFormat::Text => "text",
            ContentFormat::Json => "json",
            ContentFormat::Html => "html",
        }
    }
}

/// A page body as delivered by the API.
#[derive(Debug, Clone, PartialEq)]
pub enum PageBody {
    /// Flat markdown or plain text
    Text(String),
    /// HTML markup
    Html(String),
    /// Rich block tree
    Tree(serde_json::Value),
}
