// src/services/enumerator.rs

//! Document and page enumeration.
//!
//! Every listing failure is isolated: the failing listing contributes
//! nothing and the run carries on.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::Result;
use crate::models::{Document, Listing, Page};
use crate::services::DocumentApi;

/// Pages of one document, split by the delta-scan cutoff.
#[derive(Debug, Default)]
pub struct PageSelection {
    /// Pages whose bodies must be fetched
    pub pages: Vec<Page>,
    /// Pages skipped as unchanged since the cutoff
    pub skipped: usize,
}

/// Walks documents and pages of the remote store.
pub struct Enumerator<'a> {
    api: &'a dyn DocumentApi,
    filter: Option<Regex>,
    cutoff: Option<DateTime<Utc>>,
}

impl<'a> Enumerator<'a> {
    pub fn new(
        api: &'a dyn DocumentApi,
        filter: Option<Regex>,
        cutoff: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            api,
            filter,
            cutoff,
        }
    }

    /// Top-level documents whose name matches the filter.
    pub async fn documents(&self) -> Vec<Document> {
        let listed =
            collect_all(|cursor| async move { self.api.list_documents(None, cursor.as_deref()).await })
                .await;
        match listed {
            Ok(documents) => {
                let total = documents.len();
                let matched: Vec<Document> = documents
                    .into_iter()
                    .filter(|doc| self.filter.as_ref().is_none_or(|re| re.is_match(&doc.name)))
                    .collect();
                log::info!("Listed {total} documents, {} match the filter", matched.len());
                matched
            }
            Err(error) => {
                log::error!("Failed to list documents: {error}");
                Vec::new()
            }
        }
    }

    /// Direct child documents of `parent`; empty on failure.
    pub async fn child_documents(&self, parent: &Document) -> Vec<Document> {
        let parent_id = parent.id.as_str();
        let listed = collect_all(|cursor| async move {
            self.api.list_documents(Some(parent_id), cursor.as_deref()).await
        })
        .await;
        listed.unwrap_or_else(|error| {
            log::warn!("Failed to list children of {} ({}): {error}", parent.name, parent.id);
            Vec::new()
        })
    }

    /// Filtered documents followed by their descendants up to `max_depth`,
    /// depth-first, each document once.
    pub async fn document_tree(&self, max_depth: u32) -> Vec<Document> {
        let roots = self.documents().await;
        let mut stack: Vec<(Document, u32)> = roots.into_iter().rev().map(|d| (d, 0)).collect();
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();

        while let Some((document, depth)) = stack.pop() {
            if !seen.insert(document.id.clone()) {
                continue;
            }
            if depth < max_depth {
                let children = self.child_documents(&document).await;
                log::debug!(
                    "{} has {} child documents at depth {}",
                    document.name,
                    children.len(),
                    depth + 1
                );
                stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
            }
            ordered.push(document);
        }

        ordered
    }

    /// All pages of `document` (nested pages flattened), minus pages
    /// unchanged since the cutoff. Empty on failure.
    pub async fn pages(&self, document: &Document) -> PageSelection {
        let document_id = document.id.as_str();
        let listed = collect_all(|cursor| async move {
            self.api.list_pages(document_id, cursor.as_deref()).await
        })
        .await;

        let pages = match listed {
            Ok(pages) => pages,
            Err(error) => {
                log::warn!("Failed to list pages of {} ({}): {error}", document.name, document.id);
                return PageSelection::default();
            }
        };

        let mut selection = PageSelection::default();
        for mut page in pages.into_iter().flat_map(Page::flatten) {
            if page.parent_document_id.is_none() {
                page.parent_document_id = Some(document.id.clone());
            }
            match self.cutoff {
                Some(cutoff) if !page.updated_since(cutoff) => selection.skipped += 1,
                _ => selection.pages.push(page),
            }
        }
        selection
    }
}

/// Follow a cursor-paginated listing to the end.
///
/// Stops if the API hands back a cursor it already gave.
async fn collect_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Listing<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors = HashSet::new();

    loop {
        let listing = fetch(cursor.take()).await?;
        let next = listing.continuation().map(str::to_string);
        items.extend(listing.items);

        match next {
            Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
            Some(next) => {
                log::warn!("Listing returned repeated cursor {next:?}, stopping");
                break;
            }
            None => break,
        }
    }

    Ok(items)
}
