// src/testing.rs

//! In-memory document store for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{ContentFormat, Document, Listing, Page, PageBody};
use crate::services::DocumentApi;

#[derive(Default)]
pub struct FakeApi {
    roots: Vec<Document>,
    children: HashMap<String, Vec<Document>>,
    pages: HashMap<String, Vec<Page>>,
    bodies: HashMap<(String, ContentFormat), PageBody>,
    failing_children: HashSet<String>,
    failing_page_listings: HashSet<String>,
    failing_content: HashSet<String>,
    fail_document_listing: bool,
    listing_page_size: Option<usize>,
    fetched: Mutex<Vec<(String, ContentFormat)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(id: &str, name: &str, updated_at: Option<DateTime<Utc>>) -> Page {
        Page {
            id: id.to_string(),
            name: name.to_string(),
            last_updated_at: updated_at,
            parent_document_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_document(mut self, id: &str, name: &str) -> Self {
        self.roots.push(document(id, name));
        self
    }

    pub fn with_child(mut self, parent_id: &str, id: &str, name: &str) -> Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(document(id, name));
        self
    }

    /// Add a page (with any nested children) and its markdown body.
    pub fn with_page(mut self, document_id: &str, page: Page, markdown: &str) -> Self {
        self.bodies.insert(
            (page.id.clone(), ContentFormat::Markdown),
            PageBody::Text(markdown.to_string()),
        );
        self.pages
            .entry(document_id.to_string())
            .or_default()
            .push(page);
        self
    }

    pub fn with_body(mut self, page_id: &str, format: ContentFormat, body: PageBody) -> Self {
        self.bodies.insert((page_id.to_string(), format), body);
        self
    }

    pub fn with_listing_page_size(mut self, size: usize) -> Self {
        self.listing_page_size = Some(size);
        self
    }

    pub fn failing_document_listing(mut self) -> Self {
        self.fail_document_listing = true;
        self
    }

    pub fn failing_children_of(mut self, parent_id: &str) -> Self {
        self.failing_children.insert(parent_id.to_string());
        self
    }

    pub fn failing_pages_of(mut self, document_id: &str) -> Self {
        self.failing_page_listings.insert(document_id.to_string());
        self
    }

    pub fn failing_content(mut self, page_id: &str) -> Self {
        self.failing_content.insert(page_id.to_string());
        self
    }

    /// Page ids whose content was requested, in any format.
    pub fn fetched_pages(&self) -> HashSet<String> {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Formats requested for one page, in request order.
    pub fn formats_tried(&self, page_id: &str) -> Vec<ContentFormat> {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == page_id)
            .map(|(_, format)| *format)
            .collect()
    }

    fn paginate<T: Clone>(&self, items: &[T], cursor: Option<&str>) -> Listing<T> {
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let size = self.listing_page_size.unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(items.len());
        Listing {
            items: items[start.min(end)..end].to_vec(),
            next_cursor: (end < items.len()).then(|| end.to_string()),
        }
    }
}

fn document(id: &str, name: &str) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
    }
}

#[async_trait]
impl DocumentApi for FakeApi {
    async fn list_documents(
        &self,
        parent_id: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Listing<Document>> {
        match parent_id {
            None if self.fail_document_listing => {
                Err(AppError::fatal("GET /documents", "HTTP 500"))
            }
            None => Ok(self.paginate(&self.roots, cursor)),
            Some(parent) if self.failing_children.contains(parent) => {
                Err(AppError::fatal("GET /documents", "HTTP 403"))
            }
            Some(parent) => Ok(self.paginate(
                self.children.get(parent).map(Vec::as_slice).unwrap_or_default(),
                cursor,
            )),
        }
    }

    async fn list_pages(&self, document_id: &str, cursor: Option<&str>) -> Result<Listing<Page>> {
        if self.failing_page_listings.contains(document_id) {
            return Err(AppError::fatal("GET /pages", "HTTP 503"));
        }
        Ok(self.paginate(
            self.pages.get(document_id).map(Vec::as_slice).unwrap_or_default(),
            cursor,
        ))
    }

    async fn fetch_content(&self, page_id: &str, format: ContentFormat) -> Result<PageBody> {
        self.fetched
            .lock()
            .unwrap()
            .push((page_id.to_string(), format));
        if self.failing_content.contains(page_id) {
            return Err(AppError::fatal("GET /content", "HTTP 502"));
        }
        self.bodies
            .get(&(page_id.to_string(), format))
            .cloned()
            .ok_or_else(|| AppError::fatal("GET /content", "HTTP 415"))
    }
}
