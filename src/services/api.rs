// src/services/api.rs

//! Remote document store client.
//!
//! [`DocumentApi`] is the seam the enumerator and harvester talk to;
//! [`HttpDocumentClient`] is the real implementation over HTTPS with bearer
//! auth and retry on rate limiting and server errors.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, ContentFormat, Document, Listing, Page, PageBody};
use crate::services::retry::{RetryPolicy, retry_with_backoff};
use crate::utils::http::create_async_client;

/// Read-only view of the remote document store.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// One page of documents; scoped to `parent_id` when given.
    async fn list_documents(
        &self,
        parent_id: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Listing<Document>>;

    /// One page of a document's pages, nested children expanded.
    async fn list_pages(&self, document_id: &str, cursor: Option<&str>) -> Result<Listing<Page>>;

    /// A page body in the requested format.
    async fn fetch_content(&self, page_id: &str, format: ContentFormat) -> Result<PageBody>;
}

/// HTTP implementation of [`DocumentApi`].
pub struct HttpDocumentClient {
    client: reqwest::Client,
    base_url: Url,
    workspace_id: String,
    token: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl HttpDocumentClient {
    /// Build a client from validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_async_client(&config.api)?,
            base_url: Url::parse(&config.api.base_url)?,
            workspace_id: config.api.workspace_id.clone(),
            token: config.api.token.clone(),
            page_size: config.harvest.page_size,
            retry: RetryPolicy::from_config(&config.api),
        })
    }

    /// Workspace-scoped endpoint URL; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("api.base_url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("workspaces")
            .push(&self.workspace_id)
            .extend(segments);
        Ok(url)
    }

    /// Issue an authenticated request and return the response body.
    ///
    /// 429 and 5xx responses are retried with backoff; other non-success
    /// statuses fail immediately.
    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<String> {
        let url = self.endpoint(segments)?;
        let context = format!("{method} {}", url.path());

        retry_with_backoff(&self.retry, &context, || {
            let request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(&self.token)
                .query(params);
            let context = context.as_str();
            async move {
                let response = request.send().await?;
                check_status(response.status(), context)?;
                Ok::<_, AppError>(response.text().await?)
            }
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T> {
        let body = self.request(Method::GET, segments, params).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn listing_params(&self, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.page_size.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        params
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentClient {
    async fn list_documents(
        &self,
        parent_id: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Listing<Document>> {
        let mut params = self.listing_params(cursor);
        if let Some(parent_id) = parent_id {
            params.push(("parent_id", parent_id.to_string()));
        }
        self.get_json(&["documents"], &params).await
    }

    async fn list_pages(&self, document_id: &str, cursor: Option<&str>) -> Result<Listing<Page>> {
        let mut params = self.listing_params(cursor);
        params.push(("depth", "-1".to_string()));
        self.get_json(&["documents", document_id, "pages"], &params)
            .await
    }

    async fn fetch_content(&self, page_id: &str, format: ContentFormat) -> Result<PageBody> {
        let params = [("format", format.as_str().to_string())];
        let body = self
            .request(Method::GET, &["pages", page_id, "content"], &params)
            .await?;
        Ok(decode_content(&body, format))
    }
}

fn check_status(status: StatusCode, context: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(AppError::transient(context, format!("HTTP {status}")))
    } else {
        Err(AppError::fatal(context, format!("HTTP {status}")))
    }
}

/// Interpret a content response.
///
/// The API wraps bodies as `{"content": ...}`; a string is flat text (or
/// HTML), anything structured is a block tree. Non-JSON bodies are taken
/// as-is.
pub fn decode_content(body: &str, format: ContentFormat) -> PageBody {
    let flat = |text: String| match format {
        ContentFormat::Html => PageBody::Html(text),
        _ => PageBody::Text(text),
    };

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return flat(body.to_string());
    };

    let content = match value {
        Value::Object(mut map) => map.remove("content").unwrap_or(Value::Object(map)),
        other => other,
    };

    match content {
        Value::String(text) => flat(text),
        Value::Null => flat(String::new()),
        tree => PageBody::Tree(tree),
    }
}
