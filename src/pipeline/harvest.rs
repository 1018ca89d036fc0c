// src/pipeline/harvest.rs

//! Harvest run orchestration.
//!
//! Documents are processed one at a time; page bodies within a document are
//! fetched through the bounded runner. Every failure below the run level is
//! logged and skipped, so a run always ends with a snapshot.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    AnnotationBlock, Config, ContentFormat, Document, HarvestStats, Page, RunSnapshot, Source,
};
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::normalize::body_to_text;
use crate::pipeline::parse::parse_blocks;
use crate::services::{DocumentApi, Enumerator};
use crate::storage::SnapshotStorage;
use crate::utils::run_all;

/// Harvest status entries from the document store into a snapshot.
pub async fn harvest(
    config: &Config,
    api: &dyn DocumentApi,
    now: DateTime<Utc>,
) -> Result<(RunSnapshot, HarvestStats)> {
    let harvest = &config.harvest;
    let cutoff = config.cutoff(now);
    if let Some(cutoff) = cutoff {
        log::info!("Delta scan: skipping pages not updated since {cutoff}");
    }

    let enumerator = Enumerator::new(api, harvest.filter_regex()?, cutoff);
    let documents = enumerator.document_tree(harvest.max_depth).await;

    let mut stats = HarvestStats {
        documents: documents.len(),
        ..HarvestStats::default()
    };
    let mut entries = Vec::new();

    for document in &documents {
        let selection = enumerator.pages(document).await;
        stats.pages_listed += selection.pages.len() + selection.skipped;
        stats.pages_skipped += selection.skipped;

        let results = run_all(selection.pages, harvest.concurrency, |page| {
            extract_page(api, &harvest.content_formats, document, page)
        })
        .await;

        for result in results {
            match result {
                Some(found) => {
                    stats.pages_fetched += 1;
                    entries.extend(found);
                }
                None => stats.pages_failed += 1,
            }
        }
    }

    stats.blocks_extracted = entries.len();
    let snapshot = aggregate(entries, now);
    stats.messages = snapshot.messages.len();

    Ok((snapshot, stats))
}

/// Run one harvest and replace the stored snapshot.
pub async fn run_harvester(
    config: &Config,
    api: &dyn DocumentApi,
    storage: &dyn SnapshotStorage,
) -> Result<RunSnapshot> {
    log::info!("Harvest starting");

    let (snapshot, stats) = harvest(config, api, Utc::now()).await?;
    let location = storage.write_snapshot(&snapshot).await?;

    log::info!("Harvest summary:");
    log::info!("    documents: {}", stats.documents);
    log::info!(
        "    pages: {} listed, {} unchanged, {} fetched, {} failed",
        stats.pages_listed,
        stats.pages_skipped,
        stats.pages_fetched,
        stats.pages_failed
    );
    log::info!(
        "    messages: {} extracted, {} after dedup",
        stats.blocks_extracted,
        stats.messages
    );
    log::info!("    overall: {:?}", snapshot.overall);
    log::info!("    snapshot: {location}");

    Ok(snapshot)
}

/// Fetch, normalize and parse one page.
async fn extract_page(
    api: &dyn DocumentApi,
    formats: &[ContentFormat],
    document: &Document,
    page: Page,
) -> Result<Vec<AnnotationBlock>> {
    let text = fetch_page_text(api, formats, &page)
        .await
        .inspect_err(|error| {
            log::warn!(
                "Skipping page {} ({}) in {}: {error}",
                page.name,
                page.id,
                document.name
            );
        })?;

    let source = Source {
        document: document.name.clone(),
        page: page.name.clone(),
        updated_at: page.last_updated_at,
    };
    let entries = parse_blocks(&text, &source);
    if !entries.is_empty() {
        log::debug!("{} status blocks in {}/{}", entries.len(), document.name, page.name);
    }
    Ok(entries)
}

/// Try each format in order until one yields non-empty text.
///
/// A page that only ever comes back empty is empty, not failed; it fails
/// only when every format errored.
async fn fetch_page_text(
    api: &dyn DocumentApi,
    formats: &[ContentFormat],
    page: &Page,
) -> Result<String> {
    let mut last_error = None;
    let mut any_answer = false;

    for &format in formats {
        match api.fetch_content(&page.id, format).await {
            Ok(body) => {
                let text = body_to_text(&body);
                if !text.trim().is_empty() {
                    return Ok(text);
                }
                any_answer = true;
                log::debug!("Page {} is empty as {}", page.id, format.as_str());
            }
            Err(error) => {
                log::debug!("Page {} unavailable as {}: {error}", page.id, format.as_str());
                last_error = Some(error);
            }
        }
    }

    match last_error {
        Some(_) if any_answer => Ok(String::new()),
        Some(error) => Err(error),
        None if any_answer => Ok(String::new()),
        None => Err(AppError::config("no content formats configured")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::models::{OverallSeverity, PageBody, Severity};
    use crate::storage::LocalStorage;
    use crate::testing::FakeApi;

    const DEGRADED: &str = "Intro text\n\n[system]\nname: API degraded\nstatus: warn\ndisplay: yes\ndomain: Example.com, www.Foo.org\nmessage: Partial outages expected.\n[/system]\n";

    fn config() -> Config {
        let mut config = Config::default();
        config.api.token = "t".into();
        config.api.workspace_id = "w".into();
        config.harvest.concurrency = 2;
        config
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    fn status_api() -> FakeApi {
        FakeApi::new()
            .with_document("d1", "Status")
            .with_document("d2", "Other")
            .with_page("d1", FakeApi::page("p1", "Incidents", Some(at(3))), DEGRADED)
            .with_page(
                "d1",
                FakeApi::page("p2", "Outage", Some(at(1))),
                "[system]\nname: DB down\nstatus: error\nmessage: down\n[/system]",
            )
            .with_page(
                "d2",
                FakeApi::page("p3", "Copy", Some(at(5))),
                "[system]\nname: DB down\nstatus: error\nmessage: down\n[/system]\n[system]\nname: Old\nsolved: yes\n[/system]",
            )
    }

    #[tokio::test]
    async fn harvests_dedupes_and_ranks() {
        let api = status_api();
        let (snapshot, stats) = harvest(&config(), &api, at(10)).await.unwrap();

        let names: Vec<_> = snapshot.messages.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["DB down", "API degraded"]);
        assert_eq!(snapshot.messages[0].source.page, "Outage");
        assert_eq!(snapshot.overall, OverallSeverity::Error);
        assert_eq!(snapshot.generated_at, at(10));

        let degraded = &snapshot.messages[1];
        assert_eq!(degraded.severity, Severity::Warning);
        assert_eq!(degraded.audience, vec!["example.com", "foo.org"]);
        assert_eq!(degraded.message, "Partial outages expected.");

        assert_eq!(stats.documents, 2);
        assert_eq!(stats.pages_fetched, 3);
        assert_eq!(stats.blocks_extracted, 3);
        assert_eq!(stats.messages, 2);
    }

    #[tokio::test]
    async fn rerun_is_identical() {
        let api = status_api();
        let (first, _) = harvest(&config(), &api, at(10)).await.unwrap();
        let (second, _) = harvest(&config(), &api, at(10)).await.unwrap();
        assert_eq!(
            serde_json::to_string(&first.messages).unwrap(),
            serde_json::to_string(&second.messages).unwrap()
        );
    }

    #[tokio::test]
    async fn failed_page_does_not_block_others() {
        let api = status_api().failing_content("p2").failing_pages_of("d2");
        let (snapshot, stats) = harvest(&config(), &api, at(10)).await.unwrap();

        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].name, "API degraded");
        assert_eq!(snapshot.overall, OverallSeverity::Warn);
        assert_eq!(stats.pages_failed, 1);
        assert_eq!(stats.pages_fetched, 1);
    }

    #[tokio::test]
    async fn total_failure_still_yields_snapshot() {
        let api = FakeApi::new().failing_document_listing();
        let (snapshot, stats) = harvest(&config(), &api, at(10)).await.unwrap();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.overall, OverallSeverity::Ok);
        assert_eq!(stats.documents, 0);
    }

    #[tokio::test]
    async fn delta_scan_never_fetches_stale_pages() {
        let api = status_api();
        let mut config = config();
        config.harvest.full_resync = false;
        config.harvest.since_hours = Some(24 * 6);

        let (snapshot, stats) = harvest(&config, &api, at(10)).await.unwrap();
        let fetched = api.fetched_pages();
        assert!(fetched.contains("p3"));
        assert!(!fetched.contains("p1"));
        assert!(!fetched.contains("p2"));
        assert_eq!(stats.pages_skipped, 2);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].source.page, "Copy");
    }

    #[tokio::test]
    async fn name_filter_limits_documents() {
        let api = status_api();
        let mut config = config();
        config.harvest.document_filter = Some("^STATUS$".into());

        let (_, stats) = harvest(&config, &api, at(10)).await.unwrap();
        assert_eq!(stats.documents, 1);
        assert!(!api.fetched_pages().contains("p3"));
    }

    #[tokio::test]
    async fn recursion_reaches_child_documents() {
        let api = FakeApi::new()
            .with_document("root", "Root")
            .with_child("root", "child", "Child")
            .with_page(
                "child",
                FakeApi::page("cp", "Child page", None),
                "[system]\nname: From child\n[/system]",
            );

        let (flat, _) = harvest(&config(), &api, at(10)).await.unwrap();
        assert!(flat.messages.is_empty());

        let mut deep = config();
        deep.harvest.max_depth = 1;
        let (snapshot, _) = harvest(&deep, &api, at(10)).await.unwrap();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].source.document, "Child");
    }

    #[tokio::test]
    async fn formats_fall_back_in_order() {
        let api = FakeApi::new()
            .with_document("d", "Doc")
            .with_page("d", FakeApi::page("p", "Tree page", None), "   ")
            .with_body(
                "p",
                ContentFormat::Json,
                PageBody::Tree(json!({"blocks": [
                    {"text": "[system]"},
                    {"text": "name: From tree"},
                    {"text": "[/system]"}
                ]})),
            )
            .with_body("p", ContentFormat::Html, PageBody::Html("<p>unused</p>".into()));

        let (snapshot, _) = harvest(&config(), &api, at(10)).await.unwrap();
        assert_eq!(snapshot.messages[0].name, "From tree");
        assert_eq!(
            api.formats_tried("p"),
            vec![ContentFormat::Markdown, ContentFormat::Text, ContentFormat::Json]
        );
    }

    #[tokio::test]
    async fn run_harvester_writes_snapshot() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("status.json"));
        let api = status_api();

        let snapshot = run_harvester(&config(), &api, &storage).await.unwrap();
        let stored = storage.load_snapshot().await.unwrap().unwrap();
        assert_eq!(stored, snapshot);
    }
}
