//! HTTP collaborator for the local indexing/search backend.
//!
//! The backend owns the authoritative root set and all indexing/search
//! machinery; this module only speaks its JSON wire format. Result entries
//! are canonicalized at the decode boundary: older backends report the file
//! name as `file` and relevance as a 0..=100 `similarity` percentage, newer
//! ones as `filename` and a 0..=1 `score`. Everything past this module sees
//! a single [`SearchResult`] shape with a 0..=1 score.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::state::{IndexingProgress, SearchResult};

/// The backend is remote-but-local; the base is fixed, not configuration.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[async_trait]
pub trait Backend: Send + Sync {
    /// Authoritative root list. Always fetched fresh before acting on roots.
    async fn fetch_roots(&self) -> Result<Vec<String>>;
    async fn add_root(&self, path: &str) -> Result<()>;
    async fn remove_root(&self, path: &str) -> Result<()>;
    /// One-way reindex notification. Completion is only observable through
    /// [`Backend::fetch_progress`], never through this call's response.
    async fn trigger_indexing(&self) -> Result<()>;
    async fn fetch_progress(&self) -> Result<IndexingProgress>;
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>>;
}

pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn ensure_ok(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} returned {}: {}", what, status, body));
    }
    Ok(response)
}

#[derive(Deserialize)]
struct RootsResponse {
    #[serde(default)]
    roots: Vec<String>,
}

#[derive(Serialize)]
struct RootRequest<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawSearchResult>,
}

/// Wire shape as actually emitted across backend versions.
#[derive(Deserialize)]
struct RawSearchResult {
    path: Option<String>,
    filename: Option<String>,
    file: Option<String>,
    score: Option<f32>,
    similarity: Option<f32>,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    matched_terms: Vec<String>,
}

impl RawSearchResult {
    fn canonicalize(self) -> Option<SearchResult> {
        let path = self.path.filter(|p| !p.is_empty())?;
        let filename = self
            .filename
            .or(self.file)
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| {
                std::path::Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone())
            });
        let score = match (self.score, self.similarity) {
            (Some(s), _) => s,
            (None, Some(percent)) => percent / 100.0,
            (None, None) => 0.0,
        }
        .clamp(0.0, 1.0);
        Some(SearchResult {
            path,
            filename,
            score,
            snippet: self.snippet,
            matched_terms: self.matched_terms,
        })
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn fetch_roots(&self) -> Result<Vec<String>> {
        let response = self.client.get(self.url("/roots")).send().await?;
        let body: RootsResponse = ensure_ok(response, "root fetch").await?.json().await?;
        Ok(body.roots)
    }

    async fn add_root(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/roots/add"))
            .json(&RootRequest { path })
            .send()
            .await?;
        ensure_ok(response, "root add").await?;
        Ok(())
    }

    async fn remove_root(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/roots/remove"))
            .json(&RootRequest { path })
            .send()
            .await?;
        ensure_ok(response, "root remove").await?;
        Ok(())
    }

    async fn trigger_indexing(&self) -> Result<()> {
        let response = self.client.post(self.url("/index")).send().await?;
        ensure_ok(response, "reindex trigger").await?;
        Ok(())
    }

    async fn fetch_progress(&self) -> Result<IndexingProgress> {
        let response = self.client.get(self.url("/status")).send().await?;
        let progress = ensure_ok(response, "status fetch").await?.json().await?;
        Ok(progress)
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(self.url("/search"))
            .json(&SearchRequest { query, top_k })
            .send()
            .await?;
        let body: SearchResponse = ensure_ok(response, "search").await?.json().await?;

        let raw_count = body.results.len();
        let results: Vec<SearchResult> = body
            .results
            .into_iter()
            .filter_map(RawSearchResult::canonicalize)
            .collect();
        if results.len() < raw_count {
            warn!(
                "search: dropped {} malformed result entries",
                raw_count - results.len()
            );
        }
        debug!("search: query=\"{}\" -> {} results", query, results.len());
        Ok(results)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::with_base_url(server.uri())
    }

    #[tokio::test]
    async fn fetch_roots_returns_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/roots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "roots": ["/home/u/docs", "/home/u/notes"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let roots = client_for(&server).await.fetch_roots().await.unwrap();
        assert_eq!(roots, vec!["/home/u/docs", "/home/u/notes"]);
    }

    #[tokio::test]
    async fn fetch_roots_missing_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/roots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let roots = client_for(&server).await.fetch_roots().await.unwrap();
        assert!(roots.is_empty());
    }

    #[tokio::test]
    async fn add_root_posts_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/roots/add"))
            .and(body_json(serde_json::json!({ "path": "/home/u/docs" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).await.add_root("/home/u/docs").await.unwrap();
    }

    #[tokio::test]
    async fn remove_root_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/roots/remove"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .remove_root("/home/u/docs")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"), "got: {}", err);
    }

    #[tokio::test]
    async fn trigger_indexing_ignores_ack_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/index"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "indexing scheduled" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).await.trigger_indexing().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_progress_decodes_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "indexing": true,
                "phase": "indexing",
                "percentage": 42,
                "current_file": "/home/u/docs/report.pdf",
                "processed_files": 21,
                "total_files": 50
            })))
            .mount(&server)
            .await;

        let progress = client_for(&server).await.fetch_progress().await.unwrap();
        assert!(progress.indexing);
        assert_eq!(progress.phase, crate::state::IndexingPhase::Indexing);
        assert_eq!(progress.percentage, 42);
        assert_eq!(progress.current_file.as_deref(), Some("/home/u/docs/report.pdf"));
    }

    #[tokio::test]
    async fn search_canonicalizes_legacy_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_json(serde_json::json!({ "query": "invoice", "top_k": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    // legacy shape: `file` + percentage `similarity`
                    { "file": "a.txt", "path": "/docs/a.txt", "snippet": "a...", "similarity": 87.5 },
                    // current shape: `filename` + fractional `score`
                    { "filename": "b.txt", "path": "/docs/b.txt", "snippet": "b...", "score": 0.61,
                      "matched_terms": ["invoice"] },
                    // no filename at all: derived from the path
                    { "path": "/docs/c.txt", "score": 0.2 },
                    // malformed: no path, dropped
                    { "file": "ghost.txt", "similarity": 99.0 }
                ]
            })))
            .mount(&server)
            .await;

        let results = client_for(&server).await.search("invoice", 10).await.unwrap();
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].filename, "a.txt");
        assert!((results[0].score - 0.875).abs() < 1e-6);

        assert_eq!(results[1].filename, "b.txt");
        assert!((results[1].score - 0.61).abs() < 1e-6);
        assert_eq!(results[1].matched_terms, vec!["invoice"]);

        assert_eq!(results[2].filename, "c.txt");
    }

    #[tokio::test]
    async fn search_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.search("q", 10).await.unwrap_err();
        assert!(err.to_string().contains("503"), "got: {}", err);
    }
}
