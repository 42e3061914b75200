//! Session search state and the durable indexing log.
//!
//! The live result set shown on the search screen is session-only; the
//! indexing log is the durable record of the last search and is only ever
//! read back by the dedicated logs view, never silently into the session
//! slot on restart.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};

use crate::backend::Backend;
use crate::state::{SearchResult, MAX_LOGGED_RESULTS};
use crate::storage::{keys, Storage};

/// Page size requested from the backend per search.
pub const SEARCH_TOP_K: usize = 10;

pub struct SearchStore {
    storage: Arc<dyn Storage>,
    query: String,
    results: Vec<SearchResult>,
    searching: bool,
    log_query: String,
    log_results: Vec<SearchResult>,
}

impl SearchStore {
    /// Reads the durable indexing log into memory, migrating from the legacy
    /// key schema when only legacy data exists. The session slot always
    /// starts empty.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let saved_query = storage.get(keys::INDEXING_LOGS_QUERY);
        let saved_results_raw = storage.get(keys::INDEXING_LOGS_RESULTS);

        let mut log_query = saved_query.clone().unwrap_or_default();
        let mut log_results = saved_results_raw
            .as_deref()
            .and_then(parse_results)
            .unwrap_or_default();

        if saved_query.is_none() && saved_results_raw.is_none() {
            // One-time, non-destructive migration from the legacy schema:
            // write the new keys, leave the old ones in place.
            if let Some(legacy_query) = storage.get(keys::LEGACY_SEARCH_QUERY) {
                info!("migrating indexing log from legacy storage keys");
                storage.set(keys::INDEXING_LOGS_QUERY, &legacy_query);
                log_query = legacy_query;
            }
            if let Some(legacy_raw) = storage.get(keys::LEGACY_SEARCH_RESULTS) {
                if let Some(results) = parse_results(&legacy_raw) {
                    write_results(storage.as_ref(), &results);
                    log_results = results;
                }
            }
        }

        Self {
            storage,
            query: String::new(),
            results: Vec::new(),
            searching: false,
            log_query,
            log_results,
        }
    }

    /// Runs one search against the backend. The session result set and the
    /// durable log are both updated on every path, including failure (which
    /// records an empty list rather than leaving the log stale), and the
    /// searching flag is cleared exactly once per call. The backend error,
    /// if any, is returned for inline display; it is never fatal.
    pub async fn run_search(&mut self, backend: &dyn Backend, query: &str) -> Result<usize> {
        self.searching = true;
        self.query = query.to_string();

        let outcome = backend.search(query, SEARCH_TOP_K).await;
        let (results, error) = match outcome {
            Ok(mut results) => {
                results.truncate(MAX_LOGGED_RESULTS);
                (results, None)
            }
            Err(e) => {
                warn!("search failed: {}", e);
                (Vec::new(), Some(e))
            }
        };

        self.results = results.clone();
        self.log_query = query.to_string();
        self.log_results = results;
        self.storage.set(keys::INDEXING_LOGS_QUERY, query);
        write_results(self.storage.as_ref(), &self.log_results);

        self.searching = false;

        match error {
            None => {
                debug!("search: \"{}\" -> {} results", query, self.results.len());
                Ok(self.results.len())
            }
            Some(e) => Err(e),
        }
    }

    /// Erases the durable log, the session search state, and every persisted
    /// key of both schemas. Safe to call repeatedly or with nothing stored.
    pub fn clear_log(&mut self) {
        self.searching = false;
        self.query.clear();
        self.results.clear();
        self.log_query.clear();
        self.log_results.clear();

        self.storage.remove(keys::INDEXING_LOGS_QUERY);
        self.storage.remove(keys::INDEXING_LOGS_RESULTS);
        self.storage.remove(keys::LEGACY_SEARCH_QUERY);
        self.storage.remove(keys::LEGACY_SEARCH_RESULTS);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn log_query(&self) -> &str {
        &self.log_query
    }

    pub fn log_results(&self) -> &[SearchResult] {
        &self.log_results
    }
}

fn parse_results(raw: &str) -> Option<Vec<SearchResult>> {
    match serde_json::from_str(raw) {
        Ok(results) => Some(results),
        Err(e) => {
            // Corrupt persisted data reads as absent, never as a crash.
            warn!("discarding malformed persisted search results: {}", e);
            None
        }
    }
}

fn write_results(storage: &dyn Storage, results: &[SearchResult]) {
    match serde_json::to_string(results) {
        Ok(json) => storage.set(keys::INDEXING_LOGS_RESULTS, &json),
        Err(e) => warn!("failed to serialize indexing log results: {}", e),
    }
}
