//! Application context: the composition root.
//!
//! Everything the original kept in ad-hoc globals lives here instead, built
//! once at startup from injected collaborators and torn down with the
//! process. Components own their state exclusively: the context only routes
//! between them and caches the last reconciled root list for screen gating.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio::sync::watch;

use crate::backend::Backend;
use crate::navigation::{search_gate, Nav, SearchGate};
use crate::poller::ProgressPoller;
use crate::reconciler::{self, PendingRoots, ReconcileError};
use crate::shell::ShellBridge;
use crate::state::IndexingProgress;
use crate::storage::{keys, Storage};
use crate::store::SearchStore;

pub struct AppContext {
    backend: Arc<dyn Backend>,
    storage: Arc<dyn Storage>,
    pub nav: Nav,
    pub search: SearchStore,
    roots: Vec<String>,
    user_name: String,
}

impl AppContext {
    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn Storage>) -> Self {
        // Older builds cached the root list locally; the backend owns it now,
        // so any stale copy is purged before it can shadow ground truth.
        storage.remove(keys::USER_ROUTES);

        let user_name = storage.get(keys::USER_NAME).unwrap_or_default();
        let nav = Nav::new(storage.clone());
        let search = SearchStore::load(storage.clone());

        Self {
            backend,
            storage,
            nav,
            search,
            roots: Vec::new(),
            user_name,
        }
    }

    /// Last reconciled/fetched root list. A cache for screen gating only,
    /// never a substitute for refetching before acting on roots.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Refreshes the cached root list from the backend, deduplicating while
    /// preserving backend order.
    pub async fn refresh_roots(&mut self) -> Result<&[String]> {
        let fetched = self.backend.fetch_roots().await?;
        let mut unique = Vec::with_capacity(fetched.len());
        for root in fetched {
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        self.roots = unique;
        Ok(&self.roots)
    }

    /// Reconciles the backend to `desired` and adopts the refetched ground
    /// truth, even when some of the batch failed.
    pub async fn apply_roots(&mut self, desired: &[String]) -> Result<(), ReconcileError> {
        match reconciler::reconcile(self.backend.as_ref(), desired).await {
            Ok(roots) => {
                self.roots = roots;
                Ok(())
            }
            Err(ReconcileError::Partial {
                roots,
                attempted,
                failures,
            }) => {
                self.roots = roots.clone();
                Err(ReconcileError::Partial {
                    roots,
                    attempted,
                    failures,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn run_search(&mut self, query: &str) -> Result<usize> {
        self.search.run_search(self.backend.as_ref(), query).await
    }

    pub fn search_gate(&self) -> SearchGate {
        search_gate(&self.roots)
    }

    pub fn spawn_poller(&self) -> (ProgressPoller, watch::Receiver<Option<IndexingProgress>>) {
        ProgressPoller::spawn(self.backend.clone())
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn save_user_name(&mut self, name: &str) {
        let name = name.trim();
        info!("saving user name ({} chars)", name.len());
        self.user_name = name.to_string();
        self.storage.set(keys::USER_NAME, name);
    }

    /// Avatar initials: first letter of the first and last words of the
    /// name, uppercased, with "U" standing in for an unset name.
    pub fn display_initials(&self) -> String {
        let name = self.user_name.trim();
        if name.is_empty() {
            return "U".to_string();
        }
        let mut words = name.split_whitespace();
        let first = words.next().and_then(|w| w.chars().next());
        let last = words.last().and_then(|w| w.chars().next());
        match (first, last) {
            (Some(f), Some(l)) => format!("{}{}", f.to_uppercase(), l.to_uppercase()),
            (Some(f), None) => f.to_uppercase().to_string(),
            _ => "U".to_string(),
        }
    }
}

/// Opens the native folder picker and stages the choice into a pending edit
/// buffer, surfacing capacity/duplicate rejections before any network call.
/// Returns the staged path, or `None` when the user cancelled.
pub async fn stage_picked_root(
    shell: &dyn ShellBridge,
    pending: &mut PendingRoots,
) -> Result<Option<String>> {
    let Some(path) = shell.pick_folder().await? else {
        return Ok(None);
    };
    let path = path.to_string_lossy().into_owned();
    pending.push(path.clone())?;
    Ok(Some(path))
}
