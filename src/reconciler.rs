//! Root reconciliation.
//!
//! The backend's registered root set is the single source of truth; the
//! client edits a [`PendingRoots`] buffer and then asks [`reconcile`] to
//! compute and apply the minimal add/remove batch. Paths are compared with
//! trailing separators stripped, but the backend's original strings are
//! preserved for removal calls.

use std::collections::HashSet;
use std::fmt;

use log::{debug, info, warn};
use thiserror::Error;

use crate::backend::Backend;
use crate::state::MAX_ROOTS;

/// Normalized form used for comparisons only. The backend always holds the
/// canonical unnormalized string.
pub fn normalize_root(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RootError {
    #[error("a maximum of 5 monitored roots is allowed")]
    CapacityExceeded,
    #[error("this folder is already added: {0}")]
    Duplicate(String),
}

/// User-edited, not-yet-applied root list. Ordering is preserved; duplicates
/// and the capacity ceiling are rejected at insertion time, before any
/// network call is made.
#[derive(Debug, Default, Clone)]
pub struct PendingRoots {
    paths: Vec<String>,
}

impl PendingRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the edit buffer from the backend's current list, dropping any
    /// duplicates the backend may have accumulated.
    pub fn from_current(roots: &[String]) -> Self {
        let mut pending = Self::new();
        for root in roots {
            let _ = pending.push(root.clone());
        }
        pending
    }

    pub fn push(&mut self, path: impl Into<String>) -> Result<(), RootError> {
        let path = path.into();
        if self.paths.len() >= MAX_ROOTS {
            return Err(RootError::CapacityExceeded);
        }
        let normalized = normalize_root(&path).to_string();
        if self
            .paths
            .iter()
            .any(|existing| normalize_root(existing) == normalized)
        {
            return Err(RootError::Duplicate(path));
        }
        self.paths.push(path);
        Ok(())
    }

    /// Removes the entry matching `path` under normalized comparison.
    pub fn remove(&mut self, path: &str) -> bool {
        let normalized = normalize_root(path);
        let before = self.paths.len();
        self.paths.retain(|p| normalize_root(p) != normalized);
        self.paths.len() != before
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_paths(self) -> Vec<String> {
        self.paths
    }
}

/// Minimal batch turning `current` into `desired`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Backend entries absent from the desired set, in the backend's own
    /// (unnormalized) spelling.
    pub to_remove: Vec<String>,
    /// Desired entries the backend does not have yet, in desired order.
    pub to_add: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

pub fn plan(desired: &[String], current: &[String]) -> ReconcilePlan {
    let desired_norm: HashSet<&str> = desired.iter().map(|p| normalize_root(p)).collect();
    let current_norm: HashSet<&str> = current.iter().map(|p| normalize_root(p)).collect();

    ReconcilePlan {
        to_remove: current
            .iter()
            .filter(|p| !desired_norm.contains(normalize_root(p)))
            .cloned()
            .collect(),
        to_add: desired
            .iter()
            .filter(|p| !current_norm.contains(normalize_root(p)))
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootOp {
    Add,
    Remove,
    Reindex,
}

impl fmt::Display for RootOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootOp::Add => write!(f, "add"),
            RootOp::Remove => write!(f, "remove"),
            RootOp::Reindex => write!(f, "reindex"),
        }
    }
}

/// One failed backend call within a reconciliation batch.
#[derive(Debug, Clone)]
pub struct FailedOp {
    pub op: RootOp,
    /// `None` for the batch-level reindex trigger.
    pub path: Option<String>,
    pub reason: String,
}

impl fmt::Display for FailedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {}: {}", self.op, path, self.reason),
            None => write!(f, "{}: {}", self.op, self.reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The authoritative root list could not be read; nothing was applied
    /// (or, for the post-apply fetch, ground truth is unknown).
    #[error("could not fetch the backend root list: {0}")]
    Fetch(#[source] anyhow::Error),
    /// Some calls in the batch failed. `roots` is the refetched ground truth
    /// after the batch ran.
    #[error("{} of {} root changes failed", failures.len(), attempted)]
    Partial {
        roots: Vec<String>,
        attempted: usize,
        failures: Vec<FailedOp>,
    },
}

/// Makes the backend's root set match `desired`.
///
/// Removals are fully applied before any addition, so swapping one root for
/// another never transiently exceeds the ceiling. A failing entry is
/// recorded and skipped, never aborting the rest of the batch. Exactly one
/// reindex trigger is issued per batch, and only when at least one change
/// actually landed; reindexing is a full rescan, so a zero-change
/// reconciliation must not cause one. The returned list is always refetched
/// from the backend, never assumed from local optimism.
pub async fn reconcile(
    backend: &dyn Backend,
    desired: &[String],
) -> Result<Vec<String>, ReconcileError> {
    let current = backend.fetch_roots().await.map_err(ReconcileError::Fetch)?;
    let batch = plan(desired, &current);

    if batch.is_empty() {
        debug!("reconcile: no changes, skipping reindex");
        return Ok(current);
    }

    let attempted = batch.to_remove.len() + batch.to_add.len();
    let mut failures = Vec::new();
    let mut applied = 0usize;

    for path in &batch.to_remove {
        match backend.remove_root(path).await {
            Ok(()) => applied += 1,
            Err(e) => {
                warn!("reconcile: failed to remove root {}: {}", path, e);
                failures.push(FailedOp {
                    op: RootOp::Remove,
                    path: Some(path.clone()),
                    reason: e.to_string(),
                });
            }
        }
    }

    for path in &batch.to_add {
        match backend.add_root(path).await {
            Ok(()) => applied += 1,
            Err(e) => {
                warn!("reconcile: failed to add root {}: {}", path, e);
                failures.push(FailedOp {
                    op: RootOp::Add,
                    path: Some(path.clone()),
                    reason: e.to_string(),
                });
            }
        }
    }

    let roots = backend.fetch_roots().await.map_err(ReconcileError::Fetch)?;

    if applied > 0 {
        info!(
            "reconcile: applied {}/{} changes, triggering full reindex",
            applied, attempted
        );
        if let Err(e) = backend.trigger_indexing().await {
            warn!("reconcile: reindex trigger failed: {}", e);
            failures.push(FailedOp {
                op: RootOp::Reindex,
                path: None,
                reason: e.to_string(),
            });
        }
    }

    if failures.is_empty() {
        Ok(roots)
    } else {
        Err(ReconcileError::Partial {
            roots,
            attempted,
            failures,
        })
    }
}
