//! Adaptive indexing-progress polling.
//!
//! One fetch in flight at a time: each cycle schedules the next only after
//! its own fetch resolves. Consumers watch the published
//! `Option<IndexingProgress>`; `None` means nothing should be shown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::state::{IndexingPhase, IndexingProgress};

/// Poll cadence while the backend reports active indexing.
pub const FAST_POLL: Duration = Duration::from_millis(1000);
/// Poll cadence when idle, after completion, and after a fetch failure.
pub const SLOW_POLL: Duration = Duration::from_millis(5000);
/// How long a just-completed run stays visible before being cleared.
pub const COMPLETE_LINGER: Duration = Duration::from_millis(3000);

/// Handle to a running poll loop. Dropping it (or calling [`stop`]) cancels
/// the loop, including a pending completion-linger timer; the liveness flag
/// guarantees a response that arrives after cancellation is never published.
///
/// [`stop`]: ProgressPoller::stop
pub struct ProgressPoller {
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ProgressPoller {
    pub fn spawn(
        backend: Arc<dyn Backend>,
    ) -> (Self, watch::Receiver<Option<IndexingProgress>>) {
        let (tx, rx) = watch::channel(None);
        let alive = Arc::new(AtomicBool::new(true));
        let flag = alive.clone();
        let task = tokio::spawn(async move {
            poll_loop(backend, tx, flag).await;
        });
        (Self { alive, task }, rx)
    }

    pub fn stop(self) {
        self.shutdown();
    }

    fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_loop(
    backend: Arc<dyn Backend>,
    tx: watch::Sender<Option<IndexingProgress>>,
    alive: Arc<AtomicBool>,
) {
    let mut last_phase = IndexingPhase::Idle;

    loop {
        if !alive.load(Ordering::SeqCst) || tx.is_closed() {
            return;
        }

        let delay = match backend.fetch_progress().await {
            Ok(progress) => {
                if !alive.load(Ordering::SeqCst) {
                    return;
                }
                let phase = progress.phase;
                let was_complete = last_phase == IndexingPhase::Complete;
                last_phase = phase;

                if progress.indexing {
                    debug!(
                        "indexing progress: {}% ({}/{})",
                        progress.percentage, progress.processed_files, progress.total_files
                    );
                    let _ = tx.send(Some(progress));
                    FAST_POLL
                } else if phase == IndexingPhase::Complete && !was_complete {
                    // Just finished: keep the final snapshot visible briefly,
                    // then clear it, with the next poll still on the slow
                    // cadence relative to this fetch.
                    let _ = tx.send(Some(progress));
                    tokio::time::sleep(COMPLETE_LINGER).await;
                    if !alive.load(Ordering::SeqCst) {
                        return;
                    }
                    let _ = tx.send(None);
                    SLOW_POLL - COMPLETE_LINGER
                } else {
                    if phase != IndexingPhase::Complete {
                        let _ = tx.send(None);
                    }
                    SLOW_POLL
                }
            }
            Err(e) => {
                // Transient backend unavailability; retry on the slow cadence.
                warn!("failed to fetch indexing progress: {}", e);
                SLOW_POLL
            }
        };

        tokio::time::sleep(delay).await;
    }
}
