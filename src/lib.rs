//! Client-side state sync core for the SAGE local semantic search backend.
//!
//! The backend owns the authoritative state (registered roots, the index,
//! search ranking); this crate keeps a desktop client's view of that state
//! correct and durable across restarts, partial failures, and backend-side
//! changes. The windowing/rendering layer that embeds it stays out of scope
//! and plugs in through the [`shell::ShellBridge`] capability seam.

pub mod app;
pub mod backend;
pub mod navigation;
pub mod poller;
pub mod reconciler;
pub mod shell;
pub mod state;
pub mod storage;
pub mod store;

pub use app::AppContext;
pub use backend::{Backend, BackendClient};
pub use navigation::{Nav, Screen, SearchGate};
pub use poller::ProgressPoller;
pub use reconciler::{reconcile, PendingRoots, ReconcileError, RootError};
pub use state::{IndexingPhase, IndexingProgress, SearchResult};
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::SearchStore;
