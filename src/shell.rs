//! Native shell capability seam.
//!
//! The core never talks to a privileged bridge directly; the hosting shell
//! (whatever windowing layer embeds this crate) supplies an implementation.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ShellBridge: Send + Sync {
    /// Opens the native folder picker. `Ok(None)` means the user cancelled.
    async fn pick_folder(&self) -> Result<Option<PathBuf>>;

    /// Opens a file with the platform's default application.
    async fn open_file(&self, path: &Path) -> Result<()>;
}
