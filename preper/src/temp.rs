// SPDX-License-Identifier: MIT

//! Scoped temp workspaces.
//!
//! Each workspace is a fresh directory below a shared base directory, owned by
//! exactly one operation. It is removed once the operation's future settles,
//! whatever the outcome, on the blocking pool. If the future is dropped midway
//! the [`TempDir`] guard removes it instead.

use std::future::Future;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{trace, warn};

use crate::error::{IoContext, PackError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempSpace {
    base: PathBuf,
}

impl TempSpace {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Run `f` with a new workspace named `<prefix>XXXXXX` and remove it after.
    pub async fn with_temp<F, Fut, T>(&self, prefix: &str, f: F) -> Result<T, PackError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T, PackError>>,
    {
        let dir = self.allocate(prefix).await?;
        let path = dir.path().to_owned();
        trace!("Allocated temp workspace {}", path.display());

        let result = f(path.clone()).await;

        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => trace!("Removed temp workspace {}", path.display()),
            Ok(Err(e)) => warn!("Failed to remove temp workspace {}: {e}", path.display()),
            Err(e) => warn!("Temp workspace removal of {} aborted: {e}", path.display()),
        }
        result
    }

    async fn allocate(&self, prefix: &str) -> Result<TempDir, PackError> {
        tokio::fs::create_dir_all(&self.base)
            .await
            .io_context(|| format!("Failed to create temp base {}", self.base.display()))?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&self.base)
            .io_context(|| {
                format!(
                    "Failed to create temp workspace in {}",
                    self.base.display()
                )
            })
    }
}
