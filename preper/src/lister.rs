// SPDX-License-Identifier: MIT

use std::future::Future;
use std::path::Path;

use preper_packlist::PackListError;

/// Resolves which files of a package directory belong in its archive.
pub trait FileLister: Send + Sync + 'static {
    /// `/`-separated paths relative to `dir`, in archive order.
    fn list_files(
        &self,
        dir: &Path,
    ) -> impl Future<Output = Result<Vec<String>, PackListError>> + Send;
}

/// The packlist rules from [`preper_packlist`], run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackListResolver;

impl FileLister for PackListResolver {
    async fn list_files(&self, dir: &Path) -> Result<Vec<String>, PackListError> {
        let dir = dir.to_owned();
        tokio::task::spawn_blocking(move || preper_packlist::list_files(&dir))
            .await
            .map_err(|e| PackListError::Aborted {
                reason: e.to_string(),
            })?
    }
}
