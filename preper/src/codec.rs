// SPDX-License-Identifier: MIT

use std::future::Future;

use preper_tarball::{TarballError, TarballOptions};

/// Writes a compressed archive of `files` as described by `options`.
pub trait ArchiveCodec: Send + Sync + 'static {
    fn create_archive(
        &self,
        options: TarballOptions,
        files: Vec<String>,
    ) -> impl Future<Output = Result<(), TarballError>> + Send;
}

/// tar + gzip via [`preper_tarball`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TarballCodec;

impl ArchiveCodec for TarballCodec {
    async fn create_archive(
        &self,
        options: TarballOptions,
        files: Vec<String>,
    ) -> Result<(), TarballError> {
        preper_tarball::create(options, files).await
    }
}
