// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::Display;
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{Instrument, debug, info_span};

use crate::builder;
use crate::codec::{ArchiveCodec, TarballCodec};
use crate::config::Config;
use crate::descriptor::PackageDescriptor;
use crate::error::{ConfigError, IoContext, PackError};
use crate::gate::{reason_label, should_prepare};
use crate::installer::{CommandInstaller, Installer};
use crate::lister::{FileLister, PackListResolver};
use crate::manifest::PackageManifest;
use crate::stream::{self, CHANNEL_CAPACITY, PackSink, PackStream};
use crate::temp::TempSpace;

/// Prefix of the temp workspace a streamed archive is staged in.
pub const STREAM_TEMP_PREFIX: &str = "pacote-packing";

/// File name of the staged archive inside its workspace.
pub const STAGED_ARCHIVE: &str = "package.tgz";

/// Where a streamed pack operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[display("preparing")]
    Preparing,
    #[display("packing")]
    Packing,
    #[display("done")]
    Done,
    #[display("failed")]
    Failed,
}

struct Inner<I, L, C> {
    installer: I,
    lister: L,
    codec: C,
    temp: TempSpace,
    chunk_size: usize,
}

/// Prepares package checkouts and packs them into archives.
///
/// Cheap to clone; clones share their collaborators.
pub struct Preper<I = CommandInstaller, L = PackListResolver, C = TarballCodec> {
    inner: Arc<Inner<I, L, C>>,
}

impl<I, L, C> Clone for Preper<I, L, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Preper {
    /// A packer using the default collaborators configured by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config,
            CommandInstaller::from_config(config)?,
            PackListResolver,
            TarballCodec,
        ))
    }
}

impl<I, L, C> Preper<I, L, C>
where
    I: Installer,
    L: FileLister,
    C: ArchiveCodec,
{
    pub fn new(config: &Config, installer: I, lister: L, codec: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                installer,
                lister,
                codec,
                temp: TempSpace::new(&config.tmp_dir),
                chunk_size: config.chunk_size.max(1),
            }),
        }
    }

    pub fn temp_space(&self) -> &TempSpace {
        &self.inner.temp
    }

    /// Pack `dir` into a `.tgz` at `target` without running `prepare`.
    pub async fn pack_directory(&self, dir: &Path, target: &Path) -> Result<(), PackError> {
        let inner = &*self.inner;
        builder::pack(&inner.temp, &inner.lister, &inner.codec, dir, target).await
    }

    /// Prepare `dir` if it declares a `prepare` script, then stream its archive.
    ///
    /// Returns immediately; the work happens on a spawned task that stops once
    /// the returned stream is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn pack_remote_package(
        &self,
        manifest: PackageManifest,
        dir: impl Into<PathBuf>,
    ) -> PackStream {
        let dir = dir.into();
        let (sink, stream) = stream::channel(CHANNEL_CAPACITY);
        let span = info_span!("pack", package = %manifest.name, dir = %dir.display());
        let this = self.clone();

        tokio::spawn(
            async move {
                let mut phase = Phase::Preparing;
                match this.drive(&manifest, &dir, &sink, &mut phase).await {
                    Ok(()) => transition(&mut phase, Phase::Done),
                    Err(e) => {
                        transition(&mut phase, Phase::Failed);
                        debug!("Pack of {manifest} failed: {e}");
                        sink.fail(e).await;
                    }
                }
            }
            .instrument(span),
        );

        stream
    }

    /// Adapter for pipelines that take archive producers as plain functions.
    pub fn dir_packer(
        &self,
    ) -> impl Fn(PackageManifest, PathBuf) -> PackStream + Clone + Send + Sync + 'static {
        let this = self.clone();
        move |manifest, dir| this.pack_remote_package(manifest, dir)
    }

    async fn drive(
        &self,
        manifest: &PackageManifest,
        dir: &Path,
        sink: &PackSink,
        phase: &mut Phase,
    ) -> Result<(), PackError> {
        let inner = &*self.inner;

        let descriptor = PackageDescriptor::read(dir).await?;
        if should_prepare(&descriptor) {
            let reason = reason_label(&descriptor, manifest);
            inner.installer.install(dir, &reason).await?;
        } else {
            debug!("No prepare script in {}, skipping install", descriptor.name);
        }

        transition(phase, Phase::Packing);
        sink.prepared().await?;

        inner
            .temp
            .with_temp(STREAM_TEMP_PREFIX, |tmp| async move {
                let archive = tmp.join(STAGED_ARCHIVE);
                self.pack_directory(dir, &archive).await?;
                stream_file(&archive, inner.chunk_size, sink).await
            })
            .await
    }
}

/// Send the contents of `path` to `sink` in chunks of at most `chunk_size`.
async fn stream_file(path: &Path, chunk_size: usize, sink: &PackSink) -> Result<(), PackError> {
    let file = tokio::fs::File::open(path)
        .await
        .io_context(|| format!("Failed to open archive {}", path.display()))?;

    let mut chunks = ReaderStream::with_capacity(file, chunk_size);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.io_context(|| format!("Failed to read archive {}", path.display()))?;
        sink.data(chunk).await?;
    }
    Ok(())
}

fn transition(phase: &mut Phase, next: Phase) {
    debug!("{phase} -> {next}");
    *phase = next;
}
