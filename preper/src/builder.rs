// SPDX-License-Identifier: MIT

//! Packs a package directory into a `.tgz` at a target path.
//!
//! The archive is written inside a temp workspace and moved to the target in a
//! single rename, so the target either holds a complete archive or is left
//! as it was.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::codec::ArchiveCodec;
use crate::descriptor::PackageDescriptor;
use crate::error::PackError;
use crate::lister::FileLister;
use crate::temp::TempSpace;
use preper_tarball::TarballOptions;

/// Prefix of the temp workspace an archive is written in.
pub const PACK_TEMP_PREFIX: &str = "packing";

/// Pack `dir` into a gzip'd tarball at `target`.
pub async fn pack<L, C>(
    temp: &TempSpace,
    lister: &L,
    codec: &C,
    dir: &Path,
    target: &Path,
) -> Result<(), PackError>
where
    L: FileLister,
    C: ArchiveCodec,
{
    // Fail on a broken descriptor before anything touches the disk.
    let descriptor = PackageDescriptor::read(dir).await?;
    let file_name = target.file_name().ok_or_else(|| PackError::InvalidTarget {
        path: target.to_owned(),
        reason: "target has no file name",
    })?;

    temp.with_temp(PACK_TEMP_PREFIX, |tmp| async move {
        let tmp_target = tmp.join(file_name);

        let files: Vec<String> = lister
            .list_files(dir)
            .await?
            .into_iter()
            .map(|f| format!("./{f}"))
            .collect();
        debug!(
            "Packing {} files of {} into {}",
            files.len(),
            descriptor.name,
            tmp_target.display()
        );

        codec
            .create_archive(TarballOptions::new(&tmp_target, dir), files)
            .await?;

        publish(&tmp_target, target).await?;
        debug!("Published {}", target.display());
        Ok(())
    })
    .await
}

/// Move `from` to `to`, replacing `to` atomically.
///
/// When the temp workspace lives on another filesystem the archive is first
/// copied next to `to` and renamed from there.
async fn publish(from: &Path, to: &Path) -> Result<(), PackError> {
    let publish_error = |source| PackError::Publish {
        from: from.to_owned(),
        to: to.to_owned(),
        source,
    };

    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Rename of {} crosses devices", from.display());
            copy_then_rename(from, to).await.map_err(publish_error)
        }
        Err(e) => Err(publish_error(e)),
    }
}

/// Copy `from` to a hidden sibling of `to`, then rename that over `to`.
///
/// The sibling is removed again if either step fails.
async fn copy_then_rename(from: &Path, to: &Path) -> io::Result<()> {
    let staged = staging_path(to);
    debug!("Staging {} at {}", from.display(), staged.display());
    let result = async {
        tokio::fs::copy(from, &staged).await?;
        tokio::fs::rename(&staged, to).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&staged).await;
    }
    result
}

fn staging_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    to.with_file_name(format!(".{name}.{}.partial", std::process::id()))
}
