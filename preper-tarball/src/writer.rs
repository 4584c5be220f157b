// SPDX-License-Identifier: MIT

use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};
use tracing::{debug, trace};

use crate::{TarballError, TarballOptions};

/// Gzip OS byte for "unknown", keeps the header identical across hosts.
const GZIP_OS_UNKNOWN: u8 = 255;

/// Map a file list entry to the name stored in the archive.
///
/// Leading `./` markers are stripped and the remaining `/`-separated path is
/// joined onto `prefix`. Absolute paths and `..` components are rejected so
/// that no entry can escape the archive root.
pub fn entry_name(prefix: &str, raw: &str) -> Result<String, TarballError> {
    let rel = relative_path(raw)?;
    if prefix.is_empty() || prefix.ends_with('/') {
        Ok(format!("{prefix}{rel}"))
    } else {
        Ok(format!("{prefix}/{rel}"))
    }
}

fn relative_path(raw: &str) -> Result<String, TarballError> {
    let invalid = |reason| TarballError::InvalidPath {
        path: raw.to_string(),
        reason,
    };

    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(invalid("absolute path"));
    }

    let mut parts = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid("parent directory component")),
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(parts.join("/"))
}

fn mtime_of(meta: &Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt as _;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    if meta.is_dir() {
        0o755
    } else if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn portable_mode(entry_type: EntryType, mode: u32) -> u32 {
    match entry_type {
        EntryType::Directory => 0o755,
        EntryType::Symlink => 0o777,
        _ if mode & 0o111 != 0 => 0o755,
        _ => 0o644,
    }
}

fn fill_header(
    header: &mut Header,
    meta: &Metadata,
    entry_type: EntryType,
    opts: &TarballOptions,
) -> io::Result<()> {
    header.set_entry_type(entry_type);
    header.set_mtime(opts.mtime.unwrap_or_else(|| mtime_of(meta)));

    let mode = mode_of(meta);
    if opts.portable {
        header.set_mode(portable_mode(entry_type, mode));
        header.set_uid(0);
        header.set_gid(0);
        header.set_username("")?;
        header.set_groupname("")?;
    } else {
        header.set_mode(mode);
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt as _;
            header.set_uid(u64::from(meta.uid()));
            header.set_gid(u64::from(meta.gid()));
        }
    }
    Ok(())
}

fn append_entry<W: Write>(
    builder: &mut Builder<W>,
    opts: &TarballOptions,
    raw: &str,
) -> Result<(), TarballError> {
    let rel = relative_path(raw)?;
    let name = entry_name(&opts.prefix, &rel)?;
    let source = opts.cwd.join(&rel);

    let meta = fs::symlink_metadata(&source)
        .map_err(|e| TarballError::metadata_error(&source, e))?;
    let file_type = meta.file_type();
    let mut header = Header::new_gnu();

    if file_type.is_file() {
        fill_header(&mut header, &meta, EntryType::Regular, opts)
            .map_err(|e| TarballError::append_error(&source, e))?;
        header.set_size(meta.len());
        let file = File::open(&source).map_err(|e| TarballError::append_error(&source, e))?;
        builder
            .append_data(&mut header, &name, io::Read::take(file, meta.len()))
            .map_err(|e| TarballError::append_error(&source, e))?;
    } else if file_type.is_dir() {
        fill_header(&mut header, &meta, EntryType::Directory, opts)
            .map_err(|e| TarballError::append_error(&source, e))?;
        header.set_size(0);
        builder
            .append_data(&mut header, format!("{name}/"), io::empty())
            .map_err(|e| TarballError::append_error(&source, e))?;
    } else if file_type.is_symlink() {
        let target =
            fs::read_link(&source).map_err(|e| TarballError::metadata_error(&source, e))?;
        fill_header(&mut header, &meta, EntryType::Symlink, opts)
            .map_err(|e| TarballError::append_error(&source, e))?;
        header.set_size(0);
        builder
            .append_link(&mut header, &name, &target)
            .map_err(|e| TarballError::append_error(&source, e))?;
    } else {
        return Err(TarballError::UnsupportedFileType { path: source });
    }

    trace!("Appended {} as {}", source.display(), name);
    Ok(())
}

fn write_archive<W: Write>(
    out: W,
    opts: &TarballOptions,
    files: &[impl AsRef<str>],
) -> Result<W, TarballError> {
    let mut builder = Builder::new(out);
    for file in files {
        append_entry(&mut builder, opts, file.as_ref())?;
    }
    builder
        .into_inner()
        .map_err(|e| TarballError::finish_error(&opts.file, e))
}

fn finish_file(out: BufWriter<File>, path: &Path) -> Result<(), TarballError> {
    let file = out
        .into_inner()
        .map_err(|e| TarballError::finish_error(path, e.into_error()))?;
    file.sync_all()
        .map_err(|e| TarballError::finish_error(path, e))
}

/// Write `files` (relative to `opts.cwd`) into the archive at `opts.file`.
///
/// This blocks on filesystem I/O; async callers should use [`create`].
pub fn create_tarball(
    opts: &TarballOptions,
    files: &[impl AsRef<str>],
) -> Result<(), TarballError> {
    let file =
        File::create(&opts.file).map_err(|e| TarballError::create_archive_error(&opts.file, e))?;
    let out = BufWriter::new(file);

    let out = if opts.gzip {
        let encoder = GzBuilder::new()
            .mtime(0)
            .operating_system(GZIP_OS_UNKNOWN)
            .write(out, Compression::default());
        write_archive(encoder, opts, files)?
            .finish()
            .map_err(|e| TarballError::finish_error(&opts.file, e))?
    } else {
        write_archive(out, opts, files)?
    };
    finish_file(out, &opts.file)?;

    debug!(
        "Packed {} entries from {} into {}",
        files.len(),
        opts.cwd.display(),
        opts.file.display()
    );
    Ok(())
}

/// Async wrapper around [`create_tarball`] running on the blocking pool.
pub async fn create(opts: TarballOptions, files: Vec<String>) -> Result<(), TarballError> {
    tokio::task::spawn_blocking(move || create_tarball(&opts, &files)).await?
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use flate2::read::GzDecoder;
    use preper_utils_test::PackageFixture;
    use rstest::rstest;

    use super::*;
    use crate::FIXED_MTIME;

    struct Stored {
        name: String,
        mtime: u64,
        mode: u32,
        uid: u64,
        gid: u64,
        kind: EntryType,
    }

    fn read_stored(path: &Path, gzip: bool) -> Vec<Stored> {
        let file = File::open(path).unwrap();
        let reader: Box<dyn io::Read> = if gzip {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let mut archive = tar::Archive::new(reader);
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let header = entry.header();
                Stored {
                    name: entry.path().unwrap().to_string_lossy().into_owned(),
                    mtime: header.mtime().unwrap(),
                    mode: header.mode().unwrap(),
                    uid: header.uid().unwrap(),
                    gid: header.gid().unwrap(),
                    kind: header.entry_type(),
                }
            })
            .collect()
    }

    fn sample_package() -> PackageFixture {
        let fixture = PackageFixture::with_name("sample").unwrap();
        fixture.write("index.js", "module.exports = 1;\n").unwrap();
        fixture.write("lib/util.js", "exports.util = true;\n").unwrap();
        fixture
    }

    #[rstest]
    #[case::plain("index.js", "package/index.js")]
    #[case::dot_slash("./index.js", "package/index.js")]
    #[case::repeated_dot("././lib/./a.js", "package/lib/a.js")]
    #[case::scoped("./@scope/file.js", "package/@scope/file.js")]
    #[case::backslash("lib\\a.js", "package/lib/a.js")]
    fn entry_names_join_prefix(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(entry_name("package/", raw).unwrap(), expected);
    }

    #[test]
    fn entry_name_adds_missing_separator() {
        assert_eq!(entry_name("package", "./a.js").unwrap(), "package/a.js");
        assert_eq!(entry_name("", "./a.js").unwrap(), "a.js");
    }

    #[rstest]
    #[case::parent("../secret")]
    #[case::nested_parent("lib/../../secret")]
    #[case::absolute("/etc/passwd")]
    #[case::empty("./")]
    fn entry_names_reject_escapes(#[case] raw: &str) {
        let err = entry_name("package/", raw).unwrap_err();
        assert!(matches!(err, TarballError::InvalidPath { .. }), "{err}");
    }

    #[test_log::test]
    fn entries_carry_prefix_and_fixed_mtime() {
        let fixture = sample_package();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("package.tgz");

        let opts = TarballOptions::new(&target, fixture.path());
        create_tarball(&opts, &["./package.json", "./index.js", "./lib/util.js"]).unwrap();

        let stored = read_stored(&target, true);
        let names: Vec<_> = stored.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["package/package.json", "package/index.js", "package/lib/util.js"]
        );
        assert!(stored.iter().all(|s| s.mtime == FIXED_MTIME));
    }

    #[test_log::test]
    fn output_ignores_real_mtimes() {
        let fixture = sample_package();
        let out = tempfile::tempdir().unwrap();
        let files = ["./package.json", "./index.js", "./lib/util.js"];

        let first = out.path().join("first.tgz");
        create_tarball(&TarballOptions::new(&first, fixture.path()), &files).unwrap();

        let later = SystemTime::now() + Duration::from_secs(86_400 * 30);
        fixture.set_mtime_all(later).unwrap();

        let second = out.path().join("second.tgz");
        create_tarball(&TarballOptions::new(&second, fixture.path()), &files).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test_log::test]
    fn scoped_names_are_stored_as_plain_paths() {
        let fixture = PackageFixture::with_name("@scope/pkg").unwrap();
        fixture.write("@scope/file.js", "x").unwrap();
        fixture.write("@@odd.js", "y").unwrap();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("scoped.tgz");

        create_tarball(
            &TarballOptions::new(&target, fixture.path()),
            &["./@scope/file.js", "./@@odd.js"],
        )
        .unwrap();

        let names: Vec<_> = read_stored(&target, true)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["package/@scope/file.js", "package/@@odd.js"]);
    }

    #[cfg(unix)]
    #[test_log::test]
    fn portable_mode_normalizes_owner_and_mode() {
        let fixture = sample_package();
        fixture.write_executable("bin/cli.js", "#!/usr/bin/env node\n").unwrap();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("portable.tgz");

        create_tarball(
            &TarballOptions::new(&target, fixture.path()),
            &["./index.js", "./bin/cli.js", "./lib"],
        )
        .unwrap();

        let stored = read_stored(&target, true);
        assert!(stored.iter().all(|s| s.uid == 0 && s.gid == 0));
        assert_eq!(stored[0].mode, 0o644);
        assert_eq!(stored[1].mode, 0o755);
        assert_eq!(stored[2].name.trim_end_matches('/'), "package/lib");
        assert_eq!(stored[2].kind, EntryType::Directory);
        assert_eq!(stored[2].mode, 0o755);
    }

    #[cfg(unix)]
    #[test_log::test]
    fn symlinks_are_stored_as_links() {
        let fixture = sample_package();
        std::os::unix::fs::symlink("index.js", fixture.path().join("alias.js")).unwrap();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("links.tgz");

        create_tarball(&TarballOptions::new(&target, fixture.path()), &["./alias.js"]).unwrap();

        let file = File::open(&target).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let entry = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(entry.header().entry_type(), EntryType::Symlink);
        assert_eq!(
            entry.link_name().unwrap().unwrap().to_string_lossy(),
            "index.js"
        );
    }

    #[test_log::test]
    fn uncompressed_output_keeps_real_mtime_when_unset() {
        let fixture = sample_package();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("plain.tar");
        let then = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fixture.set_mtime_all(then).unwrap();

        let opts = TarballOptions::new(&target, fixture.path())
            .gzip(false)
            .mtime(None);
        create_tarball(&opts, &["index.js"]).unwrap();

        let stored = read_stored(&target, false);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].mtime, 1_600_000_000);
    }

    #[test_log::test]
    fn missing_file_reports_its_path() {
        let fixture = sample_package();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("broken.tgz");

        let err = create_tarball(
            &TarballOptions::new(&target, fixture.path()),
            &["./index.js", "./missing.js"],
        )
        .unwrap_err();

        match err {
            TarballError::Io {
                operation, path, ..
            } => {
                assert_eq!(operation, crate::TarballOperation::ReadMetadata);
                assert!(path.ends_with("missing.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn async_create_matches_blocking_output() {
        let fixture = sample_package();
        let out = tempfile::tempdir().unwrap();
        let files = vec!["./package.json".to_string(), "./index.js".to_string()];

        let blocking = out.path().join("blocking.tgz");
        create_tarball(&TarballOptions::new(&blocking, fixture.path()), &files).unwrap();

        let spawned = out.path().join("spawned.tgz");
        create(TarballOptions::new(&spawned, fixture.path()), files)
            .await
            .unwrap();

        assert_eq!(fs::read(&blocking).unwrap(), fs::read(&spawned).unwrap());
    }
}

#[cfg(test)]
mod proptests {
    use preper_utils_test::arb_relative_path;
    use proptest::prelude::*;

    use super::entry_name;

    proptest! {
        #[test]
        fn dot_prefixed_names_round_to_plain(path in arb_relative_path()) {
            let stored = entry_name("package/", &format!("./{path}")).unwrap();
            prop_assert_eq!(stored, format!("package/{path}"));
        }
    }
}
