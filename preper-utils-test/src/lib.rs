// SPDX-License-Identifier: MIT

//! Test utilities for preper.
//!
//! Provides on-disk package fixtures and proptest strategies shared by the
//! workspace crates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use proptest::prelude::*;
use tempfile::TempDir;

/// A wrapper around TempDir that provides a canonicalized path.
/// This resolves symlinks like /var -> /private/var on macOS, so paths
/// compared in assertions match what the code under test sees.
pub struct CanonicalTempDir {
    _inner: TempDir,
    path: PathBuf,
}

impl CanonicalTempDir {
    /// Create a new temporary directory with a canonicalized path.
    pub fn new() -> io::Result<Self> {
        let inner = TempDir::new()?;
        let path = inner.path().canonicalize()?;
        Ok(Self {
            _inner: inner,
            path,
        })
    }

    /// Get the canonicalized path to the temporary directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A package checkout on disk, removed when dropped.
pub struct PackageFixture {
    dir: CanonicalTempDir,
}

impl PackageFixture {
    /// An empty directory without a `package.json`.
    pub fn empty() -> io::Result<Self> {
        Ok(Self {
            dir: CanonicalTempDir::new()?,
        })
    }

    /// A package whose `package.json` is the given JSON value.
    pub fn with_manifest(manifest: &serde_json::Value) -> io::Result<Self> {
        let fixture = Self::empty()?;
        fixture.write_manifest(manifest)?;
        Ok(fixture)
    }

    /// A package with only `name` and `version` declared.
    pub fn with_name(name: &str) -> io::Result<Self> {
        Self::with_manifest(&serde_json::json!({ "name": name, "version": "1.0.0" }))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Overwrite `package.json`.
    pub fn write_manifest(&self, manifest: &serde_json::Value) -> io::Result<PathBuf> {
        let json = serde_json::to_string_pretty(manifest).map_err(io::Error::other)?;
        self.write("package.json", json)
    }

    /// Write a file at the `/`-separated relative path, creating parents.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Like [`write`](Self::write) but marks the file executable on unix.
    pub fn write_executable(&self, rel: &str, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let path = self.write(rel, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(path)
    }

    /// Set the modification time of every regular file in the fixture.
    pub fn set_mtime_all(&self, time: SystemTime) -> io::Result<()> {
        set_mtime_recursive(self.path(), time)
    }
}

fn set_mtime_recursive(dir: &Path, time: SystemTime) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            set_mtime_recursive(&entry.path(), time)?;
        } else if file_type.is_file() {
            fs::File::options()
                .write(true)
                .open(entry.path())?
                .set_modified(time)?;
        }
    }
    Ok(())
}

/// List every entry below `dir`, as sorted `/`-separated relative paths.
pub fn list_tree(dir: &Path) -> io::Result<Vec<String>> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let rel = path
                .strip_prefix(root)
                .map_err(io::Error::other)?
                .to_string_lossy()
                .replace('\\', "/");
            out.push(rel);
            if entry.file_type()?.is_dir() {
                walk(root, &path, out)?;
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    if dir.exists() {
        walk(dir, dir, &mut out)?;
    }
    out.sort();
    Ok(out)
}

pub fn arb_filename() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9@_+=.-]{1,24}".prop_filter("Not cur and parent dir", |s| s != "." && s != "..")
}

prop_compose! {
    /// A `/`-separated relative path without `.` or `..` components.
    pub fn arb_relative_path()(parts in proptest::collection::vec(arb_filename(), 1..6)) -> String
    {
        parts.join("/")
    }
}
