// SPDX-License-Identifier: MIT

use std::path::PathBuf;

/// Root directory every entry is stored under.
pub const PACKAGE_PREFIX: &str = "package/";

/// `1985-10-26T08:15:00Z` as seconds since the unix epoch.
///
/// Zip tooling downstream mishandles entries dated at the epoch itself, so a
/// fixed date in the 1980s is used instead of zero.
pub const FIXED_MTIME: u64 = 499_162_500;

/// Parameters for a single archive write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarballOptions {
    /// Archive file to create (truncated if it exists).
    pub file: PathBuf,
    /// Directory entry names are resolved against.
    pub cwd: PathBuf,
    /// Prefix joined in front of every stored entry name.
    pub prefix: String,
    /// Drop owner ids and names and normalize modes.
    pub portable: bool,
    /// Modification time for every entry; `None` keeps each file's own mtime.
    pub mtime: Option<u64>,
    /// Wrap the tar stream in gzip.
    pub gzip: bool,
}

impl TarballOptions {
    /// Options producing a reproducible `package/` rooted `.tgz`.
    pub fn new(file: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            cwd: cwd.into(),
            prefix: PACKAGE_PREFIX.to_string(),
            portable: true,
            mtime: Some(FIXED_MTIME),
            gzip: true,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn portable(mut self, portable: bool) -> Self {
        self.portable = portable;
        self
    }

    pub fn mtime(mut self, mtime: Option<u64>) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }
}
