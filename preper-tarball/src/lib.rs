// SPDX-License-Identifier: MIT

//! Reproducible tarball packing.
//!
//! This crate turns a list of files below a directory into a gzip compressed
//! tar archive whose bytes depend only on the file contents, names and
//! execute bits. It is the archive codec used by `preper` to pack package
//! checkouts the way a registry publish would.
//!
//! # Reproducibility
//!
//! With the default [`TarballOptions`]:
//!
//! - every entry is stored below the [`PACKAGE_PREFIX`] root,
//! - every entry carries the same [`FIXED_MTIME`],
//! - portable mode drops owner ids, owner names and permission noise,
//! - the gzip header carries no timestamp and an "unknown" OS byte.
//!
//! Entries are written in the order given, so callers that want stable output
//! must hand in a stable file list.

mod error;
mod options;
mod writer;

pub use error::{TarballError, TarballOperation};
pub use options::{FIXED_MTIME, PACKAGE_PREFIX, TarballOptions};
pub use writer::{create, create_tarball, entry_name};
