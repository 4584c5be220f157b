// SPDX-License-Identifier: MIT

//! Prepare and pack package checkouts that did not come from a registry.
//!
//! A package fetched from a git host has not been through a registry publish,
//! so its `prepare` script may never have run. [`Preper`] fixes that up: it
//! installs dependencies and runs the build when the package declares a
//! `prepare` script, packs the distributable files into a reproducible
//! `.tgz`, and hands the archive out as a [`PackStream`].
//!
//! # Pipeline
//!
//! ```text
//! read package.json ─▶ install + prepare (if declared) ─▶ Prepared
//!                                                        │
//!     stream bytes ◀─ rename into place ◀─ tar + gzip ◀──┘
//! ```
//!
//! Every stage failure ends the stream with a single error. Archives are
//! written inside a private temp workspace and only become visible at their
//! destination through a rename, so a half written archive is never
//! observable.
//!
//! # Collaborators
//!
//! Dependency installation ([`Installer`]), file list resolution
//! ([`FileLister`]) and the archive codec ([`ArchiveCodec`]) are injected, with
//! [`CommandInstaller`], [`PackListResolver`] and [`TarballCodec`] as the
//! defaults wired up by [`Preper::from_config`].

pub mod builder;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod gate;
pub mod installer;
pub mod lister;
pub mod manifest;
pub mod publisher;
pub mod stream;
pub mod temp;

pub use codec::{ArchiveCodec, TarballCodec};
pub use config::Config;
pub use descriptor::PackageDescriptor;
pub use error::{ConfigError, InstallError, IoContext, PackError};
pub use gate::should_prepare;
pub use installer::{CommandInstaller, Installer};
pub use lister::{FileLister, PackListResolver};
pub use manifest::PackageManifest;
pub use publisher::{Phase, Preper};
pub use stream::{PackEvent, PackStream};
pub use temp::TempSpace;

#[cfg(test)]
mod tests;
