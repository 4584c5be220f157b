// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::process::ExitStatus;

use preper_packlist::PackListError;
use preper_tarball::TarballError;
use thiserror::Error;

/// Failure of a single pack operation. Every variant is terminal.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("Failed to read package descriptor {}: {source}", path.display())]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse package descriptor {}: {source}", path.display())]
    ParseDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dependency installation failed: {0}")]
    Install(#[from] InstallError),

    #[error("Failed to resolve package files: {0}")]
    FileList(#[from] PackListError),

    #[error("Failed to write archive: {0}")]
    Archive(#[from] TarballError),

    #[error("Failed to publish {} to {}: {source}", from.display(), to.display())]
    Publish {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid archive target {}: {reason}", path.display())]
    InvalidTarget { path: PathBuf, reason: &'static str },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output stream closed by consumer")]
    Closed,
}

impl PackError {
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

/// Failure reported by an [`Installer`](crate::Installer).
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("{reason}")]
    Other { reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Helper trait for adding context to IO errors
pub trait IoContext<T> {
    fn io_context<F>(self, f: F) -> Result<T, PackError>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T, PackError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PackError::io(f(), e))
    }
}
