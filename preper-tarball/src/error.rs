// SPDX-License-Identifier: MIT

use std::io;
use std::path::PathBuf;

use derive_more::Display;
use thiserror::Error;

#[derive(Display, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum TarballOperation {
    #[display("creating archive")]
    CreateArchive,
    #[display("reading entry metadata")]
    ReadMetadata,
    #[display("appending entry")]
    AppendEntry,
    #[display("finishing archive")]
    Finish,
}

#[derive(Error, Debug)]
pub enum TarballError {
    #[error("{operation} {path}: {source}")]
    Io {
        operation: TarballOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid entry path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("unsupported file type for entry {path}")]
    UnsupportedFileType { path: PathBuf },

    #[error("archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TarballError {
    pub fn io(operation: TarballOperation, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn create_archive_error(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::io(TarballOperation::CreateArchive, path, err)
    }

    pub fn metadata_error(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::io(TarballOperation::ReadMetadata, path, err)
    }

    pub fn append_error(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::io(TarballOperation::AppendEntry, path, err)
    }

    pub fn finish_error(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self::io(TarballOperation::Finish, path, err)
    }
}
