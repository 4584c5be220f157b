// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackListError {
    #[error("walking package directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read ignore file {path}: {source}")]
    ReadIgnore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ignore rules in {path}: {source}")]
    Ignore {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("file list resolution aborted: {reason}")]
    Aborted { reason: String },

    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },
}
