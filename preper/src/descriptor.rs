// SPDX-License-Identifier: MIT

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PackError;

pub const DESCRIPTOR_FILE: &str = "package.json";

/// The `package.json` of a source directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Option<String>,
    /// Kept as raw JSON: only `prepare` is read, and other entries may hold
    /// anything.
    pub scripts: Value,
}

impl PackageDescriptor {
    /// Read and parse `package.json` below `dir`.
    pub async fn read(dir: &Path) -> Result<Self, PackError> {
        let path = dir.join(DESCRIPTOR_FILE);
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|source| PackError::ReadDescriptor {
                path: path.clone(),
                source,
            })?;
        serde_json::from_slice(&contents)
            .map_err(|source| PackError::ParseDescriptor { path, source })
    }

    pub fn prepare_script(&self) -> Option<&str> {
        self.scripts.get("prepare").and_then(Value::as_str)
    }
}
