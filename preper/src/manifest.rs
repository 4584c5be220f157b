// SPDX-License-Identifier: MIT

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller supplied metadata about the package being packed.
///
/// Only used to label installer runs and log lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,

    /// Where the checkout was resolved from, e.g. a git URL with commit.
    #[serde(default, rename = "_resolved", alias = "resolved")]
    pub resolved: String,
}

impl PackageManifest {
    pub fn new(name: impl Into<String>, resolved: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: resolved.into(),
        }
    }
}

impl fmt::Display for PackageManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.resolved)
    }
}
