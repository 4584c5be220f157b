// SPDX-License-Identifier: MIT

use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::PackListError;

/// The parts of `package.json` that influence the file list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageFiles {
    pub files: Option<Vec<String>>,
    pub main: Option<String>,
    pub bin: Option<serde_json::Value>,
}

impl PackageFiles {
    /// Read `package.json` below `root`. A missing file yields the defaults.
    pub fn read(root: &Path) -> Result<Self, PackListError> {
        let path = root.join("package.json");
        let contents = match std::fs::read(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(PackListError::ReadManifest { path, source }),
        };
        serde_json::from_slice(&contents)
            .map_err(|source| PackListError::ParseManifest { path, source })
    }

    /// `main` and `bin` targets, normalized to `/`-separated relative paths.
    pub fn entry_points(&self) -> Vec<String> {
        let bins: Vec<&str> = match &self.bin {
            Some(serde_json::Value::String(bin)) => vec![bin.as_str()],
            Some(serde_json::Value::Object(bins)) => {
                bins.values().filter_map(|v| v.as_str()).collect()
            }
            _ => Vec::new(),
        };
        self.main
            .as_deref()
            .into_iter()
            .chain(bins)
            .filter_map(normalize)
            .collect()
    }
}

/// Strip `./` markers and leading slashes; reject paths leaving the package.
pub(crate) fn normalize(raw: &str) -> Option<String> {
    let raw = raw.replace('\\', "/");
    let mut parts = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            part => parts.push(part),
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case::plain("index.js", Some("index.js"))]
    #[case::dotted("./lib/index.js", Some("lib/index.js"))]
    #[case::rooted("/lib//x.js", Some("lib/x.js"))]
    #[case::escape("../outside.js", None)]
    #[case::empty("./", None)]
    #[case::backslashes("bin\\cli.js", Some("bin/cli.js"))]
    fn normalizes_paths(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize(raw).as_deref(), expected);
    }

    #[test]
    fn entry_points_cover_main_and_bin_forms() {
        let single: PackageFiles =
            serde_json::from_value(json!({ "main": "./main.js", "bin": "cli.js" })).unwrap();
        assert_eq!(single.entry_points(), ["main.js", "cli.js"]);

        let map: PackageFiles =
            serde_json::from_value(json!({ "bin": { "a": "bin/a.js", "b": "./bin/b.js" } }))
                .unwrap();
        assert_eq!(map.entry_points(), ["bin/a.js", "bin/b.js"]);
    }
}
