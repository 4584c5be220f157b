// SPDX-License-Identifier: MIT

//! Package file list resolution.
//!
//! Decides which files of a package checkout end up in its tarball, following
//! the rules a registry publish applies:
//!
//! 1. Files that never belong in a package (VCS metadata, `node_modules`,
//!    editor droppings, npm's own logs and rc files) are always skipped.
//! 2. Each directory's `.npmignore`, or its `.gitignore` when there is no
//!    `.npmignore`, removes matching paths below it. Gitignore syntax,
//!    including `!` re-includes, with deeper files taking precedence.
//! 3. A `files` allow-list in `package.json`, when present, keeps only the
//!    paths it names.
//! 4. `package.json`, readme, license and changelog files, plus the `main`
//!    and `bin` targets, are kept regardless of 2 and 3.
//!
//! The result is sorted, so the same tree always yields the same list.

mod error;
mod manifest;
mod rules;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

pub use error::PackListError;
pub use manifest::PackageFiles;
use rules::{AllowList, IgnoreRules, is_always_included_root_file, is_never_included};

/// File list resolver rooted at a package directory.
#[derive(Debug, Clone)]
pub struct PackList {
    root: PathBuf,
}

impl PackList {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk the package and return its `/`-separated relative file paths.
    pub fn list(&self) -> Result<Vec<String>, PackListError> {
        let manifest = PackageFiles::read(&self.root)?;
        let ignore = IgnoreRules::load(&self.root)?;
        let allow = manifest
            .files
            .as_deref()
            .map(AllowList::new)
            .transpose()?;

        let mut selected = BTreeSet::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let Ok(rel) = relative(&self.root, entry.path()) else {
                    return true;
                };
                !is_never_included(&rel, true) && !ignore.is_ignored(&rel, true)
            });

        for entry in walker {
            let entry = entry?;
            if entry.depth() == 0 || entry.file_type().is_dir() {
                continue;
            }
            let rel = relative(&self.root, entry.path())?;
            if !entry.file_type().is_file() {
                trace!("Skipping non-regular file {rel}");
                continue;
            }
            if is_never_included(&rel, false) {
                continue;
            }
            if is_always_included_root_file(&rel) {
                selected.insert(rel);
                continue;
            }
            if ignore.is_ignored(&rel, false) {
                trace!("Ignoring {rel}");
                continue;
            }
            if allow.as_ref().is_some_and(|allow| !allow.allows(&rel)) {
                continue;
            }
            selected.insert(rel);
        }

        for forced in manifest.entry_points() {
            if is_never_included(&forced, false) || selected.contains(&forced) {
                continue;
            }
            if self.root.join(&forced).is_file() {
                selected.insert(forced);
            }
        }

        debug!(
            "Resolved {} files for {}",
            selected.len(),
            self.root.display()
        );
        Ok(selected.into_iter().collect())
    }
}

/// Resolve the file list of the package at `root`.
pub fn list_files(root: &Path) -> Result<Vec<String>, PackListError> {
    PackList::new(root).list()
}

fn relative(root: &Path, path: &Path) -> Result<String, PackListError> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| PackListError::NonUtf8Path {
                path: path.to_owned(),
            })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use preper_utils_test::PackageFixture;
    use serde_json::json;

    use super::*;

    fn fixture(manifest: serde_json::Value) -> PackageFixture {
        let fixture = PackageFixture::with_manifest(&manifest).unwrap();
        fixture.write("index.js", "").unwrap();
        fixture.write("README.md", "# readme").unwrap();
        fixture.write("lib/a.js", "").unwrap();
        fixture.write("lib/nested/b.js", "").unwrap();
        fixture.write("test/a.test.js", "").unwrap();
        fixture.write(".git/HEAD", "ref: refs/heads/main").unwrap();
        fixture.write("node_modules/dep/index.js", "").unwrap();
        fixture.write("npm-debug.log", "").unwrap();
        fixture.write("lib/.a.js.swp", "").unwrap();
        fixture
    }

    #[test_log::test]
    fn lists_everything_but_never_included_files() {
        let pkg = fixture(json!({ "name": "pkg" }));
        let files = list_files(pkg.path()).unwrap();
        assert_eq!(
            files,
            [
                "README.md",
                "index.js",
                "lib/a.js",
                "lib/nested/b.js",
                "package.json",
                "test/a.test.js",
            ]
        );
    }

    #[test_log::test]
    fn files_allow_list_restricts_output() {
        let pkg = fixture(json!({ "name": "pkg", "files": ["lib/*.js"] }));
        let files = list_files(pkg.path()).unwrap();
        assert_eq!(files, ["README.md", "lib/a.js", "package.json"]);
    }

    #[test_log::test]
    fn files_allow_list_directory_includes_subtree() {
        let pkg = fixture(json!({ "name": "pkg", "files": ["lib/"] }));
        let files = list_files(pkg.path()).unwrap();
        assert_eq!(
            files,
            ["README.md", "lib/a.js", "lib/nested/b.js", "package.json"]
        );
    }

    #[test_log::test]
    fn main_and_bin_are_forced_in() {
        let pkg = fixture(json!({
            "name": "pkg",
            "main": "./index.js",
            "bin": { "pkg": "bin/cli.js" },
            "files": ["lib"],
        }));
        pkg.write("bin/cli.js", "").unwrap();
        pkg.write(".npmignore", "bin/\n").unwrap();

        let files = list_files(pkg.path()).unwrap();
        assert_eq!(
            files,
            [
                "README.md",
                "bin/cli.js",
                "index.js",
                "lib/a.js",
                "lib/nested/b.js",
                "package.json",
            ]
        );
    }

    #[test_log::test]
    fn npmignore_wins_over_gitignore() {
        let pkg = fixture(json!({ "name": "pkg" }));
        pkg.write(".gitignore", "lib/\n").unwrap();
        pkg.write(".npmignore", "test/\n*.md\n").unwrap();

        let files = list_files(pkg.path()).unwrap();
        assert_eq!(
            files,
            [
                "README.md",
                "index.js",
                "lib/a.js",
                "lib/nested/b.js",
                "package.json",
            ]
        );
    }

    #[test_log::test]
    fn gitignore_applies_without_npmignore() {
        let pkg = fixture(json!({ "name": "pkg" }));
        pkg.write(".gitignore", "# build output\n/lib/nested\ntest\n").unwrap();

        let files = list_files(pkg.path()).unwrap();
        assert_eq!(
            files,
            ["README.md", "index.js", "lib/a.js", "package.json"]
        );
    }

    #[test_log::test]
    fn npmignore_can_allow_list_with_negation() {
        let pkg = PackageFixture::with_name("pkg").unwrap();
        pkg.write("src/a.ts", "").unwrap();
        pkg.write("lib/a.js", "").unwrap();
        pkg.write(".npmignore", "*\n!lib/\n!lib/**\n").unwrap();

        let files = list_files(pkg.path()).unwrap();
        assert_eq!(files, ["lib/a.js", "package.json"]);
    }

    #[test_log::test]
    fn nested_ignore_files_apply_below_their_directory() {
        let pkg = fixture(json!({ "name": "pkg" }));
        pkg.write(".npmignore", "*.md\ntest/\n").unwrap();
        pkg.write("lib/.npmignore", "nested/\n").unwrap();
        pkg.write("docs/guide.md", "").unwrap();
        pkg.write("docs/notes.md", "").unwrap();
        pkg.write("docs/.gitignore", "!guide.md\n").unwrap();

        let files = list_files(pkg.path()).unwrap();
        assert_eq!(
            files,
            [
                "README.md",
                "docs/guide.md",
                "index.js",
                "lib/a.js",
                "package.json",
            ]
        );
    }

    #[test_log::test]
    fn scoped_looking_names_are_listed_verbatim() {
        let pkg = PackageFixture::with_name("@scope/pkg").unwrap();
        pkg.write("@scope/file.js", "").unwrap();

        let files = list_files(pkg.path()).unwrap();
        assert_eq!(files, ["@scope/file.js", "package.json"]);
    }

    #[test_log::test]
    fn missing_manifest_is_not_an_error() {
        let pkg = PackageFixture::empty().unwrap();
        pkg.write("index.js", "").unwrap();
        assert_eq!(list_files(pkg.path()).unwrap(), ["index.js"]);
    }

    #[test_log::test]
    fn malformed_manifest_is_an_error() {
        let pkg = PackageFixture::empty().unwrap();
        pkg.write("package.json", "{ not json").unwrap();
        let err = list_files(pkg.path()).unwrap_err();
        assert!(matches!(err, PackListError::ParseManifest { .. }), "{err}");
    }

    #[test_log::test]
    fn missing_root_is_a_walk_error() {
        let pkg = PackageFixture::empty().unwrap();
        let err = list_files(&pkg.path().join("nope")).unwrap_err();
        assert!(matches!(err, PackListError::Walk(_)), "{err}");
    }
}
