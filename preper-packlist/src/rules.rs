// SPDX-License-Identifier: MIT

use std::cmp::Reverse;
use std::io;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::PackListError;
use crate::manifest::normalize;

const NEVER_INCLUDED_DIRS: &[&str] = &[".git", ".svn", ".hg", "CVS", "node_modules"];

const NEVER_INCLUDED_FILES: &[&str] = &[
    ".npmignore",
    ".gitignore",
    ".DS_Store",
    "npm-debug.log",
    ".npmrc",
    ".lock-wscript",
    "config.gypi",
    "package-lock.json",
];

const ALWAYS_INCLUDED_STEMS: &[&str] = &["readme", "license", "licence", "changelog"];

fn basename(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

/// Paths no package ever ships, regardless of ignore files or allow-lists.
pub(crate) fn is_never_included(rel: &str, is_dir: bool) -> bool {
    let name = basename(rel);
    if is_dir {
        return NEVER_INCLUDED_DIRS.contains(&name);
    }
    NEVER_INCLUDED_FILES.contains(&name)
        || name.starts_with("._")
        || name.starts_with(".wafpickle-")
        || (name.starts_with('.') && name.ends_with(".swp"))
        || name.ends_with(".orig")
}

/// Root level files that are kept even when ignored or not allow-listed.
pub(crate) fn is_always_included_root_file(rel: &str) -> bool {
    if rel.contains('/') {
        return false;
    }
    if rel == "package.json" {
        return true;
    }
    let lower = rel.to_ascii_lowercase();
    let stem = lower.split('.').next().unwrap_or(&lower);
    ALWAYS_INCLUDED_STEMS.contains(&stem)
}

fn compile(pattern: &str) -> Result<GlobMatcher, PackListError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| PackListError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Ignore file names in order of preference, per directory.
const IGNORE_FILES: &[&str] = &[".npmignore", ".gitignore"];

/// The rules of one ignore file, relative to the directory holding it.
#[derive(Debug)]
struct IgnoreLayer {
    /// `/`-separated path of that directory, `""` for the package root.
    dir: String,
    depth: usize,
    rules: Gitignore,
}

impl IgnoreLayer {
    /// `rel` relative to this layer's directory, if it lies below it.
    fn scoped<'a>(&self, rel: &'a str) -> Option<&'a str> {
        if self.dir.is_empty() {
            return Some(rel);
        }
        rel.strip_prefix(self.dir.as_str())?.strip_prefix('/')
    }
}

/// Gitignore-style rules from the ignore files found throughout a package.
///
/// Each directory contributes its `.npmignore`, or its `.gitignore` when it
/// has no `.npmignore`. Rules apply to everything below that directory, and a
/// deeper file that matches a path, ignore or `!` re-include alike, decides
/// over the files above it.
#[derive(Debug, Default)]
pub(crate) struct IgnoreRules {
    /// Deepest first.
    layers: Vec<IgnoreLayer>,
}

impl IgnoreRules {
    pub(crate) fn load(root: &Path) -> Result<Self, PackListError> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.file_type().is_dir()
                    && (entry.depth() == 0
                        || !entry
                            .file_name()
                            .to_str()
                            .is_some_and(|name| is_never_included(name, true)))
            });

        let mut layers = Vec::new();
        for entry in walker {
            let entry = entry?;
            if let Some(rules) = read_ignore_file(entry.path())? {
                layers.push(IgnoreLayer {
                    dir: crate::relative(root, entry.path())?,
                    depth: entry.depth(),
                    rules,
                });
            }
        }
        layers.sort_by_key(|layer| Reverse(layer.depth));
        Ok(Self { layers })
    }

    /// Rules from a single ignore file at the package root.
    #[cfg(test)]
    pub(crate) fn parse(contents: &str) -> Result<Self, PackListError> {
        let rules = build(Path::new(""), Path::new(".npmignore"), contents)?;
        Ok(Self {
            layers: vec![IgnoreLayer {
                dir: String::new(),
                depth: 0,
                rules,
            }],
        })
    }

    pub(crate) fn is_ignored(&self, rel: &str, is_dir: bool) -> bool {
        for layer in &self.layers {
            let Some(scoped) = layer.scoped(rel) else {
                continue;
            };
            match layer.rules.matched_path_or_any_parents(scoped, is_dir) {
                Match::None => continue,
                decided => return decided.is_ignore(),
            }
        }
        false
    }
}

fn read_ignore_file(dir: &Path) -> Result<Option<Gitignore>, PackListError> {
    for name in IGNORE_FILES {
        let path = dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("Using ignore rules from {}", path.display());
                return build(dir, &path, &contents).map(Some);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => return Err(PackListError::ReadIgnore { path, source }),
        }
    }
    Ok(None)
}

fn build(dir: &Path, file: &Path, contents: &str) -> Result<Gitignore, PackListError> {
    let invalid = |source| PackListError::Ignore {
        path: file.to_owned(),
        source,
    };
    let mut builder = GitignoreBuilder::new(dir);
    for line in contents.lines() {
        builder
            .add_line(Some(file.to_owned()), line)
            .map_err(invalid)?;
    }
    builder.build().map_err(invalid)
}

/// The `files` allow-list of `package.json`.
#[derive(Debug)]
pub(crate) struct AllowList {
    matchers: Vec<GlobMatcher>,
}

impl AllowList {
    pub(crate) fn new(patterns: &[String]) -> Result<Self, PackListError> {
        let mut matchers = Vec::with_capacity(patterns.len() * 2);
        for pattern in patterns {
            let Some(pattern) = normalize(pattern) else {
                debug!("Skipping unusable files entry {pattern:?}");
                continue;
            };
            matchers.push(compile(&pattern)?);
            matchers.push(compile(&format!("{pattern}/**"))?);
        }
        Ok(Self { matchers })
    }

    pub(crate) fn allows(&self, rel: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(rel))
    }
}
