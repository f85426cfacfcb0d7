//! # Cache Layout
//!
//! Maps `(owner, alias, version)` onto a deterministic path:
//! `<cache root>/<subdir>/<owner>/<alias>-<version>`, with every component
//! sanitized so it can never escape its directory. The alias also has `-`
//! escaped, so the first `-` of a file name always ends the alias and two
//! different `(alias, version)` pairs never share a file.

use std::path::{Path, PathBuf};

use crate::PullConfig;

#[derive(Debug, Clone)]
pub struct CacheLayout {
    dir: PathBuf,
}

impl CacheLayout {
    /// Create a layout rooted at `dir` (the root already joined with the subdir).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &PullConfig) -> Self {
        Self::new(config.cache_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding every cached file of one owner.
    pub fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.dir.join(sanitize(owner_id))
    }

    /// Path of the cached body for one version of a resource.
    pub fn entry_path(&self, owner_id: &str, alias: &str, version: &str) -> PathBuf {
        self.owner_dir(owner_id)
            .join(format!("{}-{}", escape_alias(alias), sanitize(version)))
    }
}

/// [`sanitize`] plus percent-escaping of `%` and `-`.
fn escape_alias(alias: &str) -> String {
    let mut escaped = String::with_capacity(alias.len());
    for c in sanitize(alias).chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Make a string safe to use as a single path component.
///
/// Separators and characters that are reserved on common filesystems become
/// `_`. Components that would be empty or refer to `.`/`..` get a `_` prefix.
pub fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}
