//! Content-addressed cache keys.
//!
//! A key is derived from `(file_path, analyzer-or-analyzer-set, content_hash)`.
//! Because the content hash is part of the key, editing a file makes every
//! old key unreachable without an explicit invalidation call; stale entries
//! simply age out or get evicted.
//!
//! Keys are plain strings so that explicit invalidation can match them by
//! file-path prefix or by regex:
//!
//! ```text
//! src/api.py::security::9f86d081...                   single analyzer
//! src/api.py::multi[perf+security]@audit::9f86d0...   joint review (ids sorted)
//! ```
//!
//! `:` and `%` inside a segment are percent-encoded, so a path can never
//! contain the separator and one file's prefix never matches another file.

use std::borrow::Cow;
use std::fmt;

use crate::types::SourceFile;

/// Separator between key segments.
const SEPARATOR: &str = "::";

/// A cache key for one analysis of one version of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a single-analyzer run.
    pub fn single(file_path: &str, analyzer_id: &str, content_hash: &str) -> Self {
        Self(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{content_hash}",
            escape(file_path),
            escape(analyzer_id)
        ))
    }

    /// Key for a joint multi-analyzer run under `scenario`. The analyzer set
    /// is sorted and de-duplicated, so `[b, a]` and `[a, b, a]` share one key;
    /// different scenarios never do.
    pub fn joint<S: AsRef<str>>(
        file_path: &str,
        analyzer_ids: &[S],
        scenario: &str,
        content_hash: &str,
    ) -> Self {
        let set: Vec<Cow<'_, str>> = analyzer_ids_sorted(analyzer_ids);
        Self(format!(
            "{}{SEPARATOR}multi[{}]@{}{SEPARATOR}{content_hash}",
            escape(file_path),
            set.join("+"),
            escape(scenario)
        ))
    }

    /// Single-analyzer key for the current content of `file`.
    pub fn for_file(file: &SourceFile, analyzer_id: &str) -> Self {
        Self::single(&file.path, analyzer_id, &file.content_hash())
    }

    /// Joint key for the current content of `file`.
    pub fn joint_for_file<S: AsRef<str>>(
        file: &SourceFile,
        analyzer_ids: &[S],
        scenario: &str,
    ) -> Self {
        Self::joint(&file.path, analyzer_ids, scenario, &file.content_hash())
    }

    /// Prefix shared by every key of `file_path`, and by no key of any other
    /// file.
    pub fn file_prefix(file_path: &str) -> String {
        format!("{}{SEPARATOR}", escape(file_path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

fn analyzer_ids_sorted<S: AsRef<str>>(analyzer_ids: &[S]) -> Vec<Cow<'_, str>> {
    let mut set: Vec<&str> = analyzer_ids.iter().map(AsRef::as_ref).collect();
    set.sort_unstable();
    set.dedup();
    set.into_iter().map(escape).collect()
}

/// Percent-encode `%` and `:` so a segment cannot contain the separator.
fn escape(segment: &str) -> Cow<'_, str> {
    if !segment.contains([':', '%']) {
        return Cow::Borrowed(segment);
    }
    let mut escaped = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Sorted, de-duplicated copy of an analyzer id list.
pub fn analyzer_set<S: AsRef<str>>(analyzer_ids: &[S]) -> Vec<String> {
    let mut set: Vec<String> = analyzer_ids.iter().map(|s| s.as_ref().to_string()).collect();
    set.sort();
    set.dedup();
    set
}
