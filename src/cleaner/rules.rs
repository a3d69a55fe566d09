//! Keep/exclude classification by file extension.
//!
//! Extensions are matched longest-suffix-first, so a rule for `xml.gz` is
//! checked before a rule for `gz`. Exclusion always wins over keeping.

use std::collections::BTreeSet;

use super::error::{CleanerError, Result};

/// Type key used for files that carry no extension at all.
pub const NO_EXTENSION: &str = "no_extension";

/// Outcome of classifying a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Keep,
    Delete,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Keep => "kept",
            Decision::Delete => "deleted",
        }
    }
}

/// Immutable keep/exclude rules derived once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    keep: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl RuleSet {
    /// Build a rule set from raw extension strings.
    ///
    /// Entries are normalized with [`normalize_extension`]; blank entries are
    /// dropped. At least one of the two lists must end up non-empty.
    pub fn new<K, E>(keep: K, exclude: E) -> Result<Self>
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let keep: BTreeSet<String> = keep
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();
        let exclude: BTreeSet<String> = exclude
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();

        if keep.is_empty() && exclude.is_empty() {
            return Err(CleanerError::EmptyRuleSet);
        }

        Ok(Self { keep, exclude })
    }

    /// Parse comma-separated lists, e.g. `"jpg, png"`.
    pub fn from_csv(keep: &str, exclude: &str) -> Result<Self> {
        Self::new(split_csv(keep), split_csv(exclude))
    }

    pub fn keep_list(&self) -> &BTreeSet<String> {
        &self.keep
    }

    pub fn exclude_list(&self) -> &BTreeSet<String> {
        &self.exclude
    }

    /// Decide whether a file should be kept or deleted.
    pub fn classify(&self, file_name: &str) -> Decision {
        let ext = extension_of(file_name).unwrap_or_default();
        let candidates = if ext.is_empty() {
            Vec::new()
        } else {
            candidate_suffixes(&ext)
        };

        if candidates.iter().any(|s| self.exclude.contains(*s)) {
            return Decision::Delete;
        }

        if self.keep.is_empty() {
            return Decision::Keep;
        }

        if candidates.iter().any(|s| self.keep.contains(*s)) {
            Decision::Keep
        } else {
            Decision::Delete
        }
    }
}

/// Split a comma-separated list into trimmed, non-empty entries.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize a user-supplied extension: trim, lowercase, strip `*` and leading dots.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_start_matches(['*', '.'])
        .trim_end_matches('.')
        .to_lowercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Full lowercase extension: everything after the first dot of the name.
///
/// Leading dots belong to the stem (`.bashrc` has no extension) and a name
/// ending in a dot has none either.
pub fn extension_of(file_name: &str) -> Option<String> {
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();
    let rest = &file_name[stem_start..];
    let (_, ext) = rest.split_once('.')?;
    if ext.is_empty() || ext.ends_with('.') {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Every dot-suffix of an (already lowercased) extension, longest first.
///
/// `tar.gz` yields `["tar.gz", "gz"]`.
fn candidate_suffixes(ext: &str) -> Vec<&str> {
    let mut suffixes = vec![ext];
    let mut tail = ext;
    while let Some((_, next)) = tail.split_once('.') {
        if !next.is_empty() {
            suffixes.push(next);
        }
        tail = next;
    }
    suffixes
}

/// Directory name used when reorganizing by type: the last extension segment.
pub fn type_key(file_name: &str) -> String {
    match extension_of(file_name) {
        Some(ext) => ext
            .rsplit('.')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| NO_EXTENSION.to_string()),
        None => NO_EXTENSION.to_string(),
    }
}
