//! Feature flags of document images.

use itertools::Itertools;
use std::fmt;

/// Ordered, append-only set of transforms applied to an image.
///
/// Stored in documents as the comma-separated `comments` attribute of an
/// `AlternativeImage`, e.g. `"binarized,deskewed,cropped"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags(Vec<String>);

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated flag string; empty entries are ignored.
    pub fn parse(comments: &str) -> Self {
        Self(
            comments
                .split(',')
                .map(str::trim)
                .filter(|flag| !flag.is_empty())
                .unique()
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.0.iter().any(|f| f == flag)
    }

    /// Whether every flag of `selector` is present and none of `filter` is.
    pub fn satisfies(&self, selector: &[&str], filter: &[&str]) -> bool {
        selector.iter().all(|f| self.contains(f)) && !filter.iter().any(|f| self.contains(f))
    }

    /// Returns these flags plus `flag`. Existing flags are never removed.
    pub fn with(&self, flag: &str) -> Self {
        let mut flags = self.clone();
        if !flags.contains(flag) {
            flags.0.push(flag.to_string());
        }
        flags
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FeatureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}
