//! Resolved ban entries.

use std::collections::BTreeMap;

use serde::Serialize;

/// Suffix appended to a URL to also catch its query-string variants.
pub const QUERY_WILDCARD: &str = "?";

/// A URL to ban and whether everything below it goes too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanEntry {
    pub url: String,
    pub recursive: bool,
}

/// Ban entries keyed by URL.
///
/// Inserting a URL twice keeps a single entry; a recursive flag is never
/// downgraded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BanSet {
    entries: BTreeMap<String, bool>,
}

impl BanSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, recursive: bool) {
        let flag = self.entries.entry(url.into()).or_insert(false);
        *flag |= recursive;
    }

    /// Record `url` with `recursive`; a non-recursive URL also gets a
    /// recursive companion entry with [`QUERY_WILDCARD`] appended.
    pub fn insert_with_query_variants(&mut self, url: &str, recursive: bool) {
        self.insert(url, recursive);
        if !recursive {
            self.insert(format!("{url}{QUERY_WILDCARD}"), true);
        }
    }

    pub fn merge(&mut self, other: BanSet) {
        for (url, recursive) in other.entries {
            self.insert(url, recursive);
        }
    }

    pub fn get(&self, url: &str) -> Option<bool> {
        self.entries.get(url).copied()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries
            .iter()
            .map(|(url, recursive)| (url.as_str(), *recursive))
    }

    pub fn to_entries(&self) -> Vec<BanEntry> {
        self.iter()
            .map(|(url, recursive)| BanEntry {
                url: url.to_string(),
                recursive,
            })
            .collect()
    }
}

impl Extend<(String, bool)> for BanSet {
    fn extend<T: IntoIterator<Item = (String, bool)>>(&mut self, iter: T) {
        for (url, recursive) in iter {
            self.insert(url, recursive);
        }
    }
}

impl FromIterator<(String, bool)> for BanSet {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
