use std::collections::BTreeMap;

use super::path::Path;

/// Capabilities a node can carry out-of-band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaKey {
    /// Where the node sat when it was decoded
    Path,
    /// Byte range in the decoded input
    SourceSpan,
    /// Transformer whose combinator produced the node
    Origin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Path(Path),
    SourceSpan { start: usize, end: usize },
    Origin(String),
}

impl MetaValue {
    pub fn key(&self) -> MetaKey {
        match self {
            MetaValue::Path(_) => MetaKey::Path,
            MetaValue::SourceSpan { .. } => MetaKey::SourceSpan,
            MetaValue::Origin(_) => MetaKey::Origin,
        }
    }
}

/// Per-node side-table keyed by capability
///
/// Never part of structural equality: two nodes with different metadata
/// but the same shape compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<MetaKey, MetaValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry table
    pub fn of(value: MetaValue) -> Self {
        let mut meta = Self::new();
        meta.insert(value);
        meta
    }

    /// Insert a value under its own key, returning the value it displaced
    pub fn insert(&mut self, value: MetaValue) -> Option<MetaValue> {
        self.entries.insert(value.key(), value)
    }

    pub fn get(&self, key: MetaKey) -> Option<&MetaValue> {
        self.entries.get(&key)
    }

    pub fn remove(&mut self, key: MetaKey) -> Option<MetaValue> {
        self.entries.remove(&key)
    }

    pub fn contains(&self, key: MetaKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Decode-time location. Resolution never rewrites it, so after an
    /// insertion or removal in front of a node this names where it used to be.
    pub fn path(&self) -> Option<&Path> {
        match self.entries.get(&MetaKey::Path) {
            Some(MetaValue::Path(path)) => Some(path),
            _ => None,
        }
    }

    pub fn source_span(&self) -> Option<(usize, usize)> {
        match self.entries.get(&MetaKey::SourceSpan) {
            Some(MetaValue::SourceSpan { start, end }) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn origin(&self) -> Option<&str> {
        match self.entries.get(&MetaKey::Origin) {
            Some(MetaValue::Origin(origin)) => Some(origin),
            _ => None,
        }
    }

    /// Merge another table into this one; entries from `other` win.
    pub fn merge(&mut self, other: &Metadata) {
        for value in other.entries.values() {
            self.insert(value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaValue> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
