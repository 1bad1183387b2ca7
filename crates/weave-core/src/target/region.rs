use std::fmt;

use crate::tree::{Path, Step};

use super::vindex::{covers_element, real_range, touches, VirtualIndex};

/// The span of a tree a target claims (when written) or reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Region {
    /// A whole node and everything below it
    Node(Path),
    /// Virtual range `[start, end)` of the list at `list`
    Slice { list: Path, start: usize, end: usize },
}

impl Region {
    /// The path edits to this region are anchored at
    pub fn anchor(&self) -> &Path {
        match self {
            Region::Node(path) => path,
            Region::Slice { list, .. } => list,
        }
    }

    /// Container the region lives in: the parent map/list for node regions,
    /// the list itself for slices
    pub fn container(&self) -> Path {
        match self {
            Region::Node(path) => path.parent().unwrap_or_default(),
            Region::Slice { list, .. } => list.clone(),
        }
    }

    /// True for slices that cover no existing element
    pub fn is_zero_width(&self) -> bool {
        match self {
            Region::Node(_) => false,
            Region::Slice { start, end, .. } => real_range(*start, *end).is_empty(),
        }
    }

    /// Whether two written regions claim at least one common existing node.
    ///
    /// Slices that only share an insertion point never overlap each other.
    pub fn overlaps(&self, other: &Region) -> bool {
        match (self, other) {
            (Region::Node(a), Region::Node(b)) => a.starts_with(b) || b.starts_with(a),
            (Region::Node(path), Region::Slice { list, start, end })
            | (Region::Slice { list, start, end }, Region::Node(path)) => {
                slice_claims_path(list, *start, *end, path)
            }
            (
                Region::Slice { list: la, start: sa, end: ea },
                Region::Slice { list: lb, start: sb, end: eb },
            ) => {
                if la == lb {
                    let a = real_range(*sa, *ea);
                    let b = real_range(*sb, *eb);
                    a.start < b.end && b.start < a.end
                } else if la.is_ancestor_of(lb) {
                    covers_descendant(la, *sa, *ea, lb)
                } else if lb.is_ancestor_of(la) {
                    covers_descendant(lb, *sb, *eb, la)
                } else {
                    false
                }
            }
        }
    }

    /// Whether reading `self` observes what a write to `written` produces.
    ///
    /// Stricter than `overlaps` for same-list slices: a read window also sees
    /// insertions made inside it or at its own gap.
    pub fn reads(&self, written: &Region) -> bool {
        match (self, written) {
            (
                Region::Slice { list: lr, start: from, end: to },
                Region::Slice { list: lw, start, end },
            ) if lr == lw => touches(*from, *to, *start, *end),
            _ => self.overlaps(written),
        }
    }
}

/// A slice write claims `path` when it replaces the whole list (or an
/// ancestor of it) or when `path` lies inside one of its covered elements.
fn slice_claims_path(list: &Path, start: usize, end: usize, path: &Path) -> bool {
    if list.starts_with(path) {
        return true;
    }
    list.is_ancestor_of(path) && covers_descendant(list, start, end, path)
}

fn covers_descendant(list: &Path, start: usize, end: usize, inner: &Path) -> bool {
    match inner.steps().get(list.len()) {
        Some(Step::Index(index)) => covers_element(start, end, *index),
        _ => false,
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Node(path) => write!(f, "{path}"),
            Region::Slice { list, start, end } => write!(
                f,
                "{list}[{}..{})",
                VirtualIndex::from_raw(*start),
                VirtualIndex::from_raw(*end)
            ),
        }
    }
}
