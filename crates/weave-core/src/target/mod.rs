/*!
# Targets

Addressable regions of a frozen tree.

- `NodeTarget` names one whole node by its path from the root.
- `SliceTarget` names a contiguous range of a list in virtual-index space,
  which distinguishes insertion points (even positions) from existing
  elements (odd positions). Two transformers can both insert at the same
  gap without either overwriting the other.

Targets taken from a `Cursor` are bound to the snapshot the cursor walked;
resolving them against any other snapshot fails as stale.
*/

pub mod region;
pub mod vindex;


use std::{fmt, ops::Range};

use crate::resolve::ResolveError;
use crate::tree::{Node, NodeRef, Path, Tree, TreeId};

pub use region::Region;
pub use vindex::VirtualIndex;

/// A re-resolvable region of a frozen tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(NodeTarget),
    Slice(SliceTarget),
}

impl Target {
    /// Current value of the region in `tree`
    pub fn resolve(&self, tree: &Tree) -> Result<NodeRef, ResolveError> {
        match self {
            Target::Node(target) => target.resolve(tree),
            Target::Slice(target) => target.resolve(tree),
        }
    }

    pub fn region(&self) -> Region {
        match self {
            Target::Node(target) => Region::Node(target.path.clone()),
            Target::Slice(target) => Region::Slice {
                list: target.list.clone(),
                start: target.start.raw(),
                end: target.end.raw(),
            },
        }
    }

    /// Snapshot this target was taken from, if any
    pub fn tree(&self) -> Option<TreeId> {
        match self {
            Target::Node(target) => target.tree,
            Target::Slice(target) => target.tree,
        }
    }

    /// Path of the node (or of the sliced list)
    pub fn path(&self) -> &Path {
        match self {
            Target::Node(target) => &target.path,
            Target::Slice(target) => &target.list,
        }
    }

    pub(crate) fn check_tree(&self, tree: &Tree) -> Result<(), ResolveError> {
        check_binding(self.tree(), self.path(), tree)
    }
}

fn check_binding(bound: Option<TreeId>, path: &Path, tree: &Tree) -> Result<(), ResolveError> {
    match bound {
        Some(id) if id != tree.id() => Err(ResolveError::unresolved(
            path.clone(),
            format!("stale target taken from {id}, resolving against {}", tree.id()),
        )),
        _ => Ok(()),
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.region())
    }
}

impl From<NodeTarget> for Target {
    fn from(target: NodeTarget) -> Self {
        Target::Node(target)
    }
}

impl From<SliceTarget> for Target {
    fn from(target: SliceTarget) -> Self {
        Target::Slice(target)
    }
}

/// One whole node, found by following its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTarget {
    path: Path,
    tree: Option<TreeId>,
}

impl NodeTarget {
    /// Unbound target: resolves against whatever tree it is given
    pub fn new(path: Path) -> Self {
        Self { path, tree: None }
    }

    pub fn bound(path: Path, tree: TreeId) -> Self {
        Self {
            path,
            tree: Some(tree),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve(&self, tree: &Tree) -> Result<NodeRef, ResolveError> {
        check_binding(self.tree, &self.path, tree)?;
        tree.node_at(&self.path)
    }
}

/// A virtual range `[start, end)` of one list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceTarget {
    list: Path,
    start: VirtualIndex,
    end: VirtualIndex,
    tree: Option<TreeId>,
}

impl SliceTarget {
    pub fn new(list: Path, start: VirtualIndex, end: VirtualIndex) -> Self {
        Self {
            list,
            start,
            end,
            tree: None,
        }
    }

    /// Pure insertion point before real element `index`
    pub fn insert_before(list: Path, index: usize) -> Self {
        let gap = VirtualIndex::gap(index);
        Self::new(list, gap, gap)
    }

    /// Exactly real element `index`
    pub fn element(list: Path, index: usize) -> Self {
        Self::elements(list, index..index + 1)
    }

    /// The real elements in `range`; an empty range is an insertion point
    pub fn elements(list: Path, range: Range<usize>) -> Self {
        if range.is_empty() {
            return Self::insert_before(list, range.start);
        }
        Self::new(
            list,
            VirtualIndex::element(range.start),
            VirtualIndex::gap(range.end),
        )
    }

    pub fn bind(mut self, tree: TreeId) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn list(&self) -> &Path {
        &self.list
    }

    pub fn start(&self) -> VirtualIndex {
        self.start
    }

    pub fn end(&self) -> VirtualIndex {
        self.end
    }

    /// Existing elements this slice replaces or deletes
    pub fn real_range(&self) -> Range<usize> {
        vindex::real_range(self.start.raw(), self.end.raw())
    }

    pub fn is_insertion(&self) -> bool {
        self.real_range().is_empty()
    }

    /// Check the range against a list of `len` elements
    pub(crate) fn check_bounds(&self, len: usize) -> Result<(), ResolveError> {
        if self.start > self.end {
            return Err(ResolveError::unresolved(
                self.list.clone(),
                format!("inverted slice {}..{}", self.start, self.end),
            ));
        }
        if self.end > VirtualIndex::end_of(len) {
            return Err(ResolveError::unresolved(
                self.list.clone(),
                format!("slice end {} beyond list of {len}", self.end),
            ));
        }
        Ok(())
    }

    /// The covered elements as a fresh list node (empty for insertions)
    pub fn resolve(&self, tree: &Tree) -> Result<NodeRef, ResolveError> {
        check_binding(self.tree, &self.list, tree)?;
        let container = tree.node_at(&self.list)?;
        let items = container
            .as_list()
            .ok_or_else(|| ResolveError::kind_mismatch(self.list.clone(), "list", container.kind_name()))?;
        self.check_bounds(items.len())?;
        Ok(Node::list(items[self.real_range()].iter().cloned()))
    }
}
