use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::resolve::ResolveError;
use crate::target::{NodeTarget, SliceTarget, Target, VirtualIndex};

use super::{NodeRef, Path, Step};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one frozen tree snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u64);

impl TreeId {
    fn fresh() -> Self {
        TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree#{}", self.0)
    }
}

/// A fully frozen snapshot handed to transformers
///
/// Cloning is cheap and keeps the same identity; every snapshot produced by
/// resolution gets a fresh id, which is what makes old paths detectably
/// stale.
#[derive(Debug, Clone)]
pub struct Tree {
    root: NodeRef,
    id: TreeId,
}

impl Tree {
    pub fn new(root: NodeRef) -> Self {
        Self {
            root,
            id: TreeId::fresh(),
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            tree: self.id,
            path: Path::root(),
            node: self.root.clone(),
        }
    }

    /// Node at `path`, following every step from the root
    pub fn node_at(&self, path: &Path) -> Result<NodeRef, ResolveError> {
        let mut node = &self.root;
        let mut at = Path::root();
        for step in path.steps() {
            node = node.step(step, &at)?;
            at = at.child(step.clone());
        }
        Ok(node.clone())
    }

    /// Cursor positioned at `path`
    pub fn cursor_at(&self, path: &Path) -> Result<Cursor, ResolveError> {
        Ok(Cursor {
            tree: self.id,
            path: path.clone(),
            node: self.node_at(path)?,
        })
    }
}

/// A node together with where it lives in a specific tree
///
/// Transformers walk the tree with cursors and turn them into targets, which
/// are then bound to the snapshot the cursor came from.
#[derive(Debug, Clone)]
pub struct Cursor {
    tree: TreeId,
    path: Path,
    node: NodeRef,
}

impl Cursor {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree_id(&self) -> TreeId {
        self.tree
    }

    fn descend(&self, step: Step, node: &NodeRef) -> Cursor {
        Cursor {
            tree: self.tree,
            path: self.path.child(step),
            node: node.clone(),
        }
    }

    /// Map entry
    pub fn get(&self, key: &str) -> Option<Cursor> {
        self.node
            .get(key)
            .map(|node| self.descend(Step::Key(key.to_string()), node))
    }

    /// List element
    pub fn at(&self, index: usize) -> Option<Cursor> {
        self.node
            .at(index)
            .map(|node| self.descend(Step::Index(index), node))
    }

    /// Map entries in order; empty for other shapes
    pub fn entries(&self) -> Vec<(String, Cursor)> {
        match self.node.as_map() {
            Some(entries) => entries
                .iter()
                .map(|(key, node)| (key.clone(), self.descend(Step::Key(key.clone()), node)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Children in order: list elements, or map values
    pub fn children(&self) -> Vec<Cursor> {
        if let Some(items) = self.node.as_list() {
            return items
                .iter()
                .enumerate()
                .map(|(i, node)| self.descend(Step::Index(i), node))
                .collect();
        }
        self.entries().into_iter().map(|(_, cursor)| cursor).collect()
    }

    /// Number of list elements (0 for non-lists)
    pub fn len(&self) -> usize {
        self.node.as_list().map_or(0, <[NodeRef]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whole-node target bound to this cursor's tree
    pub fn target(&self) -> Target {
        Target::Node(NodeTarget::bound(self.path.clone(), self.tree))
    }

    /// Slice of this list in virtual-index space
    pub fn slice(&self, start: VirtualIndex, end: VirtualIndex) -> SliceTarget {
        SliceTarget::new(self.path.clone(), start, end).bind(self.tree)
    }

    /// Insertion point before real element `index`
    pub fn insert_at(&self, index: usize) -> SliceTarget {
        let gap = VirtualIndex::gap(index);
        self.slice(gap, gap)
    }

    /// Insertion point after the last element
    pub fn append(&self) -> SliceTarget {
        self.insert_at(self.len())
    }

    /// Slice covering exactly real element `index`
    pub fn element(&self, index: usize) -> SliceTarget {
        SliceTarget::element(self.path.clone(), index).bind(self.tree)
    }
}
