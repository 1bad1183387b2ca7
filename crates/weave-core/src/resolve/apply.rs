use std::collections::BTreeMap;

use tracing::trace;

use crate::target::vindex::{covers_element, real_range, touches};
use crate::target::{Region, VirtualIndex};
use crate::tree::{Node, NodeKind, NodeRef, Path, Step};

use super::errors::ResolveError;

/// A splice of one list, in virtual-index space
#[derive(Debug, Clone)]
pub(crate) struct Splice {
    pub origin: String,
    pub seq: usize,
    pub start: usize,
    pub end: usize,
    pub items: Vec<NodeRef>,
}

impl Splice {
    /// Splices sharing a start are ordered by origin alone, whatever their
    /// width; `splice_walk` lands a later one right after what an earlier
    /// one removed.
    fn order_key(&self) -> (usize, &str, usize) {
        (self.start, self.origin.as_str(), self.seq)
    }
}

/// Produced edits, keyed by the path they are anchored at
///
/// Conflict detection guarantees a whole-node replacement never has other
/// edits at or below it, and that splices of one list cover disjoint real
/// elements.
#[derive(Debug, Default)]
pub(crate) struct EditTrie {
    replace: Option<NodeRef>,
    splices: Vec<Splice>,
    children: BTreeMap<Step, EditTrie>,
}

impl EditTrie {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, path: &Path) -> &mut EditTrie {
        let mut node = self;
        for step in path.steps() {
            node = node.children.entry(step.clone()).or_default();
        }
        node
    }

    /// Record a combinator output for `region`
    pub(crate) fn record(&mut self, region: &Region, origin: &str, seq: usize, output: NodeRef) -> Result<(), ResolveError> {
        match region {
            Region::Node(path) => {
                self.entry(path).replace = Some(output);
            }
            Region::Slice { list, start, end } => {
                let items = output
                    .as_list()
                    .ok_or_else(|| ResolveError::kind_mismatch(list.clone(), "list", output.kind_name()))?
                    .to_vec();
                let splice = Splice {
                    origin: origin.to_string(),
                    seq,
                    start: *start,
                    end: *end,
                    items,
                };
                let splices = &mut self.entry(list).splices;
                let at = splices
                    .binary_search_by(|probe| probe.order_key().cmp(&splice.order_key()))
                    .unwrap_or_else(|insert_at| insert_at);
                splices.insert(at, splice);
            }
        }
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.replace.is_none() && self.splices.is_empty() && self.children.is_empty()
    }
}

/// Rebuild `node` (found at `at`) with every edit in `trie` applied.
///
/// Subtrees without edits are returned as the same `Arc`; only containers
/// on the way to an edit are reallocated, and they keep their metadata.
pub(crate) fn rebuild(node: &NodeRef, trie: &EditTrie, at: &Path) -> Result<NodeRef, ResolveError> {
    if let Some(replacement) = &trie.replace {
        return Ok(replacement.clone());
    }
    if trie.is_empty() {
        return Ok(node.clone());
    }

    match node.kind() {
        NodeKind::Map(entries) => {
            if !trie.splices.is_empty() {
                return Err(ResolveError::kind_mismatch(at.clone(), "list", "map"));
            }
            let mut entries = entries.clone();
            for (step, sub) in &trie.children {
                let child = node.step(step, at)?;
                let rebuilt = rebuild(child, sub, &at.child(step.clone()))?;
                if let Step::Key(key) = step {
                    entries.insert(key.clone(), rebuilt);
                }
            }
            Ok(node.derive(NodeKind::Map(entries)))
        }
        NodeKind::List(_) => {
            let items = rebuild_elements(node, trie, at)?;
            let items = splice_walk(&items, &trie.splices, None, at)?;
            Ok(node.derive(NodeKind::List(items)))
        }
        NodeKind::Value(_) => {
            let expected = if trie.splices.is_empty() { "container" } else { "list" };
            Err(ResolveError::kind_mismatch(at.clone(), expected, "value"))
        }
    }
}

/// List elements with nested edits applied, before any splicing
fn rebuild_elements(node: &NodeRef, trie: &EditTrie, at: &Path) -> Result<Vec<NodeRef>, ResolveError> {
    let mut items = node.as_list().map(<[NodeRef]>::to_vec).unwrap_or_default();
    for (step, sub) in &trie.children {
        let child = node.step(step, at)?;
        let rebuilt = rebuild(child, sub, &at.child(step.clone()))?;
        if let Step::Index(index) = step {
            items[*index] = rebuilt;
        }
    }
    Ok(items)
}

/// Splice `splices` into `items` in one pass.
///
/// Each splice lands at its virtual start converted to a real position and
/// shifted by the width already removed and added by the splices before it.
/// With a `window`, only what ends up inside that virtual range of the
/// original list is returned.
fn splice_walk(
    items: &[NodeRef],
    splices: &[Splice],
    window: Option<(usize, usize)>,
    at: &Path,
) -> Result<Vec<NodeRef>, ResolveError> {
    let limit = VirtualIndex::end_of(items.len()).raw();
    for splice in splices {
        if splice.start > splice.end || splice.end > limit {
            return Err(ResolveError::unresolved(
                at.clone(),
                format!(
                    "slice {}..{} from '{}' does not fit a list of {}",
                    VirtualIndex::from_raw(splice.start),
                    VirtualIndex::from_raw(splice.end),
                    splice.origin,
                    items.len()
                ),
            ));
        }
    }

    let keep = |index: usize| window.map_or(true, |(from, to)| covers_element(from, to, index));
    let mut out = Vec::with_capacity(items.len());
    let mut cursor = 0usize;
    let mut shift: isize = 0;

    for splice in splices {
        let removed = real_range(splice.start, splice.end);
        let first = removed.start.max(cursor);
        out.extend((cursor..first).filter(|&i| keep(i)).map(|i| items[i].clone()));

        if window.map_or(true, |(from, to)| touches(from, to, splice.start, splice.end)) {
            trace!(
                origin = %splice.origin,
                position = first as isize + shift,
                removed = removed.len(),
                added = splice.items.len(),
                "splice"
            );
            out.extend(splice.items.iter().cloned());
        }

        shift += splice.items.len() as isize - removed.len() as isize;
        cursor = removed.end.max(first);
    }
    out.extend((cursor..items.len()).filter(|&i| keep(i)).map(|i| items[i].clone()));

    Ok(out)
}

/// Read `region` from `root` as it looks once every edit in `trie` is applied.
///
/// Reading through a node that a produced splice removed, or a path that no
/// longer exists inside a produced replacement, fails as unresolved.
pub(crate) fn read(root: &NodeRef, trie: &EditTrie, region: &Region) -> Result<NodeRef, ResolveError> {
    let anchor = region.anchor();
    let mut node = root.clone();
    let mut pending = Some(trie);
    let mut at = Path::root();

    for step in anchor.steps() {
        if let Some(replacement) = pending.and_then(|t| t.replace.as_ref()) {
            node = replacement.clone();
            pending = None;
        }
        if let (Some(t), Step::Index(index)) = (pending, step) {
            if let Some(splice) = t.splices.iter().find(|s| covers_element(s.start, s.end, *index)) {
                return Err(ResolveError::unresolved(
                    anchor.clone(),
                    format!("element {at}/{index} was replaced by '{}'", splice.origin),
                ));
            }
        }
        node = node.step(step, &at)?.clone();
        pending = pending.and_then(|t| t.children.get(step));
        at = at.child(step.clone());
    }

    match region {
        Region::Node(_) => match pending {
            Some(t) => rebuild(&node, t, &at),
            None => Ok(node),
        },
        Region::Slice { start, end, .. } => {
            let no_splices: &[Splice] = &[];
            let (items, splices) = match pending {
                Some(t) if t.replace.is_some() => {
                    let replaced = rebuild(&node, t, &at)?;
                    (list_items(&replaced, &at)?, no_splices)
                }
                Some(t) => {
                    list_items(&node, &at)?;
                    (rebuild_elements(&node, t, &at)?, t.splices.as_slice())
                }
                None => (list_items(&node, &at)?, no_splices),
            };
            let limit = VirtualIndex::end_of(items.len()).raw();
            if start > end || *end > limit {
                return Err(ResolveError::unresolved(
                    at,
                    format!("slice does not fit a list of {}", items.len()),
                ));
            }
            Ok(Node::list(splice_walk(&items, splices, Some((*start, *end)), &at)?))
        }
    }
}

fn list_items(node: &NodeRef, at: &Path) -> Result<Vec<NodeRef>, ResolveError> {
    node.as_list()
        .map(<[NodeRef]>::to_vec)
        .ok_or_else(|| ResolveError::kind_mismatch(at.clone(), "list", node.kind_name()))
}
