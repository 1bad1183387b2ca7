/*!
# Resolution Engine

Merges one batch of transformations into a new frozen tree.

Resolution runs four sequential phases:

1. **Graph construction**: an edge `a -> b` whenever a source of `b` reads
   the region `a` writes; a cycle aborts the round.
2. **Conflict detection**: two transformations claiming a common existing
   node abort the round. Insertions at the same gap are not conflicts.
3. **Evaluation**: combinators run once each in topological order. Targets
   read the input tree; sources read the input tree overlaid with what
   earlier transformations of the batch produced.
4. **Application**: one bottom-up rebuild splices every output into place,
   reusing every untouched subtree by reference.

The input tree is never modified; a failed round leaves it fully usable.

## Ordering

Ties in the schedule, and insertions at the same virtual index, are broken
by origin id and then by position in the batch. The driver builds batches
in transformer registration order, so the result is reproducible.
*/

mod apply;
mod conflict;
pub mod errors;
mod graph;


use tracing::debug;

use crate::target::Region;
use crate::transform::{SourceValues, Transformation};
use crate::tree::{MetaKey, MetaValue, Node, NodeKind, NodeRef, Path, Tree};
use crate::WeaveConfig;

pub use errors::{CycleMember, ResolveError};

use apply::EditTrie;
use graph::DependencyGraph;

/// One batch member with its regions computed once
pub(crate) struct Entry {
    pub seq: usize,
    pub unit: Transformation,
    pub region: Region,
    pub reads: Vec<Region>,
}

impl Entry {
    fn new(seq: usize, unit: Transformation) -> Self {
        let region = unit.target().region();
        let reads = unit.sources().values().map(|source| source.region()).collect();
        Self {
            seq,
            unit,
            region,
            reads,
        }
    }

    pub(crate) fn sort_key(&self) -> (&str, usize) {
        (self.unit.origin(), self.seq)
    }
}

/// Applies transformation batches to frozen trees
#[derive(Debug, Clone)]
pub struct Resolver {
    stamp_origin: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self { stamp_origin: true }
    }

    pub fn from_config(config: &WeaveConfig) -> Self {
        Self {
            stamp_origin: config.stamp_origin,
        }
    }

    /// Tag combinator outputs with the id of the transformer that made them
    pub fn stamp_origin(mut self, enabled: bool) -> Self {
        self.stamp_origin = enabled;
        self
    }

    /// Resolve `batch` against `tree`, producing a new snapshot
    pub fn resolve(&self, tree: &Tree, batch: Vec<Transformation>) -> Result<Tree, ResolveError> {
        if batch.is_empty() {
            debug!(tree = %tree.id(), "empty batch, tree unchanged");
            return Ok(Tree::new(tree.root().clone()));
        }

        let entries: Vec<Entry> = batch
            .into_iter()
            .enumerate()
            .map(|(seq, unit)| Entry::new(seq, unit))
            .collect();

        let graph = DependencyGraph::build(&entries);
        debug!(
            transformations = entries.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        let order = graph.schedule(&entries)?;

        conflict::check(&entries)?;

        let mut produced = EditTrie::new();
        for idx in order {
            let entry = &entries[idx];
            let current = entry.unit.target().resolve(tree)?;
            let mut sources = SourceValues::new();
            for (name, source) in entry.unit.sources() {
                source.check_tree(tree)?;
                sources.insert(name.clone(), apply::read(tree.root(), &produced, &source.region())?);
            }

            let output = entry.unit.apply(&current, &sources);
            let output = if self.stamp_origin {
                stamp(&output, &current, entry.unit.origin(), matches!(entry.region, Region::Slice { .. }))
            } else {
                output
            };
            produced.record(&entry.region, entry.unit.origin(), entry.seq, output)?;
        }
        debug!(transformations = entries.len(), "combinators evaluated");

        let root = apply::rebuild(tree.root(), &produced, &Path::root())?;
        let next = Tree::new(root);
        debug!(from = %tree.id(), to = %next.id(), "batch applied");
        Ok(next)
    }
}

/// Attach origin metadata to a combinator output (to each spliced element
/// for slice outputs). Nodes that already name an origin keep it, and nodes
/// passed through from `current` stay the same `Arc`.
fn stamp(output: &NodeRef, current: &NodeRef, origin: &str, splice: bool) -> NodeRef {
    let tag = |node: &NodeRef| {
        if node.meta().contains(MetaKey::Origin) {
            node.clone()
        } else {
            node.with_meta(MetaValue::Origin(origin.to_string()))
        }
    };
    if Node::same(output, current) {
        return output.clone();
    }
    match (splice, output.kind()) {
        (true, NodeKind::List(items)) => {
            let reused = current.as_list().unwrap_or_default();
            let items = items
                .iter()
                .map(|item| {
                    if reused.iter().any(|old| Node::same(old, item)) {
                        item.clone()
                    } else {
                        tag(item)
                    }
                })
                .collect();
            output.derive(NodeKind::List(items))
        }
        (true, _) => output.clone(),
        (false, _) => tag(output),
    }
}

/// Convenience wrapper around `Resolver::new().resolve`
pub fn resolve(tree: &Tree, batch: Vec<Transformation>) -> Result<Tree, ResolveError> {
    Resolver::new().resolve(tree, batch)
}
