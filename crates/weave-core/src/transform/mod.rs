/*!
# Transformations

A transformation is one declared patch: the target it produces a value for,
the named source targets it reads, and a pure combinator computing the
replacement from those inputs.

Declaring every read up front is what lets the resolution engine order a
whole batch without running any combinator speculatively.
*/


use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::target::{SliceTarget, Target};
use crate::tree::{Node, NodeRef};

/// Identifier of the transformer that proposed a transformation
pub type OriginId = String;

/// Pure function from (current target value, resolved sources) to the
/// replacement value
///
/// For slice targets the result must be a list node; its children are
/// spliced in place of the covered range.
pub type Combinator = Arc<dyn Fn(&NodeRef, &SourceValues) -> NodeRef + Send + Sync>;

/// Resolved source values handed to a combinator, by local name
#[derive(Debug, Clone, Default)]
pub struct SourceValues {
    values: BTreeMap<String, NodeRef>,
}

impl SourceValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: NodeRef) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&NodeRef> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A patch plus its declared inputs
#[derive(Clone)]
pub struct Transformation {
    origin: OriginId,
    target: Target,
    sources: BTreeMap<String, Target>,
    combinator: Combinator,
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformation")
            .field("origin", &self.origin)
            .field("target", &self.target)
            .field("sources", &self.sources)
            .field("combinator", &"<function>")
            .finish()
    }
}

impl Transformation {
    /// Replace `target` with whatever `combinator` computes
    pub fn replace<F>(origin: impl Into<OriginId>, target: impl Into<Target>, combinator: F) -> Self
    where
        F: Fn(&NodeRef, &SourceValues) -> NodeRef + Send + Sync + 'static,
    {
        Self {
            origin: origin.into(),
            target: target.into(),
            sources: BTreeMap::new(),
            combinator: Arc::new(combinator),
        }
    }

    /// Replace the target with a fixed value
    pub fn set(origin: impl Into<OriginId>, target: impl Into<Target>, node: NodeRef) -> Self {
        Self::replace(origin, target, move |_, _| node.clone())
    }

    /// Splice fixed nodes in place of `slice` (a pure insertion when the
    /// slice has zero width)
    pub fn insert(origin: impl Into<OriginId>, slice: SliceTarget, nodes: Vec<NodeRef>) -> Self {
        Self::replace(origin, slice, move |_, _| Node::list(nodes.iter().cloned()))
    }

    /// Remove the elements covered by `slice`
    pub fn delete(origin: impl Into<OriginId>, slice: SliceTarget) -> Self {
        Self::replace(origin, slice, |_, _| Node::list(Vec::new()))
    }

    /// Declare a named input
    pub fn with_source(mut self, name: impl Into<String>, target: impl Into<Target>) -> Self {
        self.sources.insert(name.into(), target.into());
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn sources(&self) -> &BTreeMap<String, Target> {
        &self.sources
    }

    /// Run the combinator
    pub fn apply(&self, current: &NodeRef, sources: &SourceValues) -> NodeRef {
        (self.combinator)(current, sources)
    }
}
