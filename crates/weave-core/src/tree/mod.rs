/*!
# Frozen Node Tree

Immutable, reference-shared representation of a class-file-shaped tree.

A tree is made of three node shapes:

- **Map** nodes: ordered string-keyed entries (insertion order is kept)
- **List** nodes: ordered children, duplicates allowed
- **Value** nodes: opaque scalar atoms

Nodes are handed around as `NodeRef` (`Arc<Node>`). Once a node is built it
is never edited; producing a different value always allocates a new node,
and everything that did not change is reused by reference. `MapBuilder` and
`ListBuilder` are the mutable forms used while a combinator assembles a
replacement.
*/

pub mod cursor;
pub mod metadata;
pub mod path;

#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::resolve::ResolveError;

pub use cursor::{Cursor, Tree, TreeId};
pub use metadata::{MetaKey, MetaValue, Metadata};
pub use path::{Path, Step};

/// Shared handle to a frozen node
pub type NodeRef = Arc<Node>;

/// Strongly-typed external handles carried as leaf values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    /// Marker naming a class in the hierarchy (internal form, `a/b/C`)
    Class(String),
}

/// Closed set of scalar payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    None,
    Int(i64),
    Str(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Handle(Handle),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Handle(_) => "handle",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Handle(Handle::Class(name)) => write!(f, "class {name}"),
        }
    }
}

/// Shape and content of a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    Map(IndexMap<String, NodeRef>),
    List(Vec<NodeRef>),
    Value(Value),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Map(_) => "map",
            NodeKind::List(_) => "list",
            NodeKind::Value(_) => "value",
        }
    }
}

// IndexMap equality ignores order; map entry order is significant here.
impl PartialEq for NodeKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeKind::Map(a), NodeKind::Map(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va == vb)
            }
            (NodeKind::List(a), NodeKind::List(b)) => a == b,
            (NodeKind::Value(a), NodeKind::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for NodeKind {}

/// A frozen tree node plus its metadata side-table
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    meta: Metadata,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Node {}

impl Node {
    pub fn new(kind: NodeKind, meta: Metadata) -> NodeRef {
        Arc::new(Node { kind, meta })
    }

    pub fn map<K, I>(entries: I) -> NodeRef
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, NodeRef)>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Node::new(NodeKind::Map(entries), Metadata::new())
    }

    pub fn list<I>(items: I) -> NodeRef
    where
        I: IntoIterator<Item = NodeRef>,
    {
        Node::new(NodeKind::List(items.into_iter().collect()), Metadata::new())
    }

    pub fn value(value: Value) -> NodeRef {
        Node::new(NodeKind::Value(value), Metadata::new())
    }

    pub fn none() -> NodeRef {
        Node::value(Value::None)
    }

    pub fn int(i: i64) -> NodeRef {
        Node::value(Value::Int(i))
    }

    pub fn str(s: impl Into<String>) -> NodeRef {
        Node::value(Value::Str(s.into()))
    }

    pub fn bool(b: bool) -> NodeRef {
        Node::value(Value::Bool(b))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> NodeRef {
        Node::value(Value::Bytes(bytes.into()))
    }

    pub fn class(name: impl Into<String>) -> NodeRef {
        Node::value(Value::Handle(Handle::Class(name.into())))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, NodeRef>> {
        match &self.kind {
            NodeKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NodeRef]> {
        match &self.kind {
            NodeKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Map entry lookup; `None` for missing keys and non-map nodes
    pub fn get(&self, key: &str) -> Option<&NodeRef> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    /// List element lookup; `None` when out of range or not a list
    pub fn at(&self, index: usize) -> Option<&NodeRef> {
        self.as_list().and_then(|items| items.get(index))
    }

    /// Follow one step, reporting why it could not be followed.
    ///
    /// `at` is the path of `self` and is only used for diagnostics.
    pub fn step(&self, step: &Step, at: &Path) -> Result<&NodeRef, ResolveError> {
        match (&self.kind, step) {
            (NodeKind::Map(entries), Step::Key(key)) => entries
                .get(key)
                .ok_or_else(|| ResolveError::unresolved(at.child(step.clone()), "no such key")),
            (NodeKind::List(items), Step::Index(index)) => items.get(*index).ok_or_else(|| {
                ResolveError::unresolved(
                    at.child(step.clone()),
                    format!("index out of range for list of {}", items.len()),
                )
            }),
            (NodeKind::Map(_), Step::Index(_)) => Err(ResolveError::kind_mismatch(at.clone(), "list", "map")),
            (NodeKind::List(_), Step::Key(_)) => Err(ResolveError::kind_mismatch(at.clone(), "map", "list")),
            (NodeKind::Value(_), Step::Key(_)) => Err(ResolveError::kind_mismatch(at.clone(), "map", "value")),
            (NodeKind::Value(_), Step::Index(_)) => Err(ResolveError::kind_mismatch(at.clone(), "list", "value")),
        }
    }

    /// New node with different content that keeps this node's metadata
    pub fn derive(&self, kind: NodeKind) -> NodeRef {
        Node::new(kind, self.meta.clone())
    }

    /// Shallow copy carrying one more metadata entry; children stay shared
    pub fn with_meta(&self, value: MetaValue) -> NodeRef {
        let mut meta = self.meta.clone();
        meta.insert(value);
        Node::new(self.kind.clone(), meta)
    }

    /// Reference identity, as opposed to structural equality
    pub fn same(a: &NodeRef, b: &NodeRef) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Value(value) => write!(f, "{value}"),
            NodeKind::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            NodeKind::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Mutable map under construction
#[derive(Debug, Clone, Default)]
pub struct MapBuilder {
    entries: IndexMap<String, NodeRef>,
    meta: Metadata,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a frozen map's entries and metadata.
    ///
    /// Non-map nodes start an empty builder that keeps their metadata.
    pub fn from_node(node: &Node) -> Self {
        Self {
            entries: node.as_map().cloned().unwrap_or_default(),
            meta: node.meta.clone(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, node: NodeRef) -> Option<NodeRef> {
        self.entries.insert(key.into(), node)
    }

    /// Remove an entry, keeping the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<NodeRef> {
        self.entries.shift_remove(key)
    }

    pub fn with(mut self, key: impl Into<String>, node: NodeRef) -> Self {
        self.insert(key, node);
        self
    }

    pub fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    pub fn freeze(self) -> NodeRef {
        Node::new(NodeKind::Map(self.entries), self.meta)
    }
}

/// Mutable list under construction
#[derive(Debug, Clone, Default)]
pub struct ListBuilder {
    items: Vec<NodeRef>,
    meta: Metadata,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_node(node: &Node) -> Self {
        Self {
            items: node.as_list().map(<[NodeRef]>::to_vec).unwrap_or_default(),
            meta: node.meta.clone(),
        }
    }

    pub fn push(&mut self, node: NodeRef) {
        self.items.push(node);
    }

    pub fn insert(&mut self, index: usize, node: NodeRef) {
        self.items.insert(index, node);
    }

    pub fn remove(&mut self, index: usize) -> Option<NodeRef> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn with(mut self, node: NodeRef) -> Self {
        self.push(node);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    pub fn freeze(self) -> NodeRef {
        Node::new(NodeKind::List(self.items), self.meta)
    }
}

impl Extend<NodeRef> for ListBuilder {
    fn extend<T: IntoIterator<Item = NodeRef>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}
