/*!
# Superclass Resolution

Nearest common ancestor of two classes, for re-deriving verification
metadata once a tree is final. Not used during resolution.

Superclass facts come from a chain of `HierarchyProvider`s: the first one
that knows a class answers for it, and a class nobody knows is an error.
The universal root class ends every chain.
*/


use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::tree::{Handle, NodeRef, Tree, Value};

/// Root of the class hierarchy unless configured otherwise
pub const DEFAULT_ROOT_CLASS: &str = "java/lang/Object";

/// Hierarchy lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Class not found: {name}")]
    ClassNotFound { name: String },
}

/// One provider's answer for a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Direct superclass
    Found(String),
    /// The class has no superclass
    Root,
    /// Not known here; ask the next provider
    Unknown,
}

/// Source of direct-superclass facts
pub trait HierarchyProvider: Send + Sync {
    fn super_class_of(&self, name: &str) -> Lookup;
}

/// Explicit `class -> superclass` pairs
#[derive(Debug, Clone, Default)]
pub struct MapHierarchy {
    supers: HashMap<String, Option<String>>,
}

impl MapHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, super_class: impl Into<String>) {
        self.supers.insert(name.into(), Some(super_class.into()));
    }

    /// Record a class with no superclass
    pub fn insert_root(&mut self, name: impl Into<String>) {
        self.supers.insert(name.into(), None);
    }

    pub fn with(mut self, name: impl Into<String>, super_class: impl Into<String>) -> Self {
        self.insert(name, super_class);
        self
    }

    pub fn len(&self) -> usize {
        self.supers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supers.is_empty()
    }
}

impl HierarchyProvider for MapHierarchy {
    fn super_class_of(&self, name: &str) -> Lookup {
        match self.supers.get(name) {
            Some(Some(super_class)) => Lookup::Found(super_class.clone()),
            Some(None) => Lookup::Root,
            None => Lookup::Unknown,
        }
    }
}

/// Classes declared by a frozen tree
///
/// Reads `classes[*].name` and `classes[*].super`; both may be strings or
/// class handles. A missing or `none` superclass marks a root.
#[derive(Debug, Clone, Default)]
pub struct TreeHierarchy {
    classes: MapHierarchy,
}

impl TreeHierarchy {
    pub fn from_tree(tree: &Tree) -> Self {
        let mut classes = MapHierarchy::new();
        let declared = tree
            .root()
            .get("classes")
            .and_then(|node| node.as_list())
            .unwrap_or_default();

        for class in declared {
            let Some(name) = class.get("name").and_then(class_name) else {
                continue;
            };
            match class.get("super").and_then(class_name) {
                Some(super_class) => classes.insert(name, super_class),
                None => classes.insert_root(name),
            }
        }
        debug!(classes = classes.len(), tree = %tree.id(), "hierarchy read from tree");
        Self { classes }
    }
}

fn class_name(node: &NodeRef) -> Option<String> {
    match node.as_value()? {
        Value::Str(name) => Some(name.clone()),
        Value::Handle(Handle::Class(name)) => Some(name.clone()),
        _ => None,
    }
}

impl HierarchyProvider for TreeHierarchy {
    fn super_class_of(&self, name: &str) -> Lookup {
        self.classes.super_class_of(name)
    }
}

/// Provider chain with memoized answers
pub struct SuperclassResolver {
    providers: Vec<Box<dyn HierarchyProvider>>,
    root: String,
    cache: DashMap<String, Option<String>>,
}

impl Default for SuperclassResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SuperclassResolver {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            root: DEFAULT_ROOT_CLASS.to_string(),
            cache: DashMap::new(),
        }
    }

    /// Use a different universal root class
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self.cache.clear();
        self
    }

    /// Append a provider; earlier providers take precedence
    pub fn with_provider(mut self, provider: impl HierarchyProvider + 'static) -> Self {
        self.add_provider(Box::new(provider));
        self
    }

    pub fn add_provider(&mut self, provider: Box<dyn HierarchyProvider>) {
        self.providers.push(provider);
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Direct superclass of `name`, `None` for the root
    pub fn super_class_of(&self, name: &str) -> Result<Option<String>, HierarchyError> {
        if name == self.root {
            return Ok(None);
        }
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }

        let answer = self
            .providers
            .iter()
            .map(|provider| provider.super_class_of(name))
            .find(|lookup| *lookup != Lookup::Unknown);

        let super_class = match answer {
            Some(Lookup::Found(super_class)) => Some(super_class),
            Some(_) => None,
            None => {
                return Err(HierarchyError::ClassNotFound {
                    name: name.to_string(),
                })
            }
        };
        trace!(class = name, super_class = ?super_class, "superclass lookup");
        self.cache.insert(name.to_string(), super_class.clone());
        Ok(super_class)
    }

    /// Every ancestor of `name`, nearest first, ending at the root
    pub fn ancestors(&self, name: &str) -> Result<Vec<String>, HierarchyError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.super_class_of(name)?;
        while let Some(class) = current {
            if !seen.insert(class.clone()) {
                break;
            }
            current = self.super_class_of(&class)?;
            chain.push(class);
        }
        if chain.last().map(String::as_str) != Some(self.root.as_str()) && name != self.root {
            chain.push(self.root.clone());
        }
        Ok(chain)
    }

    /// Nearest class that both `a` and `b` extend (or are)
    ///
    /// Both superclass chains are walked one step at a time; the first name
    /// reached by both walks wins, and the root is the fallback once both
    /// chains run out.
    pub fn common_super_class(&self, a: &str, b: &str) -> Result<String, HierarchyError> {
        let mut seen_a: HashSet<String> = HashSet::new();
        let mut seen_b: HashSet<String> = HashSet::new();
        let mut walk_a = Some(a.to_string());
        let mut walk_b = Some(b.to_string());

        while walk_a.is_some() || walk_b.is_some() {
            if let Some(class) = walk_a.take() {
                if seen_b.contains(&class) {
                    return Ok(class);
                }
                walk_a = self.advance(&class, &mut seen_a)?;
            }
            if let Some(class) = walk_b.take() {
                if seen_a.contains(&class) {
                    return Ok(class);
                }
                walk_b = self.advance(&class, &mut seen_b)?;
            }
        }
        Ok(self.root.clone())
    }

    /// Mark `class` as visited and step to its superclass; a revisit ends
    /// the walk
    fn advance(&self, class: &str, seen: &mut HashSet<String>) -> Result<Option<String>, HierarchyError> {
        if !seen.insert(class.to_string()) {
            return Ok(None);
        }
        self.super_class_of(class)
    }

    /// Forget memoized answers
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
