use std::fmt;

use serde::{Deserialize, Serialize};

/// One step from a container to one of its children
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    /// Entry of a map node
    Key(String),
    /// Element of a list node
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(key) => write!(f, "{key}"),
            Step::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Step {
    fn from(key: &str) -> Self {
        Step::Key(key.to_string())
    }
}

impl From<usize> for Step {
    fn from(index: usize) -> Self {
        Step::Index(index)
    }
}

/// Chain of steps from the tree root to a node
///
/// Paths are only meaningful for the frozen tree they were taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path(Vec<Step>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    /// Parse the display form (`/classes/0/fields`).
    ///
    /// Segments made only of digits become list indices, everything else
    /// becomes a map key.
    pub fn parse(text: &str) -> Self {
        let steps = text
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => Step::Index(index),
                Err(_) => Step::Key(segment.to_string()),
            })
            .collect();
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, step: impl Into<Step>) -> Path {
        let mut steps = self.0.clone();
        steps.push(step.into());
        Path(steps)
    }

    pub fn key(&self, key: &str) -> Path {
        self.child(Step::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Path {
        self.child(Step::Index(index))
    }

    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Path(rest.to_vec())),
            None => None,
        }
    }

    pub fn last(&self) -> Option<&Step> {
        self.0.last()
    }

    /// True when `prefix` is this path or one of its ancestors
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when this path is a strict ancestor of `other`
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.starts_with(self)
    }

    /// Every prefix of this path, from the root down to the path itself
    pub fn prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (0..=self.0.len()).map(move |len| Path(self.0[..len].to_vec()))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl From<Vec<Step>> for Path {
    fn from(steps: Vec<Step>) -> Self {
        Path(steps)
    }
}
