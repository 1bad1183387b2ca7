use std::fmt;

use thiserror::Error;

use crate::tree::Path;

/// One participant of a dependency cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleMember {
    pub origin: String,
    pub target: String,
}

impl fmt::Display for CycleMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.target)
    }
}

fn describe_cycle(cycle: &[CycleMember]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolution errors; every one aborts the whole round
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cyclic dependency between transformations: {}", describe_cycle(.cycle))]
    CyclicDependency { cycle: Vec<CycleMember> },

    #[error("Overlapping transformations from '{first}' and '{second}' on {region}")]
    OverlappingTransformation {
        first: String,
        second: String,
        region: String,
    },

    #[error("Unresolved target {path}: {reason}")]
    UnresolvedTarget { path: Path, reason: String },

    #[error("Kind mismatch at {path}: expected {expected}, found {found}")]
    KindMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },
}

impl ResolveError {
    /// Create an unresolved target error
    pub fn unresolved(path: Path, reason: impl Into<String>) -> Self {
        Self::UnresolvedTarget {
            path,
            reason: reason.into(),
        }
    }

    /// Create a kind mismatch error
    pub fn kind_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        Self::KindMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create an overlap error
    pub fn overlapping(first: &str, second: &str, region: impl fmt::Display) -> Self {
        Self::OverlappingTransformation {
            first: first.to_string(),
            second: second.to_string(),
            region: region.to_string(),
        }
    }
}
