//! # Weave Core
//!
//! Core of the classweave transformation pipeline, including:
//! - Frozen, reference-shared class-file trees
//! - Node and slice targets in virtual-index space
//! - Transformation units with declared sources
//! - The four-phase resolution engine
//! - The fixpoint driver over registered transformers
//! - Superclass resolution over pluggable hierarchy providers
//!
//! Decoding class files is out of scope; a JSON codec is provided for
//! fixtures and debugging.

#![warn(clippy::all)]

pub mod codec;
pub mod driver;
pub mod hierarchy;
pub mod resolve;
pub mod target;
pub mod transform;
pub mod tree;


use std::path::Path as FsPath;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use codec::{decode_json, decode_str, encode_json, encode_string, CodecError};
pub use driver::{Driver, FnTransformer, RoundOutcome, RunSummary, Transformer, TransformerStats};
pub use hierarchy::{HierarchyError, HierarchyProvider, Lookup, MapHierarchy, SuperclassResolver, TreeHierarchy};
pub use resolve::{resolve, CycleMember, ResolveError, Resolver};
pub use target::{NodeTarget, Region, SliceTarget, Target, VirtualIndex};
pub use transform::{Combinator, OriginId, SourceValues, Transformation};
pub use tree::{
    Cursor, Handle, ListBuilder, MapBuilder, MetaKey, MetaValue, Metadata, Node, NodeKind, NodeRef, Path, Step,
    Tree, TreeId, Value,
};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for weave core components.
///
/// Honors `RUST_LOG` and falls back to `weave_core=info`. Calling it more
/// than once is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("weave_core=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Driver and resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Rounds the driver runs before giving up on a fixed point
    pub max_rounds: usize,
    /// Invoke transformers in parallel within a round
    pub parallel: bool,
    /// Tag produced nodes with the origin id of their transformer
    pub stamp_origin: bool,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            max_rounds: 16,
            parallel: true,
            stamp_origin: true,
        }
    }
}

impl WeaveConfig {
    /// Parse and validate a JSON configuration; missing fields keep their
    /// defaults
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: WeaveConfig =
            serde_json::from_str(text).map_err(|e| WeaveError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<FsPath>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(WeaveError::Config("max_rounds must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Set the round limit
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Toggle parallel transformer invocation
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Toggle origin stamping of produced nodes
    pub fn with_stamp_origin(mut self, stamp_origin: bool) -> Self {
        self.stamp_origin = stamp_origin;
        self
    }
}

/// Error types for weave core operations
#[derive(thiserror::Error, Debug)]
pub enum WeaveError {
    /// A round failed to resolve
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Superclass lookup failed
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    /// Transformers kept proposing changes
    #[error("No fixed point after {rounds} rounds")]
    NonConvergent { rounds: usize },

    /// Fixture decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for weave core operations
pub type Result<T> = std::result::Result<T, WeaveError>;
