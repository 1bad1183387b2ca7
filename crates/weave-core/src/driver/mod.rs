/*!
# Transformer Driver

Runs every registered transformer against the current frozen tree, merges
their proposals through the resolution engine, and repeats until a round
proposes nothing (fixed point) or the round limit is hit.

Transformers only ever see complete snapshots. Within a round they do not
observe each other's output, so they are invoked in parallel when the
configuration allows it; their batches are concatenated in registration
order either way.
*/

#[cfg(test)]
mod tests;

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::resolve::Resolver;
use crate::transform::Transformation;
use crate::tree::Tree;
use crate::{Result, WeaveConfig, WeaveError};

/// Something that proposes edits to a frozen tree
pub trait Transformer: Send + Sync {
    /// Stable identifier, used for diagnostics and tie-breaking
    fn id(&self) -> &str;

    /// Propose transformations for `tree`.
    ///
    /// Must be a pure function of the snapshot; returning nothing means this
    /// transformer is satisfied.
    fn apply(&self, tree: &Tree) -> Vec<Transformation>;
}

/// A transformer backed by a closure
pub struct FnTransformer<F>
where
    F: Fn(&Tree) -> Vec<Transformation> + Send + Sync,
{
    id: String,
    f: F,
}

impl<F> FnTransformer<F>
where
    F: Fn(&Tree) -> Vec<Transformation> + Send + Sync,
{
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self { id: id.into(), f }
    }
}

impl<F> Transformer for FnTransformer<F>
where
    F: Fn(&Tree) -> Vec<Transformation> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, tree: &Tree) -> Vec<Transformation> {
        (self.f)(tree)
    }
}

/// Per-transformer execution statistics
#[derive(Debug, Default, Clone)]
pub struct TransformerStats {
    pub transformer: String,
    pub invocations: u64,
    pub proposals: u64,
    pub total_time: Duration,
}

impl TransformerStats {
    pub fn new(transformer: String) -> Self {
        Self {
            transformer,
            ..Default::default()
        }
    }

    pub fn average_proposals(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            (self.proposals as f64) / (self.invocations as f64)
        }
    }

    pub fn average_time(&self) -> Duration {
        if self.invocations == 0 {
            Duration::ZERO
        } else {
            self.total_time.div_f64(self.invocations as f64)
        }
    }
}

/// Outcome of a converged run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The fixed-point tree
    pub tree: Tree,
    /// Rounds executed, counting the final empty one
    pub rounds: usize,
    /// Transformations applied across all rounds
    pub transformations: usize,
}

/// Outcome of a single round
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Nobody proposed anything
    FixedPoint,
    /// The batch was applied, producing a new snapshot
    Applied { tree: Tree, transformations: usize },
}

/// Fixpoint loop over a set of transformers
pub struct Driver {
    transformers: Vec<Box<dyn Transformer>>,
    config: WeaveConfig,
    resolver: Resolver,
    stats: Mutex<HashMap<String, TransformerStats>>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    pub fn new() -> Self {
        let config = WeaveConfig::default();
        Self {
            transformers: Vec::new(),
            resolver: Resolver::from_config(&config),
            config,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Driver with a validated configuration
    pub fn with_config(config: WeaveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transformers: Vec::new(),
            resolver: Resolver::from_config(&config),
            config,
            stats: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Register a transformer; registration order fixes batch order
    pub fn add_transformer(&mut self, transformer: Box<dyn Transformer>) {
        let id = transformer.id().to_string();
        self.stats
            .lock()
            .insert(id.clone(), TransformerStats::new(id));
        self.transformers.push(transformer);
    }

    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.add_transformer(Box::new(transformer));
        self
    }

    pub fn transformer_count(&self) -> usize {
        self.transformers.len()
    }

    /// Iterate rounds until a fixed point.
    ///
    /// Fails with `NonConvergent` when `max_rounds` rounds all proposed
    /// changes; any resolution error aborts the run as well. `tree` is never
    /// modified.
    pub fn run(&self, tree: &Tree) -> Result<RunSummary> {
        let mut current = tree.clone();
        let mut applied = 0;

        for round in 1..=self.config.max_rounds {
            match self.run_round(&current, round)? {
                RoundOutcome::FixedPoint => {
                    info!(round, transformations = applied, "fixed point reached");
                    return Ok(RunSummary {
                        tree: current,
                        rounds: round,
                        transformations: applied,
                    });
                }
                RoundOutcome::Applied {
                    tree,
                    transformations,
                } => {
                    applied += transformations;
                    current = tree;
                }
            }
        }

        warn!(
            max_rounds = self.config.max_rounds,
            "transformers still proposing changes at the round limit"
        );
        Err(WeaveError::NonConvergent {
            rounds: self.config.max_rounds,
        })
    }

    /// Collect one batch from every transformer and resolve it
    pub fn run_round(&self, tree: &Tree, round: usize) -> Result<RoundOutcome> {
        let batch = self.collect(tree);
        if batch.is_empty() {
            return Ok(RoundOutcome::FixedPoint);
        }

        let transformations = batch.len();
        info!(round, transformations, tree = %tree.id(), "resolving round");
        let next = self.resolver.resolve(tree, batch)?;
        Ok(RoundOutcome::Applied {
            tree: next,
            transformations,
        })
    }

    fn collect(&self, tree: &Tree) -> Vec<Transformation> {
        let invoke = |transformer: &dyn Transformer| {
            let start = Instant::now();
            let proposed = transformer.apply(tree);
            (proposed, start.elapsed())
        };

        let results: Vec<(Vec<Transformation>, Duration)> = if self.config.parallel {
            self.transformers.par_iter().map(|t| invoke(t.as_ref())).collect()
        } else {
            self.transformers.iter().map(|t| invoke(t.as_ref())).collect()
        };

        let mut stats = self.stats.lock();
        let mut batch = Vec::new();
        for (transformer, (proposed, elapsed)) in self.transformers.iter().zip(results) {
            let entry = stats
                .entry(transformer.id().to_string())
                .or_insert_with(|| TransformerStats::new(transformer.id().to_string()));
            entry.invocations += 1;
            entry.proposals += proposed.len() as u64;
            entry.total_time += elapsed;
            debug!(transformer = transformer.id(), proposed = proposed.len(), "transformer applied");
            batch.extend(proposed);
        }
        batch
    }

    /// Snapshot of the execution statistics
    pub fn stats(&self) -> HashMap<String, TransformerStats> {
        self.stats.lock().clone()
    }

    /// Clear statistics
    pub fn clear_stats(&self) {
        for stats in self.stats.lock().values_mut() {
            *stats = TransformerStats::new(stats.transformer.clone());
        }
    }
}
