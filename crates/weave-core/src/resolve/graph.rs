use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use super::errors::{CycleMember, ResolveError};
use super::Entry;

/// Read-after-write edges between the transformations of one batch
///
/// An edge `a -> b` means one of `b`'s sources reads the region `a` writes,
/// so `a` has to be evaluated first.
pub(crate) struct DependencyGraph {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub(crate) fn build(entries: &[Entry]) -> Self {
        let mut successors = vec![Vec::new(); entries.len()];
        let mut predecessors = vec![Vec::new(); entries.len()];

        for (reader, entry) in entries.iter().enumerate() {
            for (writer, other) in entries.iter().enumerate() {
                if reader == writer {
                    continue;
                }
                if entry.reads.iter().any(|read| read.reads(&other.region)) {
                    trace!(from = other.unit.origin(), to = entry.unit.origin(), "dependency edge");
                    successors[writer].push(reader);
                    predecessors[reader].push(writer);
                }
            }
        }

        Self {
            successors,
            predecessors,
        }
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// Topological order; ties go to the smallest `(origin, batch position)`
    pub(crate) fn schedule(&self, entries: &[Entry]) -> Result<Vec<usize>, ResolveError> {
        let mut indegree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<(&str, usize)> = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| (entries[idx].unit.origin(), idx))
            .collect();

        let mut order = Vec::with_capacity(entries.len());
        while let Some(next) = ready.pop_first() {
            let idx = next.1;
            order.push(idx);
            for &succ in &self.successors[idx] {
                indegree[succ] -= 1;
                if indegree[succ] == 0 {
                    ready.insert((entries[succ].unit.origin(), succ));
                }
            }
        }

        if order.len() == entries.len() {
            return Ok(order);
        }

        let scheduled: BTreeSet<usize> = order.into_iter().collect();
        let cycle = self.find_cycle(&scheduled, entries.len());
        Err(ResolveError::CyclicDependency {
            cycle: cycle
                .into_iter()
                .map(|idx| CycleMember {
                    origin: entries[idx].unit.origin().to_string(),
                    target: entries[idx].unit.target().to_string(),
                })
                .collect(),
        })
    }

    /// Walk predecessors among the unscheduled vertices until one repeats.
    ///
    /// Every unscheduled vertex still has an unscheduled predecessor, so the
    /// walk always closes a cycle.
    fn find_cycle(&self, scheduled: &BTreeSet<usize>, len: usize) -> Vec<usize> {
        let Some(start) = (0..len).find(|idx| !scheduled.contains(idx)) else {
            return Vec::new();
        };

        let mut walk = Vec::new();
        let mut seen: HashMap<usize, usize> = HashMap::new();
        let mut current = start;
        loop {
            if let Some(&pos) = seen.get(&current) {
                let mut cycle: Vec<usize> = walk[pos..].to_vec();
                cycle.reverse();
                if let Some(min_pos) = cycle.iter().enumerate().min_by_key(|(_, idx)| **idx).map(|(p, _)| p) {
                    cycle.rotate_left(min_pos);
                }
                return cycle;
            }
            seen.insert(current, walk.len());
            walk.push(current);
            match self.predecessors[current]
                .iter()
                .copied()
                .filter(|pred| !scheduled.contains(pred))
                .min()
            {
                Some(pred) => current = pred,
                None => return walk,
            }
        }
    }
}
