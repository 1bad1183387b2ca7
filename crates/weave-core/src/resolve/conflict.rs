use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::target::Region;
use crate::tree::{Path, Step};

use super::errors::ResolveError;
use super::Entry;

/// Reject any two transformations that claim a common existing node.
///
/// Regions are grouped by the container they edit. Siblings in one
/// container are compared pairwise; nesting (an edit inside a node another
/// transformation replaces) is found by walking each anchor's ancestors.
/// The reported pair is ordered by `(origin, batch position)`, so the same
/// batch in any order reports the same conflict.
pub(crate) fn check(entries: &[Entry]) -> Result<(), ResolveError> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| entries[a].sort_key().cmp(&entries[b].sort_key()));

    let mut containers: BTreeMap<Path, Vec<usize>> = BTreeMap::new();
    let mut nodes: HashMap<&Path, Vec<usize>> = HashMap::new();
    let mut slices: HashMap<&Path, Vec<usize>> = HashMap::new();
    for &idx in &order {
        let region = &entries[idx].region;
        containers.entry(region.container()).or_default().push(idx);
        match region {
            Region::Node(path) => nodes.entry(path).or_default().push(idx),
            Region::Slice { list, .. } => slices.entry(list).or_default().push(idx),
        }
    }
    debug!(containers = containers.len(), "checking for overlapping transformations");

    for members in containers.values() {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if entries[a].region.overlaps(&entries[b].region) {
                    return Err(report(entries, a, b));
                }
            }
        }
    }

    for &idx in &order {
        let region = &entries[idx].region;
        let anchor = region.anchor();
        for prefix in anchor.prefixes() {
            let is_self = prefix.len() == anchor.len();
            // A node region's own path was covered by the sibling pass.
            if is_self && matches!(region, Region::Node(_)) {
                continue;
            }
            if let Some(holders) = nodes.get(&prefix) {
                if let Some(&other) = holders.iter().find(|&&other| other != idx) {
                    return Err(report(entries, idx, other));
                }
            }
            if is_self {
                continue;
            }
            if let (Some(holders), Some(Step::Index(index))) =
                (slices.get(&prefix), anchor.steps().get(prefix.len()))
            {
                let hit = holders.iter().copied().find(|&other| {
                    other != idx && entries[other].region.overlaps(&Region::Node(prefix.index(*index)))
                });
                if let Some(other) = hit {
                    return Err(report(entries, idx, other));
                }
            }
        }
    }

    Ok(())
}

fn report(entries: &[Entry], a: usize, b: usize) -> ResolveError {
    let (first, second) = if entries[a].sort_key() <= entries[b].sort_key() {
        (a, b)
    } else {
        (b, a)
    };
    let region = if entries[first].region.anchor().len() >= entries[second].region.anchor().len() {
        &entries[first].region
    } else {
        &entries[second].region
    };
    ResolveError::overlapping(
        entries[first].unit.origin(),
        entries[second].unit.origin(),
        region,
    )
}
