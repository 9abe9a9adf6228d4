//! Dependency graph between rule outputs and their inputs.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B is derived from A"  (A is an input of B's rule)
//! ```
//!
//! Following outgoing edges answers "what else moves if A changes?".

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::item::ItemId;

/// Adjacency for registered rules.
///
/// - `preds[B]` = inputs of the rule producing B
/// - `succs[A]` = outputs whose rules read A
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** If A ∈ preds[B] then B ∈ succs[A], and vice versa.
/// 2. **No dangling entries:** Empty sets are removed, not stored.
/// 3. **Acyclic:** callers check `would_create_cycle` before `set_inputs`.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    preds: FxHashMap<ItemId, FxHashSet<ItemId>>,
    succs: FxHashMap<ItemId, FxHashSet<ItemId>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs read by the rule producing `item`.
    pub fn precedents<'a>(&'a self, item: &ItemId) -> impl Iterator<Item = &'a ItemId> + 'a {
        self.preds.get(item).into_iter().flat_map(|s| s.iter())
    }

    /// Outputs whose rules read `item`.
    pub fn dependents<'a>(&'a self, item: &ItemId) -> impl Iterator<Item = &'a ItemId> + 'a {
        self.succs.get(item).into_iter().flat_map(|s| s.iter())
    }

    pub fn is_derived(&self, item: &ItemId) -> bool {
        self.preds.contains_key(item)
    }

    /// Every item mentioned by any rule, as input or output.
    pub fn node_count(&self) -> usize {
        let mut nodes: FxHashSet<&ItemId> = self.preds.keys().collect();
        nodes.extend(self.succs.keys());
        nodes.len()
    }

    /// Wire `output` to read from `inputs`, replacing any previous wiring.
    pub fn set_inputs(&mut self, output: &ItemId, inputs: &[ItemId]) {
        if let Some(old) = self.preds.remove(output) {
            for pred in old {
                if let Some(deps) = self.succs.get_mut(&pred) {
                    deps.remove(output);
                    if deps.is_empty() {
                        self.succs.remove(&pred);
                    }
                }
            }
        }

        if inputs.is_empty() {
            return;
        }

        let new_preds: FxHashSet<ItemId> = inputs.iter().cloned().collect();
        for pred in &new_preds {
            self.succs
                .entry(pred.clone())
                .or_default()
                .insert(output.clone());
        }
        self.preds.insert(output.clone(), new_preds);
    }

    /// Would wiring `output` to `inputs` close a loop?
    ///
    /// Returns the loop as a path `output → … → input → output`. A cycle
    /// exists iff some input is reachable from `output` along dependent edges.
    pub fn would_create_cycle(&self, output: &ItemId, inputs: &[ItemId]) -> Option<Vec<ItemId>> {
        if inputs.contains(output) {
            return Some(vec![output.clone(), output.clone()]);
        }

        let targets: FxHashSet<&ItemId> = inputs.iter().collect();
        let mut parent: FxHashMap<ItemId, ItemId> = FxHashMap::default();
        let mut visited: FxHashSet<ItemId> = FxHashSet::default();
        let mut stack = vec![output.clone()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            // Sorted so the reported path is stable.
            let mut next: Vec<&ItemId> = self.dependents(&current).collect();
            next.sort();

            for dep in next {
                if visited.contains(dep) {
                    continue;
                }
                parent.entry(dep.clone()).or_insert_with(|| current.clone());
                if targets.contains(dep) {
                    let mut path = vec![dep.clone()];
                    let mut cursor = dep.clone();
                    while let Some(p) = parent.get(&cursor) {
                        path.push(p.clone());
                        if p == output {
                            break;
                        }
                        cursor = p.clone();
                    }
                    path.reverse();
                    path.push(output.clone());
                    return Some(path);
                }
                stack.push(dep.clone());
            }
        }

        None
    }

    /// Topological order of `active` outputs: inputs before the outputs that read them.
    ///
    /// Only edges between two active outputs constrain the order; any other
    /// input is a source. Kahn's algorithm with the ready set kept in `ItemId`
    /// order, so the result is a pure function of the graph and `active`.
    /// Nodes on a cycle would be left out; registration keeps the graph acyclic.
    pub fn topo_order(&self, active: &FxHashSet<ItemId>) -> Vec<ItemId> {
        let mut in_degree: FxHashMap<&ItemId, usize> = FxHashMap::default();
        for item in active {
            let count = self
                .precedents(item)
                .filter(|p| active.contains(*p))
                .count();
            in_degree.insert(item, count);
        }

        let mut ready: BTreeSet<&ItemId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&item, _)| item)
            .collect();

        let mut order = Vec::with_capacity(active.len());

        while let Some(item) = ready.pop_first() {
            order.push(item.clone());
            for dep in self.dependents(item) {
                if let Some(deg) = in_degree.get_mut(dep) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.insert(dep);
                    }
                }
            }
        }

        order
    }

    /// Check all invariants. Panics if any are violated.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (output, preds) in &self.preds {
            assert!(!preds.is_empty(), "Empty preds set stored for {output}");
            for pred in preds {
                assert!(
                    self.succs.get(pred).map_or(false, |s| s.contains(output)),
                    "Missing succ edge: {pred} should have {output} in dependents"
                );
            }
        }
        for (item, deps) in &self.succs {
            assert!(!deps.is_empty(), "Empty succs set stored for {item}");
            for dep in deps {
                assert!(
                    self.preds.get(dep).map_or(false, |s| s.contains(item)),
                    "Missing pred edge: {dep} should have {item} in precedents"
                );
            }
        }
    }
}
