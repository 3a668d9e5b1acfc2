use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use crate::error::CompositionError;
use crate::hook::HookSpec;

/// Computes, for each kind, the hook index whose output dependents should
/// bind to. The first hook to declare a kind is canonical; a later hook of
/// the same kind with `overwrite: true` replaces it as the producer that
/// dependents are wired to.
pub(crate) fn producer_of(hooks: &[HookSpec]) -> HashMap<String, usize> {
    let mut producers = HashMap::new();
    for (idx, hook) in hooks.iter().enumerate() {
        match producers.get(&hook.kind) {
            None => {
                producers.insert(hook.kind.clone(), idx);
            }
            Some(_) if hook.overwrite => {
                producers.insert(hook.kind.clone(), idx);
            }
            Some(_) => {}
        }
    }
    producers
}

pub(crate) fn build_edges(
    hooks: &[HookSpec],
    producers: &HashMap<String, usize>,
    base: &HashMap<String, crate::facet::Facet>,
) -> Result<Vec<(usize, usize)>, CompositionError> {
    let mut edges = Vec::new();
    for (idx, hook) in hooks.iter().enumerate() {
        for required in &hook.required {
            if base.contains_key(required) {
                continue;
            }
            match producers.get(required) {
                Some(&producer_idx) if producer_idx != idx => edges.push((producer_idx, idx)),
                Some(_) => {}
                None => return Err(CompositionError::MissingDependency(required.clone())),
            }
        }
    }
    Ok(edges)
}

/// Kahn's algorithm with insertion-order tie-breaking among ready nodes,
/// so the resulting order is both a valid linear extension of the
/// dependency graph and deterministic across repeated builds of the same
/// hook set.
pub(crate) fn topo_sort(n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>, Vec<usize>> {
    let mut indegree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(from, to) in edges {
        adjacency[from].push(to);
        indegree[to] += 1;
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for &to in &adjacency[next] {
            indegree[to] -= 1;
            if indegree[to] == 0 {
                ready.insert(to);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        let done: BTreeSet<usize> = order.iter().copied().collect();
        Err((0..n).filter(|i| !done.contains(i)).collect())
    }
}

/// Advisory cache of previously computed build orders, keyed by the
/// normalized shape of the hook set (kind + its declared requirements,
/// sorted). A miss just falls back to recomputing; nothing depends on the
/// cache for correctness.
#[derive(Default)]
pub struct GraphCache {
    entries: Mutex<HashMap<Vec<(String, String)>, Vec<usize>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn key_for(hooks: &[HookSpec]) -> Vec<(String, String)> {
        let mut key: Vec<(String, String)> =
            hooks.iter().map(|h| (h.kind.clone(), h.required.join(","))).collect();
        key.sort();
        key
    }

    pub(crate) fn get(&self, key: &[(String, String)]) -> Option<Vec<usize>> {
        self.entries.lock().get(key).cloned()
    }

    pub(crate) fn put(&self, key: Vec<(String, String)>, order: Vec<usize>) {
        self.entries.lock().insert(key, order);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_sort_respects_edges_and_ties_by_insertion_order() {
        // 0 and 2 are independent roots; 1 depends on 0; 3 depends on both 1 and 2.
        let edges = vec![(0, 1), (1, 3), (2, 3)];
        let order = topo_sort(4, &edges).unwrap();
        let pos = |n: usize| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(3));
        // 0 and 2 both ready at the start; insertion order (0 before 2) wins the tie.
        assert_eq!(order[0], 0);
    }

    #[test]
    fn topo_sort_reports_remaining_nodes_on_cycle() {
        let edges = vec![(0, 1), (1, 0)];
        let remaining = topo_sort(2, &edges).unwrap_err();
        assert_eq!(remaining, vec![0, 1]);
    }
}
