//! Shared fixtures for sgember-core integration tests.

use sgember_core::AffinityGraph;

/// Ring of `nodes` nodes with unit affinities between neighbours.
pub fn ring_graph(nodes: usize) -> AffinityGraph {
    let triplets = (0..nodes)
        .map(|i| (i, (i + 1) % nodes, 1.0))
        .collect();
    AffinityGraph::from_triplets(nodes, triplets).expect("ring triplets are valid")
}
