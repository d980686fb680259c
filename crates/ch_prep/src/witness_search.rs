use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::constants::Weight;
use crate::graph::{DefaultIdx, NodeIndex};
use crate::prep_graph::PrepGraph;

#[derive(Debug)]
struct Candidate<Idx = DefaultIdx> {
    node_idx: NodeIndex<Idx>,
    weight: Weight,
}

impl Candidate {
    fn new(node_idx: NodeIndex, weight: Weight) -> Self {
        Self { node_idx, weight }
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        other.weight.partial_cmp(&self.weight)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        other.weight == self.weight
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .weight
            .partial_cmp(&self.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Bounded local Dijkstra used to find witness paths: shortest paths
/// between the neighbors of a contraction candidate that avoid the
/// candidate itself.
pub(crate) struct WitnessSearch<'a> {
    g: &'a PrepGraph,
    max_nodes_settled_limit: usize,
}

impl<'a> WitnessSearch<'a> {
    pub(crate) fn with_params(g: &'a PrepGraph, max_nodes_settled_limit: usize) -> Self {
        Self {
            g,
            max_nodes_settled_limit,
        }
    }

    /// Searches from `start`, never expanding `avoid`. Stops once all
    /// `targets` are settled, the settle limit is hit, or the smallest
    /// queued weight exceeds `max_weight`. Returns the best known weight
    /// per reached node.
    pub(crate) fn search(
        &self,
        start: NodeIndex,
        targets: &[NodeIndex],
        avoid: NodeIndex,
        max_weight: Weight,
    ) -> FxHashMap<NodeIndex, Weight> {
        let mut nodes_settled = 0;
        let mut node_data = FxHashMap::default();
        let mut targets_settled = 0;

        let mut queue = BinaryHeap::new();
        queue.push(Candidate::new(start, 0.0));

        while let Some(Candidate { weight, node_idx }) = queue.pop() {
            if targets_settled == targets.len() {
                break;
            }
            if nodes_settled >= self.max_nodes_settled_limit {
                break;
            }
            if weight > max_weight {
                break;
            }

            for edge in self.g.out_edges(node_idx) {
                if edge.adj_node() == avoid {
                    continue;
                }
                let edge_weight = edge.weight();
                if !edge_weight.is_finite() {
                    continue;
                }

                let new_distance = weight + edge_weight;
                if new_distance
                    < *node_data
                        .get(&edge.adj_node())
                        .unwrap_or(&Weight::INFINITY)
                {
                    node_data.insert(edge.adj_node(), new_distance);
                    queue.push(Candidate::new(edge.adj_node(), new_distance));
                }
            }

            nodes_settled += 1;

            if targets.contains(&node_idx) {
                targets_settled += 1;
            }
        }

        node_data
    }
}
