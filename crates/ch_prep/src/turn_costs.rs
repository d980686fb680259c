//! Turn cost table, compiled once per preparation and consulted from the
//! innermost witness search loop.
//!
//! The compiled form keys entries by via-node: a prefix table delimits each
//! node's range over two parallel arrays holding the packed (from, to) edge
//! pair and the cost. Ranges are small, so lookups scan linearly.
use crate::constants::Weight;
use crate::graph::{edge_index, node_index, EdgeIndex, NodeIndex, Weighting};

/// One row of the turn cost source: the penalty for turning from
/// `from_edge` over `via_node` onto `to_edge`.
#[derive(Debug, Clone, Copy)]
pub struct TurnCostEntry {
    pub from_edge: EdgeIndex,
    pub via_node: NodeIndex,
    pub to_edge: EdgeIndex,
    pub cost: Weight,
}

// from-edge in the lower half, to-edge in the upper half
fn pack_pair(from_edge: EdgeIndex, to_edge: EdgeIndex) -> u64 {
    ((to_edge.index() as u64) << 32) | from_edge.index() as u64
}

/// Turn costs compiled into a via-node keyed lookup structure.
#[derive(Debug)]
pub struct TurnCostFunction {
    edge_pairs: Vec<u64>,
    costs: Vec<Weight>,
    first_entry_by_node: Vec<u32>,
    u_turn_cost: Weight,
}

impl TurnCostFunction {
    /// Compiles the turn cost table. `entries` must arrive in
    /// non-decreasing via-node order; the U-turn cost is taken from the
    /// weighting once, up front.
    pub fn compile(
        num_nodes: usize,
        weighting: &impl Weighting,
        entries: impl IntoIterator<Item = TurnCostEntry>,
    ) -> Self {
        let u_turn_cost = weighting.turn_weight(edge_index(1), node_index(0), edge_index(1));

        let mut edge_pairs = Vec::new();
        let mut costs = Vec::new();
        let mut first_entry_by_node = vec![0u32; num_nodes + 1];
        let mut prev_via = 0usize;

        for entry in entries {
            let via = entry.via_node.index();
            assert!(
                via < num_nodes,
                "Turn cost via-node {} does not exist",
                via
            );
            assert!(
                via >= prev_via,
                "Turn cost entries must arrive in non-decreasing via-node order, got node {} after {}",
                via,
                prev_via
            );
            // back-fill the prefix table for skipped via-nodes
            for node in prev_via + 1..=via {
                first_entry_by_node[node] = edge_pairs.len() as u32;
            }
            prev_via = via;

            edge_pairs.push(pack_pair(entry.from_edge, entry.to_edge));
            costs.push(entry.cost);
        }
        for node in prev_via + 1..=num_nodes {
            first_entry_by_node[node] = edge_pairs.len() as u32;
        }

        TurnCostFunction {
            edge_pairs,
            costs,
            first_entry_by_node,
            u_turn_cost,
        }
    }

    /// Penalty for turning from `in_edge` over `via` onto `out_edge`.
    /// Queries naming an invalid edge cost nothing; turning back onto the
    /// same edge costs the precompiled U-turn penalty.
    pub fn turn_weight(&self, in_edge: EdgeIndex, via: NodeIndex, out_edge: EdgeIndex) -> Weight {
        if in_edge == EdgeIndex::end() || out_edge == EdgeIndex::end() {
            return 0.0;
        }
        if in_edge == out_edge {
            return self.u_turn_cost;
        }

        let start = self.first_entry_by_node[via.index()] as usize;
        let end = self.first_entry_by_node[via.index() + 1] as usize;
        let pair = pack_pair(in_edge, out_edge);
        for i in start..end {
            if self.edge_pairs[i] == pair {
                return self.costs[i];
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantTurns(Weight);

    impl Weighting for ConstantTurns {
        fn edge_weight(&self, _edge: EdgeIndex, _reverse: bool) -> Weight {
            1.0
        }
        fn turn_weight(&self, _in: EdgeIndex, _via: NodeIndex, _out: EdgeIndex) -> Weight {
            self.0
        }
    }

    fn entry(from: usize, via: usize, to: usize, cost: Weight) -> TurnCostEntry {
        TurnCostEntry {
            from_edge: edge_index(from),
            via_node: node_index(via),
            to_edge: edge_index(to),
            cost,
        }
    }

    #[test]
    fn lookup_hits_and_misses() {
        let f = TurnCostFunction::compile(
            5,
            &ConstantTurns(40.0),
            vec![
                entry(0, 1, 1, 3.0),
                entry(0, 1, 2, 5.0),
                entry(4, 3, 5, 7.0),
            ],
        );

        assert_eq!(f.turn_weight(edge_index(0), node_index(1), edge_index(1)), 3.0);
        assert_eq!(f.turn_weight(edge_index(0), node_index(1), edge_index(2)), 5.0);
        assert_eq!(f.turn_weight(edge_index(0), node_index(1), edge_index(7)), 0.0);
        assert_eq!(f.turn_weight(edge_index(4), node_index(3), edge_index(5)), 7.0);
        assert_eq!(f.turn_weight(edge_index(4), node_index(2), edge_index(5)), 0.0);
    }

    #[test]
    fn u_turns_use_the_precompiled_cost() {
        let f = TurnCostFunction::compile(5, &ConstantTurns(40.0), vec![entry(0, 1, 1, 3.0)]);

        // even for edges the table never saw
        assert_eq!(f.turn_weight(edge_index(9), node_index(1), edge_index(9)), 40.0);
        assert_eq!(f.turn_weight(edge_index(0), node_index(4), edge_index(0)), 40.0);
    }

    #[test]
    fn invalid_edges_cost_nothing() {
        let f = TurnCostFunction::compile(3, &ConstantTurns(40.0), vec![entry(0, 1, 1, 3.0)]);

        assert_eq!(f.turn_weight(EdgeIndex::end(), node_index(1), edge_index(1)), 0.0);
        assert_eq!(f.turn_weight(edge_index(0), node_index(1), EdgeIndex::end()), 0.0);
        // the sentinel wins over the U-turn special case
        assert_eq!(f.turn_weight(EdgeIndex::end(), node_index(1), EdgeIndex::end()), 0.0);
    }

    #[test]
    fn empty_table_answers_queries() {
        let f = TurnCostFunction::compile(4, &ConstantTurns(0.0), Vec::new());

        assert_eq!(f.turn_weight(edge_index(0), node_index(2), edge_index(1)), 0.0);
        assert_eq!(f.turn_weight(edge_index(0), node_index(2), edge_index(0)), 0.0);
    }

    #[test]
    fn infinite_costs_surface_unchanged() {
        let f = TurnCostFunction::compile(
            3,
            &ConstantTurns(0.0),
            vec![entry(0, 1, 1, Weight::INFINITY)],
        );

        assert!(f
            .turn_weight(edge_index(0), node_index(1), edge_index(1))
            .is_infinite());
    }

    #[test]
    #[should_panic(expected = "non-decreasing via-node order")]
    fn out_of_order_entries_are_rejected() {
        TurnCostFunction::compile(
            5,
            &ConstantTurns(0.0),
            vec![entry(0, 3, 1, 1.0), entry(0, 1, 2, 1.0)],
        );
    }
}
