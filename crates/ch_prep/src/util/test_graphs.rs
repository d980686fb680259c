//! Graph fixtures shared by the tests.
use crate::constants::Weight;
use crate::graph::{
    edge_index, node_index, EdgeIndex, InputEdge, InputGraph, NodeIndex, Weighting,
};
use crate::prep_graph::PrepGraph;

/// Weighting that charges one unit per edge and nothing for turns.
pub struct ZeroTurns;

impl Weighting for ZeroTurns {
    fn edge_weight(&self, _edge: EdgeIndex, _reverse: bool) -> Weight {
        1.0
    }
    fn turn_weight(&self, _in_edge: EdgeIndex, _via: NodeIndex, _out_edge: EdgeIndex) -> Weight {
        0.0
    }
}

/// In-memory input graph: one `(node_a, node_b, weight_fwd, weight_bwd)`
/// tuple per edge, indexed by edge id.
pub struct EdgeList {
    pub num_nodes: usize,
    pub edges: Vec<(usize, usize, Weight, Weight)>,
}

impl InputGraph for EdgeList {
    fn num_nodes(&self) -> usize {
        self.num_nodes
    }
    fn num_edges(&self) -> usize {
        self.edges.len()
    }
    fn for_each_edge(&self, mut f: impl FnMut(InputEdge)) {
        for (id, &(a, b, _, _)) in self.edges.iter().enumerate() {
            f(InputEdge {
                edge: edge_index(id),
                node_a: node_index(a),
                node_b: node_index(b),
            });
        }
    }
}

impl Weighting for EdgeList {
    fn edge_weight(&self, edge: EdgeIndex, reverse: bool) -> Weight {
        let (_, _, fwd, bwd) = self.edges[edge.index()];
        if reverse {
            bwd
        } else {
            fwd
        }
    }
    fn turn_weight(&self, _in_edge: EdgeIndex, _via: NodeIndex, _out_edge: EdgeIndex) -> Weight {
        0.0
    }
}

/// Ring of four nodes with one one-way segment, ready for contraction.
pub fn build_ring_graph() -> PrepGraph {
    // 0 <-> 1 -> 2 <-> 3 <-> 0
    let mut g = PrepGraph::node_based(4, 4);
    g.add_edge(node_index(0), node_index(1), edge_index(0), 1.0, 1.0);
    g.add_edge(node_index(1), node_index(2), edge_index(1), 1.0, Weight::INFINITY);
    g.add_edge(node_index(2), node_index(3), edge_index(2), 1.0, 1.0);
    g.add_edge(node_index(3), node_index(0), edge_index(3), 1.0, 1.0);
    g.prepare_for_contraction();
    g
}

pub fn build_simple_graph() -> PrepGraph {
    //           B
    //           |
    // E -> A -> C
    //      |  /
    //      D
    let mut g = PrepGraph::node_based(5, 5);
    g.add_edge(node_index(0), node_index(2), edge_index(0), 1.0, Weight::INFINITY); // A -> C
    g.add_edge(node_index(0), node_index(3), edge_index(1), 1.0, Weight::INFINITY); // A -> D
    g.add_edge(node_index(4), node_index(0), edge_index(2), 1.0, Weight::INFINITY); // E -> A
    g.add_edge(node_index(2), node_index(1), edge_index(3), 1.0, 1.0); // C <=> B
    g.add_edge(node_index(2), node_index(3), edge_index(4), 1.0, 1.0); // C <=> D
    g.prepare_for_contraction();
    g
}

pub fn build_complex_graph() -> PrepGraph {
    // 'A'..='K', every connection passable in both directions
    let edges: [(usize, usize, Weight); 20] = [
        (0, 1, 3.0),  // A <=> B
        (0, 2, 5.0),  // A <=> C
        (0, 10, 3.0), // A <=> K
        (1, 3, 5.0),  // B <=> D
        (1, 2, 3.0),  // B <=> C
        (2, 3, 2.0),  // C <=> D
        (2, 9, 2.0),  // C <=> J
        (3, 9, 4.0),  // D <=> J
        (3, 4, 7.0),  // D <=> E
        (4, 9, 3.0),  // E <=> J
        (4, 5, 6.0),  // E <=> F
        (5, 7, 2.0),  // F <=> H
        (5, 6, 4.0),  // F <=> G
        (6, 7, 3.0),  // G <=> H
        (6, 8, 5.0),  // G <=> I
        (7, 8, 3.0),  // H <=> I
        (7, 9, 2.0),  // H <=> J
        (8, 9, 4.0),  // I <=> J
        (8, 10, 6.0), // I <=> K
        (9, 10, 3.0), // J <=> K
    ];

    let mut g = PrepGraph::node_based(11, edges.len());
    for (id, &(a, b, w)) in edges.iter().enumerate() {
        g.add_edge(node_index(a), node_index(b), edge_index(id), w, w);
    }
    g.prepare_for_contraction();
    g
}
