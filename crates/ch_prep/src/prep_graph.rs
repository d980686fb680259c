//! The preparation graph: the mutable working structure the contraction
//! driver reads from and writes to.
//!
//! The graph starts in the building phase, where base edges are pushed in.
//! `prepare_for_contraction` freezes the original-graph side (edge-based
//! mode) and switches to the ready phase, in which shortcuts are inserted,
//! neighborhoods are explored and contracted nodes are disconnected.
//! Edge records live in one arena; the per-node lists store arena
//! positions, so a record shared by both endpoints exists exactly once.
use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::constants::Weight;
use crate::edge_lists::EdgeLists;
use crate::edges::{BaseEdge, EdgeShortcut, OrigEdgeKey, PrepEdge, Shortcut};
use crate::graph::{EdgeIndex, InputGraph, NodeIndex, Weighting};
use crate::orig_graph::{OrigEdgeIter, OrigGraph, OrigGraphBuilder};
use crate::turn_costs::TurnCostFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Building,
    Ready,
    Closed,
}

pub struct PrepGraph {
    num_nodes: usize,
    /// Size of the base edge id space. Shortcut ids are minted from here.
    num_edges: usize,
    next_shortcut: usize,
    /// Arena positions `0..base_edge_count` hold base edges, everything
    /// after holds shortcuts in insertion order.
    base_edge_count: usize,
    edges: Vec<PrepEdge>,
    edge_lists: EdgeLists,
    orig_builder: Option<OrigGraphBuilder>,
    orig_graph: Option<OrigGraph>,
    turn_cost_function: Option<TurnCostFunction>,
    phase: Phase,
}

impl PrepGraph {
    /// A preparation graph that ignores turn costs.
    pub fn node_based(num_nodes: usize, num_edges: usize) -> Self {
        PrepGraph::new(num_nodes, num_edges, None, None)
    }

    /// A preparation graph that models turn costs; it tracks original edge
    /// keys on its shortcuts and keeps the original graph around for turn
    /// cost resolution.
    pub fn edge_based(
        num_nodes: usize,
        num_edges: usize,
        turn_cost_function: TurnCostFunction,
    ) -> Self {
        PrepGraph::new(
            num_nodes,
            num_edges,
            Some(OrigGraphBuilder::with_capacity(num_edges)),
            Some(turn_cost_function),
        )
    }

    fn new(
        num_nodes: usize,
        num_edges: usize,
        orig_builder: Option<OrigGraphBuilder>,
        turn_cost_function: Option<TurnCostFunction>,
    ) -> Self {
        PrepGraph {
            num_nodes,
            num_edges,
            next_shortcut: num_edges,
            base_edge_count: 0,
            edges: Vec::with_capacity(num_edges),
            edge_lists: EdgeLists::new(num_nodes),
            orig_builder,
            orig_graph: None,
            turn_cost_function,
            phase: Phase::Building,
        }
    }

    /// Feeds every base edge of `graph` in, weighted by `weighting`.
    ///
    /// **Panics** if the counts of `graph` do not match the counts this
    /// graph was sized for.
    pub fn build_from_graph(&mut self, graph: &impl InputGraph, weighting: &impl Weighting) {
        self.require_phase(Phase::Building, "build_from_graph");
        assert_eq!(
            graph.num_nodes(),
            self.num_nodes,
            "Input graph has a different node count than the preparation graph"
        );
        assert_eq!(
            graph.num_edges(),
            self.num_edges,
            "Input graph has a different edge count than the preparation graph"
        );

        graph.for_each_edge(|e| {
            let weight_fwd = weighting.edge_weight(e.edge, false);
            let weight_bwd = weighting.edge_weight(e.edge, true);
            self.add_edge(e.node_a, e.node_b, e.edge, weight_fwd, weight_bwd);
        });
    }

    /// Materializes a base edge. An edge that is inaccessible in both
    /// directions is skipped entirely.
    pub fn add_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        edge: EdgeIndex,
        weight_fwd: Weight,
        weight_bwd: Weight,
    ) {
        self.require_phase(Phase::Building, "add_edge");
        assert!(
            from.index() < self.num_nodes,
            "From node index ({}) does not exist",
            from.index()
        );
        assert!(
            to.index() < self.num_nodes,
            "To node index ({}) does not exist",
            to.index()
        );
        assert!(
            edge.index() < self.num_edges,
            "Edge id ({}) exceeds the declared edge count",
            edge.index()
        );

        if !weight_fwd.is_finite() && !weight_bwd.is_finite() {
            return;
        }
        debug_assert!(
            weight_fwd >= 0.0 && weight_bwd >= 0.0,
            "Edge weights must be non-negative"
        );

        let pos = self.edges.len() as u32;
        self.edges
            .push(PrepEdge::Base(BaseEdge::new(edge, from, to, weight_fwd, weight_bwd)));
        self.edge_lists.add(from.index(), pos);
        if from != to {
            self.edge_lists.add(to.index(), pos);
        }

        if let Some(builder) = &mut self.orig_builder {
            builder.add_edge(from, to, edge, weight_fwd.is_finite(), weight_bwd.is_finite());
        }
    }

    /// Ends the building phase: freezes the original graph (edge-based
    /// mode) and enables shortcut insertion, exploration and
    /// disconnection.
    pub fn prepare_for_contraction(&mut self) {
        self.require_phase(Phase::Building, "prepare_for_contraction");
        self.base_edge_count = self.edges.len();
        if let Some(builder) = self.orig_builder.take() {
            self.orig_graph = Some(builder.build(self.num_nodes));
        }
        self.phase = Phase::Ready;
        info!(
            "Preparation graph ready: {} nodes, {} base edges materialized",
            self.num_nodes, self.base_edge_count
        );
    }

    /// Inserts a shortcut from `from` to `to` replacing the two-edge path
    /// `skipped1`/`skipped2` and returns its freshly minted id. The key
    /// arguments are only stored in edge-based mode.
    #[allow(clippy::too_many_arguments)]
    pub fn add_shortcut(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        orig_key_first: OrigEdgeKey,
        orig_key_last: OrigEdgeKey,
        skipped1: EdgeIndex,
        skipped2: EdgeIndex,
        weight: Weight,
        orig_edge_count: u32,
    ) -> EdgeIndex {
        self.require_phase(Phase::Ready, "add_shortcut");
        debug_assert!(weight.is_finite(), "Shortcut weight must be finite");

        let prepare_edge = EdgeIndex::new(self.next_shortcut);
        self.next_shortcut += 1;

        let shortcut = Shortcut::new(
            prepare_edge,
            from,
            to,
            weight,
            skipped1,
            skipped2,
            orig_edge_count,
        );
        let record = if self.orig_graph.is_some() {
            PrepEdge::EdgeShortcut(EdgeShortcut::new(shortcut, orig_key_first, orig_key_last))
        } else {
            PrepEdge::NodeShortcut(shortcut)
        };

        let pos = self.edges.len() as u32;
        self.edges.push(record);
        self.edge_lists.add(from.index(), pos);
        if from != to {
            self.edge_lists.add(to.index(), pos);
        }

        debug!(
            "Added shortcut {}: {} -> {}, weight {}",
            prepare_edge.index(),
            from.index(),
            to.index(),
            weight
        );
        prepare_edge
    }

    /// Iterates the current edges at `node`, yielding shortcuts only if
    /// they originate there.
    pub fn out_edges(&self, node: NodeIndex) -> PrepEdgeIter<'_> {
        self.explore(node, false)
    }

    /// Iterates the current edges at `node`, yielding shortcuts only if
    /// they terminate there.
    pub fn in_edges(&self, node: NodeIndex) -> PrepEdgeIter<'_> {
        self.explore(node, true)
    }

    fn explore(&self, node: NodeIndex, reverse: bool) -> PrepEdgeIter<'_> {
        self.require_phase(Phase::Ready, "Edge explorers");
        PrepEdgeIter {
            g: self,
            base: node,
            reverse,
            pos: 0,
        }
    }

    /// Iterates the original edges leaving `node`. Edge-based mode only.
    pub fn out_orig_edges(&self, node: NodeIndex) -> OrigEdgeIter<'_> {
        self.require_phase(Phase::Ready, "Original-edge explorers");
        self.orig_graph()
            .out_edges(node)
    }

    /// Iterates the original edges entering `node`. Edge-based mode only.
    pub fn in_orig_edges(&self, node: NodeIndex) -> OrigEdgeIter<'_> {
        self.require_phase(Phase::Ready, "Original-edge explorers");
        self.orig_graph()
            .in_edges(node)
    }

    fn orig_graph(&self) -> &OrigGraph {
        self.orig_graph
            .as_ref()
            .expect("Original-edge explorers require an edge-based graph")
    }

    /// Removes every edge at `node` from the lists of its neighbors, then
    /// empties `node`'s own list. Returns the distinct neighbors in the
    /// order the shared edges were originally added; the contraction
    /// driver relies on this order for reproducible priority updates.
    pub fn disconnect(&mut self, node: NodeIndex) -> Vec<NodeIndex> {
        self.require_phase(Phase::Ready, "disconnect");

        let mut positions: Vec<u32> = self.edge_lists.slot(node.index()).to_vec();
        // arena positions grow with insertion, so sorting restores the
        // insertion order that earlier swap-removals may have disturbed
        positions.sort_unstable();

        let mut neighbors = Vec::new();
        let mut seen = FxHashSet::default();
        for pos in positions {
            let edge = &self.edges[pos as usize];
            let (a, b) = (edge.node_a(), edge.node_b());
            if a == b {
                // self-loops vanish with the slot
                continue;
            }
            let other = if a == node { b } else { a };
            self.edge_lists.remove(other.index(), pos);
            if seen.insert(other) {
                neighbors.push(other);
            }
        }
        self.edge_lists.clear(node.index());
        neighbors
    }

    /// Number of edges (base and shortcut) currently referenced by `node`.
    pub fn degree(&self, node: NodeIndex) -> usize {
        self.edge_lists.size(node.index())
    }

    pub fn node_count(&self) -> usize {
        self.num_nodes
    }

    /// Size of the base edge id space the graph was built for.
    pub fn original_edge_count(&self) -> usize {
        self.num_edges
    }

    pub fn shortcut_count(&self) -> usize {
        self.next_shortcut - self.num_edges
    }

    /// Turn penalty for in-edge → via-node → out-edge; zero for node-based
    /// graphs.
    pub fn turn_weight(&self, in_edge: EdgeIndex, via: NodeIndex, out_edge: EdgeIndex) -> Weight {
        assert!(
            self.phase != Phase::Closed,
            "turn_weight must not be called on a closed graph"
        );
        match &self.turn_cost_function {
            Some(f) => f.turn_weight(in_edge, via, out_edge),
            None => 0.0,
        }
    }

    /// Updates the weight of an existing shortcut.
    pub fn set_shortcut_weight(&mut self, shortcut: EdgeIndex, weight: Weight) {
        self.require_phase(Phase::Ready, "Shortcut setters");
        let pos = self.shortcut_pos(shortcut);
        self.edges[pos].set_weight(weight);
    }

    /// Replaces the skipped-edge pair of an existing shortcut.
    pub fn set_skipped_edges(&mut self, shortcut: EdgeIndex, skipped1: EdgeIndex, skipped2: EdgeIndex) {
        self.require_phase(Phase::Ready, "Shortcut setters");
        let pos = self.shortcut_pos(shortcut);
        self.edges[pos].set_skipped_edges(skipped1, skipped2);
    }

    /// Replaces the original edge count of an existing shortcut.
    pub fn set_orig_edge_count(&mut self, shortcut: EdgeIndex, count: u32) {
        self.require_phase(Phase::Ready, "Shortcut setters");
        let pos = self.shortcut_pos(shortcut);
        self.edges[pos].set_orig_edge_count(count);
    }

    /// Releases all storage. The graph accepts no operations afterwards.
    pub fn close(&mut self) {
        self.require_phase(Phase::Ready, "close");
        self.edges = Vec::new();
        self.edge_lists.release();
        self.orig_graph = None;
        self.turn_cost_function = None;
        self.phase = Phase::Closed;
    }

    fn shortcut_pos(&self, shortcut: EdgeIndex) -> usize {
        assert!(
            shortcut.index() >= self.num_edges,
            "Edge {} is a base edge and immutable",
            shortcut.index()
        );
        let pos = self.base_edge_count + (shortcut.index() - self.num_edges);
        assert!(
            pos < self.edges.len(),
            "Shortcut {} does not exist",
            shortcut.index()
        );
        pos
    }

    fn require_phase(&self, expected: Phase, operation: &str) {
        assert!(
            self.phase == expected,
            "{} requires the {:?} phase, the graph is {:?}",
            operation,
            expected,
            self.phase
        );
    }
}

/// One edge projected from the point of view of the explorer's base node.
#[derive(Clone, Copy)]
pub struct PrepEdgeRef<'a> {
    edge: &'a PrepEdge,
    base: NodeIndex,
}

impl PrepEdgeRef<'_> {
    #[inline]
    fn ab(&self) -> bool {
        self.base == self.edge.node_a()
    }

    pub fn prepare_edge(&self) -> EdgeIndex {
        self.edge.prepare_edge()
    }

    pub fn is_shortcut(&self) -> bool {
        self.edge.is_shortcut()
    }

    pub fn base_node(&self) -> NodeIndex {
        self.base
    }

    pub fn adj_node(&self) -> NodeIndex {
        if self.ab() {
            self.edge.node_b()
        } else {
            self.edge.node_a()
        }
    }

    /// Weight of the edge in the direction away from the base node.
    pub fn weight(&self) -> Weight {
        if self.ab() {
            self.edge.weight_ab()
        } else {
            self.edge.weight_ba()
        }
    }

    /// Weight of the edge when traversed from the adjacent node into the
    /// base node.
    pub fn weight_into_base(&self) -> Weight {
        if self.ab() {
            self.edge.weight_ba()
        } else {
            self.edge.weight_ab()
        }
    }

    pub fn orig_edge_key_first(&self) -> OrigEdgeKey {
        self.edge.orig_edge_key_first(self.ab())
    }

    pub fn orig_edge_key_last(&self) -> OrigEdgeKey {
        self.edge.orig_edge_key_last(self.ab())
    }

    pub fn skipped_edge1(&self) -> EdgeIndex {
        self.edge.skipped_edge1()
    }

    pub fn skipped_edge2(&self) -> EdgeIndex {
        self.edge.skipped_edge2()
    }

    pub fn orig_edge_count(&self) -> u32 {
        self.edge.orig_edge_count()
    }
}

/// Cursor over one node's edge list. Base edges are always yielded (access
/// is encoded in the directional weights, consumers filter); shortcuts are
/// yielded only in their own direction.
pub struct PrepEdgeIter<'a> {
    g: &'a PrepGraph,
    base: NodeIndex,
    reverse: bool,
    pos: usize,
}

impl<'a> Iterator for PrepEdgeIter<'a> {
    type Item = PrepEdgeRef<'a>;

    fn next(&mut self) -> Option<PrepEdgeRef<'a>> {
        let slot = self.g.edge_lists.slot(self.base.index());
        while self.pos < slot.len() {
            let edge = &self.g.edges[slot[self.pos] as usize];
            self.pos += 1;

            let yield_edge = if !edge.is_shortcut() {
                true
            } else if self.reverse {
                edge.node_b() == self.base
            } else {
                edge.node_a() == self.base
            };
            if yield_edge {
                return Some(PrepEdgeRef {
                    edge,
                    base: self.base,
                });
            }
        }
        None
    }
}
