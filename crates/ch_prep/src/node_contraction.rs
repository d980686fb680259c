//! Node contraction driver.
//!
//! Repeatedly picks the node with the lowest priority, covers all shortest
//! paths through it with shortcuts and disconnects it from the preparation
//! graph. The resulting contraction order is what a hierarchy is built
//! from; assembling that hierarchy is left to the caller.
use std::{
    cmp::{max, Reverse},
    fmt::{Display, Write},
    time::{Duration, Instant},
};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use log::{debug, info};
use priority_queue::PriorityQueue;

use crate::{
    constants::Weight,
    edges::INVALID_ORIG_KEY,
    graph::{node_index, EdgeIndex, NodeIndex},
    prep_graph::PrepGraph,
    witness_search::WitnessSearch,
};

const STEP_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct ContractionParams {
    priority_params: PriorityParams,
    // Limit for lazy updates
    witness_search_limit: usize,
    // Limit for initial node ordering
    witness_search_initial_limit: usize,
}

impl ContractionParams {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn priority_params(mut self, params: PriorityParams) -> Self {
        self.priority_params = params;
        self
    }

    pub fn witness_search_limit(mut self, limit: usize) -> Self {
        self.witness_search_limit = limit;
        self
    }

    pub fn witness_search_initial_limit(mut self, limit: usize) -> Self {
        self.witness_search_initial_limit = limit;
        self
    }
}

impl Default for ContractionParams {
    fn default() -> Self {
        ContractionParams {
            priority_params: Default::default(),
            witness_search_limit: 50,
            witness_search_initial_limit: 500,
        }
    }
}

/// Coefficients for the priority function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityParams {
    pub edge_difference_coeff: i32,
    pub contracted_neighbors_coeff: i32,
    pub search_space_coeff: i32,
    pub original_edges_coeff: i32,
}

impl PriorityParams {
    pub fn new(
        edge_difference_coeff: i32,
        contracted_neighbors_coeff: i32,
        search_space_coeff: i32,
        original_edges_coeff: i32,
    ) -> Self {
        PriorityParams {
            edge_difference_coeff,
            contracted_neighbors_coeff,
            search_space_coeff,
            original_edges_coeff,
        }
    }

    pub fn edge_difference_coeff(mut self, coeff: i32) -> Self {
        self.edge_difference_coeff = coeff;
        self
    }

    pub fn contracted_neighbors_coeff(mut self, coeff: i32) -> Self {
        self.contracted_neighbors_coeff = coeff;
        self
    }

    pub fn search_space_coeff(mut self, coeff: i32) -> Self {
        self.search_space_coeff = coeff;
        self
    }

    pub fn original_edges_coeff(mut self, coeff: i32) -> Self {
        self.original_edges_coeff = coeff;
        self
    }
}

impl Default for PriorityParams {
    fn default() -> Self {
        PriorityParams {
            edge_difference_coeff: 501,
            contracted_neighbors_coeff: 401,
            search_space_coeff: 7,
            original_edges_coeff: 201,
        }
    }
}

/// Strategy which is used while contracting nodes.
#[derive(Clone, Copy, Debug)]
pub enum ContractionStrategy<'a> {
    /// Nodes are contracted in the exact order of the given slice.
    FixedOrder(&'a [NodeIndex]),
    /// The order gets updated according to the chosen [`UpdateStrategy`]
    /// while the contraction is running.
    LazyUpdate(UpdateStrategy),
}

impl Default for ContractionStrategy<'_> {
    fn default() -> Self {
        Self::LazyUpdate(UpdateStrategy::default())
    }
}

/// Strategy which is used to update the contraction order.
#[derive(Clone, Copy, Debug)]
pub struct UpdateStrategy {
    update_jit: bool,
    update_local: bool,
}

impl Default for UpdateStrategy {
    fn default() -> Self {
        Self {
            update_jit: true,
            update_local: true,
        }
    }
}

impl UpdateStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a popped node is re-evaluated before contraction
    pub fn update_jit(&self) -> bool {
        self.update_jit
    }

    /// Returns true if the neighbors of a contracted node are re-evaluated
    pub fn update_local(&self) -> bool {
        self.update_local
    }

    pub fn set_update_jit(mut self, update_jit: bool) -> Self {
        self.update_jit = update_jit;
        self
    }

    pub fn set_update_local(mut self, update_local: bool) -> Self {
        self.update_local = update_local;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstructionStats {
    pub node_ordering_time: Duration,
    pub contraction_time: Duration,
    pub total_time: Duration,
    pub shortcuts_added: usize,
    timer: Instant,
}

impl Default for ConstructionStats {
    fn default() -> Self {
        ConstructionStats {
            node_ordering_time: Duration::new(0, 0),
            contraction_time: Duration::new(0, 0),
            total_time: Duration::new(0, 0),
            shortcuts_added: 0,
            timer: Instant::now(),
        }
    }
}

impl Display for ConstructionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "---Construction Stats---")?;
        writeln!(f, "Node Ordering      : {:?}", self.node_ordering_time)?;
        writeln!(f, "Construction       : {:?}", self.contraction_time)?;
        writeln!(f, "------------------------")?;
        writeln!(f, "Total time         : {:?}", self.total_time)?;
        writeln!(f, "Shortcuts added [#]: {}", self.shortcuts_added)
    }
}

impl ConstructionStats {
    fn init(&mut self) {
        self.timer = Instant::now();
        self.shortcuts_added = 0;
        self.node_ordering_time = Duration::new(0, 0);
        self.contraction_time = Duration::new(0, 0);
        self.total_time = Duration::new(0, 0);
    }

    fn stop_timer_node_ordering(&mut self) {
        self.node_ordering_time = self.timer.elapsed();
        self.total_time += self.node_ordering_time;
        self.timer = Instant::now();
    }

    fn stop_timer_construction(&mut self) {
        self.contraction_time = self.timer.elapsed();
        self.total_time += self.contraction_time;
        self.timer = Instant::now();
    }
}

/// The contraction order produced by a full run.
#[derive(Debug)]
pub struct ContractionOrdering {
    /// Rank per node: 1 for the first contracted node, `|V|` for the last.
    pub node_ranks: Vec<usize>,
    /// The nodes in contraction order.
    pub order: Vec<NodeIndex>,
    pub shortcuts_added: usize,
}

/// One edge of the neighborhood of a contraction candidate, captured
/// before the graph is mutated.
#[derive(Debug, Clone, Copy)]
struct NeighborEdge {
    prepare_edge: EdgeIndex,
    adj: NodeIndex,
    weight: Weight,
    orig_count: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct ContractionEffect {
    added: usize,
    removed: usize,
    added_orig: usize,
}

/// Contracts the nodes of a [`PrepGraph`], lowest priority first.
///
/// The graph must already be prepared for contraction. Running consumes
/// the graph's connectivity (every node ends up disconnected) and leaves
/// the inserted shortcuts behind.
pub struct NodeContractor<'a> {
    g: &'a mut PrepGraph,
    node_ranks: Vec<usize>,
    levels: Vec<usize>,
    contracted_neighbors: Vec<usize>,
    num_nodes: usize,
    params: ContractionParams,
    stats: ConstructionStats,
}

impl<'a> NodeContractor<'a> {
    pub fn new(g: &'a mut PrepGraph) -> Self {
        Self::new_with_params(g, Default::default())
    }

    pub fn new_with_params(g: &'a mut PrepGraph, params: ContractionParams) -> Self {
        let num_nodes = g.node_count();
        NodeContractor {
            g,
            node_ranks: vec![0; num_nodes],
            levels: vec![0; num_nodes],
            contracted_neighbors: vec![0; num_nodes],
            num_nodes,
            params,
            stats: Default::default(),
        }
    }

    pub fn stats(&self) -> ConstructionStats {
        self.stats
    }

    pub fn run(&mut self) -> ContractionOrdering {
        self.run_with_strategy(ContractionStrategy::default())
    }

    pub fn run_with_order(&mut self, node_order: &[NodeIndex]) -> ContractionOrdering {
        self.run_with_strategy(ContractionStrategy::FixedOrder(node_order))
    }

    pub fn run_with_strategy(&mut self, strategy: ContractionStrategy) -> ContractionOrdering {
        info!("BEGIN contracting nodes");
        self.stats.init();

        let mut queue = match strategy {
            ContractionStrategy::FixedOrder(order) => {
                assert_eq!(
                    order.len(),
                    self.num_nodes,
                    "A fixed contraction order must name every node"
                );
                let mut pq = PriorityQueue::new();
                for (priority, node) in order.iter().enumerate() {
                    pq.push(*node, Reverse(priority as i32));
                }
                pq
            }
            ContractionStrategy::LazyUpdate(_) => {
                info!("Calculating initial node order...");
                self.calc_initial_node_order()
            }
        };
        self.stats.stop_timer_node_ordering();

        let mut order_out = Vec::with_capacity(self.num_nodes);
        let mut step_size = STEP_SIZE;
        let mut next_goal = step_size;

        let pb = ProgressBar::new(queue.len() as u64);
        pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {human_pos}/{human_len} Nodes ({eta})")
            .unwrap()
            .with_key("eta", |state: &ProgressState, w: &mut dyn Write| write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap())
            .progress_chars("#>-"));

        while !queue.is_empty() {
            let (node, Reverse(priority)) = queue.pop().unwrap();

            if let ContractionStrategy::LazyUpdate(strat) = strategy {
                if strat.update_jit() {
                    // If the priority got worse in the meantime, the node is
                    // re-queued instead of contracted
                    let importance =
                        self.calc_priority(node, 0, self.params.witness_search_limit);
                    if importance > priority {
                        queue.push(node, Reverse(importance));
                        continue;
                    }
                }
            }

            debug!("=> Contracting node: {}", node.index());
            self.contract_node(node);
            let neighbors = self.g.disconnect(node);

            for neighbor in neighbors {
                self.contracted_neighbors[neighbor.index()] += 1;
                self.levels[neighbor.index()] =
                    max(self.levels[node.index()] + 1, self.levels[neighbor.index()]);

                if let ContractionStrategy::LazyUpdate(strat) = strategy {
                    if strat.update_local() {
                        let importance = self.calc_priority(
                            neighbor,
                            self.levels[neighbor.index()],
                            self.params.witness_search_limit,
                        );

                        if let Some(Reverse(old_value)) =
                            queue.change_priority(&neighbor, Reverse(importance))
                        {
                            if importance != old_value {
                                debug!(
                                    "[Update] Changed priority of node {} from {} to {}",
                                    neighbor.index(),
                                    old_value,
                                    importance
                                );
                            }
                        }
                    }
                }
            }

            self.node_ranks[node.index()] = self.num_nodes - queue.len();
            order_out.push(node);

            let progress = (self.num_nodes - queue.len()) as f64 / self.num_nodes as f64;
            if progress * 100.0 >= next_goal {
                info!(
                    "Progress: {:.2}%, Shortcuts: {}",
                    progress * 100.0,
                    self.stats.shortcuts_added
                );
                if progress * 100.0 >= 95.0 {
                    step_size = 0.5;
                }
                next_goal += step_size;
            }
            pb.inc(1);
        }
        self.stats.stop_timer_construction();
        pb.finish_with_message("Done contracting nodes");
        info!("{}", self.stats);

        ContractionOrdering {
            node_ranks: self.node_ranks.clone(),
            order: order_out,
            shortcuts_added: self.stats.shortcuts_added,
        }
    }

    fn contract_node(&mut self, v: NodeIndex) {
        self.handle_contract_node(v, self.params.witness_search_limit, false);
    }

    /// Finds all shortcuts required to contract `v`. With `is_simulation`
    /// the graph is left untouched and only the effect is reported, which
    /// is what the priority function feeds on.
    fn handle_contract_node(
        &mut self,
        v: NodeIndex,
        max_nodes_settled_limit: usize,
        is_simulation: bool,
    ) -> ContractionEffect {
        let edges_in: Vec<NeighborEdge> = self
            .g
            .in_edges(v)
            .filter(|e| e.adj_node() != v)
            .map(|e| NeighborEdge {
                prepare_edge: e.prepare_edge(),
                adj: e.adj_node(),
                weight: e.weight_into_base(),
                orig_count: if e.is_shortcut() { e.orig_edge_count() } else { 1 },
            })
            .filter(|e| e.weight.is_finite())
            .collect();

        let edges_out: Vec<NeighborEdge> = self
            .g
            .out_edges(v)
            .filter(|e| e.adj_node() != v)
            .map(|e| NeighborEdge {
                prepare_edge: e.prepare_edge(),
                adj: e.adj_node(),
                weight: e.weight(),
                orig_count: if e.is_shortcut() { e.orig_edge_count() } else { 1 },
            })
            .filter(|e| e.weight.is_finite())
            .collect();

        let mut effect = ContractionEffect {
            removed: edges_in.len() + edges_out.len(),
            ..Default::default()
        };

        for uv in &edges_in {
            // P_max = max { <u,v,w> } bounds the witness searches
            let mut max_weight = 0.0;
            let mut targets = Vec::new();
            for vw in &edges_out {
                if uv.adj == vw.adj {
                    continue;
                }
                let weight = uv.weight + vw.weight;
                if weight > max_weight {
                    max_weight = weight;
                }
                targets.push(vw.adj);
            }
            if targets.is_empty() {
                continue;
            }

            let res = WitnessSearch::with_params(self.g, max_nodes_settled_limit).search(
                uv.adj,
                &targets,
                v,
                max_weight,
            );

            // Add a shortcut wherever no better path <u,...,w> exists
            for vw in &edges_out {
                if uv.adj == vw.adj {
                    continue;
                }

                let weight = uv.weight + vw.weight;
                let witness_weight = res.get(&vw.adj).copied().unwrap_or(Weight::INFINITY);
                if witness_weight <= weight {
                    continue;
                }

                effect.added += 1;
                effect.added_orig += (uv.orig_count + vw.orig_count) as usize;
                if !is_simulation {
                    self.handle_shortcut(uv, vw, weight);
                }
            }
        }

        debug!("{v:?}: ({},{})", effect.removed, effect.added);
        effect
    }

    fn handle_shortcut(&mut self, uv: &NeighborEdge, vw: &NeighborEdge, weight: Weight) {
        let (from, to) = (uv.adj, vw.adj);
        let orig_count = uv.orig_count + vw.orig_count;

        // An existing shortcut between the same nodes is updated in place
        // if the new path is cheaper
        let existing = self
            .g
            .out_edges(from)
            .filter(|e| e.is_shortcut() && e.adj_node() == to)
            .map(|e| (e.prepare_edge(), e.weight()))
            .next();

        match existing {
            Some((shortcut, old_weight)) => {
                if weight < old_weight {
                    self.g.set_shortcut_weight(shortcut, weight);
                    self.g.set_skipped_edges(shortcut, uv.prepare_edge, vw.prepare_edge);
                    self.g.set_orig_edge_count(shortcut, orig_count);
                }
            }
            None => {
                self.g.add_shortcut(
                    from,
                    to,
                    INVALID_ORIG_KEY,
                    INVALID_ORIG_KEY,
                    uv.prepare_edge,
                    vw.prepare_edge,
                    weight,
                    orig_count,
                );
                self.stats.shortcuts_added += 1;
            }
        }
    }

    fn calc_initial_node_order(&mut self) -> PriorityQueue<NodeIndex, Reverse<i32>> {
        let mut pq = PriorityQueue::new();

        for v in 0..self.num_nodes {
            let v = node_index(v);
            let importance =
                self.calc_priority(v, 0, self.params.witness_search_initial_limit);
            pq.push(v, Reverse(importance));
        }

        pq
    }

    /// Calculates the importance of a node v.
    /// The lower the value, the earlier the node is contracted.
    /// Priority terms:
    /// - Edge difference: shortcuts added - edges removed
    /// - Contracted neighbors: how surrounded the node already is
    /// - Level: depth of the node in the hierarchy built so far
    /// - Original edges: how many input edges the new shortcuts stand for
    fn calc_priority(&mut self, v: NodeIndex, level: usize, max_nodes_settled_limit: usize) -> i32 {
        let effect = self.handle_contract_node(v, max_nodes_settled_limit, true);

        let edge_difference = effect.added as i32 - effect.removed as i32;
        let contracted_neighbors = self.contracted_neighbors[v.index()];

        let params = self.params.priority_params;

        edge_difference * params.edge_difference_coeff
            + level as i32 * params.search_space_coeff
            + contracted_neighbors as i32 * params.contracted_neighbors_coeff
            + effect.added_orig as i32 * params.original_edges_coeff
    }
}
