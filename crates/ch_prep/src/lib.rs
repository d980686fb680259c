//! Crate to build the preparation graph a contraction hierarchy is
//! computed on, together with the node contraction driver.
//!
//! # Basic usage
//! ```
//! use ch_prep::prelude::*;
//!
//! // Size the graph, push the base edges in and freeze it
//! let mut g = PrepGraph::node_based(3, 2);
//! g.add_edge(node_index(0), node_index(1), edge_index(0), 1.0, 1.0);
//! g.add_edge(node_index(1), node_index(2), edge_index(1), 1.0, 1.0);
//! g.prepare_for_contraction();
//!
//! // Contract all nodes, lowest priority first
//! let mut contractor = NodeContractor::new(&mut g);
//! let ordering = contractor.run();
//!
//! assert_eq!(ordering.order.len(), 3);
//! ```
//! [`PrepGraph`]: crate::prep_graph::PrepGraph
pub mod constants;
pub mod edge_lists;
pub mod edges;
pub mod graph;
pub mod node_contraction;
pub mod orig_graph;
pub mod prelude;
pub mod prep_graph;
pub mod turn_costs;
pub mod util;
pub(crate) mod witness_search;
