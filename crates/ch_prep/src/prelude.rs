//! Re-exports of the most commonly used items in `ch_prep`.
pub use crate::node_contraction::ContractionParams;
pub use crate::node_contraction::ContractionStrategy;
pub use crate::node_contraction::NodeContractor;
pub use crate::node_contraction::PriorityParams;
pub use crate::node_contraction::UpdateStrategy;

pub use crate::graph::edge_index;
pub use crate::graph::node_index;
pub use crate::prep_graph::PrepGraph;
pub use crate::turn_costs::TurnCostFunction;
