//! Edge records of the preparation graph.
//!
//! Two classes of records exist: immutable base edges taken over from the
//! input graph, and shortcuts inserted during contraction. Shortcuts come in
//! a node-based and an edge-based flavor; the latter additionally carries
//! the first and last original edge key of the path it represents. The
//! record class is recoverable from the prepare edge id alone: ids below the
//! base edge count are base edges, everything above is a shortcut.
use crate::constants::Weight;
use crate::graph::{EdgeIndex, NodeIndex};

/// Canonical identifier of a directed base edge: the edge id shifted left
/// once, with the direction bit in the lowest position.
pub type OrigEdgeKey = u32;

/// Placeholder key for node-based shortcuts, which do not track original
/// edges.
pub const INVALID_ORIG_KEY: OrigEdgeKey = OrigEdgeKey::MAX;

#[inline]
pub fn orig_edge_key(edge: EdgeIndex, reversed: bool) -> OrigEdgeKey {
    ((edge.index() as u32) << 1) | reversed as u32
}

#[inline]
pub fn reverse_orig_edge_key(key: OrigEdgeKey) -> OrigEdgeKey {
    key ^ 1
}

#[inline]
pub fn orig_edge_id(key: OrigEdgeKey) -> EdgeIndex {
    EdgeIndex::new((key >> 1) as usize)
}

/// An edge of the input graph. Weights are narrowed to single precision to
/// halve the record's footprint; a direction stored as infinity is
/// forbidden.
#[derive(Debug, Clone)]
pub struct BaseEdge {
    edge: EdgeIndex,
    node_a: NodeIndex,
    node_b: NodeIndex,
    weight_ab: f32,
    weight_ba: f32,
}

impl BaseEdge {
    pub(crate) fn new(
        edge: EdgeIndex,
        node_a: NodeIndex,
        node_b: NodeIndex,
        weight_ab: Weight,
        weight_ba: Weight,
    ) -> Self {
        BaseEdge {
            edge,
            node_a,
            node_b,
            weight_ab: narrow(weight_ab),
            weight_ba: narrow(weight_ba),
        }
    }
}

fn narrow(weight: Weight) -> f32 {
    let narrowed = weight as f32;
    assert!(
        !weight.is_finite() || narrowed.is_finite(),
        "Edge weight {} does not fit into single precision",
        weight
    );
    narrowed
}

/// A shortcut edge replacing the two-edge path `skipped1`/`skipped2`
/// through a contracted node. Directed from `from` to `to`; the weight is
/// reported the same in both orientations.
#[derive(Debug, Clone)]
pub struct Shortcut {
    prepare_edge: EdgeIndex,
    from: NodeIndex,
    to: NodeIndex,
    weight: Weight,
    skipped1: EdgeIndex,
    skipped2: EdgeIndex,
    orig_edge_count: u32,
}

impl Shortcut {
    pub(crate) fn new(
        prepare_edge: EdgeIndex,
        from: NodeIndex,
        to: NodeIndex,
        weight: Weight,
        skipped1: EdgeIndex,
        skipped2: EdgeIndex,
        orig_edge_count: u32,
    ) -> Self {
        Shortcut {
            prepare_edge,
            from,
            to,
            weight,
            skipped1,
            skipped2,
            orig_edge_count,
        }
    }
}

/// A shortcut that additionally tracks the first and last original edge key
/// of the represented path. The pair is fixed at insertion and reported
/// identically from both endpoints.
#[derive(Debug, Clone)]
pub struct EdgeShortcut {
    shortcut: Shortcut,
    orig_key_first: OrigEdgeKey,
    orig_key_last: OrigEdgeKey,
}

impl EdgeShortcut {
    pub(crate) fn new(
        shortcut: Shortcut,
        orig_key_first: OrigEdgeKey,
        orig_key_last: OrigEdgeKey,
    ) -> Self {
        EdgeShortcut {
            shortcut,
            orig_key_first,
            orig_key_last,
        }
    }
}

/// A record of the preparation graph: one of the three edge classes behind
/// a shared accessor surface. Calls outside a class's capabilities are
/// programmer errors and panic.
#[derive(Debug, Clone)]
pub enum PrepEdge {
    Base(BaseEdge),
    NodeShortcut(Shortcut),
    EdgeShortcut(EdgeShortcut),
}

impl PrepEdge {
    #[inline]
    pub fn is_shortcut(&self) -> bool {
        !matches!(self, PrepEdge::Base(_))
    }

    pub fn prepare_edge(&self) -> EdgeIndex {
        match self {
            PrepEdge::Base(e) => e.edge,
            PrepEdge::NodeShortcut(s) => s.prepare_edge,
            PrepEdge::EdgeShortcut(s) => s.shortcut.prepare_edge,
        }
    }

    pub fn node_a(&self) -> NodeIndex {
        match self {
            PrepEdge::Base(e) => e.node_a,
            PrepEdge::NodeShortcut(s) => s.from,
            PrepEdge::EdgeShortcut(s) => s.shortcut.from,
        }
    }

    pub fn node_b(&self) -> NodeIndex {
        match self {
            PrepEdge::Base(e) => e.node_b,
            PrepEdge::NodeShortcut(s) => s.to,
            PrepEdge::EdgeShortcut(s) => s.shortcut.to,
        }
    }

    pub fn weight_ab(&self) -> Weight {
        match self {
            PrepEdge::Base(e) => e.weight_ab as Weight,
            PrepEdge::NodeShortcut(s) => s.weight,
            PrepEdge::EdgeShortcut(s) => s.shortcut.weight,
        }
    }

    pub fn weight_ba(&self) -> Weight {
        match self {
            PrepEdge::Base(e) => e.weight_ba as Weight,
            PrepEdge::NodeShortcut(s) => s.weight,
            PrepEdge::EdgeShortcut(s) => s.shortcut.weight,
        }
    }

    /// First original edge key, seen in the a→b orientation (`ab == true`)
    /// or the b→a orientation. Edge-based shortcuts report the same key
    /// either way.
    pub fn orig_edge_key_first(&self, ab: bool) -> OrigEdgeKey {
        match self {
            PrepEdge::Base(e) => base_orig_key(e, ab),
            PrepEdge::NodeShortcut(_) => {
                panic!("Node-based shortcuts do not carry original edge keys")
            }
            PrepEdge::EdgeShortcut(s) => s.orig_key_first,
        }
    }

    /// Last original edge key, by orientation. Equal to the first key for
    /// base edges.
    pub fn orig_edge_key_last(&self, ab: bool) -> OrigEdgeKey {
        match self {
            PrepEdge::Base(e) => base_orig_key(e, ab),
            PrepEdge::NodeShortcut(_) => {
                panic!("Node-based shortcuts do not carry original edge keys")
            }
            PrepEdge::EdgeShortcut(s) => s.orig_key_last,
        }
    }

    pub fn skipped_edge1(&self) -> EdgeIndex {
        match self {
            PrepEdge::Base(_) => panic!("Base edges do not carry skipped edges"),
            PrepEdge::NodeShortcut(s) => s.skipped1,
            PrepEdge::EdgeShortcut(s) => s.shortcut.skipped1,
        }
    }

    pub fn skipped_edge2(&self) -> EdgeIndex {
        match self {
            PrepEdge::Base(_) => panic!("Base edges do not carry skipped edges"),
            PrepEdge::NodeShortcut(s) => s.skipped2,
            PrepEdge::EdgeShortcut(s) => s.shortcut.skipped2,
        }
    }

    pub fn orig_edge_count(&self) -> u32 {
        match self {
            PrepEdge::Base(_) => panic!("Base edges do not carry an original edge count"),
            PrepEdge::NodeShortcut(s) => s.orig_edge_count,
            PrepEdge::EdgeShortcut(s) => s.shortcut.orig_edge_count,
        }
    }

    pub(crate) fn set_weight(&mut self, weight: Weight) {
        debug_assert!(weight.is_finite(), "Shortcut weight must be finite");
        match self {
            PrepEdge::Base(_) => panic!("Base edges are immutable"),
            PrepEdge::NodeShortcut(s) => s.weight = weight,
            PrepEdge::EdgeShortcut(s) => s.shortcut.weight = weight,
        }
    }

    pub(crate) fn set_skipped_edges(&mut self, skipped1: EdgeIndex, skipped2: EdgeIndex) {
        match self {
            PrepEdge::Base(_) => panic!("Base edges are immutable"),
            PrepEdge::NodeShortcut(s) => {
                s.skipped1 = skipped1;
                s.skipped2 = skipped2;
            }
            PrepEdge::EdgeShortcut(s) => {
                s.shortcut.skipped1 = skipped1;
                s.shortcut.skipped2 = skipped2;
            }
        }
    }

    pub(crate) fn set_orig_edge_count(&mut self, count: u32) {
        match self {
            PrepEdge::Base(_) => panic!("Base edges are immutable"),
            PrepEdge::NodeShortcut(s) => s.orig_edge_count = count,
            PrepEdge::EdgeShortcut(s) => s.shortcut.orig_edge_count = count,
        }
    }
}

fn base_orig_key(e: &BaseEdge, ab: bool) -> OrigEdgeKey {
    let reversed = if ab {
        e.node_a > e.node_b
    } else {
        e.node_b > e.node_a
    };
    orig_edge_key(e.edge, reversed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{edge_index, node_index};

    #[test]
    fn orig_edge_keys() {
        assert_eq!(orig_edge_key(edge_index(3), false), 6);
        assert_eq!(orig_edge_key(edge_index(3), true), 7);
        assert_eq!(reverse_orig_edge_key(6), 7);
        assert_eq!(reverse_orig_edge_key(7), 6);
        assert_eq!(orig_edge_id(7), edge_index(3));
    }

    #[test]
    fn base_edge_key_orientation() {
        // stored a < b: the a→b orientation carries a clear direction bit
        let e = PrepEdge::Base(BaseEdge::new(
            edge_index(2),
            node_index(0),
            node_index(5),
            1.0,
            1.0,
        ));
        assert_eq!(e.orig_edge_key_first(true), orig_edge_key(edge_index(2), false));
        assert_eq!(e.orig_edge_key_last(true), e.orig_edge_key_first(true));
        assert_eq!(e.orig_edge_key_first(false), orig_edge_key(edge_index(2), true));

        // stored a > b: bits mirror
        let e = PrepEdge::Base(BaseEdge::new(
            edge_index(2),
            node_index(5),
            node_index(0),
            1.0,
            1.0,
        ));
        assert_eq!(e.orig_edge_key_first(true), orig_edge_key(edge_index(2), true));
        assert_eq!(e.orig_edge_key_first(false), orig_edge_key(edge_index(2), false));
    }

    #[test]
    fn base_edge_narrows_weights() {
        let e = PrepEdge::Base(BaseEdge::new(
            edge_index(0),
            node_index(0),
            node_index(1),
            1.5,
            Weight::INFINITY,
        ));
        assert_eq!(e.weight_ab(), 1.5);
        assert!(e.weight_ba().is_infinite());
    }

    #[test]
    #[should_panic(expected = "does not fit into single precision")]
    fn base_edge_rejects_weight_overflowing_f32() {
        BaseEdge::new(edge_index(0), node_index(0), node_index(1), 1e300, 1.0);
    }

    #[test]
    #[should_panic(expected = "immutable")]
    fn base_edge_rejects_weight_update() {
        let mut e = PrepEdge::Base(BaseEdge::new(
            edge_index(0),
            node_index(0),
            node_index(1),
            1.0,
            1.0,
        ));
        e.set_weight(2.0);
    }

    #[test]
    #[should_panic(expected = "skipped edges")]
    fn base_edge_rejects_skipped_query() {
        let e = PrepEdge::Base(BaseEdge::new(
            edge_index(0),
            node_index(0),
            node_index(1),
            1.0,
            1.0,
        ));
        e.skipped_edge1();
    }

    #[test]
    #[should_panic(expected = "original edge keys")]
    fn node_shortcut_rejects_key_query() {
        let s = PrepEdge::NodeShortcut(Shortcut::new(
            edge_index(9),
            node_index(0),
            node_index(1),
            2.0,
            edge_index(0),
            edge_index(1),
            2,
        ));
        s.orig_edge_key_first(true);
    }

    #[test]
    fn shortcut_setters_round_trip() {
        let mut s = PrepEdge::NodeShortcut(Shortcut::new(
            edge_index(9),
            node_index(0),
            node_index(1),
            2.0,
            edge_index(0),
            edge_index(1),
            2,
        ));

        s.set_weight(1.5);
        s.set_skipped_edges(edge_index(4), edge_index(5));
        s.set_orig_edge_count(7);

        assert_eq!(s.weight_ab(), 1.5);
        assert_eq!(s.weight_ba(), 1.5);
        assert_eq!(s.skipped_edge1(), edge_index(4));
        assert_eq!(s.skipped_edge2(), edge_index(5));
        assert_eq!(s.orig_edge_count(), 7);
    }

    #[test]
    fn edge_shortcut_keys_ignore_orientation() {
        let s = PrepEdge::EdgeShortcut(EdgeShortcut::new(
            Shortcut::new(
                edge_index(9),
                node_index(0),
                node_index(1),
                2.0,
                edge_index(0),
                edge_index(1),
                2,
            ),
            4,
            7,
        ));

        assert_eq!(s.orig_edge_key_first(true), 4);
        assert_eq!(s.orig_edge_key_first(false), 4);
        assert_eq!(s.orig_edge_key_last(true), 7);
        assert_eq!(s.orig_edge_key_last(false), 7);
    }
}
