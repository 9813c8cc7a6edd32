//! Undirected view of the augmented graph.
//!
//! Every directed edge becomes one arc that keeps its originating
//! orientation; antiparallel edges become two distinct arcs (multigraph
//! semantics). The virtual back arc from the exit to the entry is appended
//! last and flagged, so adjacency lists explore it after all real edges.

use crate::augment::AugmentedFlow;
use crate::graph::FlowLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArcKind {
    /// An edge of the augmented directed graph.
    Original,
    /// The closing arc from the super-exit back to the super-entry.
    VirtualBack,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ArcData {
    /// Tail of the originating directed edge.
    pub(crate) from: usize,
    /// Head of the originating directed edge.
    pub(crate) to: usize,
    pub(crate) kind: ArcKind,
}

impl ArcData {
    pub(crate) fn other(&self, endpoint: usize) -> usize {
        if endpoint == self.from {
            self.to
        } else {
            self.from
        }
    }

    pub(crate) fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug)]
pub(crate) struct UndirectedView {
    pub(crate) arcs: Vec<ArcData>,
    /// Per node: `(arc id, other endpoint)` in creation order. Self-loops
    /// appear once.
    pub(crate) adjacency: Vec<Vec<(usize, usize)>>,
    pub(crate) virtual_arc: usize,
}

impl UndirectedView {
    pub(crate) fn build<N>(augmented: &AugmentedFlow<N>) -> Self
    where
        N: FlowLabel,
    {
        let node_count = augmented.graph.node_count();
        let mut arcs = Vec::with_capacity(augmented.graph.edge_count() + 1);
        let mut adjacency = vec![Vec::new(); node_count];

        for from in 0..node_count {
            for &to in augmented.graph.outgoing_ix(from) {
                let id = arcs.len();
                arcs.push(ArcData {
                    from,
                    to,
                    kind: ArcKind::Original,
                });
                adjacency[from].push((id, to));
                if to != from {
                    adjacency[to].push((id, from));
                }
            }
        }

        let virtual_arc = arcs.len();
        arcs.push(ArcData {
            from: augmented.exit,
            to: augmented.entry,
            kind: ArcKind::VirtualBack,
        });
        adjacency[augmented.exit].push((virtual_arc, augmented.entry));
        if augmented.entry != augmented.exit {
            adjacency[augmented.entry].push((virtual_arc, augmented.exit));
        }

        UndirectedView {
            arcs,
            adjacency,
            virtual_arc,
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub(crate) fn arc_count(&self) -> usize {
        self.arcs.len()
    }
}
