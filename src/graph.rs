//! The directed flow graph the analysis consumes.
//!
//! Nodes are identified by opaque labels; internally every label is interned
//! into a dense index in insertion order, which is what makes the whole
//! pipeline deterministic. Both directions of the adjacency are kept so that
//! sources and sinks can be found in a single pass.

use std::fmt::Debug;
use std::hash::Hash;

use error_stack::Report;
use hashbrown::HashSet;
use indexmap::{IndexMap, IndexSet};

use crate::error::StructureError;

/// A node label usable by the analysis.
///
/// Besides the usual requirements, a label type must supply the two reserved
/// labels used for the synthetic super-entry and super-exit. Graphs that
/// already contain either reserved label are rejected with
/// [`StructureError::InvalidInput`] before any work is done.
pub trait FlowLabel: Clone + Eq + Hash + Debug {
    /// Label of the synthetic super-entry node.
    fn synthetic_entry() -> Self;
    /// Label of the synthetic super-exit node.
    fn synthetic_exit() -> Self;
}

impl FlowLabel for String {
    fn synthetic_entry() -> Self {
        "__entry__".to_owned()
    }

    fn synthetic_exit() -> Self {
        "__exit__".to_owned()
    }
}

impl FlowLabel for &'static str {
    fn synthetic_entry() -> Self {
        "__entry__"
    }

    fn synthetic_exit() -> Self {
        "__exit__"
    }
}

macro_rules! unsigned_flow_label {
    ($($t:ty),*) => {
        $(
            impl FlowLabel for $t {
                fn synthetic_entry() -> Self {
                    <$t>::MAX
                }

                fn synthetic_exit() -> Self {
                    <$t>::MAX - 1
                }
            }
        )*
    };
}

unsigned_flow_label!(u8, u16, u32, u64, usize);

/// A directed flow graph (duplicate edges collapse to one), typically a
/// control-flow graph.
///
/// # Examples
///
/// ```
/// use sese::FlowGraph;
///
/// let graph = FlowGraph::from_edges([("a", "b"), ("b", "c"), ("a", "b")]);
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 2);
/// assert_eq!(graph.successors(&"a").collect::<Vec<_>>(), [&"b"]);
/// ```
#[derive(Debug, Clone)]
pub struct FlowGraph<N> {
    labels: IndexSet<N>,
    out: Vec<Vec<usize>>,
    inc: Vec<Vec<usize>>,
    edges: HashSet<(usize, usize)>,
}

impl<N> Default for FlowGraph<N>
where
    N: FlowLabel,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FlowGraph<N>
where
    N: FlowLabel,
{
    pub fn new() -> Self {
        FlowGraph {
            labels: IndexSet::new(),
            out: Vec::new(),
            inc: Vec::new(),
            edges: HashSet::new(),
        }
    }

    /// Build a graph from directed edges. Nodes are created on first mention,
    /// in iteration order; duplicate edges are ignored.
    pub fn from_edges<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = (N, N)>,
    {
        let mut graph = Self::new();
        for (from, to) in iterable {
            graph.add_edge(from, to);
        }
        graph
    }

    /// Build a graph from an explicit adjacency mapping
    /// `node -> (successors, predecessors)` and validate it: every edge must
    /// appear in both the outgoing list of its tail and the incoming list of
    /// its head.
    ///
    /// # Errors
    ///
    /// [`StructureError::InvalidInput`] if a node has two adjacency entries
    /// or the two directions disagree.
    pub fn from_adjacency<I, O, P>(adjacency: I) -> Result<Self, Report<StructureError>>
    where
        I: IntoIterator<Item = (N, O, P)>,
        O: IntoIterator<Item = N>,
        P: IntoIterator<Item = N>,
    {
        let mut declared: IndexMap<N, (IndexSet<N>, IndexSet<N>)> = IndexMap::new();
        for (node, out, inc) in adjacency {
            let out: IndexSet<N> = out.into_iter().collect();
            let inc: IndexSet<N> = inc.into_iter().collect();
            if declared.insert(node.clone(), (out, inc)).is_some() {
                return Err(Report::new(StructureError::InvalidInput)
                    .attach_printable(format!("duplicate adjacency entry for {node:?}")));
            }
        }

        for (node, (out, _)) in &declared {
            for succ in out {
                let listed = declared
                    .get(succ)
                    .map_or(false, |(_, inc)| inc.contains(node));
                if !listed {
                    return Err(Report::new(StructureError::InvalidInput).attach_printable(
                        format!(
                            "edge {node:?} -> {succ:?} is missing from the incoming list of {succ:?}"
                        ),
                    ));
                }
            }
        }
        for (node, (_, inc)) in &declared {
            for pred in inc {
                let listed = declared
                    .get(pred)
                    .map_or(false, |(out, _)| out.contains(node));
                if !listed {
                    return Err(Report::new(StructureError::InvalidInput).attach_printable(
                        format!(
                            "edge {pred:?} -> {node:?} is listed incoming but missing from the outgoing list of {pred:?}"
                        ),
                    ));
                }
            }
        }

        let mut graph = Self::new();
        for node in declared.keys() {
            graph.add_node(node.clone());
        }
        for (node, (out, _)) in &declared {
            for succ in out {
                graph.add_edge(node.clone(), succ.clone());
            }
        }
        Ok(graph)
    }

    /// Insert a node without edges. A no-op if the label is already present.
    pub fn add_node(&mut self, node: N) {
        self.intern(node);
    }

    /// Insert a directed edge, creating missing endpoints. Duplicate edges
    /// are ignored; self-loops are allowed.
    pub fn add_edge(&mut self, from: N, to: N) {
        let from = self.intern(from);
        let to = self.intern(to);
        self.add_edge_ix(from, to);
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, node: &N) -> bool {
        self.labels.contains(node)
    }

    pub fn contains_edge(&self, from: &N, to: &N) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(from), Some(to)) => self.edges.contains(&(from, to)),
            _ => false,
        }
    }

    /// Node labels in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.labels.iter()
    }

    /// Directed edges, grouped by tail in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N)> + '_ {
        (0..self.out.len()).flat_map(move |from| {
            self.out[from]
                .iter()
                .map(move |&to| (self.label(from), self.label(to)))
        })
    }

    pub fn successors(&self, node: &N) -> impl Iterator<Item = &N> + '_ {
        let targets = self
            .index_of(node)
            .map_or(&[][..], |ix| self.out[ix].as_slice());
        targets.iter().map(move |&ix| self.label(ix))
    }

    pub fn predecessors(&self, node: &N) -> impl Iterator<Item = &N> + '_ {
        let sources = self
            .index_of(node)
            .map_or(&[][..], |ix| self.inc[ix].as_slice());
        sources.iter().map(move |&ix| self.label(ix))
    }

    fn intern(&mut self, node: N) -> usize {
        let (ix, fresh) = self.labels.insert_full(node);
        if fresh {
            self.out.push(Vec::new());
            self.inc.push(Vec::new());
        }
        ix
    }

    pub(crate) fn index_of(&self, node: &N) -> Option<usize> {
        self.labels.get_index_of(node)
    }

    pub(crate) fn label(&self, ix: usize) -> &N {
        self.labels.get_index(ix).expect("node index out of bounds")
    }

    pub(crate) fn edge_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.out.len())
            .flat_map(move |from| self.out[from].iter().map(move |&to| (from, to)))
    }

    pub(crate) fn outgoing_ix(&self, ix: usize) -> &[usize] {
        &self.out[ix]
    }

    pub(crate) fn incoming_ix(&self, ix: usize) -> &[usize] {
        &self.inc[ix]
    }

    pub(crate) fn add_node_ix(&mut self, node: N) -> usize {
        self.intern(node)
    }

    pub(crate) fn add_edge_ix(&mut self, from: usize, to: usize) {
        if self.edges.insert((from, to)) {
            self.out[from].push(to);
            self.inc[to].push(from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_deduplicate() {
        let mut graph = FlowGraph::from_edges([("a", "b"), ("a", "b"), ("b", "a")]);
        graph.add_edge("a", "b");
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge(&"a", &"b"));
        assert!(graph.contains_edge(&"b", &"a"));
        assert!(!graph.contains_edge(&"a", &"a"));
    }

    #[test]
    fn adjacency_roundtrip() {
        let graph = FlowGraph::from_adjacency([
            ("a", vec!["b", "c"], vec![]),
            ("b", vec!["c"], vec!["a"]),
            ("c", vec![], vec!["a", "b"]),
        ])
        .unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.predecessors(&"c").collect::<Vec<_>>(), [&"a", &"b"]);
    }

    #[test]
    fn adjacency_missing_incoming_is_rejected() {
        let result =
            FlowGraph::from_adjacency([("a", vec!["b"], vec![]), ("b", vec![], vec![])]);
        let report = result.unwrap_err();
        assert_eq!(report.current_context(), &StructureError::InvalidInput);
    }

    #[test]
    fn adjacency_phantom_predecessor_is_rejected() {
        let result =
            FlowGraph::from_adjacency([("a", vec![], vec![]), ("b", vec![], vec!["a"])]);
        assert_eq!(
            result.unwrap_err().current_context(),
            &StructureError::InvalidInput
        );
    }

    #[test]
    fn adjacency_duplicate_entry_is_rejected() {
        let result =
            FlowGraph::from_adjacency([("a", vec![], vec![]), ("a", vec![], vec![])]);
        assert_eq!(
            result.unwrap_err().current_context(),
            &StructureError::InvalidInput
        );
    }

    #[test]
    fn nodes_keep_insertion_order() {
        let graph = FlowGraph::from_edges([("x", "y"), ("z", "x")]);
        assert_eq!(graph.nodes().collect::<Vec<_>>(), [&"x", &"y", &"z"]);
    }
}
