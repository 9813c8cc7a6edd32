//! Graph normalization.
//!
//! The cycle-equivalence traversal requires a single-source, single-sink
//! graph closed by a back edge from the exit to the entry. This stage
//! inserts a synthetic super-entry/super-exit where the input has several
//! sources or sinks (or none), wiring them up in the input's iteration
//! order. The virtual back arc itself is not added to the adjacency; it
//! exists only in the undirected view, flagged so that later stages can
//! recognize the top-level region.

use error_stack::Report;

use crate::error::StructureError;
use crate::graph::{FlowGraph, FlowLabel};

/// The input graph after super-entry/super-exit insertion.
#[derive(Debug, Clone)]
pub(crate) struct AugmentedFlow<N> {
    pub(crate) graph: FlowGraph<N>,
    pub(crate) entry: usize,
    pub(crate) exit: usize,
    pub(crate) entry_synthetic: bool,
    pub(crate) exit_synthetic: bool,
}

pub(crate) fn augment<N>(input: &FlowGraph<N>) -> Result<AugmentedFlow<N>, Report<StructureError>>
where
    N: FlowLabel,
{
    if input.node_count() == 0 {
        return Err(Report::new(StructureError::InvalidInput)
            .attach_printable("the graph has no nodes"));
    }

    let entry_label = N::synthetic_entry();
    let exit_label = N::synthetic_exit();
    if input.contains_node(&entry_label) || input.contains_node(&exit_label) {
        return Err(Report::new(StructureError::InvalidInput).attach_printable(format!(
            "the reserved labels {entry_label:?} and {exit_label:?} must not appear in the input"
        )));
    }

    let mut sources = Vec::new();
    let mut sinks = Vec::new();
    for ix in 0..input.node_count() {
        if input.incoming_ix(ix).is_empty() {
            sources.push(ix);
        }
        if input.outgoing_ix(ix).is_empty() {
            sinks.push(ix);
        }
    }

    if sources.is_empty() {
        return Err(Report::new(StructureError::Unsupported).attach_printable(
            "the graph has no source node; refusing to pick an arbitrary entry",
        ));
    }

    let mut graph = input.clone();
    let (entry, entry_synthetic) = if sources.len() == 1 {
        (sources[0], false)
    } else {
        let entry = graph.add_node_ix(entry_label);
        for &source in &sources {
            graph.add_edge_ix(entry, source);
        }
        (entry, true)
    };
    let (exit, exit_synthetic) = if sinks.len() == 1 {
        (sinks[0], false)
    } else {
        let exit = graph.add_node_ix(exit_label);
        for &sink in &sinks {
            graph.add_edge_ix(sink, exit);
        }
        (exit, true)
    };

    Ok(AugmentedFlow {
        graph,
        entry,
        exit,
        entry_synthetic,
        exit_synthetic,
    })
}
