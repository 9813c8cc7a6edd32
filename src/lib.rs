//! **sese** decomposes a directed, rooted graph — typically a control-flow
//! graph — into canonical *single-entry/single-exit regions* and arranges
//! them into the *program structure tree* (PST).
//!
//! The construction is the linear-time algorithm of Johnson, Pearson and
//! Pingali: the graph is normalized to a single source and sink, closed by a
//! virtual back edge, and traversed depth-first on its undirected view while
//! per-node *bracket lists* of spanning backedges decide which arcs are
//! cycle equivalent. Consecutive arcs of one equivalence class bound a
//! region; containment of regions yields the tree.
//!
//! # Example
//!
//! ```
//! use sese::{program_structure_tree, FlowGraph};
//!
//! // A diamond between two straight-line edges.
//! let graph = FlowGraph::from_edges([
//!     ("s", "a"),
//!     ("a", "b"),
//!     ("a", "c"),
//!     ("b", "d"),
//!     ("c", "d"),
//!     ("d", "t"),
//! ]);
//! let structure = program_structure_tree(&graph).unwrap();
//!
//! // The graph already has a unique source and sink, so nothing was added.
//! assert_eq!(structure.entry(), &"s");
//! assert_eq!(structure.exit(), &"t");
//! assert!(!structure.entry_is_synthetic());
//!
//! // The root region spans the whole program; the diamond body is nested
//! // inside it, and each branch is nested inside the diamond.
//! assert_eq!(structure.root().nodes().len(), 6);
//! let diamond = structure.leaf_region_of(&"c").map(|id| structure.region(id));
//! assert!(diamond.unwrap().nodes().contains(&"c"));
//!
//! // The edges entering and leaving the diamond are cycle equivalent.
//! let classes: Vec<_> = structure
//!     .arcs()
//!     .iter()
//!     .filter(|arc| (arc.from(), arc.to()) == (&"s", &"a") || (arc.from(), arc.to()) == (&"d", &"t"))
//!     .map(|arc| arc.class())
//!     .collect();
//! assert_eq!(classes[0], classes[1]);
//! ```
//!
//! Graphviz renderings of the results live in the [`dot`] module.

pub mod dot;
pub mod error;
pub mod graph;
pub mod region;

mod augment;
mod bracket;
mod cycle_equiv;
mod undirected;

pub use crate::error::StructureError;
pub use crate::graph::{FlowGraph, FlowLabel};
pub use crate::region::{
    program_structure_tree, ArcId, ArcInfo, ClassId, ProgramStructure, Region, RegionId,
};
