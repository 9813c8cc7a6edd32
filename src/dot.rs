//! Simple graphviz dot file format output for analysis results.
//!
//! Three views are available: the augmented control-flow graph
//! ([`CfgDot`]), the program structure tree itself ([`PstDot`]), and the
//! control-flow graph with regions drawn as nested clusters
//! ([`ClusteredCfgDot`]). Output can be tuned with a slice of [`Config`]
//! values. Formatting is intentionally plain; this is meant for debugging
//! and exact output may change.

use std::fmt::{self, Debug, Display, Formatter};

use hashbrown::HashMap;

use crate::graph::FlowLabel;
use crate::region::{ProgramStructure, RegionId};

static INDENT: &str = "    ";

/// Renderer configuration.
///
/// This enum does not have an exhaustive definition (will be expanded).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Config {
    /// Use node indices for node labels.
    NodeIndexLabel,
    /// Label every edge with the cycle-equivalence class of its arc.
    EdgeClassLabel,
}

#[derive(Default)]
struct Configs {
    node_index_label: bool,
    edge_class_label: bool,
}

impl Configs {
    fn extract(configs: &[Config]) -> Self {
        let mut conf = Self::default();
        for config in configs {
            match config {
                Config::NodeIndexLabel => conf.node_index_label = true,
                Config::EdgeClassLabel => conf.edge_class_label = true,
            }
        }
        conf
    }
}

fn escaped<N>(label: &N) -> String
where
    N: Debug,
{
    let raw = format!("{label:?}");
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out
}

fn node_text<N>(config: &Configs, ix: usize, label: &N) -> String
where
    N: Debug,
{
    if config.node_index_label {
        ix.to_string()
    } else {
        escaped(label)
    }
}

fn write_edges<N>(
    f: &mut Formatter<'_>,
    structure: &ProgramStructure<N>,
    config: &Configs,
) -> fmt::Result
where
    N: FlowLabel,
{
    let graph = structure.augmented();
    let classes = config.edge_class_label.then(|| {
        let mut classes = HashMap::new();
        for arc in structure.arcs() {
            if arc.is_virtual_back() {
                continue;
            }
            let from = graph.index_of(arc.from()).expect("arc endpoint exists");
            let to = graph.index_of(arc.to()).expect("arc endpoint exists");
            classes.insert((from, to), arc.class());
        }
        classes
    });
    for (from, to) in graph.edge_indices() {
        // Edges into unreachable components carry no class.
        match classes.as_ref().and_then(|classes| classes.get(&(from, to))) {
            Some(class) => {
                writeln!(f, "{INDENT}{from} -> {to} [label=\"{}\"]", class.index())?;
            }
            None => writeln!(f, "{INDENT}{from} -> {to}")?,
        }
    }
    Ok(())
}

/// Renders the augmented control-flow graph. Synthetic entry/exit nodes are
/// drawn dashed; the virtual back arc is not part of the adjacency and is
/// not drawn.
///
/// # Examples
///
/// ```
/// use sese::{program_structure_tree, FlowGraph};
/// use sese::dot::{CfgDot, Config};
///
/// let graph = FlowGraph::from_edges([("s", "t")]);
/// let structure = program_structure_tree(&graph).unwrap();
/// println!("{}", CfgDot::new(&structure));
/// println!("{}", CfgDot::with_config(&structure, &[Config::EdgeClassLabel]));
/// ```
pub struct CfgDot<'a, N> {
    structure: &'a ProgramStructure<N>,
    config: Configs,
}

impl<'a, N> CfgDot<'a, N> {
    /// Create a `CfgDot` formatting wrapper with default configuration.
    pub fn new(structure: &'a ProgramStructure<N>) -> Self {
        Self::with_config(structure, &[])
    }

    /// Create a `CfgDot` formatting wrapper with custom configuration.
    pub fn with_config(structure: &'a ProgramStructure<N>, config: &[Config]) -> Self {
        CfgDot {
            structure,
            config: Configs::extract(config),
        }
    }
}

impl<N> Display for CfgDot<'_, N>
where
    N: FlowLabel,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let graph = self.structure.augmented();
        writeln!(f, "digraph {{")?;
        for (ix, label) in graph.nodes().enumerate() {
            let synthetic = (self.structure.entry_is_synthetic()
                && label == self.structure.entry())
                || (self.structure.exit_is_synthetic() && label == self.structure.exit());
            let style = if synthetic { ", style=dashed" } else { "" };
            writeln!(
                f,
                "{INDENT}{ix} [label=\"{}\"{style}]",
                node_text(&self.config, ix, label)
            )?;
        }
        write_edges(f, self.structure, &self.config)?;
        writeln!(f, "}}")
    }
}

/// Renders the program structure tree, one node per region.
pub struct PstDot<'a, N> {
    structure: &'a ProgramStructure<N>,
}

impl<'a, N> PstDot<'a, N> {
    pub fn new(structure: &'a ProgramStructure<N>) -> Self {
        PstDot { structure }
    }
}

impl<N> Display for PstDot<'_, N>
where
    N: FlowLabel,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {{")?;
        for region in self.structure.regions() {
            let ix = region.id().index();
            writeln!(
                f,
                "{INDENT}r{ix} [label=\"R{ix} ({} nodes)\", shape=box]",
                region.nodes().len()
            )?;
        }
        for region in self.structure.regions() {
            if let Some(parent) = region.parent() {
                writeln!(
                    f,
                    "{INDENT}r{} -> r{}",
                    parent.index(),
                    region.id().index()
                )?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Renders the augmented control-flow graph with every region as a cluster,
/// nested according to the program structure tree. Each node is placed in
/// the cluster of its leaf-most region; unreachable nodes are drawn outside
/// all clusters.
pub struct ClusteredCfgDot<'a, N> {
    structure: &'a ProgramStructure<N>,
    config: Configs,
}

impl<'a, N> ClusteredCfgDot<'a, N> {
    /// Create a `ClusteredCfgDot` formatting wrapper with default
    /// configuration.
    pub fn new(structure: &'a ProgramStructure<N>) -> Self {
        Self::with_config(structure, &[])
    }

    /// Create a `ClusteredCfgDot` formatting wrapper with custom
    /// configuration.
    pub fn with_config(structure: &'a ProgramStructure<N>, config: &[Config]) -> Self {
        ClusteredCfgDot {
            structure,
            config: Configs::extract(config),
        }
    }
}

impl<N> ClusteredCfgDot<'_, N>
where
    N: FlowLabel,
{
    fn write_region(&self, f: &mut Formatter<'_>, id: RegionId, depth: usize) -> fmt::Result {
        let graph = self.structure.augmented();
        let pad = INDENT.repeat(depth);
        writeln!(f, "{pad}subgraph cluster_{} {{", id.index())?;
        writeln!(f, "{pad}{INDENT}label=\"R{}\"", id.index())?;
        for child in self.structure.children_of(id) {
            self.write_region(f, child, depth + 1)?;
        }
        for ix in 0..graph.node_count() {
            if self.structure.leaf_by_index(ix) == Some(id) {
                writeln!(
                    f,
                    "{pad}{INDENT}{ix} [label=\"{}\"]",
                    node_text(&self.config, ix, graph.label(ix))
                )?;
            }
        }
        writeln!(f, "{pad}}}")
    }
}

impl<N> Display for ClusteredCfgDot<'_, N>
where
    N: FlowLabel,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let graph = self.structure.augmented();
        writeln!(f, "digraph {{")?;
        self.write_region(f, self.structure.root().id(), 1)?;
        for ix in 0..graph.node_count() {
            if self.structure.leaf_by_index(ix).is_none() {
                writeln!(
                    f,
                    "{INDENT}{ix} [label=\"{}\"]",
                    node_text(&self.config, ix, graph.label(ix))
                )?;
            }
        }
        write_edges(f, self.structure, &self.config)?;
        writeln!(f, "}}")
    }
}
