//! Single-entry/single-exit regions and the program structure tree.
//!
//! # Regions
//!
//! A SESE region is a set of nodes with exactly one edge entering it and
//! exactly one edge leaving it. The bounding pair of edges is always a pair
//! of *cycle-equivalent* arcs that are consecutive on a path of the
//! depth-first spanning tree; conversely, every such consecutive pair bounds
//! a canonical region. The program structure tree (PST) arranges the
//! canonical regions by containment, rooted at the whole-program region
//! bounded by the virtual back arc.
//!
//! Region node sets are inclusive: a parent's set contains the sets of all
//! of its descendants. The smallest region containing a given node is
//! available through [`ProgramStructure::leaf_region_of`].

use std::cmp::Reverse;

use error_stack::Report;
use indexmap::IndexSet;

use crate::augment::{augment, AugmentedFlow};
use crate::cycle_equiv::{cycle_equivalence, CycleEquivalence, UNDEF};
use crate::error::StructureError;
use crate::graph::{FlowGraph, FlowLabel};
use crate::undirected::{ArcKind, UndirectedView};

/// Identifier of a region; indexes [`ProgramStructure::regions`] in
/// pre-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionId(usize);

impl RegionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifier of an arc of the closed undirected view; indexes
/// [`ProgramStructure::arcs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArcId(usize);

impl ArcId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A cycle-equivalence class. Two arcs bound a common region iff they carry
/// the same class and are consecutive on their tree path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassId(usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One arc of the analyzed graph, with its originating orientation and
/// equivalence class.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArcInfo<N> {
    from: N,
    to: N,
    backedge: bool,
    virtual_back: bool,
    class: ClassId,
}

impl<N> ArcInfo<N> {
    /// Tail of the originating directed edge.
    pub fn from(&self) -> &N {
        &self.from
    }

    /// Head of the originating directed edge.
    pub fn to(&self) -> &N {
        &self.to
    }

    /// Whether the depth-first traversal classified this arc as a backedge
    /// (as opposed to a spanning-tree arc).
    pub fn is_backedge(&self) -> bool {
        self.backedge
    }

    /// Whether this is the virtual closing arc from the exit to the entry.
    pub fn is_virtual_back(&self) -> bool {
        self.virtual_back
    }

    pub fn class(&self) -> ClassId {
        self.class
    }
}

/// A canonical SESE region.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "N: serde::Serialize",
        deserialize = "N: serde::Deserialize<'de> + std::hash::Hash + Eq"
    ))
)]
pub struct Region<N> {
    id: RegionId,
    entry_arc: ArcId,
    exit_arc: ArcId,
    nodes: IndexSet<N>,
    parent: Option<RegionId>,
    class: ClassId,
}

impl<N> PartialEq for Region<N>
where
    N: FlowLabel,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.entry_arc == other.entry_arc
            && self.exit_arc == other.exit_arc
            && self.nodes == other.nodes
            && self.parent == other.parent
            && self.class == other.class
    }
}

impl<N> Eq for Region<N> where N: FlowLabel {}

impl<N> Region<N>
where
    N: FlowLabel,
{
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// The arc entering the region. For the root region this is the virtual
    /// back arc.
    pub fn entry_arc(&self) -> ArcId {
        self.entry_arc
    }

    /// The arc leaving the region. For the root region this is the virtual
    /// back arc.
    pub fn exit_arc(&self) -> ArcId {
        self.exit_arc
    }

    /// Contained nodes, in depth-first discovery order. Includes the nodes
    /// of all nested regions.
    pub fn nodes(&self) -> &IndexSet<N> {
        &self.nodes
    }

    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains(node)
    }

    /// The smallest region strictly containing this one; `None` for the
    /// root.
    pub fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    /// The cycle-equivalence class of the bounding arcs.
    pub fn class(&self) -> ClassId {
        self.class
    }
}

/// Result of the analysis: the augmented graph, the canonical regions in
/// pre-order, the arc classification and the traversal data.
#[derive(Debug, Clone)]
pub struct ProgramStructure<N> {
    augmented: FlowGraph<N>,
    entry: N,
    exit: N,
    entry_synthetic: bool,
    exit_synthetic: bool,
    regions: Vec<Region<N>>,
    arcs: Vec<ArcInfo<N>>,
    class_count: usize,
    dfs_enter: Vec<usize>,
    dfs_leave: Vec<usize>,
    dfs_parent: Vec<Option<ArcId>>,
    leaf: Vec<Option<RegionId>>,
    unreachable: Vec<N>,
}

impl<N> ProgramStructure<N>
where
    N: FlowLabel,
{
    /// The adjacency after super-entry/super-exit insertion. The virtual
    /// back arc is not part of it; it is only visible through [`arcs`].
    ///
    /// [`arcs`]: Self::arcs
    pub fn augmented(&self) -> &FlowGraph<N> {
        &self.augmented
    }

    pub fn entry(&self) -> &N {
        &self.entry
    }

    pub fn exit(&self) -> &N {
        &self.exit
    }

    pub fn entry_is_synthetic(&self) -> bool {
        self.entry_synthetic
    }

    pub fn exit_is_synthetic(&self) -> bool {
        self.exit_synthetic
    }

    /// All canonical regions, parents before children; the first element is
    /// the root region.
    pub fn regions(&self) -> &[Region<N>] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> &Region<N> {
        &self.regions[id.0]
    }

    /// The whole-program region.
    pub fn root(&self) -> &Region<N> {
        &self.regions[0]
    }

    pub fn children_of(&self, id: RegionId) -> impl Iterator<Item = RegionId> + '_ {
        self.regions
            .iter()
            .filter(move |region| region.parent == Some(id))
            .map(|region| region.id)
    }

    /// Every arc of the closed undirected view that the traversal reached,
    /// including the virtual back arc but not the analysis-internal capping
    /// arcs. Arcs incident to unreachable nodes are absent.
    pub fn arcs(&self) -> &[ArcInfo<N>] {
        &self.arcs
    }

    pub fn arc(&self, id: ArcId) -> &ArcInfo<N> {
        &self.arcs[id.0]
    }

    /// Number of distinct cycle-equivalence classes.
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// The smallest region containing `node`, if the node exists and was
    /// reachable.
    pub fn leaf_region_of(&self, node: &N) -> Option<RegionId> {
        let ix = self.augmented.index_of(node)?;
        self.leaf[ix]
    }

    /// Depth-first `(enter, leave)` interval of `node`, for debugging.
    pub fn dfs_interval(&self, node: &N) -> Option<(usize, usize)> {
        let ix = self.augmented.index_of(node)?;
        (self.dfs_enter[ix] != UNDEF).then(|| (self.dfs_enter[ix], self.dfs_leave[ix]))
    }

    /// The tree arc through which `node` was discovered, for debugging.
    pub fn dfs_parent_arc(&self, node: &N) -> Option<ArcId> {
        let ix = self.augmented.index_of(node)?;
        self.dfs_parent[ix]
    }

    /// Nodes that the undirected traversal never reached; they belong to no
    /// region.
    pub fn unreachable(&self) -> &[N] {
        &self.unreachable
    }

    pub(crate) fn leaf_by_index(&self, ix: usize) -> Option<RegionId> {
        self.leaf[ix]
    }
}

/// Decompose `graph` into canonical SESE regions arranged as a program
/// structure tree.
///
/// The graph is augmented first (see [`FlowLabel`] for the reserved labels
/// of the synthetic nodes), then a single undirected depth-first traversal
/// assigns every arc a cycle-equivalence class, and consecutive arcs of one
/// class are folded into regions. Runs in time linear in nodes plus edges.
///
/// # Examples
///
/// ```
/// use sese::{program_structure_tree, FlowGraph};
///
/// let graph = FlowGraph::from_edges([
///     ("s", "a"),
///     ("a", "b"),
///     ("a", "c"),
///     ("b", "d"),
///     ("c", "d"),
///     ("d", "t"),
/// ]);
/// let structure = program_structure_tree(&graph).unwrap();
///
/// assert_eq!(structure.entry(), &"s");
/// assert_eq!(structure.exit(), &"t");
/// // The diamond body is a region of its own, nested in the root.
/// let diamond = structure
///     .regions()
///     .iter()
///     .find(|region| region.nodes().len() == 4)
///     .unwrap();
/// assert!(diamond.contains(&"a") && diamond.contains(&"d"));
/// assert_eq!(diamond.parent(), Some(structure.root().id()));
/// ```
///
/// # Errors
///
/// [`StructureError::InvalidInput`] for an empty graph or reserved labels,
/// [`StructureError::Unsupported`] for a source-free graph, and
/// [`StructureError::InternalInvariantViolation`] if a post-analysis check
/// fails (a bug).
pub fn program_structure_tree<N>(
    graph: &FlowGraph<N>,
) -> Result<ProgramStructure<N>, Report<StructureError>>
where
    N: FlowLabel,
{
    let augmented = augment(graph)?;
    let view = UndirectedView::build(&augmented);
    let equiv = cycle_equivalence(&view, augmented.entry)?;
    synthesize(augmented, view, equiv)
}

struct Candidate {
    outer: (usize, usize),
    hole: Option<(usize, usize)>,
    entry_arc: usize,
    exit_arc: usize,
    class: usize,
}

enum Enclosure {
    Nested,
    Outside,
    Improper,
}

/// Interval relation of a prospective child to a prospective parent, with
/// both region shapes being "outer interval minus optional hole".
fn encloses(parent: &Candidate, child: &Candidate) -> Enclosure {
    let (ps, pe) = parent.outer;
    let (cs, ce) = child.outer;
    if cs < ps || ce > pe {
        if ce < ps || cs > pe {
            return Enclosure::Outside;
        }
        return Enclosure::Improper;
    }
    let Some((hs, he)) = parent.hole else {
        return Enclosure::Nested;
    };
    if ce < hs || cs > he {
        return Enclosure::Nested;
    }
    if cs >= hs && ce <= he {
        return Enclosure::Outside;
    }
    if hs >= cs && he <= ce {
        // The child's outer interval swallows the parent's hole; that is
        // proper only if the child's own hole covers it.
        if let Some((chs, che)) = child.hole {
            if chs <= hs && he <= che {
                return Enclosure::Nested;
            }
        }
        return Enclosure::Improper;
    }
    Enclosure::Improper
}

fn synthesize<N>(
    augmented: AugmentedFlow<N>,
    view: UndirectedView,
    equiv: CycleEquivalence,
) -> Result<ProgramStructure<N>, Report<StructureError>>
where
    N: FlowLabel,
{
    let CycleEquivalence {
        class,
        class_count,
        enter,
        leave,
        parent_arc,
        order,
        disc,
        disc_count,
        tree,
        unreachable,
    } = equiv;

    // Public arc table; capping arcs never made it into `disc`, arcs of
    // unreachable components are skipped here.
    let mut arc_remap = vec![UNDEF; view.arc_count()];
    let mut arcs = Vec::with_capacity(disc_count);
    for (id, data) in view.arcs.iter().enumerate() {
        if disc[id] == UNDEF {
            continue;
        }
        arc_remap[id] = arcs.len();
        arcs.push(ArcInfo {
            from: augmented.graph.label(data.from).clone(),
            to: augmented.graph.label(data.to).clone(),
            backedge: !tree.contains(id),
            virtual_back: data.kind == ArcKind::VirtualBack,
            class: ClassId(class[id]),
        });
    }

    // Bucket arcs by class, in discovery order; within a class the arcs
    // then form a chain from the outermost to the innermost position on
    // their tree path.
    let mut by_disc = vec![UNDEF; disc_count];
    for (id, &d) in disc.iter().enumerate() {
        if d != UNDEF {
            by_disc[d] = id;
        }
    }
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); class_count];
    for &id in &by_disc {
        members[class[id]].push(id);
    }

    // The deeper endpoint: the child end of a tree arc, the descendant end
    // of a backedge.
    let anchor = |id: usize| -> usize {
        let data = &view.arcs[id];
        if enter[data.from] > enter[data.to] {
            data.from
        } else {
            data.to
        }
    };
    let shallow = |id: usize| -> usize {
        let data = &view.arcs[id];
        if enter[data.from] > enter[data.to] {
            data.to
        } else {
            data.from
        }
    };

    let mut candidates = Vec::new();
    candidates.push(Candidate {
        outer: (0, order.len() - 1),
        hole: None,
        entry_arc: view.virtual_arc,
        exit_arc: view.virtual_arc,
        class: class[view.virtual_arc],
    });

    for (class_id, chain) in members.iter().enumerate() {
        if chain.len() < 2 {
            // Self-loops, loop back arcs and bridges stay classified but
            // bound no region.
            continue;
        }
        for pair in chain.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let top = anchor(first);
            let outer = (enter[top], leave[top]);
            // A backedge whose upper endpoint lies inside the slice cuts off
            // everything below its lower endpoint; one that wraps around the
            // slice (like the virtual back arc) cuts nothing.
            let hole = if tree.contains(second) {
                Some(anchor(second))
            } else {
                let upper = enter[shallow(second)];
                (outer.0 <= upper && upper <= outer.1).then(|| anchor(second))
            };
            let hole = hole.map(|inner| (enter[inner], leave[inner]));
            if let Some((hs, he)) = hole {
                if hs <= outer.0 || he > outer.1 {
                    return Err(Report::new(StructureError::InternalInvariantViolation)
                        .attach_printable(format!(
                            "arcs {first} and {second} of class {class_id} do not lie on one tree path"
                        )));
                }
            }

            let covered = |node: usize| {
                let t = enter[node];
                outer.0 <= t
                    && t <= outer.1
                    && !hole.map_or(false, |(hs, he)| hs <= t && t <= he)
            };
            let first_data = &view.arcs[first];
            let second_data = &view.arcs[second];
            let first_enters = covered(first_data.to) && !covered(first_data.from);
            let first_exits = covered(first_data.from) && !covered(first_data.to);
            let second_enters = covered(second_data.to) && !covered(second_data.from);
            let second_exits = covered(second_data.from) && !covered(second_data.to);
            let (entry_arc, exit_arc) = if first_enters && second_exits {
                (first, second)
            } else if second_enters && first_exits {
                (second, first)
            } else {
                // Only reachable on graphs where some node cannot reach the
                // exit; keep the chain order.
                debug_assert!(first_enters || second_enters || first_exits || second_exits);
                (first, second)
            };

            candidates.push(Candidate {
                outer,
                hole,
                entry_arc,
                exit_arc,
                class: class_id,
            });
        }
    }

    // Pre-order: outer interval start ascending, effective size descending.
    // The root starts at 0 and no other candidate can, so it stays first.
    let effective = |candidate: &Candidate| {
        (candidate.outer.1 - candidate.outer.0 + 1)
            - candidate.hole.map_or(0, |(hs, he)| he - hs + 1)
    };
    candidates.sort_by_key(|candidate| (candidate.outer.0, Reverse(effective(candidate))));
    debug_assert!(candidates[0].outer == (0, order.len() - 1));

    // Smallest enclosing candidate wins; a stack walk over the pre-order
    // needs only to pop finished siblings.
    let mut parents: Vec<Option<usize>> = vec![None; candidates.len()];
    let mut open = vec![0usize];
    for ix in 1..candidates.len() {
        loop {
            let Some(&top) = open.last() else {
                return Err(Report::new(StructureError::InternalInvariantViolation)
                    .attach_printable("region containment stack ran empty below the root"));
            };
            match encloses(&candidates[top], &candidates[ix]) {
                Enclosure::Nested => {
                    parents[ix] = Some(top);
                    open.push(ix);
                    break;
                }
                Enclosure::Outside => {
                    open.pop();
                }
                Enclosure::Improper => {
                    return Err(Report::new(StructureError::InternalInvariantViolation)
                        .attach_printable("computed regions overlap without nesting"));
                }
            }
        }
    }

    let node_count = augmented.graph.node_count();
    let mut leaf: Vec<Option<RegionId>> = vec![None; node_count];
    let mut regions = Vec::with_capacity(candidates.len());
    for (ix, candidate) in candidates.iter().enumerate() {
        let id = RegionId(ix);
        let mut nodes = IndexSet::new();
        let mut t = candidate.outer.0;
        while t <= candidate.outer.1 {
            if let Some((hs, he)) = candidate.hole {
                if t >= hs && t <= he {
                    t = he + 1;
                    continue;
                }
            }
            let node = order[t];
            nodes.insert(augmented.graph.label(node).clone());
            leaf[node] = Some(id);
            t += 1;
        }
        regions.push(Region {
            id,
            entry_arc: ArcId(arc_remap[candidate.entry_arc]),
            exit_arc: ArcId(arc_remap[candidate.exit_arc]),
            nodes,
            parent: parents[ix].map(RegionId),
            class: ClassId(candidate.class),
        });
    }

    let dfs_parent = parent_arc
        .iter()
        .map(|parent| parent.map(|id| ArcId(arc_remap[id])))
        .collect();
    let unreachable = unreachable
        .iter()
        .map(|&ix| augmented.graph.label(ix).clone())
        .collect();
    let entry = augmented.graph.label(augmented.entry).clone();
    let exit = augmented.graph.label(augmented.exit).clone();

    Ok(ProgramStructure {
        augmented: augmented.graph,
        entry,
        exit,
        entry_synthetic: augmented.entry_synthetic,
        exit_synthetic: augmented.exit_synthetic,
        regions,
        arcs,
        class_count,
        dfs_enter: enter,
        dfs_leave: leave,
        dfs_parent,
        leaf,
        unreachable,
    })
}
