//! Cycle-equivalence classes of arcs.
//!
//! Two arcs of the closed, undirected view are *cycle equivalent* iff every
//! cycle containing one also contains the other. This module implements the
//! linear-time construction from ["The Program Structure Tree: Computing
//! Control Regions in Linear Time"][0] by Johnson, Pearson and Pingali
//! (PLDI '94): an undirected depth-first traversal followed by a sweep in
//! reverse discovery order that maintains, per node, the ordered list of
//! *brackets* — backedges spanning the node. A tree arc's class is decided
//! by the top bracket of its subtree together with the bracket count at the
//! moment of observation; a fresh *capping* backedge is inserted whenever a
//! node has two children whose subtrees both reach above it, which keeps the
//! top bracket canonical.
//!
//! Both passes use explicit work lists, so recursion depth does not depend
//! on the input size.
//!
//! [0]: https://dl.acm.org/doi/10.1145/178243.178258

use error_stack::Report;
use fixedbitset::FixedBitSet;

use crate::bracket::{BracketArena, BracketList};
use crate::error::StructureError;
use crate::undirected::UndirectedView;

pub(crate) const UNDEF: usize = usize::MAX;

/// Everything the traversal learns about the view; consumed by region
/// synthesis.
#[derive(Debug)]
pub(crate) struct CycleEquivalence {
    /// Per real arc: its class, or `UNDEF` if the arc was never reached.
    pub(crate) class: Vec<usize>,
    pub(crate) class_count: usize,
    /// Discovery index per node (`UNDEF` when unreachable).
    pub(crate) enter: Vec<usize>,
    /// Largest discovery index inside the node's subtree.
    pub(crate) leave: Vec<usize>,
    /// Tree arc through which the node was first reached.
    pub(crate) parent_arc: Vec<Option<usize>>,
    /// Nodes in discovery order; `order[enter[n]] == n`.
    pub(crate) order: Vec<usize>,
    /// Per real arc: the order in which the traversal first crossed it.
    pub(crate) disc: Vec<usize>,
    pub(crate) disc_count: usize,
    /// Real arcs that became spanning-tree arcs.
    pub(crate) tree: FixedBitSet,
    /// Nodes the undirected traversal never reached.
    pub(crate) unreachable: Vec<usize>,
}

pub(crate) fn cycle_equivalence(
    view: &UndirectedView,
    entry: usize,
) -> Result<CycleEquivalence, Report<StructureError>> {
    let node_count = view.node_count();
    let real_arcs = view.arc_count();

    // Pass 1: undirected DFS with an explicit stack of (node, cursor).
    let mut enter = vec![UNDEF; node_count];
    let mut leave = vec![UNDEF; node_count];
    let mut parent_arc: Vec<Option<usize>> = vec![None; node_count];
    let mut order = Vec::with_capacity(node_count);
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut disc = vec![UNDEF; real_arcs];
    let mut disc_count = 0;
    let mut tree = FixedBitSet::with_capacity(real_arcs);
    let mut back_from: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut back_to: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut self_loops: Vec<Vec<usize>> = vec![Vec::new(); node_count];

    enter[entry] = 0;
    order.push(entry);
    let mut stack: Vec<(usize, usize)> = vec![(entry, 0)];
    while let Some(frame) = stack.last_mut() {
        let (node, cursor) = *frame;
        let adjacency = &view.adjacency[node];
        if cursor == adjacency.len() {
            leave[node] = order.len() - 1;
            stack.pop();
            continue;
        }
        frame.1 += 1;
        let (arc, other) = adjacency[cursor];
        if disc[arc] != UNDEF {
            // Already crossed from the other endpoint (or it is the arc we
            // arrived through).
            continue;
        }
        disc[arc] = disc_count;
        disc_count += 1;
        if other == node {
            self_loops[node].push(arc);
        } else if enter[other] == UNDEF {
            tree.insert(arc);
            parent_arc[other] = Some(arc);
            children[node].push(other);
            enter[other] = order.len();
            order.push(other);
            stack.push((other, 0));
        } else {
            // An undirected DFS has no cross arcs: the other endpoint is a
            // proper ancestor still on the stack.
            debug_assert!(enter[other] < enter[node]);
            back_from[node].push(arc);
            back_to[other].push(arc);
        }
    }

    let unreachable: Vec<usize> = (0..node_count).filter(|&n| enter[n] == UNDEF).collect();

    // Pass 2: reverse discovery order; children always precede parents.
    // Capping backedges are allocated ids past the real arcs, in the same
    // per-arc bookkeeping vectors.
    let mut class = vec![UNDEF; real_arcs];
    let mut recent_size = vec![UNDEF; real_arcs];
    let mut recent_class = vec![UNDEF; real_arcs];
    let mut cell = vec![UNDEF; real_arcs];
    let mut capping_to: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut hi = vec![UNDEF; node_count];
    let mut blist = vec![BracketList::new(); node_count];
    let mut arena = BracketArena::with_capacity(real_arcs);
    let mut next_class = 0;
    let fresh = |counter: &mut usize| {
        let id = *counter;
        *counter += 1;
        id
    };

    for &node in order.iter().rev() {
        // Self-loops never span anything; each is its own class.
        for &arc in &self_loops[node] {
            class[arc] = fresh(&mut next_class);
        }

        let mut hi0 = UNDEF;
        for &arc in &back_from[node] {
            hi0 = hi0.min(enter[view.arcs[arc].other(node)]);
        }
        let mut hi1 = UNDEF;
        let mut hi2 = UNDEF;
        for &child in &children[node] {
            let h = hi[child];
            if h < hi1 {
                hi2 = hi1;
                hi1 = h;
            } else if h < hi2 {
                hi2 = h;
            }
        }
        hi[node] = hi0.min(hi1);

        let mut brackets = BracketList::new();
        for &child in &children[node] {
            brackets = arena.concat(brackets, blist[child]);
        }
        for &capping in &capping_to[node] {
            arena.delete(&mut brackets, cell[capping]);
        }
        for &arc in &back_to[node] {
            arena.delete(&mut brackets, cell[arc]);
            if class[arc] == UNDEF {
                class[arc] = fresh(&mut next_class);
            }
        }
        for &arc in &back_from[node] {
            cell[arc] = arena.push(&mut brackets, arc);
        }
        if hi2 < hi0 && hi2 < enter[node] {
            // Two subtrees reach strictly above this node: insert a capping
            // backedge up to the second-highest reach so the top bracket
            // stays canonical. A reach that ends at the node itself expires
            // here and must not be capped.
            let capping = class.len();
            class.push(UNDEF);
            recent_size.push(UNDEF);
            recent_class.push(UNDEF);
            cell.push(arena.push(&mut brackets, capping));
            capping_to[order[hi2]].push(capping);
        }

        if let Some(edge) = parent_arc[node] {
            if brackets.is_empty() {
                // No cycle passes through this tree arc (it is a bridge of
                // the closed graph); it can be equivalent to nothing.
                class[edge] = fresh(&mut next_class);
            } else {
                let top = arena
                    .top(&brackets)
                    .expect("non-empty bracket list has a top");
                if recent_size[top] != brackets.len() {
                    recent_size[top] = brackets.len();
                    recent_class[top] = fresh(&mut next_class);
                }
                class[edge] = recent_class[top];
                if brackets.len() == 1 {
                    class[top] = class[edge];
                }
            }
        }
        blist[node] = brackets;
    }

    class.truncate(real_arcs);
    for (arc, &assigned) in class.iter().enumerate() {
        if disc[arc] != UNDEF && assigned == UNDEF {
            return Err(Report::new(StructureError::InternalInvariantViolation)
                .attach_printable(format!("arc {arc} was traversed but never classified")));
        }
    }

    Ok(CycleEquivalence {
        class,
        class_count: next_class,
        enter,
        leave,
        parent_arc,
        order,
        disc,
        disc_count,
        tree,
        unreachable,
    })
}
