use itertools::Itertools;
use sese::{program_structure_tree, ClassId, FlowGraph, ProgramStructure, Region, StructureError};

fn structure(edges: &[(&'static str, &'static str)]) -> ProgramStructure<&'static str> {
    program_structure_tree(&FlowGraph::from_edges(edges.iter().copied())).unwrap()
}

fn region_with<'a>(
    structure: &'a ProgramStructure<&'static str>,
    nodes: &[&'static str],
) -> &'a Region<&'static str> {
    structure
        .regions()
        .iter()
        .find(|region| {
            region.nodes().len() == nodes.len() && nodes.iter().all(|n| region.contains(n))
        })
        .unwrap_or_else(|| panic!("no region with nodes {nodes:?}"))
}

fn class_of(
    structure: &ProgramStructure<&'static str>,
    from: &'static str,
    to: &'static str,
) -> ClassId {
    structure
        .arcs()
        .iter()
        .find(|arc| !arc.is_virtual_back() && arc.from() == &from && arc.to() == &to)
        .unwrap_or_else(|| panic!("no arc {from} -> {to}"))
        .class()
}

fn virtual_class(structure: &ProgramStructure<&'static str>) -> ClassId {
    structure
        .arcs()
        .iter()
        .find(|arc| arc.is_virtual_back())
        .unwrap()
        .class()
}

#[test]
fn diamond() {
    let structure = structure(&[
        ("s", "a"),
        ("a", "b"),
        ("a", "c"),
        ("b", "d"),
        ("c", "d"),
        ("d", "t"),
    ]);

    // No augmentation: the source and sink are unique.
    assert!(!structure.entry_is_synthetic());
    assert!(!structure.exit_is_synthetic());
    assert_eq!(structure.augmented().node_count(), 6);

    // Root over everything, the diamond body, the exit slice, two branches.
    assert_eq!(structure.regions().len(), 5);
    let root = structure.root();
    assert_eq!(root.nodes().len(), 6);
    let body = region_with(&structure, &["a", "b", "c", "d"]);
    assert_eq!(body.parent(), Some(root.id()));
    let left = region_with(&structure, &["b"]);
    let right = region_with(&structure, &["c"]);
    assert_eq!(left.parent(), Some(body.id()));
    assert_eq!(right.parent(), Some(body.id()));

    // The arcs around the diamond share the outermost class.
    assert_eq!(class_of(&structure, "s", "a"), class_of(&structure, "d", "t"));
    assert_eq!(class_of(&structure, "s", "a"), virtual_class(&structure));
    assert_ne!(class_of(&structure, "a", "b"), class_of(&structure, "a", "c"));

    // The diamond body is bounded by its entry and exit edges.
    let entry = structure.arc(body.entry_arc());
    let exit = structure.arc(body.exit_arc());
    assert_eq!((entry.from(), entry.to()), (&"s", &"a"));
    assert_eq!((exit.from(), exit.to()), (&"d", &"t"));
}

#[test]
fn natural_loop() {
    let structure = structure(&[("s", "a"), ("a", "b"), ("b", "a"), ("b", "t")]);

    // The loop body is a region entered from outside the loop and left by
    // the fall-through edge.
    let body = region_with(&structure, &["a", "b"]);
    let entry = structure.arc(body.entry_arc());
    let exit = structure.arc(body.exit_arc());
    assert_eq!((entry.from(), entry.to()), (&"s", &"a"));
    assert_eq!((exit.from(), exit.to()), (&"b", &"t"));

    // The loop's back arc has a class of its own and bounds no region.
    let back = class_of(&structure, "b", "a");
    let sharing = structure
        .arcs()
        .iter()
        .filter(|arc| arc.class() == back)
        .count();
    assert_eq!(sharing, 1);
    assert!(structure
        .regions()
        .iter()
        .all(|region| region.class() != back));
}

#[test]
fn multi_source_gets_a_super_entry() {
    let structure = structure(&[("a", "c"), ("b", "c"), ("c", "d")]);

    assert!(structure.entry_is_synthetic());
    assert!(!structure.exit_is_synthetic());
    assert_eq!(structure.entry(), &"__entry__");
    assert_eq!(structure.exit(), &"d");
    assert!(structure.augmented().contains_edge(&"__entry__", &"a"));
    assert!(structure.augmented().contains_edge(&"__entry__", &"b"));
    // The virtual back arc is not part of the adjacency.
    assert_eq!(structure.augmented().successors(&"d").count(), 0);
    assert!(structure
        .arcs()
        .iter()
        .any(|arc| arc.is_virtual_back() && arc.from() == &"d" && arc.to() == &"__entry__"));

    assert!(structure.root().contains(&"__entry__"));
    region_with(&structure, &["a"]);
    region_with(&structure, &["b"]);
    region_with(&structure, &["d"]);
}

#[test]
fn unreachable_island_is_reported() {
    // The island is a source-free, sink-free cycle, so augmentation leaves
    // it alone and the traversal never reaches it.
    let structure = structure(&[("s", "a"), ("a", "t"), ("x", "y"), ("y", "x")]);

    assert_eq!(structure.unreachable(), &["x", "y"]);
    assert!(structure
        .regions()
        .iter()
        .all(|region| !region.contains(&"x") && !region.contains(&"y")));
    assert!(structure
        .arcs()
        .iter()
        .all(|arc| arc.from() != &"x" && arc.to() != &"x"));
    assert_eq!(structure.leaf_region_of(&"x"), None);
    assert_eq!(structure.dfs_interval(&"x"), None);
}

#[test]
fn island_with_a_source_is_wired_to_the_super_entry() {
    // With a source and a sink of its own, the island takes part in the
    // augmentation and becomes analyzable.
    let structure = structure(&[("s", "a"), ("a", "t"), ("x", "y")]);

    assert!(structure.entry_is_synthetic());
    assert!(structure.exit_is_synthetic());
    assert!(structure.augmented().contains_edge(&"__entry__", &"x"));
    assert!(structure.augmented().contains_edge(&"y", &"__exit__"));
    assert!(structure.unreachable().is_empty());
    assert!(structure.root().contains(&"x"));
}

#[test]
fn self_loop_is_a_degenerate_class() {
    let structure = structure(&[("s", "a"), ("a", "a"), ("a", "t")]);

    let self_arc = structure
        .arcs()
        .iter()
        .find(|arc| arc.from() == &"a" && arc.to() == &"a")
        .unwrap();
    assert!(self_arc.is_backedge());
    let sharing = structure
        .arcs()
        .iter()
        .filter(|arc| arc.class() == self_arc.class())
        .count();
    assert_eq!(sharing, 1);

    // "a" still sits in the ordinary straight-line region around it.
    let body = region_with(&structure, &["a"]);
    let entry = structure.arc(body.entry_arc());
    let exit = structure.arc(body.exit_arc());
    assert_eq!((entry.from(), entry.to()), (&"s", &"a"));
    assert_eq!((exit.from(), exit.to()), (&"a", &"t"));
    assert_eq!(structure.leaf_region_of(&"a"), Some(body.id()));
}

#[test]
fn three_diamonds_in_sequence() {
    let structure = structure(&[
        ("s", "a1"),
        ("a1", "b1"),
        ("a1", "c1"),
        ("b1", "d1"),
        ("c1", "d1"),
        ("d1", "a2"),
        ("a2", "b2"),
        ("a2", "c2"),
        ("b2", "d2"),
        ("c2", "d2"),
        ("d2", "a3"),
        ("a3", "b3"),
        ("a3", "c3"),
        ("b3", "d3"),
        ("c3", "d3"),
        ("d3", "t"),
    ]);

    // Root + three diamonds + the exit slice + six branch regions.
    assert_eq!(structure.regions().len(), 11);

    let root_id = structure.root().id();
    let diamonds = [
        region_with(&structure, &["a1", "b1", "c1", "d1"]),
        region_with(&structure, &["a2", "b2", "c2", "d2"]),
        region_with(&structure, &["a3", "b3", "c3", "d3"]),
    ];
    for diamond in diamonds {
        assert_eq!(diamond.parent(), Some(root_id));
        assert_eq!(structure.children_of(diamond.id()).count(), 2);
    }

    // All the arcs between the diamonds carry the root class.
    let outer = virtual_class(&structure);
    assert_eq!(class_of(&structure, "s", "a1"), outer);
    assert_eq!(class_of(&structure, "d1", "a2"), outer);
    assert_eq!(class_of(&structure, "d2", "a3"), outer);
    assert_eq!(class_of(&structure, "d3", "t"), outer);
}

#[test]
fn single_node_graph() {
    let mut graph = FlowGraph::new();
    graph.add_node("only");
    let structure = program_structure_tree(&graph).unwrap();

    assert_eq!(structure.entry(), &"only");
    assert_eq!(structure.exit(), &"only");
    assert_eq!(structure.regions().len(), 1);
    assert_eq!(
        structure.root().nodes().iter().copied().collect_vec(),
        ["only"]
    );
    // The virtual back arc degenerates to a self-loop.
    assert!(structure.arcs()[0].is_virtual_back());
    assert_eq!(structure.arcs().len(), 1);
}

#[test]
fn single_edge_graph() {
    let structure = structure(&[("u", "v")]);

    assert_eq!(structure.entry(), &"u");
    assert_eq!(structure.exit(), &"v");
    assert_eq!(structure.regions().len(), 2);
    assert_eq!(structure.root().nodes().len(), 2);
    let inner = region_with(&structure, &["v"]);
    assert_eq!(inner.parent(), Some(structure.root().id()));
}

#[test]
fn empty_graph_is_rejected() {
    let graph: FlowGraph<&'static str> = FlowGraph::new();
    let report = program_structure_tree(&graph).unwrap_err();
    assert_eq!(report.current_context(), &StructureError::InvalidInput);
}

#[test]
fn source_free_graph_is_unsupported() {
    let graph = FlowGraph::from_edges([("a", "b"), ("b", "c"), ("c", "a")]);
    let report = program_structure_tree(&graph).unwrap_err();
    assert_eq!(report.current_context(), &StructureError::Unsupported);
}

#[test]
fn reserved_labels_are_rejected() {
    let graph = FlowGraph::from_edges([("__exit__", "a")]);
    let report = program_structure_tree(&graph).unwrap_err();
    assert_eq!(report.current_context(), &StructureError::InvalidInput);
}

#[test]
fn analysis_is_deterministic() {
    let edges = [
        ("s", "a"),
        ("a", "b"),
        ("a", "c"),
        ("b", "d"),
        ("c", "d"),
        ("d", "a"),
        ("d", "t"),
        ("t", "t"),
    ];
    let first = structure(&edges);
    let second = structure(&edges);

    assert_eq!(first.regions(), second.regions());
    assert_eq!(first.arcs(), second.arcs());
    assert_eq!(first.class_count(), second.class_count());
}

#[test]
fn every_node_has_a_leaf_region() {
    let structure = structure(&[
        ("s", "a"),
        ("a", "b"),
        ("b", "a"),
        ("a", "c"),
        ("c", "t"),
        ("b", "t"),
    ]);
    for node in structure.augmented().nodes() {
        let leaf = structure.leaf_region_of(node).unwrap();
        assert!(structure.region(leaf).contains(node));
    }
}
