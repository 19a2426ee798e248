//! Tests for the attack tree aggregate: IDs, structure and checks

use std::error::Error;

use rstest::rstest;

use atdraw::domain::{
    AttackTree, ConjunctionType, DomainError, Edge, InvalidEdgeKey, Meta, Node, NodeId, NodeKind,
    UnknownConjunctionType, ID_SPACE,
};

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

// ============================================================
// ID allocation
// ============================================================

#[test]
fn given_nodes_without_id_when_adding_then_allocates_lowest_canonical_ids() {
    let mut tree = AttackTree::new();

    let a = tree.add_node(Node::threat("a")).unwrap();
    let b = tree.add_node(Node::threat("b")).unwrap();
    let c = tree.add_node(Node::countermeasure("c")).unwrap();

    assert_eq!(a.as_str(), "N0000");
    assert_eq!(b.as_str(), "N0001");
    assert_eq!(c.as_str(), "N0002");
    assert!([a, b, c].iter().all(NodeId::is_canonical));
}

#[test]
fn given_removed_node_when_adding_then_reuses_freed_id() {
    let mut tree = AttackTree::new();
    for title in ["a", "b", "c"] {
        tree.add_node(Node::threat(title)).unwrap();
    }
    assert!(tree.remove_node(&id("N0001")));

    let reused = tree.add_node(Node::threat("d")).unwrap();

    assert_eq!(reused.as_str(), "N0001");
}

#[test]
fn given_reserved_ids_when_allocating_then_skips_them_until_released() {
    let mut tree = AttackTree::new();
    tree.reserve(id("N0000"));
    tree.reserve(id("N0001"));

    assert_eq!(tree.next_id(&[]), Some(id("N0002")));
    assert_eq!(tree.next_id(&[id("N0002")]), Some(id("N0003")));

    tree.release_reserved();
    assert_eq!(tree.next_id(&[]), Some(id("N0000")));
}

#[test]
fn given_full_id_space_when_adding_without_id_then_no_free_ids() {
    let mut tree = AttackTree::new();
    for index in 0..ID_SPACE {
        tree.add_node(Node::threat("t").with_id(NodeId::from_index(index)))
            .unwrap();
    }
    assert_eq!(tree.len(), 10_000);

    let result = tree.add_node(Node::threat("one too many"));

    assert_eq!(result, Err(DomainError::NoFreeIds));
    assert_eq!(tree.len(), 10_000);
}

#[test]
fn given_existing_id_when_adding_then_duplicate_id() {
    let mut tree = AttackTree::new();
    tree.add_node(Node::threat("a").with_id("N0007")).unwrap();

    let result = tree.add_node(Node::countermeasure("b").with_id("N0007"));

    assert_eq!(result, Err(DomainError::DuplicateId(id("N0007"))));
    assert_eq!(tree.node(&id("N0007")).unwrap().kind, NodeKind::Threat);
}

#[rstest]
#[case::word("hello")]
#[case::five_digits("N12345")]
#[case::three_digits("N042")]
#[case::lowercase("n0001")]
fn given_non_canonical_id_when_adding_then_invalid_id(#[case] raw: &str) {
    let mut tree = AttackTree::new();

    let result = tree.add_node(Node::threat("x").with_id(raw));

    assert_eq!(result, Err(DomainError::InvalidId(id(raw))));
    assert!(tree.is_empty());
}

// ============================================================
// Root
// ============================================================

#[test]
fn given_second_root_when_setting_then_previous_root_is_cleared() {
    let mut tree = AttackTree::new();
    let first = tree.add_node(Node::threat("first").as_root()).unwrap();
    let second = tree.add_node(Node::threat("second")).unwrap();

    tree.set_root(&second).unwrap();

    assert_eq!(tree.root(), Some(&second));
    assert!(!tree.node(&first).unwrap().is_root);
    assert!(tree.node(&second).unwrap().is_root);
    assert_eq!(
        tree.set_root(&id("N0042")),
        Err(DomainError::UnknownNode(id("N0042")))
    );
}

// ============================================================
// Removal
// ============================================================

#[test]
fn given_node_with_two_edges_when_removed_then_tree_is_restored() {
    // Arrange
    let mut tree = AttackTree::new();
    let root = tree.add_node(Node::threat("goal").as_root()).unwrap();
    let cm = tree.add_node(Node::countermeasure("fix")).unwrap();
    let before_nodes: Vec<NodeId> = tree.node_ids().cloned().collect();
    let before_edges = tree.edges().to_vec();

    // Act
    let added = tree.add_node(Node::threat("step")).unwrap();
    tree.add_edge(&root, &added).unwrap();
    tree.add_edge(&added, &cm).unwrap();
    assert!(tree.remove_node(&added));

    // Assert
    let after_nodes: Vec<NodeId> = tree.node_ids().cloned().collect();
    assert_eq!(after_nodes, before_nodes);
    assert_eq!(tree.edges(), before_edges.as_slice());
    assert!(tree.node(&root).unwrap().children().is_empty());
    assert!(tree.node(&cm).unwrap().parents().is_empty());
    assert!(!tree.remove_node(&added));
}

#[test]
fn given_root_when_removed_then_root_is_unset() {
    let mut tree = AttackTree::new();
    let root = tree.add_node(Node::threat("goal").as_root()).unwrap();

    tree.remove_node(&root);

    assert_eq!(tree.root(), None);
    assert!(tree.is_empty());
}

#[test]
fn given_edge_key_when_removing_then_both_adjacency_lists_shrink() {
    let mut tree = AttackTree::new();
    let a = tree.add_node(Node::threat("a")).unwrap();
    let b = tree.add_node(Node::threat("b")).unwrap();
    tree.add_edge(&a, &b).unwrap();
    let key: Edge = "N0000-N0001".parse().unwrap();

    assert!(tree.remove_edge_key(&key));

    assert!(!tree.has_edge(&a, &b));
    assert!(tree.node(&a).unwrap().children().is_empty());
    assert!(tree.node(&b).unwrap().parents().is_empty());
    assert!(!tree.remove_edge(&a, &b));
}

#[test]
fn given_edge_when_displayed_then_uses_source_dash_destination() {
    let edge = Edge::new("N0003", "N0010");

    assert_eq!(edge.to_string(), "N0003-N0010");
    assert!("N0003".parse::<Edge>().is_err());
}

#[test]
fn given_malformed_labels_when_parsing_then_errors_describe_input() {
    let key_err = "N0003-".parse::<Edge>().unwrap_err();
    let type_err = "xor".parse::<ConjunctionType>().unwrap_err();

    assert_eq!(key_err, InvalidEdgeKey("N0003-".into()));
    assert_eq!(key_err.to_string(), "invalid edge key: N0003-");
    assert_eq!(type_err, UnknownConjunctionType("xor".into()));
    assert_eq!(type_err.to_string(), "unknown conjunction type: xor");
    assert!(type_err.source().is_none());
}

// ============================================================
// Copies
// ============================================================

#[test]
fn given_cloned_tree_when_original_changes_then_copy_is_unaffected() {
    let mut tree = AttackTree::new();
    let root = tree.add_node(Node::threat("goal").as_root()).unwrap();
    let snapshot = tree.clone();

    let child = tree.add_node(Node::threat("step")).unwrap();
    tree.add_edge(&root, &child).unwrap();
    tree.node_mut(&root).unwrap().title = "changed".to_string();

    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.edges().is_empty());
    assert_eq!(snapshot.node(&root).unwrap().title, "goal");
    assert!(snapshot.node(&root).unwrap().children().is_empty());
}

// ============================================================
// Checks
// ============================================================

#[test]
fn given_three_node_loop_when_checking_cycle_then_names_a_member() {
    let mut tree = AttackTree::new();
    let a = tree.add_node(Node::threat("a")).unwrap();
    let b = tree.add_node(Node::threat("b")).unwrap();
    let c = tree.add_node(Node::threat("c")).unwrap();
    tree.add_edge(&a, &b).unwrap();
    tree.add_edge(&b, &c).unwrap();
    tree.add_edge(&c, &a).unwrap();

    let result = tree.check_cycle();

    match result {
        Err(DomainError::CycleDetected(at)) => assert!([&a, &b, &c].contains(&&at)),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn given_dag_with_shared_child_when_checking_cycle_then_ok() {
    let mut tree = AttackTree::new();
    let alt = tree
        .add_node(Node::conjunction(ConjunctionType::Alternative))
        .unwrap();
    let a = tree.add_node(Node::threat("a")).unwrap();
    let b = tree.add_node(Node::threat("b")).unwrap();
    let cm = tree.add_node(Node::countermeasure("cm")).unwrap();
    tree.add_edge(&alt, &a).unwrap();
    tree.add_edge(&alt, &b).unwrap();
    tree.add_edge(&a, &cm).unwrap();
    tree.add_edge(&b, &cm).unwrap();

    assert_eq!(tree.check_cycle(), Ok(()));
}

#[test]
fn given_meta_parts_when_checking_meta_then_requires_title_author_and_root() {
    let mut tree = AttackTree::with_meta(Meta {
        title: "t".into(),
        author: "a".into(),
        ..Meta::default()
    });
    assert!(!tree.check_meta());

    tree.add_node(Node::threat("goal").as_root()).unwrap();
    assert!(tree.check_meta());

    tree.meta.author.clear();
    assert!(!tree.check_meta());
}

#[test]
fn given_untitled_nodes_when_checking_nodes_then_collects_only_concrete_ones() {
    let mut tree = AttackTree::new();
    tree.add_node(Node::threat("titled")).unwrap();
    let untitled = tree.add_node(Node::new(NodeKind::Countermeasure)).unwrap();
    tree.add_node(Node::conjunction(ConjunctionType::Sequence).with_title(""))
        .unwrap();

    assert!(!tree.check_nodes());
    assert_eq!(tree.false_nodes(), &[untitled.clone()]);

    tree.node_mut(&untitled).unwrap().title = "now titled".into();
    assert!(tree.check_nodes());
    assert!(tree.false_nodes().is_empty());
}

#[test]
fn given_shapes_when_checking_extended_then_flags_multi_parent_orphans_and_empty_conjunctions() {
    // single rooted chain: simple
    let mut tree = AttackTree::new();
    let root = tree.add_node(Node::threat("goal").as_root()).unwrap();
    let child = tree.add_node(Node::threat("step")).unwrap();
    tree.add_edge(&root, &child).unwrap();
    assert!(!tree.check_extended());

    // detached node
    let orphan = tree.add_node(Node::countermeasure("loose")).unwrap();
    assert!(tree.check_extended());
    assert!(tree.is_extended());

    // shared child
    tree.remove_node(&orphan);
    let cm = tree.add_node(Node::countermeasure("cm")).unwrap();
    tree.add_edge(&child, &cm).unwrap();
    assert!(!tree.check_extended());
    let other = tree.add_node(Node::threat("other")).unwrap();
    tree.remove_edge(&root, &child);
    let alt = tree
        .add_node(Node::conjunction(ConjunctionType::Alternative))
        .unwrap();
    tree.add_edge(&alt, &child).unwrap();
    tree.add_edge(&alt, &other).unwrap();
    tree.add_edge(&root, &alt).unwrap();
    tree.add_edge(&other, &cm).unwrap();
    assert!(tree.check_extended());

    // empty conjunction
    let mut lonely = AttackTree::new();
    let goal = lonely.add_node(Node::threat("goal").as_root()).unwrap();
    let empty = lonely
        .add_node(Node::conjunction(ConjunctionType::Threshold))
        .unwrap();
    lonely.add_edge(&goal, &empty).unwrap();
    assert!(lonely.check_extended());
}

#[test]
fn given_root_and_detached_node_when_listing_top_level_then_root_comes_first() {
    let mut tree = AttackTree::new();
    let loose = tree.add_node(Node::threat("loose")).unwrap();
    let root = tree.add_node(Node::threat("goal").as_root()).unwrap();

    let top = tree.top_level_nodes();

    assert_eq!(top, vec![&root, &loose]);
}

#[test]
fn given_tree_when_rendering_termtree_then_lists_children_under_parent() {
    let mut tree = AttackTree::new();
    let root = tree.add_node(Node::threat("goal").as_root()).unwrap();
    let cm = tree.add_node(Node::countermeasure("fix")).unwrap();
    tree.add_edge(&root, &cm).unwrap();

    let rendered = tree.to_termtree(&root).unwrap().to_string();

    assert!(rendered.starts_with("N0000 goal (threat)"));
    assert!(rendered.contains("N0001 fix (countermeasure)"));
}
