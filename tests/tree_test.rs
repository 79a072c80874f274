//! Tests for the tree model and TreeBuilder

use rstest::rstest;

use talent_solver::domain::{
    Assignment, DomainError, Node, Tree, TreeBuilder, TreeNodeConvert, MAX_INDEXED_POINTS,
};

fn diamond() -> Tree {
    TreeBuilder::new("diamond")
        .node(Node::new(1, "Top").at(1, 2))
        .node(Node::new(2, "Left").requires([1]).at(2, 1))
        .node(Node::new(3, "Right").requires([1]).at(2, 3))
        .node(Node::new(4, "Bottom").requires([2, 3]).at(3, 2))
        .build()
        .unwrap()
}

// ============================================================
// Builder validation
// ============================================================

#[rstest]
#[case(
    vec![Node::new(1, "A"), Node::new(1, "B")],
    DomainError::DuplicateNode(1)
)]
#[case(vec![Node::new(1, "A").with_max_points(0)], DomainError::InvalidCapacity(1))]
#[case(vec![Node::new(1, "A").requires([1])], DomainError::SelfPrerequisite(1))]
#[case(
    vec![Node::new(1, "A").requires([7])],
    DomainError::UnknownPrerequisite { node: 1, prerequisite: 7 }
)]
fn given_invalid_nodes_when_building_then_rejects(
    #[case] nodes: Vec<Node>,
    #[case] expected: DomainError,
) {
    let err = TreeBuilder::new("bad").nodes(nodes).build().unwrap_err();
    assert_eq!(err, expected);
}

#[test]
fn given_repeated_prerequisite_when_building_then_deduplicates() {
    let tree = TreeBuilder::new("dupes")
        .node(Node::new(1, "A"))
        .node(Node::new(2, "B").requires([1, 1]))
        .build()
        .unwrap();

    assert_eq!(tree.node(2).unwrap().prerequisites, vec![1]);
    assert_eq!(tree.topological_order().unwrap(), vec![1, 2]);
}

// ============================================================
// Structure queries
// ============================================================

#[test]
fn given_diamond_when_querying_then_reports_links() {
    let tree = diamond();

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.children(1), &[2, 3]);
    assert!(tree.children(4).is_empty());
    assert_eq!(tree.roots().map(|n| n.id).collect::<Vec<_>>(), vec![1]);
    assert_eq!(tree.max_talent_points(), 4);
}

#[test]
fn given_diamond_when_ordering_then_parents_come_first() {
    let order = diamond().topological_order().unwrap();
    assert_eq!(order, vec![1, 2, 3, 4]);
}

#[test]
fn given_ready_nodes_when_ordering_then_lower_threshold_first() {
    let tree = TreeBuilder::new("thresholds")
        .node(Node::new(1, "Late").with_points_required(5))
        .node(Node::new(2, "Early"))
        .node(Node::new(3, "Middle").with_points_required(2))
        .build()
        .unwrap();

    assert_eq!(tree.topological_order().unwrap(), vec![2, 3, 1]);
}

#[test]
fn given_pre_filled_node_when_counting_points_then_excluded_from_ceiling() {
    let tree = TreeBuilder::new("granted")
        .node(Node::new(1, "Granted").with_max_points(3).pre_filled())
        .node(Node::new(2, "Free").with_max_points(2))
        .build()
        .unwrap();

    assert_eq!(tree.max_talent_points(), 2);
    assert_eq!(tree.pre_filled_talent_points(), 3);
    assert_eq!(tree.free_nodes().count(), 1);
    assert_eq!(tree.node(1).unwrap().points, 3);
}

#[test]
fn given_oversized_tree_when_checking_then_too_large() {
    let tree = TreeBuilder::new("big")
        .nodes((0..33).map(|i| Node::new(i, format!("N{i}")).with_max_points(2)))
        .build()
        .unwrap();

    assert_eq!(
        tree.is_solvable(),
        Err(DomainError::TreeTooLarge {
            requested: 66,
            allowed: MAX_INDEXED_POINTS
        })
    );
}

// ============================================================
// Transient ranks
// ============================================================

#[test]
fn given_assignment_when_applied_then_reset_clears_free_nodes() {
    let mut tree = diamond();

    tree.apply(&Assignment::new().with(1, 1).with(2, 1)).unwrap();
    assert_eq!(tree.spent_points(), 2);
    assert_eq!(tree.current_assignment().rank(2), 1);

    tree.reset();
    assert_eq!(tree.spent_points(), 0);
}

#[test]
fn given_rank_above_capacity_when_applying_then_rejected_and_unchanged() {
    let mut tree = diamond();
    tree.apply(&Assignment::new().with(1, 1)).unwrap();

    let err = tree.apply(&Assignment::new().with(1, 2)).unwrap_err();

    assert!(matches!(err, DomainError::RuleViolation { node: 1, .. }));
    assert_eq!(tree.spent_points(), 1);
}

#[test]
fn given_tree_when_rendering_then_shows_nested_children() {
    let rendered = diamond().to_tree_string().to_string();

    assert!(rendered.contains("Top"));
    assert!(rendered.contains("Bottom"));
    assert!(rendered.lines().count() >= 4);
}
