//! Tests for paging through a budget

use std::sync::Arc;

use rstest::{fixture, rstest};

use talent_solver::application::{ApplicationError, ResultStore, SolverService};
use talent_solver::config::Settings;
use talent_solver::domain::{Constraint, Node, Pin, TreeBuilder};

/// Six independent nodes: bucket 3 holds C(6, 3) = 20 entries.
#[fixture]
fn store() -> ResultStore {
    let tree = TreeBuilder::new("pages")
        .nodes((1..=6).map(|i| Node::new(i, format!("N{i}"))))
        .build()
        .unwrap();
    SolverService::new(Arc::new(Settings::default()))
        .solve(&tree, 6)
        .unwrap()
}

#[rstest]
#[case(1, 20)]
#[case(7, 3)]
#[case(20, 1)]
#[case(50, 1)]
fn given_page_size_when_counting_pages_then_rounds_up(
    store: ResultStore,
    #[case] page_size: usize,
    #[case] expected: usize,
) {
    assert_eq!(store.page_count(3, page_size).unwrap(), expected);
}

#[rstest]
fn given_pages_when_concatenated_then_equal_filtered_bucket(store: ResultStore) {
    let pages = store.page_count(3, 7).unwrap();

    let joined: Vec<_> = (0..pages)
        .flat_map(|p| store.page(3, p, 7).unwrap().to_vec())
        .collect();

    assert_eq!(joined.as_slice(), store.filtered(3).unwrap());
    assert_eq!(store.page(3, 2, 7).unwrap().len(), 6);
}

#[rstest]
fn given_page_past_end_when_paging_then_empty(store: ResultStore) {
    assert!(store.page(3, 3, 7).unwrap().is_empty());
    assert!(store.page(3, usize::MAX, 7).unwrap().is_empty());
}

#[rstest]
fn given_zero_page_size_when_paging_then_rejected(store: ResultStore) {
    assert!(matches!(
        store.page(3, 0, 0),
        Err(ApplicationError::InvalidPageSize)
    ));
    assert!(matches!(
        store.page_count(3, 0),
        Err(ApplicationError::InvalidPageSize)
    ));
}

#[rstest]
fn given_budget_above_limit_when_paging_then_out_of_range(store: ResultStore) {
    assert!(matches!(
        store.page(7, 0, 10),
        Err(ApplicationError::BudgetOutOfRange { budget: 7, limit: 6 })
    ));
}

#[rstest]
fn given_filter_when_paging_then_pages_follow_filtered_view(mut store: ResultStore) {
    store
        .apply_filter(&Constraint::new().pin(1, Pin::Rank(1)))
        .unwrap();

    // N1 plus two of the other five
    assert_eq!(store.filtered_len(3).unwrap(), 10);
    assert_eq!(store.page_count(3, 4).unwrap(), 3);
    let last = store.page(3, 2, 4).unwrap();
    assert_eq!(last.len(), 2);
    assert_eq!(last, &store.filtered(3).unwrap()[8..]);
}

#[rstest]
fn given_page_when_decoding_then_each_row_spends_the_budget(store: ResultStore) {
    let rows = store.decode_page(3, 1, 5).unwrap();

    assert_eq!(rows.len(), 5);
    for (entry, assignment) in rows {
        assert_eq!(assignment.total(), 3);
        assert_eq!(entry.index.budget(), 3);
    }
}

#[rstest]
fn given_same_generation_when_paging_twice_then_pages_are_stable(store: ResultStore) {
    let first = store.page(2, 1, 4).unwrap().to_vec();
    let second = store.page(2, 1, 4).unwrap().to_vec();
    assert_eq!(first, second);
}
