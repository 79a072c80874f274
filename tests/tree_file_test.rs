//! Tests for loading tree definition files

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use talent_solver::application::{ApplicationError, SolverService};
use talent_solver::config::Settings;
use talent_solver::domain::{DomainError, NodeKind};
use talent_solver::infrastructure::traits::RealFileSystem;
use talent_solver::infrastructure::tree_file::load_tree;
use talent_solver::infrastructure::InfraError;

const TREES: &str = "tests/resources/trees";

#[test]
fn given_tree_file_when_loading_then_builds_nodes() {
    let tree = load_tree(&RealFileSystem, &Path::new(TREES).join("warrior.toml")).unwrap();

    assert_eq!(tree.name(), "warrior");
    assert_eq!(tree.len(), 6);
    assert!(tree.node(1).unwrap().pre_filled);
    assert_eq!(tree.node(2).unwrap().max_points, 2);
    assert_eq!(tree.node(5).unwrap().kind, NodeKind::Passive);
    assert!(tree.node(4).unwrap().kind.is_switch());
    assert_eq!(tree.node(4).unwrap().prerequisites, vec![2, 3]);
    assert_eq!(tree.max_talent_points(), 7);
    assert_eq!(tree.pre_filled_talent_points(), 1);
}

#[test]
fn given_loaded_tree_when_solving_then_counts_every_configuration() {
    let tree = load_tree(&RealFileSystem, &Path::new(TREES).join("warrior.toml")).unwrap();

    let store = SolverService::new(Arc::new(Settings::default()))
        .solve(&tree, tree.max_talent_points())
        .unwrap();

    assert_eq!(store.total_entries(), 26);
    // every entry holding the stance switch stands for two loadouts
    assert_eq!(store.total_configurations(), 43);
}

#[test]
fn given_cyclic_tree_file_when_loading_then_loads_but_is_not_solvable() {
    let tree = load_tree(&RealFileSystem, &Path::new(TREES).join("cycle.toml")).unwrap();

    assert!(matches!(
        tree.is_solvable(),
        Err(DomainError::CycleDetected(_))
    ));
}

#[test]
fn given_unknown_prerequisite_when_loading_then_domain_error() {
    let err = load_tree(&RealFileSystem, &Path::new(TREES).join("unknown_parent.toml"))
        .unwrap_err();

    assert!(matches!(
        err,
        InfraError::Application(ApplicationError::Domain(DomainError::UnknownPrerequisite {
            node: 1,
            prerequisite: 99
        }))
    ));
}

#[test]
fn given_missing_file_when_loading_then_tree_file_error() {
    let temp = TempDir::new().unwrap();

    let err = load_tree(&RealFileSystem, &temp.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, InfraError::TreeFile { .. }));
}

#[test]
fn given_malformed_toml_when_loading_then_tree_file_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    std::fs::write(&path, "name = \"bad\"\n[[nodes]]\nid = \"one\"\n").unwrap();

    let err = load_tree(&RealFileSystem, &path).unwrap_err();

    assert!(matches!(err, InfraError::TreeFile { .. }));
}
