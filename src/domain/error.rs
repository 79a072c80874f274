//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent violations of the talent tree rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("tree too large: {requested} points requested, at most {allowed} can be indexed")]
    TreeTooLarge { requested: u32, allowed: u32 },

    #[error("cycle detected in prerequisites at node {0}")]
    CycleDetected(NodeId),

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("node {node} references unknown prerequisite {prerequisite}")]
    UnknownPrerequisite { node: NodeId, prerequisite: NodeId },

    #[error("node {0} lists itself as prerequisite")]
    SelfPrerequisite(NodeId),

    #[error("node {0} must have a capacity of at least one point")]
    InvalidCapacity(NodeId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("rule violation at node {node}: {reason}")]
    RuleViolation { node: NodeId, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
