//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, NodeId};

/// Application errors wrap domain errors and add engine-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("index {0:#x} is not a configuration of this tree")]
    InvalidIndex(u64),

    #[error("invalid selection for node {node}: {reason}")]
    InvalidSelection { node: NodeId, reason: String },

    #[error("budget {budget} out of range (limit {limit})")]
    BudgetOutOfRange { budget: u32, limit: u32 },

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
