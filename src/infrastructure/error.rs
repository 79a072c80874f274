//! Infrastructure-level errors (wraps application errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tree file {}: {message}", path.display())]
    TreeFile { path: PathBuf, message: String },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<DomainError> for InfraError {
    fn from(e: DomainError) -> Self {
        Self::Application(e.into())
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
