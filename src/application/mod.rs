//! Application layer: solver, index codec and result store
//!
//! This layer drives the domain model; it performs no file or terminal I/O.

pub mod error;
pub mod index;
pub mod services;
pub mod store;

pub use error::{ApplicationError, ApplicationResult};
pub use index::{IndexLayout, Sind, Slot};
pub use services::SolverService;
pub use store::{Entry, ResultStore};
