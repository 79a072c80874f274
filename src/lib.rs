//! Talent tree solver
//!
//! Enumerates every valid point configuration of a talent tree, indexes each
//! one as a 64-bit value bucketed by points spent, filters the result set by
//! partial constraints and reconstructs configurations on demand.
//!
//! ```ignore
//! let tree = TreeBuilder::new("demo")
//!     .node(Node::new(1, "Strike").with_max_points(2))
//!     .node(Node::new(2, "Cleave").requires([1]))
//!     .build()?;
//! let store = SolverService::new(Arc::new(Settings::default())).solve(&tree, 3)?;
//! for entry in store.page(2, 0, 20)? {
//!     println!("{}", store.decode(entry.index)?);
//! }
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
