//! Domain layer: talent tree model and rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod assignment;
pub mod builder;
pub mod display;
pub mod entities;
pub mod error;
pub mod rules;

pub use assignment::{Assignment, Choice, Constraint, Loadout, Pin};
pub use builder::TreeBuilder;
pub use display::TreeNodeConvert;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use rules::{validate, UnlockRule};
