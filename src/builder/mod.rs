//! Builder API for registering the state forest.
//!
//! The builder is handed to the closure passed to `Machine::start`. It records
//! each state with its optional parent and initial flag, and validates the
//! whole registration set before the tree is frozen.

pub mod error;
pub mod tree;

pub use error::{ConfigError, ConfigErrors};
pub use tree::TreeBuilder;

pub(crate) use tree::Blueprint;
