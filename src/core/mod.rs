//! Core state machine types.
//!
//! This module contains the parts of the machine that do not drive callbacks:
//! - The `State` contract implemented by application states
//! - The immutable `StateTree` and the transition plans computed from it
//! - Transition history tracking

mod history;
mod state;
mod tree;

pub use history::{StateHistory, TransitionRecord};
pub use state::State;
pub use tree::{StateTree, TransitionPlan};
