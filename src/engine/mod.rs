//! The transition engine.
//!
//! # Key Concepts
//!
//! - **Dispatch**: events walk from the current state toward its root until a
//!   state accepts them
//! - **Transitions**: requested through the callback `Context`, executed as
//!   minimal exit/enter walks around the common ancestry
//! - **Deferred events**: queued by callbacks and replayed through the normal
//!   dispatch path after each transition step

mod context;
mod error;
mod machine;

pub use context::Context;
pub use error::MachineError;
pub use machine::Machine;
