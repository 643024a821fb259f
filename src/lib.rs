//! Statetree: a synchronous hierarchical state machine runtime
//!
//! Applications describe a forest of states with parent/child relationships,
//! and the machine keeps exactly one current state. Events are offered to the
//! current state first and bubble up to its ancestors until one accepts them.
//! When a state requests a transition, only the states outside the shared
//! ancestry of the old and new state are exited and entered.
//!
//! # Core Concepts
//!
//! - **State**: behavior implementing the `State` trait, bound to a key
//! - **Tree**: the immutable forest built once by `Machine::start`
//! - **Context**: the handle callbacks use to request transitions or defer events
//! - **History**: record of every executed transition step
//!
//! # Example
//!
//! ```rust
//! use statetree::{Context, Machine, Result, State};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Conn {
//!     Online,
//!     Idle,
//!     Busy,
//! }
//!
//! #[derive(Debug)]
//! enum Msg {
//!     Request,
//!     Done,
//!     Heartbeat,
//! }
//!
//! struct Online;
//! struct Idle;
//! struct Busy;
//!
//! impl State<Conn, Msg> for Online {
//!     fn name(&self) -> &str { "Online" }
//!     fn handle_event(&mut self, _ctx: &mut Context<'_, Conn, Msg>, event: &Msg) -> Result<bool> {
//!         Ok(matches!(event, Msg::Heartbeat))
//!     }
//! }
//!
//! impl State<Conn, Msg> for Idle {
//!     fn name(&self) -> &str { "Idle" }
//!     fn handle_event(&mut self, ctx: &mut Context<'_, Conn, Msg>, event: &Msg) -> Result<bool> {
//!         match event {
//!             Msg::Request => ctx.transition_to(Conn::Busy).map(|()| true),
//!             _ => Ok(false),
//!         }
//!     }
//! }
//!
//! impl State<Conn, Msg> for Busy {
//!     fn name(&self) -> &str { "Busy" }
//!     fn handle_event(&mut self, ctx: &mut Context<'_, Conn, Msg>, event: &Msg) -> Result<bool> {
//!         match event {
//!             Msg::Done => ctx.transition_to(Conn::Idle).map(|()| true),
//!             // Serve it once we are idle again.
//!             Msg::Request => {
//!                 ctx.defer_event(Msg::Request);
//!                 Ok(true)
//!             }
//!             _ => Ok(false),
//!         }
//!     }
//! }
//!
//! let mut machine: Machine<Conn, Msg> = Machine::new("connection");
//! machine.start(None, |tree| {
//!     tree.add_state(Conn::Online, Online)
//!         .add(Conn::Idle, Idle, Some(Conn::Online), true)
//!         .add_child(Conn::Busy, Busy, Conn::Online);
//! })?;
//!
//! machine.send_event(Msg::Request)?;
//! machine.send_event(Msg::Request)?;
//! assert_eq!(machine.pending_deferred(), 1);
//!
//! // Done returns to Idle, which replays the deferred Request.
//! machine.send_event(Msg::Done)?;
//! assert_eq!(machine.current_state(), Some(Conn::Busy));
//! machine.send_event(Msg::Heartbeat)?;
//! # Ok::<(), statetree::MachineError>(())
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod logging;
pub mod snapshot;

// Re-export commonly used types
pub use builder::{ConfigError, ConfigErrors, TreeBuilder};
pub use config::{MachineConfig, MachineConfigBuilder};
pub use self::core::{State, StateHistory, StateTree, TransitionPlan, TransitionRecord};
pub use engine::{Context, Machine, MachineError};
pub use logging::{Logger, NoopLogger, TracingLogger};
pub use snapshot::{MachineSnapshot, SnapshotError};

/// Result type used by the machine and by state callbacks.
pub type Result<T> = std::result::Result<T, MachineError>;
