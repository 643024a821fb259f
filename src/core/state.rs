//! The contract every participating state implements.
//!
//! A state is a behavior object bound to a key when it is registered. It does
//! not know its parent; the tree owns structure and the engine decides when
//! each callback runs.

use crate::engine::Context;
use crate::Result;

/// Behavior of a single node in the state forest.
///
/// `K` is the key type used to identify states (usually a fieldless enum) and
/// `E` is the event type dispatched to the machine.
///
/// Callbacks receive a [`Context`] through which they may request a
/// transition or defer an event. Any `Err` returned from a callback
/// propagates out of [`Machine::start`](crate::Machine::start) or
/// [`Machine::send_event`](crate::Machine::send_event) unchanged; the engine
/// does not roll back partially applied transitions.
///
/// # Example
///
/// ```rust
/// use statetree::{Context, Result, State};
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// #[derive(Debug)]
/// enum Command {
///     Push,
/// }
///
/// struct Closed;
///
/// impl State<Door, Command> for Closed {
///     fn name(&self) -> &str {
///         "Closed"
///     }
///
///     fn handle_event(&mut self, ctx: &mut Context<'_, Door, Command>, event: &Command) -> Result<bool> {
///         match event {
///             Command::Push => {
///                 ctx.transition_to(Door::Open)?;
///                 Ok(true)
///             }
///         }
///     }
/// }
/// ```
pub trait State<K, E> {
    /// Display label used in diagnostics and history records.
    fn name(&self) -> &str;

    /// Called when this state becomes active. `reason` is the triggering
    /// event, or `None` during startup without an event.
    fn enter(&mut self, _ctx: &mut Context<'_, K, E>, _reason: Option<&E>) -> Result<()> {
        Ok(())
    }

    /// Called when this state stops being active.
    fn exit(&mut self, _ctx: &mut Context<'_, K, E>, _reason: Option<&E>) -> Result<()> {
        Ok(())
    }

    /// Try to process `event`.
    ///
    /// Returning `Ok(false)` passes the event on to the parent state. A state
    /// returning `false` should not have acted as if the event was consumed.
    fn handle_event(&mut self, ctx: &mut Context<'_, K, E>, event: &E) -> Result<bool>;
}
