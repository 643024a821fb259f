//! Handle given to state callbacks while the machine processes an event.

use crate::core::StateTree;
use crate::engine::error::MachineError;
use crate::logging::{emit, Logger};
use crate::Result;
use std::fmt::Debug;
use std::hash::Hash;

/// Mutable engine fields: current/target slots, nesting depth and the
/// deferred queue.
pub(crate) struct Cursor<E> {
    pub current: usize,
    pub target: usize,
    pub depth: usize,
    pub deferred: Vec<E>,
}

impl<E> Cursor<E> {
    pub fn new(initial: usize) -> Self {
        Self {
            current: initial,
            target: initial,
            depth: 0,
            deferred: Vec::new(),
        }
    }

    /// Record `target` as the next state. Only legal inside a processing scope.
    pub fn request(&mut self, machine: &str, target: usize) -> Result<()> {
        if self.depth == 0 {
            return Err(MachineError::TransitionOutsideProcessing {
                machine: machine.to_string(),
            });
        }
        self.target = target;
        Ok(())
    }
}

/// What a state may do to the machine from inside a callback.
///
/// A context only exists while the machine is processing, so the requests it
/// carries are always made inside a processing scope.
pub struct Context<'a, K, E> {
    machine: &'a str,
    logger: &'a dyn Logger,
    tree: &'a StateTree<K>,
    cursor: &'a mut Cursor<E>,
}

impl<'a, K, E> Context<'a, K, E>
where
    K: Copy + Eq + Hash + Debug,
    E: Debug,
{
    pub(crate) fn new(
        machine: &'a str,
        logger: &'a dyn Logger,
        tree: &'a StateTree<K>,
        cursor: &'a mut Cursor<E>,
    ) -> Self {
        Self {
            machine,
            logger,
            tree,
            cursor,
        }
    }

    /// Request a transition to `key` once the current callback returns.
    ///
    /// The last request made before the engine checks for a pending
    /// transition wins. Requesting the current state is a no-op transition.
    pub fn transition_to(&mut self, key: K) -> Result<()> {
        let target = self
            .tree
            .slot(&key)
            .ok_or_else(|| MachineError::UnknownState {
                machine: self.machine.to_string(),
                state: format!("{key:?}"),
            })?;
        self.cursor.request(self.machine, target)?;
        emit(self.logger, || {
            format!("{}: transition to {key:?} requested", self.machine)
        });
        Ok(())
    }

    /// Queue `event` for redelivery after the next transition step.
    pub fn defer_event(&mut self, event: E) {
        emit(self.logger, || format!("{}: deferring {event:?}", self.machine));
        self.cursor.deferred.push(event);
    }

    /// The state the machine is in. During a transition step this is already
    /// the step's target.
    pub fn current_state(&self) -> K {
        self.tree.key(self.cursor.current)
    }

    /// The state the machine is heading to; equals the current state when no
    /// transition is pending.
    pub fn target_state(&self) -> K {
        self.tree.key(self.cursor.target)
    }

    /// True when `key` is the current state or one of its ancestors.
    pub fn is_in(&self, key: &K) -> bool {
        self.tree.is_ancestor_of(key, &self.current_state())
    }

    pub fn machine_name(&self) -> &str {
        self.machine
    }

    pub fn processing_depth(&self) -> usize {
        self.cursor.depth
    }

    pub fn pending_deferred(&self) -> usize {
        self.cursor.deferred.len()
    }

    pub fn tree(&self) -> &StateTree<K> {
        self.tree
    }
}
