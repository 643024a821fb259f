//! Hierarchical state machine that dispatches events and runs transitions.

use crate::builder::{Blueprint, TreeBuilder};
use crate::config::MachineConfig;
use crate::core::{State, StateHistory, StateTree, TransitionPlan, TransitionRecord};
use crate::engine::context::{Context, Cursor};
use crate::engine::error::MachineError;
use crate::logging::{emit, Logger, TracingLogger};
use crate::snapshot::MachineSnapshot;
use crate::Result;
use chrono::Utc;
use std::fmt::Debug;
use std::hash::Hash;

/// Frozen tree, behavior objects and mutable cursor of a started machine.
struct Runtime<K, E> {
    tree: StateTree<K>,
    states: Vec<Box<dyn State<K, E>>>,
    cursor: Cursor<E>,
}

impl<K, E> Runtime<K, E> {
    fn name_of(&self, slot: usize) -> String {
        self.states[slot].name().to_string()
    }

    fn names(&self, slots: &[usize]) -> Vec<String> {
        slots.iter().map(|&slot| self.name_of(slot)).collect()
    }
}

fn not_started(machine: &str) -> MachineError {
    MachineError::NotStarted {
        machine: machine.to_string(),
    }
}

/// Synchronous hierarchical state machine.
///
/// Events go to the current state first and fall back to its ancestors until
/// one accepts them. Transitions requested by callbacks exit and enter only
/// the states outside the common ancestry of the current and target states,
/// and events deferred by callbacks are redelivered after each transition
/// step.
///
/// A machine is single-threaded: every call runs to completion on the
/// caller's thread, and callers sharing a machine across threads must
/// serialize access themselves.
///
/// # Example
///
/// ```rust
/// use statetree::{Context, Machine, Result, State};
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Light {
///     Powered,
///     Off,
///     On,
/// }
///
/// #[derive(Debug)]
/// enum Switch {
///     Toggle,
///     Unplug,
/// }
///
/// struct Powered;
/// struct Off;
/// struct On;
///
/// impl State<Light, Switch> for Powered {
///     fn name(&self) -> &str { "Powered" }
///     fn handle_event(&mut self, _ctx: &mut Context<'_, Light, Switch>, event: &Switch) -> Result<bool> {
///         Ok(matches!(event, Switch::Unplug))
///     }
/// }
///
/// impl State<Light, Switch> for Off {
///     fn name(&self) -> &str { "Off" }
///     fn handle_event(&mut self, ctx: &mut Context<'_, Light, Switch>, event: &Switch) -> Result<bool> {
///         match event {
///             Switch::Toggle => ctx.transition_to(Light::On).map(|()| true),
///             _ => Ok(false),
///         }
///     }
/// }
///
/// impl State<Light, Switch> for On {
///     fn name(&self) -> &str { "On" }
///     fn handle_event(&mut self, ctx: &mut Context<'_, Light, Switch>, event: &Switch) -> Result<bool> {
///         match event {
///             Switch::Toggle => ctx.transition_to(Light::Off).map(|()| true),
///             _ => Ok(false),
///         }
///     }
/// }
///
/// let mut machine: Machine<Light, Switch> = Machine::new("lamp");
/// machine
///     .start(None, |tree| {
///         tree.add_state(Light::Powered, Powered)
///             .add(Light::Off, Off, Some(Light::Powered), true)
///             .add_child(Light::On, On, Light::Powered);
///     })
///     .unwrap();
///
/// machine.send_event(Switch::Toggle).unwrap();
/// assert_eq!(machine.current_state(), Some(Light::On));
///
/// // Handled by the parent, no transition.
/// machine.send_event(Switch::Unplug).unwrap();
/// assert_eq!(machine.current_state(), Some(Light::On));
/// ```
pub struct Machine<K, E> {
    name: String,
    config: MachineConfig,
    logger: Box<dyn Logger>,
    history: StateHistory,
    runtime: Option<Runtime<K, E>>,
}

impl<K, E> Machine<K, E>
where
    K: Copy + Eq + Hash + Debug + 'static,
    E: Debug + 'static,
{
    /// Create an unstarted machine with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, MachineConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: MachineConfig) -> Self {
        Self {
            name: name.into(),
            history: StateHistory::with_limit(config.history_limit),
            config,
            logger: Box::new(TracingLogger),
            runtime: None,
        }
    }

    /// Replace the diagnostic logger.
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Build the state tree and enter the initial state.
    ///
    /// `build` registers states on the [`TreeBuilder`]. Once validated the
    /// tree never changes. The initial state's chain is then entered root
    /// first with `event` as the reason, and any transition requested while
    /// entering is carried out before `start` returns.
    pub fn start<F>(&mut self, event: Option<E>, build: F) -> Result<()>
    where
        F: FnOnce(&mut TreeBuilder<K, E>),
    {
        if self.runtime.is_some() {
            return Err(MachineError::AlreadyStarted {
                machine: self.name.clone(),
            });
        }

        let mut builder = TreeBuilder::new();
        build(&mut builder);
        let Blueprint {
            tree,
            states,
            initial,
            overridden,
        } = builder.finish()?;

        for key in &overridden {
            emit(self.logger.as_ref(), || {
                format!(
                    "{}: initial state {key:?} replaced by a later designation",
                    self.name
                )
            });
        }

        self.runtime = Some(Runtime {
            tree,
            states,
            cursor: Cursor::new(initial),
        });

        self.enter_scope()?;
        let result = self
            .initial_entry(event.as_ref())
            .and_then(|()| self.run_transitions(event.as_ref()));
        self.leave_scope();
        result
    }

    /// Dispatch `event` to the current state, falling back to its ancestors,
    /// then carry out any requested transition.
    ///
    /// Fails with [`MachineError::UnhandledEvent`] when no state on the
    /// current chain accepts the event; the current state is unchanged in
    /// that case.
    pub fn send_event(&mut self, event: E) -> Result<()> {
        self.enter_scope()?;
        let result = self
            .dispatch(&event)
            .and_then(|()| self.run_transitions(Some(&event)));
        self.leave_scope();
        result
    }

    /// Request a transition from outside a callback.
    ///
    /// Transitions may only be requested while the machine is processing, so
    /// from here this always fails with
    /// [`MachineError::TransitionOutsideProcessing`] unless the key is
    /// unknown. States use [`Context::transition_to`] instead.
    pub fn transition_to(&mut self, key: K) -> Result<()> {
        let Some(runtime) = self.runtime.as_mut() else {
            return Err(MachineError::TransitionOutsideProcessing {
                machine: self.name.clone(),
            });
        };
        let target = runtime
            .tree
            .slot(&key)
            .ok_or_else(|| MachineError::UnknownState {
                machine: self.name.clone(),
                state: format!("{key:?}"),
            })?;
        runtime.cursor.request(&self.name, target)
    }

    /// Queue `event` for redelivery after the next transition step.
    pub fn defer_event(&mut self, event: E) -> Result<()> {
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| not_started(&self.name))?;
        emit(self.logger.as_ref(), || {
            format!("{}: deferring {event:?}", self.name)
        });
        runtime.cursor.deferred.push(event);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn current_state(&self) -> Option<K> {
        let runtime = self.runtime.as_ref()?;
        Some(runtime.tree.key(runtime.cursor.current))
    }

    pub fn target_state(&self) -> Option<K> {
        let runtime = self.runtime.as_ref()?;
        Some(runtime.tree.key(runtime.cursor.target))
    }

    /// Nesting depth of event processing; zero whenever no call is running.
    pub fn processing_depth(&self) -> usize {
        self.runtime.as_ref().map_or(0, |runtime| runtime.cursor.depth)
    }

    pub fn pending_deferred(&self) -> usize {
        self.runtime
            .as_ref()
            .map_or(0, |runtime| runtime.cursor.deferred.len())
    }

    pub fn tree(&self) -> Option<&StateTree<K>> {
        self.runtime.as_ref().map(|runtime| &runtime.tree)
    }

    /// Active states from the root down to the current state.
    pub fn active_path(&self) -> Vec<K> {
        self.current_state()
            .and_then(|current| self.tree()?.path(&current))
            .unwrap_or_default()
    }

    /// True when `key` is the current state or one of its ancestors.
    pub fn is_in(&self, key: &K) -> bool {
        match (self.tree(), self.current_state()) {
            (Some(tree), Some(current)) => tree.is_ancestor_of(key, &current),
            _ => false,
        }
    }

    /// Display name of the state registered under `key`.
    pub fn state_name(&self, key: &K) -> Option<&str> {
        let runtime = self.runtime.as_ref()?;
        let slot = runtime.tree.slot(key)?;
        Some(runtime.states[slot].name())
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Capture the machine's observable state for diagnostics.
    pub fn snapshot(&self) -> MachineSnapshot {
        let (current, active_path, pending_deferred) = match &self.runtime {
            Some(runtime) => {
                let mut path = runtime.tree.chain(runtime.cursor.current);
                path.reverse();
                (
                    Some(runtime.name_of(runtime.cursor.current)),
                    runtime.names(&path),
                    runtime.cursor.deferred.len(),
                )
            }
            None => (None, Vec::new(), 0),
        };
        MachineSnapshot::new(
            self.name.clone(),
            current,
            active_path,
            pending_deferred,
            self.history.clone(),
        )
    }

    fn enter_scope(&mut self) -> Result<()> {
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| not_started(&self.name))?;
        if let Some(limit) = self.config.max_processing_depth {
            if runtime.cursor.depth >= limit {
                return Err(MachineError::DepthLimitExceeded {
                    machine: self.name.clone(),
                    limit,
                });
            }
        }
        runtime.cursor.depth += 1;
        Ok(())
    }

    fn leave_scope(&mut self) {
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.cursor.depth = runtime.cursor.depth.saturating_sub(1);
        }
    }

    fn record(&mut self, record: TransitionRecord) {
        if self.config.record_history {
            self.history.record(record);
        }
    }

    /// Run `call` against the state in `slot` with a fresh context.
    fn with_state<T>(
        &mut self,
        slot: usize,
        call: impl FnOnce(&mut dyn State<K, E>, &mut Context<'_, K, E>) -> Result<T>,
    ) -> Result<T> {
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| not_started(&self.name))?;
        let Runtime {
            tree,
            states,
            cursor,
        } = runtime;
        let mut ctx = Context::new(&self.name, self.logger.as_ref(), tree, cursor);
        call(states[slot].as_mut(), &mut ctx)
    }

    fn initial_entry(&mut self, reason: Option<&E>) -> Result<()> {
        let (path, entered) = {
            let runtime = self.runtime.as_ref().ok_or_else(|| not_started(&self.name))?;
            let mut path = runtime.tree.chain(runtime.cursor.current);
            path.reverse();
            let entered = runtime.names(&path);
            (path, entered)
        };

        emit(self.logger.as_ref(), || {
            format!("{}: starting, enter [{}]", self.name, entered.join(", "))
        });
        self.record(TransitionRecord {
            from: None,
            to: entered.last().cloned().unwrap_or_default(),
            exited: Vec::new(),
            entered,
            timestamp: Utc::now(),
        });

        for slot in path {
            self.with_state(slot, |state, ctx| state.enter(ctx, reason))?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &E) -> Result<()> {
        let chain = {
            let runtime = self.runtime.as_ref().ok_or_else(|| not_started(&self.name))?;
            runtime.tree.chain(runtime.cursor.current)
        };

        emit(self.logger.as_ref(), || {
            let names = self
                .runtime
                .as_ref()
                .map(|runtime| runtime.names(&chain))
                .unwrap_or_default();
            format!("{}: dispatch {event:?} to [{}]", self.name, names.join(", "))
        });

        for slot in chain {
            if self.with_state(slot, |state, ctx| state.handle_event(ctx, event))? {
                emit(self.logger.as_ref(), || {
                    let name = self
                        .runtime
                        .as_ref()
                        .map(|runtime| runtime.name_of(slot))
                        .unwrap_or_default();
                    format!("{}: {event:?} handled by {name}", self.name)
                });
                return Ok(());
            }
        }

        Err(MachineError::UnhandledEvent {
            machine: self.name.clone(),
            event: format!("{event:?}"),
        })
    }

    /// Pending (current, target) slots, if a transition has been requested.
    fn pending_transition(&self) -> Result<Option<(usize, usize)>> {
        let runtime = self.runtime.as_ref().ok_or_else(|| not_started(&self.name))?;
        let Cursor {
            current, target, ..
        } = runtime.cursor;
        Ok((current != target).then_some((current, target)))
    }

    /// Compute and record one step, moving the cursor onto the target before
    /// any callback runs.
    fn begin_step(&mut self, current: usize, target: usize) -> Result<TransitionPlan<usize>> {
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| not_started(&self.name))?;
        let plan = runtime.tree.plan_slots(current, target);
        let record = TransitionRecord {
            from: Some(runtime.name_of(current)),
            to: runtime.name_of(target),
            exited: runtime.names(&plan.exit),
            entered: runtime.names(&plan.enter),
            timestamp: Utc::now(),
        };
        runtime.cursor.current = target;

        emit(self.logger.as_ref(), || {
            format!(
                "{}: transition {} -> {}, exit [{}], enter [{}]",
                self.name,
                record.from.as_deref().unwrap_or_default(),
                record.to,
                record.exited.join(", "),
                record.entered.join(", ")
            )
        });
        self.record(record);
        Ok(plan)
    }

    fn run_transitions(&mut self, reason: Option<&E>) -> Result<()> {
        let mut steps = 0;
        while let Some((current, target)) = self.pending_transition()? {
            if let Some(limit) = self.config.max_transition_steps {
                if steps >= limit {
                    return Err(MachineError::TransitionLimitExceeded {
                        machine: self.name.clone(),
                        limit,
                    });
                }
            }
            steps += 1;

            let plan = self.begin_step(current, target)?;
            for slot in plan.exit {
                self.with_state(slot, |state, ctx| state.exit(ctx, reason))?;
            }
            for slot in plan.enter {
                self.with_state(slot, |state, ctx| state.enter(ctx, reason))?;
            }
            self.replay_deferred()?;
        }
        Ok(())
    }

    fn replay_deferred(&mut self) -> Result<()> {
        let pending = match self.runtime.as_mut() {
            Some(runtime) => std::mem::take(&mut runtime.cursor.deferred),
            None => return Err(not_started(&self.name)),
        };
        if pending.is_empty() {
            return Ok(());
        }

        emit(self.logger.as_ref(), || {
            format!("{}: replaying {} deferred event(s)", self.name, pending.len())
        });
        for event in pending {
            self.send_event(event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Key {
        Root,
        Left,
        Right,
    }

    #[derive(Debug)]
    enum Ev {
        Go(Key),
        Ping,
        Bounce,
        Later,
    }

    /// Accepts `Go` by transitioning and `Ping` only at the root.
    struct Node {
        label: &'static str,
        is_root: bool,
    }

    impl State<Key, Ev> for Node {
        fn name(&self) -> &str {
            self.label
        }

        fn handle_event(&mut self, ctx: &mut Context<'_, Key, Ev>, event: &Ev) -> Result<bool> {
            match event {
                Ev::Go(target) if !self.is_root => {
                    ctx.transition_to(*target)?;
                    Ok(true)
                }
                Ev::Ping => Ok(self.is_root),
                Ev::Later if !self.is_root => {
                    ctx.defer_event(Ev::Ping);
                    ctx.transition_to(Key::Right)?;
                    Ok(true)
                }
                Ev::Bounce => {
                    // Always bounce to the other leaf.
                    let next = if ctx.current_state() == Key::Left {
                        Key::Right
                    } else {
                        Key::Left
                    };
                    ctx.transition_to(next)?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        fn enter(&mut self, ctx: &mut Context<'_, Key, Ev>, reason: Option<&Ev>) -> Result<()> {
            if matches!(reason, Some(Ev::Bounce)) && !self.is_root {
                let next = if ctx.current_state() == Key::Left {
                    Key::Right
                } else {
                    Key::Left
                };
                ctx.transition_to(next)?;
            }
            Ok(())
        }
    }

    fn node(label: &'static str) -> Node {
        Node {
            label,
            is_root: false,
        }
    }

    fn started(config: MachineConfig) -> Machine<Key, Ev> {
        let mut machine = Machine::with_config("test", config).with_logger(crate::NoopLogger);
        machine
            .start(None, |tree| {
                tree.add_state(
                    Key::Root,
                    Node {
                        label: "Root",
                        is_root: true,
                    },
                )
                .add(Key::Left, node("Left"), Some(Key::Root), true)
                .add_child(Key::Right, node("Right"), Key::Root);
            })
            .unwrap();
        machine
    }

    #[test]
    fn start_enters_initial_chain() {
        let machine = started(MachineConfig::default());
        assert_eq!(machine.current_state(), Some(Key::Left));
        assert_eq!(machine.target_state(), Some(Key::Left));
        assert_eq!(machine.active_path(), vec![Key::Root, Key::Left]);
        assert_eq!(machine.processing_depth(), 0);
        assert!(machine.is_in(&Key::Root));
        assert!(!machine.is_in(&Key::Right));
    }

    #[test]
    fn send_before_start_fails() {
        let mut machine: Machine<Key, Ev> = Machine::new("idle").with_logger(crate::NoopLogger);
        let error = machine.send_event(Ev::Ping).unwrap_err();
        assert_eq!(
            error,
            MachineError::NotStarted {
                machine: "idle".to_string()
            }
        );
        assert_eq!(machine.current_state(), None);
        assert!(machine.active_path().is_empty());
    }

    #[test]
    fn start_twice_fails() {
        let mut machine = started(MachineConfig::default());
        let error = machine
            .start(None, |tree| {
                tree.add(Key::Root, node("Root"), None, true);
            })
            .unwrap_err();
        assert!(matches!(error, MachineError::AlreadyStarted { .. }));
        assert_eq!(machine.tree().map(StateTree::len), Some(3));
    }

    #[test]
    fn transition_outside_processing_fails() {
        let mut machine = started(MachineConfig::default());
        let error = machine.transition_to(Key::Right).unwrap_err();
        assert!(matches!(
            error,
            MachineError::TransitionOutsideProcessing { .. }
        ));
        assert_eq!(machine.target_state(), Some(Key::Left));
    }

    #[test]
    fn transition_limit_stops_runaway_loops() {
        let mut machine = started(MachineConfig::builder().max_transition_steps(5).build());
        let error = machine.send_event(Ev::Bounce).unwrap_err();
        assert_eq!(
            error,
            MachineError::TransitionLimitExceeded {
                machine: "test".to_string(),
                limit: 5,
            }
        );
        assert_eq!(machine.processing_depth(), 0);
    }

    #[test]
    fn depth_limit_rejects_nested_processing() {
        let mut machine = started(MachineConfig::builder().max_processing_depth(1).build());
        machine.send_event(Ev::Ping).unwrap();

        // Replaying the deferred ping would nest a second dispatch.
        let error = machine.send_event(Ev::Later).unwrap_err();
        assert!(matches!(error, MachineError::DepthLimitExceeded { limit: 1, .. }));
        assert_eq!(machine.current_state(), Some(Key::Right));
        assert_eq!(machine.processing_depth(), 0);
    }

    #[test]
    fn deferred_event_is_replayed_after_transition() {
        let mut machine = started(MachineConfig::default());
        machine.send_event(Ev::Later).unwrap();
        assert_eq!(machine.current_state(), Some(Key::Right));
        assert_eq!(machine.pending_deferred(), 0);
    }

    #[test]
    fn defer_before_start_fails() {
        let mut machine: Machine<Key, Ev> = Machine::new("idle").with_logger(crate::NoopLogger);
        assert!(matches!(
            machine.defer_event(Ev::Ping),
            Err(MachineError::NotStarted { .. })
        ));
    }

    #[test]
    fn history_records_each_step() {
        let mut machine = started(MachineConfig::default());
        machine.send_event(Ev::Go(Key::Right)).unwrap();

        let history = machine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.path(), vec!["Left", "Right"]);
        let last = history.last().unwrap();
        assert_eq!(last.exited, vec!["Left".to_string()]);
        assert_eq!(last.entered, vec!["Right".to_string()]);
        assert!(history.transitions()[0].is_initial());
        assert_eq!(
            history.transitions()[0].entered,
            vec!["Root".to_string(), "Left".to_string()]
        );
    }

    #[test]
    fn history_can_be_disabled() {
        let mut machine = started(MachineConfig::builder().record_history(false).build());
        machine.send_event(Ev::Go(Key::Right)).unwrap();
        assert!(machine.history().is_empty());
    }

    #[test]
    fn logger_receives_dispatch_and_transition_lines() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&lines);
        let mut machine: Machine<Key, Ev> = Machine::new("logged")
            .with_logger(move |message: &str| sink.borrow_mut().push(message.to_string()));
        machine
            .start(None, |tree| {
                tree.add(Key::Root, node("Root"), None, true)
                    .add(Key::Left, node("Left"), Some(Key::Root), true);
            })
            .unwrap();
        machine.send_event(Ev::Go(Key::Root)).unwrap();

        let lines = lines.borrow();
        assert_eq!(
            lines[0],
            "logged: initial state Root replaced by a later designation"
        );
        assert_eq!(lines[1], "logged: starting, enter [Root, Left]");
        assert!(lines.contains(&"logged: dispatch Go(Root) to [Left, Root]".to_string()));
        assert!(lines.contains(&"logged: Go(Root) handled by Left".to_string()));
        assert!(lines.contains(&"logged: transition Left -> Root, exit [Left], enter []".to_string()));
    }

    #[test]
    fn state_names_are_resolved_by_key() {
        let machine = started(MachineConfig::default());
        assert_eq!(machine.state_name(&Key::Right), Some("Right"));
    }
}
