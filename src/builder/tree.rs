//! Builder used inside `Machine::start` to register states.

use crate::builder::error::{ConfigError, ConfigErrors};
use crate::core::{State, StateTree};
use std::fmt::Debug;
use std::hash::Hash;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigError>>;

/// Validated output of a builder pass.
pub(crate) struct Blueprint<K, E> {
    pub tree: StateTree<K>,
    pub states: Vec<Box<dyn State<K, E>>>,
    pub initial: usize,
    /// Initial designations that a later one replaced, oldest first.
    pub overridden: Vec<K>,
}

/// Registers states and their parents while the machine starts.
///
/// Problems are accumulated instead of stopping at the first one; they are
/// all reported together when `start` validates the builder.
pub struct TreeBuilder<K, E> {
    tree: StateTree<K>,
    states: Vec<Box<dyn State<K, E>>>,
    initial: Option<K>,
    overridden: Vec<K>,
    checks: Vec<Check>,
}

impl<K, E> TreeBuilder<K, E>
where
    K: Copy + Eq + Hash + Debug + 'static,
    E: 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            tree: StateTree::new(),
            states: Vec::new(),
            initial: None,
            overridden: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Register `state` under `key`.
    ///
    /// `parent` must already be registered. When `initial` is set the state
    /// becomes the initial state, even if the registration itself is
    /// rejected; a later designation replaces an earlier one.
    pub fn add(
        &mut self,
        key: K,
        state: impl State<K, E> + 'static,
        parent: Option<K>,
        initial: bool,
    ) -> &mut Self {
        if initial {
            self.set_initial(key);
        }

        if self.tree.contains(&key) {
            self.checks.push(Validation::fail(ConfigError::DuplicateState {
                state: format!("{key:?}"),
            }));
            return self;
        }

        let parent_slot = match parent {
            Some(parent) => match self.tree.slot(&parent) {
                Some(slot) => Some(slot),
                None => {
                    self.checks
                        .push(Validation::fail(ConfigError::ParentNotRegistered {
                            state: format!("{key:?}"),
                            parent: format!("{parent:?}"),
                        }));
                    return self;
                }
            },
            None => None,
        };

        self.tree.insert(key, parent_slot);
        self.states.push(Box::new(state));
        self.checks.push(Validation::success(()));
        self
    }

    /// Register a root state.
    pub fn add_state(&mut self, key: K, state: impl State<K, E> + 'static) -> &mut Self {
        self.add(key, state, None, false)
    }

    /// Register a state beneath `parent`.
    pub fn add_child(
        &mut self,
        key: K,
        state: impl State<K, E> + 'static,
        parent: K,
    ) -> &mut Self {
        self.add(key, state, Some(parent), false)
    }

    /// Register `state` and make it the initial state.
    pub fn add_initial(
        &mut self,
        key: K,
        state: impl State<K, E> + 'static,
        parent: Option<K>,
    ) -> &mut Self {
        self.add(key, state, parent, true)
    }

    /// Designate the initial state. The last designation wins.
    pub fn set_initial(&mut self, key: K) -> &mut Self {
        if let Some(previous) = self.initial.replace(key) {
            self.overridden.push(previous);
        }
        self
    }

    /// Validate every registration and freeze the tree.
    pub(crate) fn finish(self) -> Result<Blueprint<K, E>, ConfigErrors> {
        let mut checks = self.checks;

        let initial = match self.initial {
            None => {
                checks.push(Validation::fail(ConfigError::MissingInitialState));
                None
            }
            Some(key) => {
                let slot = self.tree.slot(&key);
                if slot.is_none() {
                    checks.push(Validation::fail(ConfigError::UnknownInitialState {
                        state: format!("{key:?}"),
                    }));
                }
                slot
            }
        };

        if let Validation::Failure(errors) = Validation::all_vec(checks) {
            return Err(ConfigErrors(errors.iter().cloned().collect()));
        }

        let initial = initial.ok_or_else(|| ConfigErrors(vec![ConfigError::MissingInitialState]))?;

        Ok(Blueprint {
            tree: self.tree,
            states: self.states,
            initial,
            overridden: self.overridden,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Context;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Key {
        Root,
        Child,
        Leaf,
        Stray,
    }

    struct Inert;

    impl State<Key, ()> for Inert {
        fn name(&self) -> &str {
            "Inert"
        }

        fn handle_event(&mut self, _ctx: &mut Context<'_, Key, ()>, _event: &()) -> crate::Result<bool> {
            Ok(false)
        }
    }

    fn builder() -> TreeBuilder<Key, ()> {
        TreeBuilder::new()
    }

    #[test]
    fn builds_forest_in_registration_order() {
        let mut builder = builder();
        builder
            .add_state(Key::Root, Inert)
            .add_child(Key::Child, Inert, Key::Root)
            .add(Key::Leaf, Inert, Some(Key::Child), true);

        let blueprint = builder.finish().unwrap();
        assert_eq!(blueprint.tree.len(), 3);
        assert_eq!(blueprint.states.len(), 3);
        assert_eq!(blueprint.tree.key(blueprint.initial), Key::Leaf);
        assert_eq!(
            blueprint.tree.ancestors(&Key::Leaf),
            Some(vec![Key::Leaf, Key::Child, Key::Root])
        );
    }

    #[test]
    fn missing_initial_state_is_reported() {
        let mut builder = builder();
        builder.add_state(Key::Root, Inert);

        let errors = builder.finish().err().unwrap();
        assert_eq!(errors.errors(), &[ConfigError::MissingInitialState]);
    }

    #[test]
    fn parent_must_precede_child() {
        let mut builder = builder();
        builder
            .add_child(Key::Child, Inert, Key::Root)
            .add(Key::Root, Inert, None, true);

        let errors = builder.finish().err().unwrap();
        assert_eq!(
            errors.errors(),
            &[ConfigError::ParentNotRegistered {
                state: "Child".to_string(),
                parent: "Root".to_string(),
            }]
        );
    }

    #[test]
    fn all_problems_are_accumulated() {
        let mut builder = builder();
        builder
            .add_state(Key::Root, Inert)
            .add_state(Key::Root, Inert)
            .add_child(Key::Leaf, Inert, Key::Child)
            .set_initial(Key::Stray);

        let errors = builder.finish().err().unwrap();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ConfigError::DuplicateState {
            state: "Root".to_string()
        }));
        assert!(errors.contains(&ConfigError::ParentNotRegistered {
            state: "Leaf".to_string(),
            parent: "Child".to_string(),
        }));
        assert!(errors.contains(&ConfigError::UnknownInitialState {
            state: "Stray".to_string()
        }));
    }

    #[test]
    fn last_initial_designation_wins() {
        let mut builder = builder();
        builder
            .add(Key::Root, Inert, None, true)
            .add(Key::Child, Inert, Some(Key::Root), true);

        let blueprint = builder.finish().unwrap();
        assert_eq!(blueprint.tree.key(blueprint.initial), Key::Child);
        assert_eq!(blueprint.overridden, vec![Key::Root]);
    }

    #[test]
    fn set_initial_may_precede_registration() {
        let mut builder = builder();
        builder.set_initial(Key::Root).add_state(Key::Root, Inert);

        let blueprint = builder.finish().unwrap();
        assert_eq!(blueprint.tree.key(blueprint.initial), Key::Root);
    }

    #[test]
    fn add_initial_registers_and_designates() {
        let mut builder = builder();
        builder
            .add_state(Key::Root, Inert)
            .add_initial(Key::Child, Inert, Some(Key::Root));

        let blueprint = builder.finish().unwrap();
        assert_eq!(blueprint.tree.key(blueprint.initial), Key::Child);
        assert!(blueprint.overridden.is_empty());
    }
}
