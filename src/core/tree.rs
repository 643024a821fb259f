//! Arena-backed forest of state nodes.
//!
//! The tree only stores structure: which key lives at which arena slot and
//! which slot is its parent. Behavior objects are kept by the engine in a
//! parallel vector so that a callback can inspect the tree while its own
//! state is mutably borrowed.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Clone, Debug)]
struct Node<K> {
    key: K,
    parent: Option<usize>,
}

/// Immutable forest of registered states.
///
/// Nodes are appended in registration order and a parent must already be
/// present when a child is added, so every parent slot is strictly lower than
/// its child's slot. Walking parent links therefore always terminates at a
/// root.
///
/// # Example
///
/// ```rust
/// use statetree::{Machine, State, Context, Result};
///
/// struct Idle;
///
/// impl State<&'static str, ()> for Idle {
///     fn name(&self) -> &str {
///         "Idle"
///     }
///
///     fn handle_event(&mut self, _ctx: &mut Context<'_, &'static str, ()>, _event: &()) -> Result<bool> {
///         Ok(true)
///     }
/// }
///
/// let mut machine: Machine<&'static str, ()> = Machine::new("demo");
/// machine
///     .start(None, |tree| {
///         tree.add("root", Idle, None, false);
///         tree.add("leaf", Idle, Some("root"), true);
///     })
///     .unwrap();
///
/// let tree = machine.tree().unwrap();
/// assert_eq!(tree.ancestors(&"leaf"), Some(vec!["leaf", "root"]));
/// assert_eq!(tree.path(&"leaf"), Some(vec!["root", "leaf"]));
/// ```
#[derive(Clone, Debug)]
pub struct StateTree<K> {
    nodes: Vec<Node<K>>,
    index: HashMap<K, usize>,
}

/// Exit and enter sequences that move the machine between two nodes.
///
/// `exit` is ordered deepest first, `enter` shallowest first. States in the
/// shared ancestry appear in neither list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan<T> {
    pub exit: Vec<T>,
    pub enter: Vec<T>,
}

impl<T> TransitionPlan<T> {
    /// True when the plan touches no state (a transition to self).
    pub fn is_empty(&self) -> bool {
        self.exit.is_empty() && self.enter.is_empty()
    }

    pub(crate) fn map<U>(self, f: impl Fn(T) -> U) -> TransitionPlan<U> {
        TransitionPlan {
            exit: self.exit.into_iter().map(&f).collect(),
            enter: self.enter.into_iter().map(&f).collect(),
        }
    }
}

impl<K: Copy + Eq + Hash> StateTree<K> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a node. Callers check for duplicates and unknown parents first.
    pub(crate) fn insert(&mut self, key: K, parent: Option<usize>) -> usize {
        let slot = self.nodes.len();
        self.nodes.push(Node { key, parent });
        self.index.insert(key, slot);
        slot
    }

    pub(crate) fn slot(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub(crate) fn key(&self, slot: usize) -> K {
        self.nodes[slot].key
    }

    /// Slots from `slot` up to its root, self first.
    pub(crate) fn chain(&self, slot: usize) -> Vec<usize> {
        let mut chain = vec![slot];
        let mut cursor = self.nodes[slot].parent;
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.nodes[parent].parent;
        }
        chain
    }

    /// Compute the minimal exit/enter walk from `from` to `to`.
    pub(crate) fn plan_slots(&self, from: usize, to: usize) -> TransitionPlan<usize> {
        let from_chain = self.chain(from);
        let to_chain = self.chain(to);

        let from_set: HashSet<usize> = from_chain.iter().copied().collect();
        let to_set: HashSet<usize> = to_chain.iter().copied().collect();

        let exit = from_chain
            .into_iter()
            .filter(|slot| !to_set.contains(slot))
            .collect();
        let mut enter: Vec<usize> = to_chain
            .into_iter()
            .filter(|slot| !from_set.contains(slot))
            .collect();
        enter.reverse();

        TransitionPlan { exit, enter }
    }

    fn keys_of(&self, slots: impl IntoIterator<Item = usize>) -> Vec<K> {
        slots.into_iter().map(|slot| self.key(slot)).collect()
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// All keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.nodes.iter().map(|node| node.key)
    }

    /// Keys that have no parent.
    pub fn roots(&self) -> Vec<K> {
        self.nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| node.key)
            .collect()
    }

    pub fn parent_of(&self, key: &K) -> Option<K> {
        let slot = self.slot(key)?;
        self.nodes[slot].parent.map(|parent| self.key(parent))
    }

    /// Ancestor chain of `key`, the state itself first and its root last.
    pub fn ancestors(&self, key: &K) -> Option<Vec<K>> {
        let slot = self.slot(key)?;
        Some(self.keys_of(self.chain(slot)))
    }

    /// Ancestor chain of `key` ordered root first.
    pub fn path(&self, key: &K) -> Option<Vec<K>> {
        let mut path = self.ancestors(key)?;
        path.reverse();
        Some(path)
    }

    pub fn root_of(&self, key: &K) -> Option<K> {
        let slot = self.slot(key)?;
        self.chain(slot).last().map(|&root| self.key(root))
    }

    /// Number of ancestors above `key`; roots have depth 0.
    pub fn depth_of(&self, key: &K) -> Option<usize> {
        let slot = self.slot(key)?;
        Some(self.chain(slot).len() - 1)
    }

    /// True when `ancestor` is `descendant` itself or lies on its chain.
    pub fn is_ancestor_of(&self, ancestor: &K, descendant: &K) -> bool {
        match (self.slot(ancestor), self.slot(descendant)) {
            (Some(ancestor), Some(descendant)) => self.chain(descendant).contains(&ancestor),
            _ => false,
        }
    }

    /// Exit/enter plan between two registered keys.
    pub fn plan(&self, from: &K, to: &K) -> Option<TransitionPlan<K>> {
        let from = self.slot(from)?;
        let to = self.slot(to)?;
        Some(self.plan_slots(from, to).map(|slot| self.key(slot)))
    }
}
