//! Configuration errors reported while building the state tree.

use thiserror::Error;

/// A single problem found in the registrations made during `start`.
///
/// States are identified by the `Debug` rendering of their key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("State {state} names parent {parent}, which is not registered yet. Parents must precede children")]
    ParentNotRegistered { state: String, parent: String },

    #[error("State {state} is registered more than once")]
    DuplicateState { state: String },

    #[error("Initial state {state} is not a registered state")]
    UnknownInitialState { state: String },

    #[error("No initial state defined. Mark a state as initial or call .set_initial(state)")]
    MissingInitialState,
}

/// Every configuration problem found in one builder pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid state tree: {}", join(.0))]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl ConfigErrors {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, error: &ConfigError) -> bool {
        self.0.contains(error)
    }
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_message_lists_every_error() {
        let errors = ConfigErrors(vec![
            ConfigError::DuplicateState {
                state: "Idle".to_string(),
            },
            ConfigError::MissingInitialState,
        ]);

        let message = errors.to_string();
        assert!(message.starts_with("Invalid state tree: "));
        assert!(message.contains("State Idle is registered more than once"));
        assert!(message.contains("No initial state defined"));
        assert_eq!(errors.len(), 2);
    }
}
