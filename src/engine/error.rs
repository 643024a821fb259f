//! Errors raised while starting a machine or processing events.

use crate::builder::ConfigErrors;
use std::fmt::Display;
use thiserror::Error;

/// Errors that can occur while a machine runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),

    #[error("Machine '{machine}' has not been started")]
    NotStarted { machine: String },

    #[error("Machine '{machine}' is already started; its state tree cannot change")]
    AlreadyStarted { machine: String },

    #[error("Machine '{machine}' did not handle event {event}")]
    UnhandledEvent { machine: String, event: String },

    #[error("Machine '{machine}': transitions may only be requested while processing an event")]
    TransitionOutsideProcessing { machine: String },

    #[error("Machine '{machine}' has no state {state}")]
    UnknownState { machine: String, state: String },

    #[error("Machine '{machine}' exceeded the processing depth limit of {limit}")]
    DepthLimitExceeded { machine: String, limit: usize },

    #[error("Machine '{machine}' exceeded {limit} transition steps for one event")]
    TransitionLimitExceeded { machine: String, limit: usize },

    #[error("State '{state}' failed: {message}")]
    Callback { state: String, message: String },
}

impl MachineError {
    /// Build the error a state returns when its own logic fails.
    pub fn callback(state: impl Into<String>, message: impl Display) -> Self {
        Self::Callback {
            state: state.into(),
            message: message.to_string(),
        }
    }
}
