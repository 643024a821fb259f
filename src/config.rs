//! Runtime configuration for a machine.
//!
//! Every setting defaults to the unguarded behavior: unbounded dispatch
//! nesting, unbounded transition loops, and an unbounded history.

use serde::{Deserialize, Serialize};

/// Limits and bookkeeping options applied by the engine.
///
/// # Example
///
/// ```rust
/// use statetree::MachineConfig;
///
/// let config = MachineConfig::builder()
///     .max_processing_depth(16)
///     .max_transition_steps(64)
///     .history_limit(100)
///     .build();
///
/// assert_eq!(config.max_processing_depth, Some(16));
/// assert!(config.record_history);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Maximum nesting of event processing, including deferred replay
    pub max_processing_depth: Option<usize>,
    /// Maximum transition steps executed for one triggering event
    pub max_transition_steps: Option<usize>,
    /// Whether transition steps are recorded in the history
    pub record_history: bool,
    /// Maximum number of history records kept
    pub history_limit: Option<usize>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_processing_depth: None,
            max_transition_steps: None,
            record_history: true,
            history_limit: None,
        }
    }
}

impl MachineConfig {
    pub fn builder() -> MachineConfigBuilder {
        MachineConfigBuilder::new()
    }
}

/// Fluent builder for [`MachineConfig`].
#[derive(Clone, Debug, Default)]
pub struct MachineConfigBuilder {
    config: MachineConfig,
}

impl MachineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound nested event processing
    pub fn max_processing_depth(mut self, depth: usize) -> Self {
        self.config.max_processing_depth = Some(depth);
        self
    }

    /// Bound transition steps per triggering event
    pub fn max_transition_steps(mut self, steps: usize) -> Self {
        self.config.max_transition_steps = Some(steps);
        self
    }

    /// Enable or disable history recording
    pub fn record_history(mut self, enabled: bool) -> Self {
        self.config.record_history = enabled;
        self
    }

    /// Keep only the most recent `limit` history records
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = Some(limit);
        self
    }

    pub fn build(self) -> MachineConfig {
        self.config
    }
}
