//! Transition history tracking.
//!
//! Every completed transition step is stored as a [`TransitionRecord`] that
//! carries state names rather than keys, so a history can be serialized no
//! matter which key type the machine uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of one executed transition step.
///
/// `from` is `None` for the initial entry performed by `start`.
///
/// # Example
///
/// ```rust
/// use statetree::TransitionRecord;
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: Some("Idle".to_string()),
///     to: "Running".to_string(),
///     exited: vec!["Idle".to_string()],
///     entered: vec!["Running".to_string()],
///     timestamp: Utc::now(),
/// };
/// assert!(!record.is_initial());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the state that was current before the step
    pub from: Option<String>,
    /// Name of the state that became current
    pub to: String,
    /// States exited, deepest first
    pub exited: Vec<String>,
    /// States entered, shallowest first
    pub entered: Vec<String>,
    /// When the step started
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn is_initial(&self) -> bool {
        self.from.is_none()
    }
}

/// Ordered history of transition steps, oldest first.
///
/// An optional limit keeps only the most recent records.
///
/// # Example
///
/// ```rust
/// use statetree::{StateHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_limit(Some(1));
/// for (from, to) in [(None, "A"), (Some("A"), "B")] {
///     history.record(TransitionRecord {
///         from: from.map(str::to_string),
///         to: to.to_string(),
///         exited: Vec::new(),
///         entered: vec![to.to_string()],
///         timestamp: Utc::now(),
///     });
/// }
///
/// assert_eq!(history.len(), 1);
/// assert_eq!(history.path(), vec!["A", "B"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    records: Vec<TransitionRecord>,
    limit: Option<usize>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that keeps at most `limit` records.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            records: Vec::new(),
            limit,
        }
    }

    /// Append a record, discarding the oldest ones beyond the limit.
    pub fn record(&mut self, record: TransitionRecord) {
        self.records.push(record);
        if let Some(limit) = self.limit {
            if self.records.len() > limit {
                let excess = self.records.len() - limit;
                self.records.drain(..excess);
            }
        }
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names of the states the machine settled in, in order.
    ///
    /// Starts with the `from` of the oldest retained record when there is one.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(from) = self.records.first().and_then(|r| r.from.as_deref()) {
            path.push(from);
        }
        for record in &self.records {
            path.push(record.to.as_str());
        }
        path
    }

    /// Time between the first and last retained record.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}
