//! Diagnostic snapshots of a running machine.
//!
//! A snapshot captures what an operator wants to see when auditing a machine:
//! where it is, what it is waiting to replay, and how it got there. States are
//! behavior objects, so snapshots are inspection records and are never used to
//! rebuild a machine.

use crate::core::StateHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable view of a machine at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Diagnostic name of the machine
    pub machine: String,

    /// Name of the current state; `None` before `start`
    pub current: Option<String>,

    /// Active state names from the root down to the current state
    pub active_path: Vec<String>,

    /// Number of events waiting to be replayed
    pub pending_deferred: usize,

    /// Transition history at the time of the snapshot
    pub history: StateHistory,
}

impl MachineSnapshot {
    pub(crate) fn new(
        machine: String,
        current: Option<String>,
        active_path: Vec<String>,
        pending_deferred: usize,
        history: StateHistory,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            machine,
            current,
            active_path,
            pending_deferred,
            history,
        }
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Decode from JSON, rejecting unsupported versions.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    /// Encode in the compact bincode format.
    pub fn to_binary(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Decode from bincode, rejecting unsupported versions.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransitionRecord;

    fn sample() -> MachineSnapshot {
        let mut history = StateHistory::new();
        history.record(TransitionRecord {
            from: None,
            to: "Idle".to_string(),
            exited: Vec::new(),
            entered: vec!["Root".to_string(), "Idle".to_string()],
            timestamp: Utc::now(),
        });
        MachineSnapshot::new(
            "device".to_string(),
            Some("Idle".to_string()),
            vec!["Root".to_string(), "Idle".to_string()],
            2,
            history,
        )
    }

    #[test]
    fn json_encoding_preserves_snapshot() {
        let snapshot = sample();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"machine\": \"device\""));

        let restored = MachineSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn binary_encoding_preserves_snapshot() {
        let snapshot = sample();
        let bytes = snapshot.to_binary().unwrap();
        let restored = MachineSnapshot::from_binary(&bytes).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut snapshot = sample();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let json = serde_json::to_string(&snapshot).unwrap();

        let error = MachineSnapshot::from_json(&json).unwrap_err();
        assert!(matches!(
            error,
            SnapshotError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn garbage_input_fails_to_decode() {
        assert!(matches!(
            MachineSnapshot::from_json("not json"),
            Err(SnapshotError::DeserializationFailed(_))
        ));
        assert!(matches!(
            MachineSnapshot::from_binary(&[1, 2, 3]),
            Err(SnapshotError::DeserializationFailed(_))
        ));
    }

    #[test]
    fn snapshots_get_distinct_ids() {
        assert_ne!(sample().id, sample().id);
    }
}
