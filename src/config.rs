//! History configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`History`](crate::History).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Queue depth for shadow subscriptions created on behalf of Subscribers.
    /// Only the newest message matters to the history, so this stays small.
    /// Default: 1
    pub default_queue_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_queue_size: 1,
        }
    }
}

impl HistoryConfig {
    /// Parse from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::HistoryError::Deserialization(e.to_string()))
    }
}
