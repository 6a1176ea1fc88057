//! Error types for the topic history.

use thiserror::Error;

/// Main error type for history and middleware operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),

    #[error("Bus has been shut down")]
    BusClosed,

    #[error("No message received yet")]
    NoMessage,

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Schema mismatch for {datatype}: expected {expected}, got {got}")]
    SchemaMismatch {
        datatype: String,
        expected: String,
        got: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for HistoryError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        HistoryError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for HistoryError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        HistoryError::Deserialization(e.to_string())
    }
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
