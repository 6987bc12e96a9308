//! Error types for mam-core

use thiserror::Error;

/// Error type for attribution operations
#[derive(Debug, Error)]
pub enum AttributionError {
    /// Configuration value rejected before any computation started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A journey violates the collection invariants
    #[error("Invalid journey at index {index}: {reason}")]
    InvalidJourney { index: usize, reason: String },

    /// Operation needs inter-touch timing that the collection does not carry
    #[error("Journey collection has no inter-touch timing")]
    MissingTiming,

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AttributionError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AttributionError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for attribution operations
pub type Result<T> = std::result::Result<T, AttributionError>;
