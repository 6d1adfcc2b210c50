// src/error.rs
use thiserror::Error;

use crate::env::consensus::types::Value;

#[derive(Debug, Error)]
pub enum BenOrError {
    /// Malformed or out-of-domain message field. The message is dropped.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Stale round {round} (current round {current})")]
    StaleRound { round: u64, current: u64 },

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Invalid initial value: {0} (expected 0 or 1)")]
    InvalidInitialValue(Value),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BenOrError>;
