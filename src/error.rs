use thiserror::Error;

/// Main error type for the KOL RL agent
#[derive(Error, Debug)]
pub enum KolrlError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Checkpoint errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for KolrlError
pub type Result<T> = std::result::Result<T, KolrlError>;
