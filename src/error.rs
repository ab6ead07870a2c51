//! Error types for the sampling engine.

use std::path::PathBuf;

/// Errors reported by the engine and its collaborators.
///
/// Configuration problems are surfaced before any output is produced;
/// I/O faults terminate the run after reader and writer handles are
/// released.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Input file not found: {}", path.display())]
    InputMissing { path: PathBuf },

    #[error("Could not determine format for {} (specify --format explicitly)", path.display())]
    UnknownFormat { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Shorthand for an `InvalidConfig` with a formatted message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
