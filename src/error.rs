//! Error types for the rankflow integration layer

use rankflow_algorithms::RankError;
use thiserror::Error;

/// Errors that can occur when loading input or configuration and running a ranking
#[derive(Error, Debug)]
pub enum RankflowError {
    /// Matrix construction or propagation failed
    #[error("Rank error: {0}")]
    Rank(#[from] RankError),

    /// A configuration value could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type RankflowResult<T> = Result<T, RankflowError>;
