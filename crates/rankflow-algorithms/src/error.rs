//! Error types for rank computation

use thiserror::Error;

/// Errors raised while building the transition matrix or propagating rank
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankError {
    /// A caller-supplied parameter is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The graph or a derived matrix breaks a structural invariant
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
}

pub type RankResult<T> = Result<T, RankError>;
