//! Rankflow
//!
//! Steady-state importance scores for the nodes of a directed graph using a
//! damped random-surfer model (PageRank).
//!
//! # Architecture
//!
//! - `rankflow-algorithms`: graph model, transition matrix builder and the
//!   sharded map/reduce propagation engine
//! - this crate: configuration (YAML + environment), JSON link input and the
//!   unified error type
//! - `rankflow-cli`: the command-line front end
//!
//! ## Example Usage
//!
//! ```rust
//! use rankflow::{rank_links, Links, RankflowConfig};
//!
//! let links = Links::from_iter([(1, vec![2, 3]), (2, vec![3]), (3, vec![1])]);
//! let outcome = rank_links(&links, &RankflowConfig::default()).unwrap();
//!
//! assert!(outcome.converged());
//! assert!((outcome.ranks.total() - 3.0).abs() < 1e-9);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;

pub use config::{ConfigOverrides, RankflowConfig};
pub use error::{RankflowError, RankflowResult};
pub use io::{links_from_json, links_to_json, load_links, ranks_to_json};

// Re-export the algorithms crate
pub use rankflow_algorithms::{
    build_nodes, build_transition_matrix, is_dangling_node, page_rank, propagate,
    DistanceMetric, EngineState, LinkGenerator, Links, NodeId, PageRankConfig, PageRankEngine,
    PageRankOutcome, RankError, RankSnapshot, RankVector, TransitionMatrix,
};

/// Rank `links` with a file/env-level configuration
pub fn rank_links(links: &Links, config: &RankflowConfig) -> RankflowResult<PageRankOutcome> {
    let config = config.to_page_rank_config()?;
    Ok(page_rank(links, config)?)
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
