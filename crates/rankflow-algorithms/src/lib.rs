pub mod common;
pub mod error;
pub mod generate;
pub mod pagerank;
pub mod transition;

pub use common::{build_nodes, is_dangling_node, Links, NodeId, NodeIndex, Nodes, RankVector};
pub use error::{RankError, RankResult};
pub use generate::LinkGenerator;
pub use pagerank::{
    divide_rank, merge_contributions, page_rank, partition, propagate, DistanceMetric,
    EngineState, PageRankConfig, PageRankEngine, PageRankOutcome, PartialContribution,
    RankIterations, RankSnapshot,
};
pub use transition::{
    build_transition_matrix, damped_matrix, probability_matrix, TransitionMatrix,
    ROW_SUM_TOLERANCE,
};
