//! PageRank propagation engine
//!
//! Each iteration computes `next = Gᵗ · current` as a map/reduce:
//! the node set is split into shards by `id mod W`, every shard emits its own
//! partial contribution map on the rayon pool, and a single reduce step sums
//! the partials by destination. The transition matrix is shared read-only.

use super::common::{Links, NodeId, RankVector};
use super::error::{RankError, RankResult};
use super::transition::{check_damping_factor, damped_matrix, TransitionMatrix, ROW_SUM_TOLERANCE};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Distance used to compare successive rank vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DistanceMetric {
    /// Sum of absolute differences
    #[default]
    L1,
    /// Euclidean distance
    L2,
}

impl std::str::FromStr for DistanceMetric {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l1" => Ok(DistanceMetric::L1),
            "l2" => Ok(DistanceMetric::L2),
            other => Err(RankError::InvalidParameter(format!(
                "unknown distance metric {:?}, expected l1 or l2",
                other
            ))),
        }
    }
}

impl DistanceMetric {
    pub fn distance(&self, a: &RankVector, b: &RankVector) -> f64 {
        match self {
            DistanceMetric::L1 => a.l1_distance(b),
            DistanceMetric::L2 => a.l2_distance(b),
        }
    }
}

/// PageRank configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRankConfig {
    /// Damping factor (usually 0.85)
    pub damping_factor: f64,
    /// Upper bound on iterations
    pub max_iterations: usize,
    /// Stop once successive vectors are closer than this. `None` runs all iterations.
    pub tolerance: Option<f64>,
    /// Distance used for the tolerance check
    pub distance: DistanceMetric,
    /// Number of shards the node set is split into per iteration
    pub shards: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 50,
            tolerance: Some(1e-6),
            distance: DistanceMetric::L1,
            shards: 4,
        }
    }
}

impl PageRankConfig {
    pub fn with_damping_factor(mut self, damping_factor: f64) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Reject out-of-range parameters before any computation starts
    pub fn validate(&self) -> RankResult<()> {
        check_damping_factor(self.damping_factor)?;
        if self.max_iterations == 0 {
            return Err(RankError::InvalidParameter(
                "max_iterations must be at least 1".into(),
            ));
        }
        if let Some(tolerance) = self.tolerance {
            if tolerance.is_nan() || tolerance < 0.0 {
                return Err(RankError::InvalidParameter(format!(
                    "tolerance must be non-negative, got {}",
                    tolerance
                )));
            }
        }
        if self.shards == 0 {
            return Err(RankError::InvalidParameter("shards must be at least 1".into()));
        }
        Ok(())
    }
}

/// Rank contributed by one shard, keyed by destination
pub type PartialContribution = FxHashMap<NodeId, f64>;

/// Split the current ranks into `shards` disjoint groups by `id mod shards`
pub fn partition(ranks: &RankVector, shards: usize) -> Vec<RankVector> {
    ranks.split_by_node_ids(shards)
}

/// Map phase: distribute each source's rank along its matrix row.
///
/// A source without a row in `matrix` is a broken upstream invariant.
pub fn divide_rank(shard: &RankVector, matrix: &TransitionMatrix) -> RankResult<PartialContribution> {
    let index = matrix.index();
    let mut contributions = PartialContribution::default();

    for (source, rank) in shard.iter() {
        let row = matrix.row(source).ok_or_else(|| {
            RankError::InvalidGraph(format!("transition matrix has no row for node {}", source))
        })?;
        for (&target, &p) in index.node_ids().iter().zip(row.iter()) {
            *contributions.entry(target).or_insert(0.0) += p * rank;
        }
    }

    Ok(contributions)
}

/// Reduce phase: sum partial contributions by destination.
///
/// The result has exactly the keys of `template`; partials are folded in
/// shard order so the sum is reproducible for a given shard count.
pub fn merge_contributions(template: &RankVector, partials: &[PartialContribution]) -> RankResult<RankVector> {
    let mut merged = template.zeroed().into_map();

    for partial in partials {
        for (&target, &contribution) in partial {
            let slot = merged.get_mut(&target).ok_or_else(|| {
                RankError::InvalidGraph(format!("contribution to unknown node {}", target))
            })?;
            *slot += contribution;
        }
    }

    Ok(RankVector::from(merged))
}

/// One propagation step over `shards` parallel workers
pub fn propagate(current: &RankVector, matrix: &TransitionMatrix, shards: usize) -> RankResult<RankVector> {
    let partials: Vec<PartialContribution> = partition(current, shards)
        .into_par_iter()
        .map(|shard| divide_rank(&shard, matrix))
        .collect::<RankResult<_>>()?;

    tracing::trace!(
        shards = partials.len(),
        sizes = ?partials.iter().map(|p| p.len()).collect::<Vec<_>>(),
        "map phase complete"
    );

    merge_contributions(current, &partials)
}

/// Where the engine is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Iterating,
    /// Successive vectors came within the tolerance
    Converged,
    /// Iteration bound reached first
    Stopped,
}

/// Rank vector after one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct RankSnapshot {
    /// 1-based iteration number
    pub iteration: usize,
    pub ranks: RankVector,
    /// Distance from the previous vector under the configured metric
    pub delta: f64,
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankOutcome {
    pub ranks: RankVector,
    /// Number of iterations performed
    pub iterations: usize,
    /// Final convergence delta
    pub delta: f64,
    pub state: EngineState,
}

impl PageRankOutcome {
    pub fn converged(&self) -> bool {
        self.state == EngineState::Converged
    }

    pub fn top_n(&self, n: usize) -> Vec<(NodeId, f64)> {
        self.ranks.top_n(n)
    }
}

/// Owns the derived matrix and configuration for one graph.
///
/// The matrix is built once and reused by every run and every iteration.
pub struct PageRankEngine {
    matrix: Arc<TransitionMatrix>,
    initial: RankVector,
    config: PageRankConfig,
}

impl PageRankEngine {
    pub fn new(links: &Links, config: PageRankConfig) -> RankResult<Self> {
        config.validate()?;

        let nodes = links.to_nodes();
        let matrix = damped_matrix(links, &nodes, config.damping_factor)?;

        Self::with_matrix(Arc::new(matrix), config)
    }

    /// Use an existing matrix. It is validated before use.
    pub fn with_matrix(matrix: Arc<TransitionMatrix>, config: PageRankConfig) -> RankResult<Self> {
        config.validate()?;
        matrix.validate(ROW_SUM_TOLERANCE)?;

        let initial = RankVector::uniform(matrix.index().node_ids().iter().copied(), 1.0);
        Ok(Self {
            matrix,
            initial,
            config,
        })
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    pub fn config(&self) -> &PageRankConfig {
        &self.config
    }

    pub fn initial_ranks(&self) -> &RankVector {
        &self.initial
    }

    /// Lazy sequence of per-iteration snapshots, starting from the initial ranks.
    ///
    /// Each call starts a fresh run. Dropping the iterator cancels the run.
    pub fn iterations(&self) -> RankIterations<'_> {
        RankIterations {
            engine: self,
            current: self.initial.clone(),
            iteration: 0,
            state: EngineState::Iterating,
        }
    }

    /// Iterate until convergence or the iteration bound
    pub fn run(&self) -> RankResult<PageRankOutcome> {
        let mut iterations = self.iterations();
        let mut last: Option<RankSnapshot> = None;

        for snapshot in iterations.by_ref() {
            last = Some(snapshot?);
        }

        let state = iterations.state();
        let (ranks, iteration, delta) = match last {
            Some(snapshot) => (snapshot.ranks, snapshot.iteration, snapshot.delta),
            None => (self.initial.clone(), 0, 0.0),
        };

        if state == EngineState::Stopped && self.config.tolerance.is_some() {
            tracing::warn!(
                iterations = iteration,
                delta,
                "iteration bound reached before convergence"
            );
        }

        Ok(PageRankOutcome {
            ranks,
            iterations: iteration,
            delta,
            state,
        })
    }
}

/// Iterator over the propagation steps of a `PageRankEngine`
pub struct RankIterations<'a> {
    engine: &'a PageRankEngine,
    current: RankVector,
    iteration: usize,
    state: EngineState,
}

impl RankIterations<'_> {
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Ranks after the most recent iteration (the initial ranks before the first)
    pub fn current(&self) -> &RankVector {
        &self.current
    }
}

impl Iterator for RankIterations<'_> {
    type Item = RankResult<RankSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != EngineState::Iterating {
            return None;
        }

        let config = &self.engine.config;
        let next = match propagate(&self.current, &self.engine.matrix, config.shards) {
            Ok(next) => next,
            Err(e) => {
                self.state = EngineState::Stopped;
                return Some(Err(e));
            }
        };

        self.iteration += 1;
        let delta = config.distance.distance(&self.current, &next);
        tracing::debug!(
            iteration = self.iteration,
            delta,
            mass = next.total(),
            "propagation step"
        );

        if config.tolerance.map_or(false, |tolerance| delta < tolerance) {
            self.state = EngineState::Converged;
            tracing::info!(iterations = self.iteration, delta, "rank converged");
        } else if self.iteration >= config.max_iterations {
            self.state = EngineState::Stopped;
            tracing::info!(iterations = self.iteration, delta, "iteration bound reached");
        }

        self.current = next.clone();
        Some(Ok(RankSnapshot {
            iteration: self.iteration,
            ranks: next,
            delta,
        }))
    }
}

/// Calculate PageRank for `links`
pub fn page_rank(links: &Links, config: PageRankConfig) -> RankResult<PageRankOutcome> {
    PageRankEngine::new(links, config)?.run()
}
