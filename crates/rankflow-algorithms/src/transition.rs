//! Transition matrix construction
//!
//! Two stages:
//! 1. raw transition probabilities from the out-edges (`probability_matrix`)
//! 2. Meyer's random surfer damping on top of them (`damped_matrix`)
//!
//! The result is a dense, row-stochastic matrix that is built once per graph
//! and shared read-only by every propagation step.

use super::common::{Links, NodeId, NodeIndex, Nodes};
use super::error::{RankError, RankResult};
use ndarray::{Array2, ArrayView1, Axis};

/// Row sums must be within this distance of 1.0
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Dense `n x n` transition probabilities, addressed by NodeId.
///
/// Row = source node, column = destination node.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    index: NodeIndex,
    probabilities: Array2<f64>,
}

impl TransitionMatrix {
    /// Assemble a matrix from an index and a square probability array.
    ///
    /// Only the shape is checked here; call `validate` for the row sums.
    pub fn from_parts(index: NodeIndex, probabilities: Array2<f64>) -> RankResult<Self> {
        let n = index.len();
        if probabilities.dim() != (n, n) {
            return Err(RankError::InvalidGraph(format!(
                "matrix shape {:?} does not match {} indexed nodes",
                probabilities.dim(),
                n
            )));
        }
        Ok(Self {
            index,
            probabilities,
        })
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.probabilities
    }

    /// Probability of moving from `source` to `target`
    pub fn get(&self, source: NodeId, target: NodeId) -> Option<f64> {
        let row = self.index.index_of(source)?;
        let col = self.index.index_of(target)?;
        Some(self.probabilities[[row, col]])
    }

    /// Full outgoing distribution of `source`, in `index()` order
    pub fn row(&self, source: NodeId) -> Option<ArrayView1<'_, f64>> {
        let row = self.index.index_of(source)?;
        Some(self.probabilities.row(row))
    }

    pub fn row_sum(&self, source: NodeId) -> Option<f64> {
        self.row(source).map(|row| row.sum())
    }

    /// Check the row-stochastic invariant: every entry is a probability in
    /// `[0, 1]` and every row sums to 1, both within `tolerance`.
    pub fn validate(&self, tolerance: f64) -> RankResult<()> {
        if self.index.is_empty() {
            return Err(RankError::InvalidGraph("transition matrix has no rows".into()));
        }
        for (idx, row) in self.probabilities.axis_iter(Axis(0)).enumerate() {
            let node = self.index.node_at(idx).unwrap_or_default();
            for (col, &p) in row.iter().enumerate() {
                if !p.is_finite() || p < -tolerance || p > 1.0 + tolerance {
                    let target = self.index.node_at(col).unwrap_or_default();
                    return Err(RankError::InvalidGraph(format!(
                        "entry ({}, {}) is {}, expected a probability in [0, 1]",
                        node, target, p
                    )));
                }
            }
            let sum = row.sum();
            if (sum - 1.0).abs() > tolerance {
                return Err(RankError::InvalidGraph(format!(
                    "row for node {} sums to {}, expected 1.0",
                    node, sum
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_damping_factor(damping: f64) -> RankResult<()> {
    if (0.0..=1.0).contains(&damping) {
        Ok(())
    } else {
        Err(RankError::InvalidParameter(format!(
            "damping factor must be within [0, 1], got {}",
            damping
        )))
    }
}

fn unknown_node(id: NodeId) -> RankError {
    RankError::InvalidGraph(format!("link references node {} which is not in the node set", id))
}

/// Stage 1: raw transition probabilities S.
///
/// A destination appearing `k` times in a list of `N` out-edges gets `k / N`.
/// Dangling nodes keep an all-zero row; stage 2 resolves them.
///
/// |  |1  |2  |3  |4  |
/// |:-|--:|--:|--:|--:|
/// |1 |  0|1/2|1/2|  0|
/// |2 |  0|  0|  1|  0|
/// |3 |1/2|  0|  0|1/2|
/// |4 |  0|  0|  0|  0|
pub fn probability_matrix(links: &Links, nodes: &Nodes) -> RankResult<TransitionMatrix> {
    let index = NodeIndex::from_nodes(nodes);
    if index.is_empty() {
        return Err(RankError::InvalidGraph("node set is empty".into()));
    }

    let n = index.len();
    let mut probabilities = Array2::<f64>::zeros((n, n));

    for (source, targets) in links.iter() {
        if targets.is_empty() {
            continue;
        }
        let row = index.index_of(source).ok_or_else(|| unknown_node(source))?;

        // Count occurrences, then divide by the out-degree
        for &target in targets {
            let col = index.index_of(target).ok_or_else(|| unknown_node(target))?;
            probabilities[[row, col]] += 1.0;
        }
        let out_degree = targets.len() as f64;
        probabilities
            .row_mut(row)
            .mapv_inplace(|count| count / out_degree);
    }

    TransitionMatrix::from_parts(index, probabilities)
}

/// Stage 2: damped transition probabilities G.
///
/// - node with links: `G[i][j] = d * S[i][j] + (1 - d) / n`
/// - dangling node:   `G[i][j] = 1 / n`
pub fn damped_matrix(links: &Links, nodes: &Nodes, damping: f64) -> RankResult<TransitionMatrix> {
    check_damping_factor(damping)?;

    let TransitionMatrix {
        index,
        mut probabilities,
    } = probability_matrix(links, nodes)?;

    let n = index.len() as f64;
    let teleport = 1.0 / n;

    for (idx, mut row) in probabilities.axis_iter_mut(Axis(0)).enumerate() {
        let dangling = index
            .node_at(idx)
            .map_or(true, |id| links.is_dangling_node(id));
        if dangling {
            row.fill(teleport);
        } else {
            row.mapv_inplace(|s| damping * s + (1.0 - damping) * teleport);
        }
    }

    tracing::debug!(nodes = index.len(), damping, "built transition matrix");
    TransitionMatrix::from_parts(index, probabilities)
}

/// Derive the node set from `links` and build the damped matrix
pub fn build_transition_matrix(links: &Links, damping: f64) -> RankResult<TransitionMatrix> {
    check_damping_factor(damping)?;
    let nodes = links.to_nodes();
    damped_matrix(links, &nodes, damping)
}
