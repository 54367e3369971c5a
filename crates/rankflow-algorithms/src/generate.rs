//! Random link generation for test input and benchmarks

use super::common::{Links, NodeId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Random directed graph over nodes `0..node_count`.
///
/// Every node gets an out-degree drawn from `0..max_out_degree`; its
/// destinations are distinct nodes picked from a shuffled id list.
#[derive(Debug, Clone)]
pub struct LinkGenerator {
    pub node_count: usize,
    pub max_out_degree: usize,
    /// Fixed seed for reproducible graphs
    pub seed: Option<u64>,
}

impl LinkGenerator {
    /// Default out-degree bound is a tenth of the node count (at least 1)
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            max_out_degree: (node_count / 10).max(1),
            seed: None,
        }
    }

    pub fn with_max_out_degree(mut self, max_out_degree: usize) -> Self {
        self.max_out_degree = max_out_degree.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn generate(&self) -> Links {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.generate_with(&mut rng)
    }

    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Links {
        let mut ids: Vec<NodeId> = (0..self.node_count as NodeId).collect();
        let max_out_degree = self.max_out_degree.clamp(1, self.node_count.max(1));

        let mut edges = BTreeMap::new();
        for source in 0..self.node_count as NodeId {
            ids.shuffle(rng);
            let out_degree = rng.gen_range(0..max_out_degree);
            edges.insert(source, ids[..out_degree].to_vec());
        }
        let links = Links::new(edges);

        tracing::debug!(
            nodes = self.node_count,
            edges = links.edge_count(),
            "generated random links"
        );
        links
    }
}
