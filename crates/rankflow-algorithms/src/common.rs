//! Graph model shared by the rank algorithms
//!
//! `Links` is the immutable out-edge structure of a directed graph.
//! `RankVector` maps every node to its rank and doubles as the node set.
//! `NodeIndex` gives the dense `0..n` numbering used by the matrix.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// Directed links: source node -> destination list.
///
/// Duplicate destinations are kept; they weigh the transition towards that
/// destination (see `transition::probability_matrix`).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Links {
    edges: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Links {
    pub fn new(edges: BTreeMap<NodeId, Vec<NodeId>>) -> Self {
        Self { edges }
    }

    /// Build links from `(source, destination)` pairs.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut map: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (source, target) in edges {
            map.entry(source).or_default().push(target);
        }
        Self { edges: map }
    }

    /// Out-edges of `id`, empty if it has no entry
    pub fn out_edges(&self, id: NodeId) -> &[NodeId] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.out_edges(id).len()
    }

    /// True iff `id` has no entry or an empty out-edge list
    pub fn is_dangling_node(&self, id: NodeId) -> bool {
        self.out_edges(id).is_empty()
    }

    /// Number of source entries (including ones with empty lists)
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of out-edges, duplicates included
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> + '_ {
        self.edges.iter().map(|(&id, targets)| (id, targets.as_slice()))
    }

    /// Derive the node set: every key and every referenced destination,
    /// each with an initial rank of 1.0.
    pub fn to_nodes(&self) -> RankVector {
        let mut ranks = BTreeMap::new();
        for (&source, targets) in &self.edges {
            ranks.insert(source, 1.0);
            for &target in targets {
                ranks.insert(target, 1.0);
            }
        }
        RankVector { ranks }
    }
}

/// One `key: K links: [...]` line per source, in ascending id order
impl fmt::Display for Links {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (source, targets) in self.iter() {
            writeln!(f, "key: {} links: {:?}", source, targets)?;
        }
        Ok(())
    }
}

impl From<BTreeMap<NodeId, Vec<NodeId>>> for Links {
    fn from(edges: BTreeMap<NodeId, Vec<NodeId>>) -> Self {
        Self::new(edges)
    }
}

impl From<HashMap<NodeId, Vec<NodeId>>> for Links {
    fn from(edges: HashMap<NodeId, Vec<NodeId>>) -> Self {
        Self::new(edges.into_iter().collect())
    }
}

impl FromIterator<(NodeId, Vec<NodeId>)> for Links {
    fn from_iter<I: IntoIterator<Item = (NodeId, Vec<NodeId>)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Derive the node set of `links` with rank 1.0 per node
pub fn build_nodes(links: &Links) -> Nodes {
    links.to_nodes()
}

/// True iff `id` has no outgoing links
pub fn is_dangling_node(links: &Links, id: NodeId) -> bool {
    links.is_dangling_node(id)
}

/// Rank per node. Ordered by NodeId so every traversal is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RankVector {
    ranks: BTreeMap<NodeId, f64>,
}

/// The node set of a graph, carrying each node's rank
pub type Nodes = RankVector;

impl RankVector {
    /// Every id in `ids` with the same rank
    pub fn uniform<I>(ids: I, value: f64) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            ranks: ids.into_iter().map(|id| (id, value)).collect(),
        }
    }

    /// Same keys, every rank reset to 0
    pub fn zeroed(&self) -> Self {
        Self::uniform(self.ranks.keys().copied(), 0.0)
    }

    pub fn get(&self, id: NodeId) -> Option<f64> {
        self.ranks.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ranks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ranks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.ranks.iter().map(|(&id, &rank)| (id, rank))
    }

    /// Sum of all ranks (the rank mass in the system)
    pub fn total(&self) -> f64 {
        self.ranks.values().sum()
    }

    /// Sum of absolute differences. Nodes missing on one side count as 0.
    pub fn l1_distance(&self, other: &RankVector) -> f64 {
        self.paired_diffs(other).map(f64::abs).sum()
    }

    /// Euclidean distance. Nodes missing on one side count as 0.
    pub fn l2_distance(&self, other: &RankVector) -> f64 {
        self.paired_diffs(other).map(|d| d * d).sum::<f64>().sqrt()
    }

    fn paired_diffs<'a>(&'a self, other: &'a RankVector) -> impl Iterator<Item = f64> + 'a {
        let ours = self
            .ranks
            .iter()
            .map(move |(id, &rank)| rank - other.ranks.get(id).copied().unwrap_or(0.0));
        let theirs_only = other
            .ranks
            .iter()
            .filter(move |(id, _)| !self.ranks.contains_key(id))
            .map(|(_, &rank)| -rank);
        ours.chain(theirs_only)
    }

    /// Partition into `shard_count` disjoint vectors by `id mod shard_count`.
    ///
    /// Always returns exactly `shard_count` shards (some may be empty).
    /// A count of 0 is treated as 1.
    pub fn split_by_node_ids(&self, shard_count: usize) -> Vec<RankVector> {
        let shard_count = shard_count.max(1);
        let mut shards = vec![RankVector::default(); shard_count];
        for (&id, &rank) in &self.ranks {
            let shard = (id % shard_count as u64) as usize;
            shards[shard].ranks.insert(id, rank);
        }
        shards
    }

    /// Highest-ranked `n` nodes, ties broken by ascending NodeId
    pub fn top_n(&self, n: usize) -> Vec<(NodeId, f64)> {
        let mut sorted: Vec<(NodeId, f64)> = self.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        sorted.truncate(n);
        sorted
    }

    pub fn as_map(&self) -> &BTreeMap<NodeId, f64> {
        &self.ranks
    }

    pub fn into_map(self) -> BTreeMap<NodeId, f64> {
        self.ranks
    }
}

impl From<BTreeMap<NodeId, f64>> for RankVector {
    fn from(ranks: BTreeMap<NodeId, f64>) -> Self {
        Self { ranks }
    }
}

impl FromIterator<(NodeId, f64)> for RankVector {
    fn from_iter<I: IntoIterator<Item = (NodeId, f64)>>(iter: I) -> Self {
        Self {
            ranks: iter.into_iter().collect(),
        }
    }
}

/// Dense `0..n` numbering of a node set, in ascending NodeId order.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeIndex {
    /// Mapping from dense index (0..N) back to NodeId
    index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    node_to_index: HashMap<NodeId, usize>,
}

impl NodeIndex {
    pub fn from_nodes(nodes: &RankVector) -> Self {
        let index_to_node: Vec<NodeId> = nodes.node_ids().collect();
        let node_to_index = index_to_node
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();
        Self {
            index_to_node,
            node_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.index_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_node.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.node_to_index.get(&id).copied()
    }

    pub fn node_at(&self, idx: usize) -> Option<NodeId> {
        self.index_to_node.get(idx).copied()
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.index_to_node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_links() -> Links {
        // 1 -> 2, 3 ; 2 -> 3 ; 3 -> 1, 4 ; 4 is only a destination
        Links::from_iter([(1, vec![2, 3]), (2, vec![3]), (3, vec![1, 4])])
    }

    #[test]
    fn test_build_nodes_covers_keys_and_destinations() {
        let nodes = build_nodes(&sample_links());

        assert_eq!(nodes.len(), 4);
        for id in 1..=4 {
            assert_eq!(nodes.get(id), Some(1.0));
        }
        assert_eq!(nodes.total(), 4.0);
    }

    #[test]
    fn test_build_nodes_empty_links() {
        let nodes = build_nodes(&Links::default());
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_dangling_detection() {
        let mut map = BTreeMap::new();
        map.insert(1, vec![2]);
        map.insert(5, vec![]);
        let links = Links::new(map);

        assert!(!is_dangling_node(&links, 1));
        // 2 has no entry at all
        assert!(is_dangling_node(&links, 2));
        // 5 has an explicit empty list
        assert!(is_dangling_node(&links, 5));
        assert!(is_dangling_node(&links, 42));
    }

    #[test]
    fn test_display_lists_links_by_source() {
        let links = Links::from_iter([(3, vec![1]), (1, vec![2, 3]), (2, vec![])]);
        assert_eq!(
            links.to_string(),
            "key: 1 links: [2, 3]\nkey: 2 links: []\nkey: 3 links: [1]\n"
        );
    }

    #[test]
    fn test_from_edges_keeps_duplicates() {
        let links = Links::from_edges([(1, 2), (1, 2), (1, 3), (2, 1)]);

        assert_eq!(links.out_edges(1), &[2, 2, 3]);
        assert_eq!(links.out_degree(1), 3);
        assert_eq!(links.edge_count(), 4);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn test_split_by_node_ids_is_a_partition() {
        let nodes = RankVector::uniform(0..10, 1.0);
        let shards = nodes.split_by_node_ids(3);

        assert_eq!(shards.len(), 3);
        assert_eq!(shards.iter().map(RankVector::len).sum::<usize>(), 10);
        for (i, shard) in shards.iter().enumerate() {
            assert!(shard.node_ids().all(|id| id % 3 == i as u64));
        }
    }

    #[test]
    fn test_split_more_shards_than_nodes() {
        let nodes = RankVector::uniform([7, 9], 1.0);
        let shards = nodes.split_by_node_ids(8);

        assert_eq!(shards.len(), 8);
        assert_eq!(shards[7].get(7), Some(1.0));
        assert_eq!(shards[1].get(9), Some(1.0));
        assert!(shards[0].is_empty());
    }

    #[test]
    fn test_distances() {
        let a: RankVector = [(1, 1.0), (2, 2.0)].into_iter().collect();
        let b: RankVector = [(1, 2.0), (3, 2.0)].into_iter().collect();

        // |1-2| + |2-0| + |0-2|
        assert!((a.l1_distance(&b) - 5.0).abs() < 1e-12);
        assert!((a.l2_distance(&b) - 3.0).abs() < 1e-12);
        assert_eq!(a.l1_distance(&a), 0.0);
    }

    #[test]
    fn test_top_n_ordering() {
        let ranks: RankVector = [(1, 0.5), (2, 2.0), (3, 0.5), (4, 1.0)].into_iter().collect();
        let top = ranks.top_n(3);

        assert_eq!(top, vec![(2, 2.0), (4, 1.0), (1, 0.5)]);
    }

    #[test]
    fn test_node_index_is_sorted() {
        let nodes = RankVector::uniform([30, 10, 20], 1.0);
        let index = NodeIndex::from_nodes(&nodes);

        assert_eq!(index.node_ids(), &[10, 20, 30]);
        assert_eq!(index.index_of(20), Some(1));
        assert_eq!(index.node_at(2), Some(30));
        assert_eq!(index.index_of(99), None);
    }
}
