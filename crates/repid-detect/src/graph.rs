// crates/repid-detect/src/graph.rs
//
// Sparse rating graph: G(from, to) summarizes the ratings `from` gave `to`
// inside a sweep window. Used to find groups of entities that rate each other
// highly and reciprocally.

use std::collections::{BTreeSet, HashMap, HashSet};

use repid_core::{EntityKey, Rating};

/// Aggregate of all ratings along one directed edge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeStats {
    pub count: u64,
    /// Sum of per-rating dimension means.
    pub score_sum: f64,
}

impl EdgeStats {
    pub fn mean_score(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.score_sum / self.count as f64
        }
    }
}

/// A group of entities connected by mutual high-score edges.
#[derive(Debug, Clone, PartialEq)]
pub struct MutualComponent {
    /// Sorted members.
    pub members: Vec<EntityKey>,
    /// Undirected mutual edges between members.
    pub mutual_edges: usize,
    /// Mean score over both directions of every mutual edge.
    pub mean_score: f64,
}

impl MutualComponent {
    /// Mutual edges over possible pairs.
    pub fn density(&self) -> f64 {
        let n = self.members.len();
        if n < 2 {
            return 0.0;
        }
        let possible = n * (n - 1) / 2;
        self.mutual_edges as f64 / possible as f64
    }
}

/// Sparse directed graph of rater -> target edges.
#[derive(Debug, Clone, Default)]
pub struct RatingGraph {
    /// (from, to) -> stats.
    pub entries: HashMap<(EntityKey, EntityKey), EdgeStats>,
}

impl RatingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ledger entries, skipping self-ratings (loops carry no clique signal).
    pub fn from_ratings<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> Self {
        let mut graph = Self::new();
        for rating in ratings {
            if rating.is_self_rating() {
                continue;
            }
            graph.add(rating.rater.key(), rating.target.key(), rating.scores.mean());
        }
        graph
    }

    pub fn add(&mut self, from: EntityKey, to: EntityKey, score: f64) {
        let edge = self.entries.entry((from, to)).or_default();
        edge.count += 1;
        edge.score_sum += score;
    }

    pub fn edge(&self, from: &EntityKey, to: &EntityKey) -> Option<&EdgeStats> {
        self.entries.get(&(*from, *to))
    }

    /// Connected components over undirected edges where both directions exist
    /// with a mean score of at least `min_score`.
    pub fn mutual_components(&self, min_score: f64) -> Vec<MutualComponent> {
        // Step 1: collect mutual pairs, each once with (a < b).
        let mut pairs: Vec<(EntityKey, EntityKey, f64)> = Vec::new();
        for (&(from, to), stats) in &self.entries {
            if from >= to || stats.mean_score() < min_score {
                continue;
            }
            if let Some(back) = self.edge(&to, &from) {
                if back.mean_score() >= min_score {
                    let mean = (stats.score_sum + back.score_sum) / (stats.count + back.count) as f64;
                    pairs.push((from, to, mean));
                }
            }
        }
        if pairs.is_empty() {
            return Vec::new();
        }

        // Step 2: adjacency over mutual pairs.
        let mut adjacency: HashMap<EntityKey, Vec<EntityKey>> = HashMap::new();
        for &(a, b, _) in &pairs {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }

        // Step 3: BFS components, visited in sorted order for determinism.
        let mut nodes: Vec<EntityKey> = adjacency.keys().copied().collect();
        nodes.sort();
        let mut seen: HashSet<EntityKey> = HashSet::new();
        let mut components = Vec::new();

        for start in nodes {
            if !seen.insert(start) {
                continue;
            }
            let mut members = BTreeSet::new();
            let mut queue = vec![start];
            while let Some(node) = queue.pop() {
                members.insert(node);
                for next in adjacency.get(&node).into_iter().flatten() {
                    if seen.insert(*next) {
                        queue.push(*next);
                    }
                }
            }

            let in_component: Vec<&(EntityKey, EntityKey, f64)> = pairs
                .iter()
                .filter(|(a, _, _)| members.contains(a))
                .collect();
            let mean_score =
                in_component.iter().map(|(_, _, m)| m).sum::<f64>() / in_component.len() as f64;

            components.push(MutualComponent {
                members: members.into_iter().collect(),
                mutual_edges: in_component.len(),
                mean_score,
            });
        }

        components
    }
}
