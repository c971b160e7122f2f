//! # Centrality and Distance Analysis
//!
//! Derived statistics over an estimated network. Edge traversal cost is the
//! reciprocal of absolute edge weight, so strong associations are short
//! hops; absent edges cost infinity. All costs are non-negative, which
//! keeps the Dijkstra family applicable throughout.

use crate::estimate::NetworkModel;
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView2};
use thiserror::Error;

/// Failures of the named-subset query operations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("The node '{0}' does not exist in this network.")]
    UnknownNode(String),
    #[error("The node '{0}' appears in both subsets; subsets must be disjoint.")]
    OverlappingSubsets(String),
    #[error("Both subsets must be non-empty.")]
    EmptySubset,
}

/// Per-node centrality indices, indexed like the network's node list.
#[derive(Debug, Clone)]
pub struct CentralityIndices {
    /// Number of incident nonzero edges.
    pub degree: Array1<f64>,
    /// Sum of absolute incident edge weights.
    pub strength: Array1<f64>,
    /// Sum of signed incident edge weights.
    pub expected_influence: Array1<f64>,
    /// Reciprocal of the summed shortest-path distance to all reachable
    /// nodes; zero for isolated nodes.
    pub closeness: Array1<f64>,
    /// Brandes betweenness over inverse-weight shortest paths.
    pub betweenness: Array1<f64>,
}

/// Summary of shortest-path lengths between two disjoint node subsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsetDistance {
    /// Mean over all cross-subset pairs; infinite if any pair is
    /// unreachable.
    pub mean: f64,
    /// Sample standard deviation over the pairs; infinite if any pair is
    /// unreachable, zero for a single pair.
    pub sd: f64,
    /// Number of cross-subset pairs summarized.
    pub pairs: usize,
}

/// All-pairs shortest-path matrix under the inverse-absolute-weight cost.
///
/// The result is symmetric with a zero diagonal; unreachable pairs are
/// `f64::INFINITY`.
pub fn shortest_path_matrix(weights: ArrayView2<'_, f64>) -> Array2<f64> {
    let p = weights.nrows();
    let mut distances = Array2::from_elem((p, p), f64::INFINITY);
    for source in 0..p {
        let (dist, _, _) = dijkstra(weights, source);
        for target in 0..p {
            distances[[source, target]] = dist[target];
        }
    }
    distances
}

/// Computes all centrality indices for a weighted adjacency matrix.
pub fn centrality(weights: ArrayView2<'_, f64>) -> CentralityIndices {
    let p = weights.nrows();
    let mut degree = Array1::zeros(p);
    let mut strength = Array1::zeros(p);
    let mut expected_influence = Array1::zeros(p);
    for i in 0..p {
        for j in 0..p {
            if i != j && weights[[i, j]] != 0.0 {
                degree[i] += 1.0;
                strength[i] += weights[[i, j]].abs();
                expected_influence[i] += weights[[i, j]];
            }
        }
    }

    let mut closeness = Array1::zeros(p);
    let mut betweenness = Array1::zeros(p);
    for source in 0..p {
        let (dist, sigma, predecessors) = dijkstra(weights, source);

        let reachable_sum: f64 = (0..p)
            .filter(|&t| t != source && dist[t].is_finite())
            .map(|t| dist[t])
            .sum();
        if reachable_sum > 0.0 {
            closeness[source] = 1.0 / reachable_sum;
        }

        // Brandes' dependency accumulation in reverse order of settlement.
        let mut order: Vec<usize> = (0..p).filter(|&t| dist[t].is_finite()).collect();
        order.sort_by(|&a, &b| dist[a].total_cmp(&dist[b]));
        let mut delta = vec![0.0_f64; p];
        for &w in order.iter().rev() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                betweenness[w] += delta[w];
            }
        }
    }
    // Each undirected path is discovered from both endpoints.
    betweenness.mapv_inplace(|b| b / 2.0);

    CentralityIndices {
        degree,
        strength,
        expected_influence,
        closeness,
        betweenness,
    }
}

/// Mean and standard deviation of shortest-path lengths across all pairs
/// spanning two disjoint named subsets.
pub fn subset_distance(
    model: &NetworkModel,
    left: &[&str],
    right: &[&str],
) -> Result<SubsetDistance, GraphError> {
    if left.is_empty() || right.is_empty() {
        return Err(GraphError::EmptySubset);
    }
    let resolve = |names: &[&str]| -> Result<Vec<usize>, GraphError> {
        names
            .iter()
            .map(|&n| {
                model
                    .node_index(n)
                    .ok_or_else(|| GraphError::UnknownNode(n.to_string()))
            })
            .collect()
    };
    let left_idx = resolve(left)?;
    let right_idx = resolve(right)?;
    if let Some((&l, _)) = left_idx
        .iter()
        .cartesian_product(right_idx.iter())
        .find(|(l, r)| l == r)
    {
        return Err(GraphError::OverlappingSubsets(model.names[l].clone()));
    }

    let distances = shortest_path_matrix(model.weights.view());
    let lengths: Vec<f64> = left_idx
        .iter()
        .cartesian_product(right_idx.iter())
        .map(|(&l, &r)| distances[[l, r]])
        .collect();
    let pairs = lengths.len();

    if lengths.iter().any(|d| d.is_infinite()) {
        return Ok(SubsetDistance {
            mean: f64::INFINITY,
            sd: f64::INFINITY,
            pairs,
        });
    }
    let mean = lengths.iter().sum::<f64>() / pairs as f64;
    let sd = if pairs > 1 {
        let var = lengths.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (pairs - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    Ok(SubsetDistance { mean, sd, pairs })
}

/// Dense-graph Dijkstra from one source.
///
/// Returns distances, shortest-path counts, and predecessor lists, the
/// ingredients Brandes' betweenness accumulation needs.
fn dijkstra(
    weights: ArrayView2<'_, f64>,
    source: usize,
) -> (Vec<f64>, Vec<f64>, Vec<Vec<usize>>) {
    let p = weights.nrows();
    let mut dist = vec![f64::INFINITY; p];
    let mut sigma = vec![0.0_f64; p];
    let mut predecessors = vec![Vec::new(); p];
    let mut settled = vec![false; p];
    dist[source] = 0.0;
    sigma[source] = 1.0;

    for _ in 0..p {
        let mut u = None;
        let mut best = f64::INFINITY;
        for v in 0..p {
            if !settled[v] && dist[v] < best {
                best = dist[v];
                u = Some(v);
            }
        }
        let Some(u) = u else { break };
        settled[u] = true;

        for v in 0..p {
            if v == u || settled[v] || weights[[u, v]] == 0.0 {
                continue;
            }
            let cost = 1.0 / weights[[u, v]].abs();
            let candidate = dist[u] + cost;
            if candidate < dist[v] - 1e-12 {
                dist[v] = candidate;
                sigma[v] = sigma[u];
                predecessors[v] = vec![u];
            } else if (candidate - dist[v]).abs() <= 1e-12 {
                sigma[v] += sigma[u];
                predecessors[v].push(u);
            }
        }
    }
    (dist, sigma, predecessors)
}
