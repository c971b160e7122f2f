//! Force-directed node placement.
//!
//! A Fruchterman-Reingold simulation over the unit square: every node pair
//! repels, every nonzero edge attracts in proportion to its absolute weight,
//! and a linearly cooling temperature caps per-step displacement. The
//! initial placement is a deterministic circle, so layouts are reproducible
//! run to run.

use ndarray::{Array2, ArrayView2};

/// Settings for the force-directed simulation.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Number of simulation steps.
    pub iterations: usize,
    /// Initial temperature as a fraction of the frame; caps how far a node
    /// can travel in one step.
    pub initial_temperature: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            initial_temperature: 0.1,
        }
    }
}

/// Computes a 2-D layout for a weighted adjacency matrix.
///
/// Returns an `n x 2` coordinate matrix inside the unit square.
pub fn force_directed(weights: ArrayView2<'_, f64>, config: &LayoutConfig) -> Array2<f64> {
    let p = weights.nrows();
    let mut positions = Array2::zeros((p, 2));
    if p == 0 {
        return positions;
    }
    if p == 1 {
        positions[[0, 0]] = 0.5;
        positions[[0, 1]] = 0.5;
        return positions;
    }

    for i in 0..p {
        let angle = std::f64::consts::TAU * i as f64 / p as f64;
        positions[[i, 0]] = 0.5 + 0.4 * angle.cos();
        positions[[i, 1]] = 0.5 + 0.4 * angle.sin();
    }

    let max_weight = weights.iter().fold(0.0_f64, |m, w| m.max(w.abs()));
    if max_weight == 0.0 {
        // Nothing attracts; the circle is already an equilibrium.
        return positions;
    }

    let k = (1.0 / p as f64).sqrt();
    let mut displacement = Array2::zeros((p, 2));
    for step in 0..config.iterations {
        displacement.fill(0.0);

        for i in 0..p {
            for j in (i + 1)..p {
                let dx = positions[[i, 0]] - positions[[j, 0]];
                let dy = positions[[i, 1]] - positions[[j, 1]];
                let distance = (dx * dx + dy * dy).sqrt().max(1e-9);
                let ux = dx / distance;
                let uy = dy / distance;

                // Global repulsion.
                let repulsion = k * k / distance;
                displacement[[i, 0]] += ux * repulsion;
                displacement[[i, 1]] += uy * repulsion;
                displacement[[j, 0]] -= ux * repulsion;
                displacement[[j, 1]] -= uy * repulsion;

                // Attraction along edges, scaled by relative weight.
                let weight = weights[[i, j]].abs();
                if weight > 0.0 {
                    let attraction = distance * distance / k * (weight / max_weight);
                    displacement[[i, 0]] -= ux * attraction;
                    displacement[[i, 1]] -= uy * attraction;
                    displacement[[j, 0]] += ux * attraction;
                    displacement[[j, 1]] += uy * attraction;
                }
            }
        }

        let temperature =
            config.initial_temperature * (1.0 - step as f64 / config.iterations as f64);
        for i in 0..p {
            let dx = displacement[[i, 0]];
            let dy = displacement[[i, 1]];
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude > 0.0 {
                let scale = temperature.min(magnitude) / magnitude;
                positions[[i, 0]] = (positions[[i, 0]] + dx * scale).clamp(0.0, 1.0);
                positions[[i, 1]] = (positions[[i, 1]] + dy * scale).clamp(0.0, 1.0);
            }
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn pair_distance(positions: &Array2<f64>, i: usize, j: usize) -> f64 {
        let dx = positions[[i, 0]] - positions[[j, 0]];
        let dy = positions[[i, 1]] - positions[[j, 1]];
        (dx * dx + dy * dy).sqrt()
    }

    #[test]
    fn coordinates_stay_in_the_unit_square() {
        let weights = array![
            [0.0, 0.8, 0.0, 0.2],
            [0.8, 0.0, 0.5, 0.0],
            [0.0, 0.5, 0.0, 0.0],
            [0.2, 0.0, 0.0, 0.0]
        ];
        let positions = force_directed(weights.view(), &LayoutConfig::default());
        assert_eq!(positions.shape(), &[4, 2]);
        for &value in positions.iter() {
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn connected_nodes_end_up_closer_than_disconnected_ones() {
        // 0-1 strongly tied; 2 and 3 float free.
        let weights = array![
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0]
        ];
        let positions = force_directed(weights.view(), &LayoutConfig::default());
        assert!(pair_distance(&positions, 0, 1) < pair_distance(&positions, 2, 3));
    }

    #[test]
    fn layout_is_deterministic() {
        let weights = array![[0.0, 0.6, 0.1], [0.6, 0.0, 0.0], [0.1, 0.0, 0.0]];
        let a = force_directed(weights.view(), &LayoutConfig::default());
        let b = force_directed(weights.view(), &LayoutConfig::default());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 0.0);
        }
    }

    #[test]
    fn empty_and_singleton_networks_are_handled() {
        let empty = Array2::<f64>::zeros((0, 0));
        assert_eq!(force_directed(empty.view(), &LayoutConfig::default()).shape(), &[0, 2]);

        let single = Array2::<f64>::zeros((1, 1));
        let positions = force_directed(single.view(), &LayoutConfig::default());
        assert_abs_diff_eq!(positions[[0, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(positions[[0, 1]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn edgeless_network_keeps_the_initial_circle() {
        let weights = Array2::<f64>::zeros((4, 4));
        let positions = force_directed(weights.view(), &LayoutConfig::default());
        assert_abs_diff_eq!(positions[[0, 0]], 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(positions[[0, 1]], 0.5, epsilon = 1e-12);
    }
}
