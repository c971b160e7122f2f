//! Explicit estimation settings.
//!
//! Every tuning knob of the regularized estimators is enumerated here and
//! passed explicitly; nothing falls back to a hidden library-internal grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy for reconciling the two directed coefficients of a node pair into
/// one undirected edge weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinationRule {
    /// An edge exists only if both directed coefficients are nonzero; its
    /// weight is the arithmetic mean of the two.
    And,
    /// An edge exists if either directed coefficient is nonzero; its weight
    /// is the mean of the nonzero coefficients.
    Or,
}

/// Configuration for the regularized network estimators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Number of candidate penalties on the regularization path.
    pub n_lambda: usize,
    /// Ratio of the smallest to the largest penalty on the path.
    pub lambda_min_ratio: f64,
    /// Extended-BIC hyperparameter; 0 recovers the ordinary BIC.
    pub ebic_gamma: f64,
    /// How directed coefficient pairs are merged into undirected edges.
    /// Only consulted by the Ising estimator.
    pub rule: CombinationRule,
    /// Convergence tolerance for the inner coordinate-descent loops.
    pub convergence_tolerance: f64,
    /// Iteration cap for the inner coordinate-descent loops.
    pub max_iterations: usize,
}

/// Validation failures for estimator settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the regularization path must contain at least one penalty")]
    EmptyPath,
    #[error("lambda_min_ratio must lie in (0, 1], got {0}")]
    InvalidLambdaRatio(f64),
    #[error("ebic_gamma must be non-negative, got {0}")]
    NegativeGamma(f64),
    #[error("convergence_tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),
    #[error("max_iterations must be at least 1")]
    ZeroIterations,
}

impl NetworkConfig {
    /// Defaults for binary data: EBIC gamma 0.25 and the conservative
    /// AND rule, the customary choices for Ising model selection.
    pub fn ising() -> Self {
        Self {
            n_lambda: 100,
            lambda_min_ratio: 0.01,
            ebic_gamma: 0.25,
            rule: CombinationRule::And,
            convergence_tolerance: 1e-7,
            max_iterations: 100,
        }
    }

    /// Defaults for continuous data: EBIC gamma 0.5 for the graphical
    /// lasso. The combination rule is irrelevant on this path.
    pub fn gaussian() -> Self {
        Self {
            ebic_gamma: 0.5,
            ..Self::ising()
        }
    }

    /// Checks that every setting lies in its admissible range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_lambda == 0 {
            return Err(ConfigError::EmptyPath);
        }
        if !(self.lambda_min_ratio > 0.0 && self.lambda_min_ratio <= 1.0) {
            return Err(ConfigError::InvalidLambdaRatio(self.lambda_min_ratio));
        }
        if !(self.ebic_gamma >= 0.0) {
            return Err(ConfigError::NegativeGamma(self.ebic_gamma));
        }
        if !(self.convergence_tolerance > 0.0 && self.convergence_tolerance.is_finite()) {
            return Err(ConfigError::InvalidTolerance(self.convergence_tolerance));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    /// The descending sequence of candidate penalties for a given maximum.
    ///
    /// Penalties are log-spaced from `lambda_max` down to
    /// `lambda_max * lambda_min_ratio`. A degenerate `lambda_max` of zero
    /// yields a single zero entry.
    pub fn lambda_path(&self, lambda_max: f64) -> Vec<f64> {
        if lambda_max <= 0.0 {
            return vec![0.0];
        }
        if self.n_lambda == 1 {
            return vec![lambda_max];
        }
        let log_max = lambda_max.ln();
        let log_min = (lambda_max * self.lambda_min_ratio).ln();
        let step = (log_min - log_max) / (self.n_lambda - 1) as f64;
        (0..self.n_lambda)
            .map(|i| (log_max + step * i as f64).exp())
            .collect()
    }
}
