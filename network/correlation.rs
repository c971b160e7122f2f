//! Plain correlation and partial-correlation matrices.
//!
//! These are the unregularized counterparts of the estimators in
//! [`crate::estimate`]: dense, no model selection, every pairwise
//! association reported. Zero-variance columns are kept in place with zero
//! associations rather than dropped, so matrix indices always line up with
//! the input columns.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_linalg::Inverse;
use thiserror::Error;

/// Failures of the dense matrix computations.
#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error(
        "The correlation matrix could not be inverted; variables may be collinear. Error: {0}"
    )]
    InversionFailed(#[from] ndarray_linalg::error::LinalgError),
    #[error("At least two observations are required, got {0}")]
    TooFewObservations(usize),
}

/// Pearson correlation matrix over the columns of `data`.
///
/// The diagonal is 1 for non-degenerate columns. Columns with zero variance
/// contribute zero off-diagonal entries and a zero diagonal entry.
pub fn correlation_matrix(data: ArrayView2<'_, f64>) -> Result<Array2<f64>, CorrelationError> {
    let n = data.nrows();
    if n < 2 {
        return Err(CorrelationError::TooFewObservations(n));
    }
    let p = data.ncols();
    let means = data.mean_axis(Axis(0)).expect("n >= 2 rows");
    let centered = &data - &means.view().insert_axis(Axis(0));
    let sds: Array1<f64> = centered
        .map_axis(Axis(0), |col| (col.dot(&col) / (n as f64 - 1.0)).sqrt());

    let cov = centered.t().dot(&centered) / (n as f64 - 1.0);
    let mut corr = Array2::zeros((p, p));
    for i in 0..p {
        for j in 0..p {
            if sds[i] > 0.0 && sds[j] > 0.0 {
                corr[[i, j]] = cov[[i, j]] / (sds[i] * sds[j]);
            }
        }
    }
    Ok(corr)
}

/// Partial-correlation matrix over the columns of `data`.
///
/// Inverts the correlation matrix of the non-degenerate columns and scales:
/// `pcor_ij = -k_ij / sqrt(k_ii * k_jj)`. Zero-variance columns are embedded
/// back as all-zero rows and columns.
pub fn partial_correlation_matrix(
    data: ArrayView2<'_, f64>,
) -> Result<Array2<f64>, CorrelationError> {
    let corr = correlation_matrix(data)?;
    let p = corr.nrows();
    let active: Vec<usize> = (0..p).filter(|&i| corr[[i, i]] > 0.0).collect();

    let mut result = Array2::zeros((p, p));
    if active.is_empty() {
        return Ok(result);
    }

    let sub = corr.select(Axis(0), &active).select(Axis(1), &active);
    let precision = sub.inv()?;

    for (ai, &i) in active.iter().enumerate() {
        result[[i, i]] = 1.0;
        for (aj, &j) in active.iter().enumerate() {
            if ai == aj {
                continue;
            }
            let scale = (precision[[ai, ai]] * precision[[aj, aj]]).sqrt();
            result[[i, j]] = -precision[[ai, aj]] / scale;
        }
    }
    Ok(result)
}
