//! Elementwise shrinkage and column norms.
//!
//! These are the pure helpers the ADMM core consumes: the soft-threshold
//! operator (the proximal map of the weighted L1 norm) and the column-wise
//! Euclidean norm used to normalize the concave basis.

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

use crate::error::{HuwacbError, Result};

/// Apply the soft-threshold operator elementwise.
///
/// Computes `max(v - τ, 0) - max(-v - τ, 0)` for every entry, with the
/// threshold broadcast against the shape of `values` (a single column is
/// repeated across columns, a single row across rows).
///
/// # Arguments
///
/// * `values` - The matrix to shrink
/// * `threshold` - Nonnegative thresholds, broadcastable to `values`
///
/// # Errors
///
/// * `HuwacbError::DimensionMismatch` if the threshold cannot be broadcast
pub fn soft_threshold(values: ArrayView2<'_, f64>, threshold: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    let thr = threshold.broadcast(values.dim()).ok_or_else(|| {
        HuwacbError::DimensionMismatch(format!(
            "threshold of shape {:?} cannot be broadcast to {:?}",
            threshold.dim(),
            values.dim()
        ))
    })?;

    let mut out = Array2::<f64>::zeros(values.dim());
    Zip::from(&mut out)
        .and(&values)
        .and(&thr)
        .for_each(|o, &v, &tau| *o = shrink(v, tau));
    Ok(out)
}

/// Scalar soft threshold.
#[inline]
pub(crate) fn shrink(v: f64, tau: f64) -> f64 {
    (v - tau).max(0.0) - (-v - tau).max(0.0)
}

/// Euclidean norm of each column.
pub fn column_norms(m: ArrayView2<'_, f64>) -> Array1<f64> {
    m.map_axis(Axis(0), |col| col.dot(&col).sqrt())
}
