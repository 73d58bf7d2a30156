//! Concave background basis.
//!
//! Any concave function sampled on a wavelength grid is the linear chord between
//! its end points plus a nonnegative combination of "tent" functions peaking at
//! the interior grid points. The basis built here holds exactly those columns:
//! two linear ramps for the end points (free coefficients) followed by one tent
//! per interior band (nonnegative coefficients). With this layout the solver can
//! keep the background concave with plain coordinate-wise lower bounds.

use ndarray::{Array1, Array2};

use crate::error::{HuwacbError, Result};
use crate::utils::column_norms;

/// Scale applied to the unit-norm basis columns.
pub const BASIS_SCALE: f64 = 2.0;

/// Build the L×L concave basis for a wavelength axis.
///
/// Column 0 falls linearly from 1 at the first band to 0 at the last band,
/// column L−1 rises from 0 to 1, and column j (0 < j < L−1) is the tent that
/// is 1 at band j and 0 at both end points.
///
/// # Arguments
///
/// * `wv` - Wavelengths, strictly increasing or strictly decreasing
///
/// # Errors
///
/// * `HuwacbError::InvalidInput` if `wv` is empty, not finite or not strictly
///   monotone
pub fn concave_basis(wv: &Array1<f64>) -> Result<Array2<f64>> {
    let l = wv.len();
    if l == 0 {
        return Err(HuwacbError::InvalidInput("wavelength axis is empty".to_string()));
    }
    if wv.iter().any(|w| !w.is_finite()) {
        return Err(HuwacbError::InvalidInput("wavelength axis contains non-finite values".to_string()));
    }
    if l == 1 {
        return Ok(Array2::ones((1, 1)));
    }

    let increasing = wv[1] > wv[0];
    let monotone = wv.windows(2).into_iter().all(|w| {
        if increasing {
            w[1] > w[0]
        } else {
            w[1] < w[0]
        }
    });
    if !monotone {
        return Err(HuwacbError::InvalidInput(
            "wavelength axis must be strictly monotone".to_string(),
        ));
    }

    let first = wv[0];
    let last = wv[l - 1];
    let span = last - first;

    let basis = Array2::from_shape_fn((l, l), |(i, j)| {
        let w = wv[i];
        if j == 0 {
            (last - w) / span
        } else if j == l - 1 {
            (w - first) / span
        } else if i <= j {
            (w - first) / (wv[j] - first)
        } else {
            (last - w) / (last - wv[j])
        }
    });
    Ok(basis)
}

/// Normalize every column to unit Euclidean norm and scale by [`BASIS_SCALE`].
///
/// # Errors
///
/// * `HuwacbError::InvalidInput` if a column is zero or not finite
pub fn normalize_basis(basis: &Array2<f64>) -> Result<Array2<f64>> {
    let norms = column_norms(basis.view());
    if let Some(j) = norms.iter().position(|n| !(n.is_finite() && *n > 0.0)) {
        return Err(HuwacbError::InvalidInput(format!(
            "concave basis column {} has zero or non-finite norm",
            j
        )));
    }

    let mut out = basis.clone();
    for (mut col, norm) in out.columns_mut().into_iter().zip(norms.iter()) {
        col.mapv_inplace(|v| v * BASIS_SCALE / norm);
    }
    Ok(out)
}
