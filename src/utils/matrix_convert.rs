//! Matrix conversion utilities for the huwacb-rs library.
//!
//! The solver keeps its state in ndarray arrays and hands dense systems to faer
//! for factorization. These functions move data across that boundary.

use faer::{Mat, MatRef};
use ndarray::{Array2, ArrayView2};

/// Convert an ndarray view to a faer Mat.
///
/// ndarray is row-major by default and faer is column-major, so the data is
/// copied element by element.
///
/// # Arguments
///
/// * `arr` - The ndarray view to convert
///
/// # Returns
///
/// * A faer Mat with the same data
pub fn ndarray_to_faer(arr: ArrayView2<'_, f64>) -> Mat<f64> {
    Mat::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Convert a faer matrix view to an ndarray Array2.
///
/// # Arguments
///
/// * `mat` - The faer MatRef to convert
///
/// # Returns
///
/// * An ndarray Array2 with the same data
pub fn faer_to_ndarray(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}
