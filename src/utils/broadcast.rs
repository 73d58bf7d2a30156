//! Explicit row/column broadcasting.
//!
//! The solver scales its M×Ny state by a per-coordinate vector along rows and
//! a per-sample vector along columns. These helpers spell that out instead of
//! relying on implicit broadcasting rules.

use ndarray::{Array1, Array2, Zip};

use crate::error::{HuwacbError, Result};

/// Builds `m[i, j] = numer[i] / (rows[i] * cols[j])`.
///
/// This is the threshold matrix `c1 ./ rho ./ Rhov` of the proximal step.
///
/// # Panics
///
/// Panics if `numer` and `rows` differ in length.
pub fn outer_divide(numer: &Array1<f64>, rows: &Array1<f64>, cols: &Array1<f64>) -> Array2<f64> {
    assert_eq!(numer.len(), rows.len(), "numerator and row scale lengths differ");
    Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| {
        numer[i] / (rows[i] * cols[j])
    })
}

/// Scales `m` in place by `rows[i] * cols[j]`.
///
/// # Panics
///
/// Panics if the vector lengths do not match the matrix shape.
pub fn scale_outer(m: &mut Array2<f64>, rows: &Array1<f64>, cols: &Array1<f64>) {
    assert_eq!(m.nrows(), rows.len(), "row scale length mismatch");
    assert_eq!(m.ncols(), cols.len(), "column scale length mismatch");
    Zip::indexed(m).for_each(|(i, j), v| *v *= rows[i] * cols[j]);
}

/// Broadcasts a block to `ncols` columns.
///
/// A block that already has `ncols` columns is returned as is; a single
/// column is repeated.
///
/// # Arguments
///
/// * `block` - The block to broadcast
/// * `nrows` - The required number of rows
/// * `ncols` - The target number of columns
/// * `name` - Name used in error messages
///
/// # Errors
///
/// * `HuwacbError::DimensionMismatch` if the block has the wrong number of rows
///   or a column count other than 1 or `ncols`
pub fn column_broadcast(block: &Array2<f64>, nrows: usize, ncols: usize, name: &str) -> Result<Array2<f64>> {
    if block.nrows() != nrows {
        return Err(HuwacbError::DimensionMismatch(format!(
            "{} must have {} rows, got {}",
            name,
            nrows,
            block.nrows()
        )));
    }
    if block.ncols() == ncols {
        return Ok(block.clone());
    }
    if block.ncols() == 1 {
        return Ok(Array2::from_shape_fn((nrows, ncols), |(i, _)| block[[i, 0]]));
    }
    Err(HuwacbError::DimensionMismatch(format!(
        "{} must have 1 or {} columns, got {}",
        name,
        ncols,
        block.ncols()
    )))
}
