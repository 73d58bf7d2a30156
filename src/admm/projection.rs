//! Weighted affine projection onto `{v : T v = y}`.
//!
//! For a positive weight vector `w` the projection of `u` in the norm
//! `||u||²_w = Σ w_i u_i²` is `Proj·u + Tpinvy`, where
//!
//! - `W = diag(1/w) Tᵀ` (M×L),
//! - `G = T W` (L×L, symmetric positive definite when T has full row rank),
//! - `Tpinvy = W G⁻¹ y`,
//! - `Proj = I − W G⁻¹ T`.
//!
//! The matrices depend on `w` only, so they are cached together with the
//! weights they were built from and rebuilt only when the weights change.

use faer::linalg::solvers::{Llt, PartialPivLu, Solve};
use faer::{Mat, Side};
use ndarray::{s, Array1, Array2};

use crate::error::{HuwacbError, Result};
use crate::utils::{faer_to_ndarray, ndarray_to_faer};

/// Multiple of `n·eps` below which a pivot counts as zero relative to the largest.
const PIVOT_RTOL: f64 = 16.0;

/// Factorization used for the weighted Gram matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorMethod {
    /// Cholesky (the Gram matrix was positive definite)
    Cholesky,

    /// LU with partial pivoting (Cholesky failed)
    Lu,
}

/// A dense factorization that can solve against several right-hand sides.
pub(crate) enum DenseFactor {
    Cholesky(Llt<f64>),
    Lu(PartialPivLu<f64>),
}

impl DenseFactor {
    /// Cholesky when it succeeds with usable pivots, otherwise LU.
    pub(crate) fn symmetric(matrix: &Mat<f64>) -> Self {
        match matrix.as_ref().llt(Side::Lower) {
            Ok(llt) => {
                let factor = DenseFactor::Cholesky(llt);
                if factor.is_degenerate() {
                    DenseFactor::general(matrix)
                } else {
                    factor
                }
            }
            Err(_) => DenseFactor::general(matrix),
        }
    }

    /// LU with partial pivoting.
    pub(crate) fn general(matrix: &Mat<f64>) -> Self {
        DenseFactor::Lu(matrix.as_ref().partial_piv_lu())
    }

    pub(crate) fn method(&self) -> FactorMethod {
        match self {
            DenseFactor::Cholesky(_) => FactorMethod::Cholesky,
            DenseFactor::Lu(_) => FactorMethod::Lu,
        }
    }

    /// Pivot magnitudes of the factored matrix.
    ///
    /// For Cholesky these are `L_ii²`, for LU `|U_ii|`.
    fn pivots(&self) -> Vec<f64> {
        match self {
            DenseFactor::Cholesky(llt) => {
                let l = llt.L();
                (0..l.nrows()).map(|i| l[(i, i)] * l[(i, i)]).collect()
            }
            DenseFactor::Lu(lu) => {
                let u = lu.U();
                (0..u.nrows().min(u.ncols())).map(|i| u[(i, i)].abs()).collect()
            }
        }
    }

    /// True when the smallest pivot is at most `PIVOT_RTOL·n·eps` times the largest.
    fn is_degenerate(&self) -> bool {
        let pivots = self.pivots();
        if pivots.is_empty() {
            return false;
        }
        if pivots.iter().any(|p| !p.is_finite()) {
            return true;
        }
        let largest = pivots.iter().cloned().fold(0.0_f64, f64::max);
        let smallest = pivots.iter().cloned().fold(f64::INFINITY, f64::min);
        smallest <= PIVOT_RTOL * pivots.len() as f64 * f64::EPSILON * largest
    }

    fn solve_raw(&self, rhs: &Mat<f64>) -> Mat<f64> {
        match self {
            DenseFactor::Cholesky(llt) => llt.solve(rhs.as_ref()),
            DenseFactor::Lu(lu) => lu.solve(rhs.as_ref()),
        }
    }
}

/// Solve `a · x = b` for a square `a`, rejecting singular systems.
///
/// Singularity is judged on the pivots of the factorization, not on the
/// right-hand side, so badly scaled but regular systems still solve.
///
/// # Arguments
///
/// * `a` - Square coefficient matrix
/// * `b` - Right-hand sides, one per column
/// * `symmetric` - Try Cholesky before LU
///
/// # Errors
///
/// * `HuwacbError::DimensionMismatch` if the shapes do not agree
/// * `HuwacbError::LinearAlgebraError` if `a` has non-finite entries
/// * `HuwacbError::SingularMatrix` if a pivot vanishes relative to the largest
///   one, or the solution is not finite
pub(crate) fn solve_dense(a: &Array2<f64>, b: &Array2<f64>, symmetric: bool) -> Result<(Array2<f64>, FactorMethod)> {
    if a.nrows() != a.ncols() || a.nrows() != b.nrows() {
        return Err(HuwacbError::DimensionMismatch(format!(
            "cannot solve a {}x{} system against {} right-hand side rows",
            a.nrows(),
            a.ncols(),
            b.nrows()
        )));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(HuwacbError::LinearAlgebraError(
            "cannot factor a matrix with non-finite entries".to_string(),
        ));
    }

    let a_faer = ndarray_to_faer(a.view());
    let b_faer = ndarray_to_faer(b.view());
    let factor = if symmetric {
        DenseFactor::symmetric(&a_faer)
    } else {
        DenseFactor::general(&a_faer)
    };
    if factor.is_degenerate() {
        return Err(HuwacbError::SingularMatrix(format!(
            "{}x{} matrix has a vanishing pivot",
            a.nrows(),
            a.ncols()
        )));
    }

    let x = faer_to_ndarray(factor.solve_raw(&b_faer).as_ref());
    if x.iter().any(|v| !v.is_finite()) {
        return Err(HuwacbError::SingularMatrix(
            "dense solve produced non-finite values".to_string(),
        ));
    }

    Ok((x, factor.method()))
}

/// Cached weighted projection for a fixed operator and observation.
#[derive(Debug, Clone)]
pub struct WeightedProjection {
    /// Weights the cache was built from
    weights: Array1<f64>,

    /// Null-space projector `I − W G⁻¹ T` (M×M)
    proj: Array2<f64>,

    /// Minimum weighted-norm solution `W G⁻¹ y` (M×Ny)
    tpinvy: Array2<f64>,

    /// Factorization that succeeded on the last build
    method: FactorMethod,
}

impl WeightedProjection {
    /// Build the projection for operator `t`, observation `y` and `weights`.
    ///
    /// # Arguments
    ///
    /// * `t` - The stacked operator (L×M)
    /// * `y` - The observations (L×Ny)
    /// * `weights` - Positive per-coordinate weights (M)
    ///
    /// # Errors
    ///
    /// * `HuwacbError::DimensionMismatch` if the shapes disagree
    /// * `HuwacbError::InvalidParameter` if a weight is not positive
    /// * `HuwacbError::SingularMatrix` if `T` is rank deficient
    pub fn compute(t: &Array2<f64>, y: &Array2<f64>, weights: &Array1<f64>) -> Result<Self> {
        let (l, m) = t.dim();
        let ny = y.ncols();
        if y.nrows() != l {
            return Err(HuwacbError::DimensionMismatch(format!(
                "operator has {} rows but observations have {}",
                l,
                y.nrows()
            )));
        }
        if weights.len() != m {
            return Err(HuwacbError::DimensionMismatch(format!(
                "expected {} weights, got {}",
                m,
                weights.len()
            )));
        }
        if weights.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(HuwacbError::InvalidParameter(
                "projection weights must be positive and finite".to_string(),
            ));
        }

        // W = diag(1/w) T'
        let mut w_mat = t.t().to_owned();
        for (mut row, w) in w_mat.rows_mut().into_iter().zip(weights.iter()) {
            row.mapv_inplace(|v| v / w);
        }
        let gram = t.dot(&w_mat);

        // Solve G X = [y | T] once for both derived matrices
        let mut rhs = Array2::<f64>::zeros((l, ny + m));
        rhs.slice_mut(s![.., ..ny]).assign(y);
        rhs.slice_mut(s![.., ny..]).assign(t);
        let (solution, method) = solve_dense(&gram, &rhs, true).map_err(|err| match err {
            HuwacbError::SingularMatrix(msg) => HuwacbError::SingularMatrix(format!(
                "weighted Gram matrix is singular; the stacked operator must have full row rank ({})",
                msg
            )),
            other => other,
        })?;

        let tpinvy = w_mat.dot(&solution.slice(s![.., ..ny]));
        let mut proj = w_mat.dot(&solution.slice(s![.., ny..]));
        proj.mapv_inplace(|v| -v);
        for i in 0..m {
            proj[[i, i]] += 1.0;
        }

        Ok(Self {
            weights: weights.clone(),
            proj,
            tpinvy,
            method,
        })
    }

    /// Rebuild the cache if `weights` differ from the ones it was built from.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the projection was recomputed, `Ok(false)` if the cache
    ///   was already current
    pub fn refresh(&mut self, t: &Array2<f64>, y: &Array2<f64>, weights: &Array1<f64>) -> Result<bool> {
        if self.weights == *weights {
            return Ok(false);
        }
        *self = Self::compute(t, y, weights)?;
        Ok(true)
    }

    /// Project each column of `u` onto the affine set: `Proj·u + Tpinvy`.
    pub fn project(&self, u: &Array2<f64>) -> Array2<f64> {
        self.proj.dot(u) + &self.tpinvy
    }

    /// The null-space projector.
    pub fn proj(&self) -> &Array2<f64> {
        &self.proj
    }

    /// The minimum weighted-norm feasible point.
    pub fn tpinvy(&self) -> &Array2<f64> {
        &self.tpinvy
    }

    /// The weights the cache corresponds to.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// The factorization used on the last build.
    pub fn method(&self) -> FactorMethod {
        self.method
    }
}
