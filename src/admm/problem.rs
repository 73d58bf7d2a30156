//! Assembly of the stacked constrained problem.
//!
//! The unmixing problem
//!
//! ```text
//! min  Σ_j ||r_j||₁ + λᵀ|x_j|   s.t.  y = A x + C z + r,  x ≥ 0,  z_interior ≥ 0
//! ```
//!
//! is rewritten over one stacked variable `v = [x; z; r̃]` with `r = τ₁ r̃`:
//!
//! ```text
//! min  Σ_ij c1_i |v_ij|   s.t.  T v = y,  v ≥ c2
//! ```
//!
//! where `T = [A | C | τ₁ I]`.

use std::ops::Range;

use ndarray::{s, Array1, Array2};

use crate::error::{HuwacbError, Result};

use super::config::Penalty;

/// Scale of the residual block inside the stacked variable.
pub const TAU1: f64 = 0.2;

/// Overall weight of the L1 loss on the residual.
pub const TAU: f64 = 1.0;

/// Row ranges of the three blocks of the stacked variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Number of dictionary atoms N
    pub n_atoms: usize,

    /// Number of spectral bands L
    pub n_bands: usize,

    /// Number of samples Ny
    pub n_samples: usize,
}

impl BlockLayout {
    /// Total number of coordinates M = N + 2L.
    pub fn n_coords(&self) -> usize {
        self.n_atoms + 2 * self.n_bands
    }

    /// Rows holding the abundances.
    pub fn abundance(&self) -> Range<usize> {
        0..self.n_atoms
    }

    /// Rows holding the background coefficients.
    pub fn background(&self) -> Range<usize> {
        self.n_atoms..self.n_atoms + self.n_bands
    }

    /// Rows holding the scaled residual.
    pub fn residual(&self) -> Range<usize> {
        self.n_atoms + self.n_bands..self.n_coords()
    }
}

/// The stacked operator together with penalties, bounds and initial step sizes.
#[derive(Debug, Clone)]
pub struct StackedProblem {
    /// Block dimensions
    pub layout: BlockLayout,

    /// `T = [A | C | τ₁ I]` (L×M)
    pub operator: Array2<f64>,

    /// The concave basis C (L×L), already normalized
    pub basis: Array2<f64>,

    /// Observations (L×Ny)
    pub y: Array2<f64>,

    /// L1 weights per coordinate (M)
    pub c1: Array1<f64>,

    /// Lower bounds per coordinate (M), `-inf` where unconstrained
    pub c2: Array1<f64>,

    /// Initial per-sample penalty (Ny)
    pub rho: Array1<f64>,

    /// Initial per-coordinate penalty (M)
    pub rhov: Array1<f64>,
}

impl StackedProblem {
    /// Validate the inputs and build the stacked problem.
    ///
    /// # Arguments
    ///
    /// * `a` - Dictionary (L×N); a matrix without columns means no dictionary
    /// * `y` - Observations (L×Ny)
    /// * `basis` - Normalized concave basis (L×L)
    /// * `lambda_a` - Abundance sparsity weight, scalar or length N
    /// * `rho` - Initial per-sample penalty, scalar or length Ny
    /// * `rhov` - Initial per-coordinate penalty, scalar or length N + 2L
    ///
    /// # Errors
    ///
    /// * `HuwacbError::DimensionMismatch` for inconsistent shapes
    /// * `HuwacbError::InvalidParameter` for penalties of the wrong sign
    /// * `HuwacbError::InvalidInput` for empty or non-finite data
    pub fn assemble(
        a: &Array2<f64>,
        y: &Array2<f64>,
        basis: Array2<f64>,
        lambda_a: &Penalty,
        rho: &Penalty,
        rhov: &Penalty,
    ) -> Result<Self> {
        let (l, ny) = y.dim();
        if l == 0 || ny == 0 {
            return Err(HuwacbError::InvalidInput(format!(
                "observations must be non-empty, got {}x{}",
                l, ny
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(HuwacbError::InvalidInput(
                "observations contain non-finite values".to_string(),
            ));
        }

        let n = a.ncols();
        if n > 0 && a.nrows() != l {
            return Err(HuwacbError::DimensionMismatch(format!(
                "dictionary has {} rows but observations have {}",
                a.nrows(),
                l
            )));
        }
        if a.iter().any(|v| !v.is_finite()) {
            return Err(HuwacbError::InvalidInput(
                "dictionary contains non-finite values".to_string(),
            ));
        }
        if basis.dim() != (l, l) {
            return Err(HuwacbError::DimensionMismatch(format!(
                "concave basis must be {}x{}, got {:?}",
                l,
                l,
                basis.dim()
            )));
        }

        let layout = BlockLayout {
            n_atoms: n,
            n_bands: l,
            n_samples: ny,
        };
        let m = layout.n_coords();

        lambda_a.check("LAMBDA_A", true)?;
        rho.check("RHO", false)?;
        rhov.check("RHOV", false)?;
        let lambda = lambda_a.expand(n, "LAMBDA_A")?;
        let rho = rho.expand(ny, "RHO")?;
        let rhov = rhov.expand(m, "RHOV")?;

        let mut operator = Array2::<f64>::zeros((l, m));
        if n > 0 {
            operator.slice_mut(s![.., layout.abundance()]).assign(a);
        }
        operator.slice_mut(s![.., layout.background()]).assign(&basis);
        for (i, col) in layout.residual().enumerate() {
            operator[[i, col]] = TAU1;
        }

        let mut c1 = Array1::<f64>::zeros(m);
        c1.slice_mut(s![layout.abundance()]).assign(&lambda);
        c1.slice_mut(s![layout.residual()]).fill(TAU1 / TAU);

        // Abundances and interior background coefficients are nonnegative;
        // the end-point ramps and the residual are free.
        let mut c2 = Array1::<f64>::zeros(m);
        let bg = layout.background();
        c2[bg.start] = f64::NEG_INFINITY;
        c2[bg.end - 1] = f64::NEG_INFINITY;
        c2.slice_mut(s![layout.residual()]).fill(f64::NEG_INFINITY);

        Ok(Self {
            layout,
            operator,
            basis,
            y: y.clone(),
            c1,
            c2,
            rho,
            rhov,
        })
    }

    /// Assemble the stacked variable `[x; z; r/τ₁]` from its blocks.
    ///
    /// All blocks must already have Ny columns.
    pub fn stack(&self, x: &Array2<f64>, z: &Array2<f64>, r: &Array2<f64>) -> Array2<f64> {
        let layout = self.layout;
        let mut v = Array2::<f64>::zeros((layout.n_coords(), layout.n_samples));
        v.slice_mut(s![layout.abundance(), ..]).assign(x);
        v.slice_mut(s![layout.background(), ..]).assign(z);
        v.slice_mut(s![layout.residual(), ..]).assign(&(r / TAU1));
        v
    }
}
