//! Configuration options for the ADMM solver.
//!
//! This module defines the scalar solver settings ([`AdmmConfig`]), the
//! penalty inputs that may be given as a scalar or a vector ([`Penalty`]), the
//! warm-start request ([`WarmStart`]) and the bundle of all of them passed to
//! the solver ([`SolveOptions`]).

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{HuwacbError, Result};

/// Scalar settings of the ADMM iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmmConfig {
    /// Tolerance on the primal and dual residuals, scaled by `sqrt(M·Ny)`. Default: 1e-4
    pub tol: f64,

    /// Maximum number of iterations. Default: 1000
    pub max_iterations: usize,

    /// Report every checkpoint at info level instead of debug. Default: false
    pub verbose: bool,

    /// Run the proximal step on the rayon pool for large problems. Default: true
    pub parallel: bool,
}

impl Default for AdmmConfig {
    fn default() -> Self {
        Self {
            tol: 1e-4,
            max_iterations: 1000,
            verbose: false,
            parallel: true,
        }
    }
}

impl AdmmConfig {
    /// Check that the tolerance is positive and the iteration budget nonzero.
    pub fn validate(&self) -> Result<()> {
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(HuwacbError::InvalidParameter(format!(
                "TOL must be a positive finite number, got {}",
                self.tol
            )));
        }
        if self.max_iterations == 0 {
            return Err(HuwacbError::InvalidParameter(
                "MAXITER must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A penalty given either as one value broadcast to every entry or as one
/// value per entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Penalty {
    /// Same value for every entry
    Scalar(f64),

    /// One value per entry
    Vector(Array1<f64>),
}

impl From<f64> for Penalty {
    fn from(value: f64) -> Self {
        Penalty::Scalar(value)
    }
}

impl From<Array1<f64>> for Penalty {
    fn from(values: Array1<f64>) -> Self {
        Penalty::Vector(values)
    }
}

impl Penalty {
    /// Check the sign of every value.
    ///
    /// # Arguments
    ///
    /// * `name` - Option name used in error messages
    /// * `allow_zero` - Whether zero is admissible (nonnegative vs. positive)
    pub fn check(&self, name: &str, allow_zero: bool) -> Result<()> {
        let admissible = |v: f64| v.is_finite() && (v > 0.0 || (allow_zero && v == 0.0));
        let ok = match self {
            Penalty::Scalar(v) => admissible(*v),
            Penalty::Vector(vs) => vs.iter().all(|v| admissible(*v)),
        };
        if ok {
            Ok(())
        } else {
            let bound = if allow_zero { "nonnegative" } else { "positive" };
            Err(HuwacbError::InvalidParameter(format!(
                "{} must be {} and finite",
                name, bound
            )))
        }
    }

    /// Expand to a vector of length `len`.
    ///
    /// # Errors
    ///
    /// * `HuwacbError::DimensionMismatch` if a vector penalty has the wrong length
    pub fn expand(&self, len: usize, name: &str) -> Result<Array1<f64>> {
        match self {
            Penalty::Scalar(v) => Ok(Array1::from_elem(len, *v)),
            Penalty::Vector(vs) if vs.len() == len => Ok(vs.clone()),
            Penalty::Vector(vs) => Err(HuwacbError::DimensionMismatch(format!(
                "{} must be a scalar or have length {}, got length {}",
                name,
                len,
                vs.len()
            ))),
        }
    }
}

/// How the iteration is initialized.
///
/// Blocks have Ny columns or a single column that is repeated for every
/// sample. `d0` is the dual variable in the unscaled convention returned by
/// the solver.
#[derive(Debug, Clone, Default)]
pub enum WarmStart {
    /// Start from the weighted minimum-norm feasible point
    #[default]
    None,

    /// Start from abundance, background coefficients, residual and dual
    Full {
        x0: Array2<f64>,
        z0: Array2<f64>,
        r0: Array2<f64>,
        d0: Array2<f64>,
    },

    /// Like `Full`, with the background given as a spectrum; the
    /// coefficients are recovered by solving against the concave basis
    Background {
        x0: Array2<f64>,
        b0: Array2<f64>,
        r0: Array2<f64>,
        d0: Array2<f64>,
    },
}

impl WarmStart {
    /// Build a warm start from optional blocks, enforcing all-or-nothing.
    ///
    /// # Errors
    ///
    /// * `HuwacbError::ConflictingWarmStart` if both `z0` and `b0` are given
    /// * `HuwacbError::IncompleteWarmStart` if some but not all blocks are given
    pub fn from_blocks(
        x0: Option<Array2<f64>>,
        z0: Option<Array2<f64>>,
        b0: Option<Array2<f64>>,
        r0: Option<Array2<f64>>,
        d0: Option<Array2<f64>>,
    ) -> Result<Self> {
        if z0.is_some() && b0.is_some() {
            return Err(HuwacbError::ConflictingWarmStart(
                "B0 and Z0 cannot both be supplied".to_string(),
            ));
        }

        let background_given = z0.is_some() || b0.is_some();
        let given = [x0.is_some(), background_given, r0.is_some(), d0.is_some()];
        if given.iter().all(|g| !g) {
            return Ok(WarmStart::None);
        }

        let missing: Vec<&str> = ["X0", "Z0 or B0", "R0", "D0"]
            .iter()
            .zip(given.iter())
            .filter(|(_, g)| !**g)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(HuwacbError::IncompleteWarmStart(missing.join(", ")));
        }

        match (x0, z0, b0, r0, d0) {
            (Some(x0), Some(z0), None, Some(r0), Some(d0)) => Ok(WarmStart::Full { x0, z0, r0, d0 }),
            (Some(x0), None, Some(b0), Some(r0), Some(d0)) => {
                Ok(WarmStart::Background { x0, b0, r0, d0 })
            }
            _ => Err(HuwacbError::InvalidInput(
                "inconsistent warm-start blocks".to_string(),
            )),
        }
    }

    /// Returns true when no warm start was requested.
    pub fn is_none(&self) -> bool {
        matches!(self, WarmStart::None)
    }
}

/// Everything the solver accepts besides the data.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Scalar iteration settings
    pub config: AdmmConfig,

    /// Sparsity weight on the abundances: scalar or one per atom. Default: 0
    pub lambda_a: Penalty,

    /// Initial per-sample penalty: scalar or one per sample. Default: 0.01
    pub rho: Penalty,

    /// Initial per-coordinate penalty: scalar or one per coordinate. Default: 1
    pub rhov: Penalty,

    /// Concave basis to use instead of the one built from the wavelengths
    pub concave_base: Option<Array2<f64>>,

    /// Initialization request
    pub warm_start: WarmStart,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            config: AdmmConfig::default(),
            lambda_a: Penalty::Scalar(0.0),
            rho: Penalty::Scalar(0.01),
            rhov: Penalty::Scalar(1.0),
            concave_base: None,
            warm_start: WarmStart::None,
        }
    }
}

impl SolveOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the residual tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set whether checkpoints are reported at info level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Set whether the proximal step may run in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Set the abundance sparsity weight.
    pub fn with_lambda_a(mut self, lambda_a: impl Into<Penalty>) -> Self {
        self.lambda_a = lambda_a.into();
        self
    }

    /// Set the initial per-sample penalty.
    pub fn with_rho(mut self, rho: impl Into<Penalty>) -> Self {
        self.rho = rho.into();
        self
    }

    /// Set the initial per-coordinate penalty.
    pub fn with_rhov(mut self, rhov: impl Into<Penalty>) -> Self {
        self.rhov = rhov.into();
        self
    }

    /// Use the given concave basis instead of building one.
    pub fn with_concave_base(mut self, basis: Array2<f64>) -> Self {
        self.concave_base = Some(basis);
        self
    }

    /// Set the warm start.
    pub fn with_warm_start(mut self, warm_start: WarmStart) -> Self {
        self.warm_start = warm_start;
        self
    }

    /// Check every setting that does not depend on the data dimensions.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.lambda_a.check("LAMBDA_A", true)?;
        self.rho.check("RHO", false)?;
        self.rhov.check("RHOV", false)?;
        Ok(())
    }
}
