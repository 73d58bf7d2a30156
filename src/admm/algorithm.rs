//! Implementation of the generalized ADMM solver.
//!
//! The stacked problem `min Σ c1|v|  s.t.  T v = y, v ≥ c2` is split into an
//! affine copy `s` and a proximal copy `t` with scaled dual `d`. Each sweep
//!
//! 1. projects `t − d` onto `{T v = y}` in the Rhov-weighted norm,
//! 2. soft-thresholds `s + d` by `c1 / (ρ·Rhov)` and clips at the lower bounds,
//! 3. accumulates `s − t` into the dual.
//!
//! Checkpoints measure the residuals, test for convergence and hand control to
//! the [`PenaltyController`]; a change of Rhov refreshes the cached projection.

use std::fmt;

use log::{debug, log, warn, Level};
use ndarray::{s, Array1, Array2, Zip};

use crate::basis::{concave_basis, normalize_basis};
use crate::error::{HuwacbError, Result};
use crate::utils::shrinkage::shrink;
use crate::utils::{column_broadcast, outer_divide, scale_outer, soft_threshold};

use super::config::{Penalty, SolveOptions, WarmStart};
use super::convergence::{CheckpointRecord, ConvergenceReport, ConvergenceStatus, StoppingRule};
use super::penalty::{is_checkpoint, PenaltyController, ResidualMeasures};
use super::problem::{StackedProblem, TAU1};
use super::projection::{solve_dense, WeightedProjection};

/// Problems with at least this many state entries run the proximal step in parallel.
const PARALLEL_MIN_ELEMENTS: usize = 1 << 14;

/// Result of a solve.
#[derive(Debug, Clone)]
pub struct HuwacbResult {
    /// Abundances (N×Ny, zero rows without a dictionary)
    pub abundance: Array2<f64>,

    /// Concave background coefficients (L×Ny)
    pub background_coefficients: Array2<f64>,

    /// The normalized concave basis that was used (L×L)
    pub concave_basis: Array2<f64>,

    /// Sparse residual (L×Ny)
    pub residual: Array2<f64>,

    /// Dual variable in the unscaled convention ((N+2L)×Ny)
    pub dual: Array2<f64>,

    /// Final per-sample penalty (Ny)
    pub rho: Array1<f64>,

    /// Final per-coordinate penalty (N+2L)
    pub rhov: Array1<f64>,

    /// Final primal residual
    pub res_p: f64,

    /// Final dual residual
    pub res_d: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Final status
    pub status: ConvergenceStatus,

    /// Whether the residual test was met
    pub success: bool,

    /// A message describing the result
    pub message: String,

    /// Thresholds used by the stopping test
    pub stopping: StoppingRule,

    /// Number of projection rebuilds after Rhov changes
    pub refactorizations: usize,

    /// Residuals recorded at every checkpoint
    pub history: Vec<CheckpointRecord>,
}

impl HuwacbResult {
    /// The background spectra `C·z` (L×Ny).
    pub fn background(&self) -> Array2<f64> {
        self.concave_basis.dot(&self.background_coefficients)
    }

    /// The model fit `A·x + C·z` (L×Ny), without the sparse residual.
    ///
    /// # Errors
    ///
    /// * `HuwacbError::DimensionMismatch` if `a` does not match the abundances
    pub fn fitted(&self, a: &Array2<f64>) -> Result<Array2<f64>> {
        let mut fit = self.background();
        if self.abundance.nrows() == 0 {
            return Ok(fit);
        }
        if a.ncols() != self.abundance.nrows() || a.nrows() != fit.nrows() {
            return Err(HuwacbError::DimensionMismatch(format!(
                "dictionary must be {}x{}, got {}x{}",
                fit.nrows(),
                self.abundance.nrows(),
                a.nrows(),
                a.ncols()
            )));
        }
        fit += &a.dot(&self.abundance);
        Ok(fit)
    }

    /// Serializable summary of the run.
    pub fn report(&self) -> ConvergenceReport {
        ConvergenceReport {
            status: self.status,
            iterations: self.iterations,
            res_p: self.res_p,
            res_d: self.res_d,
            tol_p: self.stopping.tol_p,
            tol_d: self.stopping.tol_d,
            refactorizations: self.refactorizations,
        }
    }
}

impl fmt::Display for HuwacbResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unmixing Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Primal residual: {:.6e} (tol {:.3e})", self.res_p, self.stopping.tol_p)?;
        writeln!(f, "  Dual residual: {:.6e} (tol {:.3e})", self.res_d, self.stopping.tol_d)?;
        writeln!(f, "  Refactorizations: {}", self.refactorizations)?;
        writeln!(
            f,
            "  Shape: {} atoms, {} bands, {} samples",
            self.abundance.nrows(),
            self.background_coefficients.nrows(),
            self.background_coefficients.ncols()
        )?;
        Ok(())
    }
}

/// Mutable iteration state.
#[derive(Debug, Clone)]
pub(crate) struct AdmmState {
    /// Affine copy (M×Ny)
    pub s: Array2<f64>,

    /// Proximal copy (M×Ny)
    pub t: Array2<f64>,

    /// Scaled dual (M×Ny)
    pub d: Array2<f64>,

    /// Per-sample penalty (Ny)
    pub rho: Array1<f64>,

    /// Per-coordinate penalty (M)
    pub rhov: Array1<f64>,

    /// `c1 / (ρ·Rhov)` (M×Ny)
    pub threshold: Array2<f64>,
}

impl AdmmState {
    /// Start from the minimum weighted-norm feasible point.
    pub fn cold_start(problem: &StackedProblem, projection: &WeightedProjection, parallel: bool) -> Result<Self> {
        let threshold = outer_divide(&problem.c1, &problem.rhov, &problem.rho);
        let s = projection.tpinvy().clone();
        let t = proximal(&s, &threshold, &problem.c2, parallel)?;
        let d = &s - &t;
        Ok(Self {
            s,
            t,
            d,
            rho: problem.rho.clone(),
            rhov: problem.rhov.clone(),
            threshold,
        })
    }

    /// Start from a stacked point `v0` and an unscaled dual `d0`.
    ///
    /// The dual is brought into the scaled convention and one full sweep is
    /// run so that `s`, `t` and `d` are mutually consistent.
    pub fn warm_start(
        problem: &StackedProblem,
        projection: &WeightedProjection,
        v0: Array2<f64>,
        mut d0: Array2<f64>,
        parallel: bool,
    ) -> Result<Self> {
        let threshold = outer_divide(&problem.c1, &problem.rhov, &problem.rho);
        scale_outer(&mut d0, &problem.rhov.mapv(f64::recip), &problem.rho.mapv(f64::recip));

        let mut state = Self {
            s: v0.clone(),
            t: v0,
            d: d0,
            rho: problem.rho.clone(),
            rhov: problem.rhov.clone(),
            threshold,
        };
        state.sweep(problem, projection, parallel)?;
        Ok(state)
    }

    /// One projection / proximal / dual sweep.
    pub fn sweep(&mut self, problem: &StackedProblem, projection: &WeightedProjection, parallel: bool) -> Result<()> {
        self.s = projection.project(&(&self.t - &self.d));
        self.t = proximal(&(&self.s + &self.d), &self.threshold, &problem.c2, parallel)?;
        self.d += &(&self.s - &self.t);
        Ok(())
    }

    /// Rebuild the thresholds after ρ or Rhov changed.
    pub fn refresh_threshold(&mut self, c1: &Array1<f64>) {
        self.threshold = outer_divide(c1, &self.rhov, &self.rho);
    }

    fn measure(&self, window: &(Array2<f64>, Array2<f64>)) -> ResidualMeasures {
        ResidualMeasures::measure(&self.s, &self.t, &window.0, &window.1, &self.rho, &self.rhov)
    }
}

/// `max(soft_threshold(values, threshold), c2)` with `c2` applied per row.
pub(crate) fn proximal(
    values: &Array2<f64>,
    threshold: &Array2<f64>,
    c2: &Array1<f64>,
    parallel: bool,
) -> Result<Array2<f64>> {
    if values.nrows() != c2.len() {
        return Err(HuwacbError::DimensionMismatch(format!(
            "expected {} lower bounds, got {}",
            values.nrows(),
            c2.len()
        )));
    }

    if parallel && values.len() >= PARALLEL_MIN_ELEMENTS && threshold.dim() == values.dim() {
        let mut out = Array2::<f64>::zeros(values.dim());
        Zip::indexed(&mut out)
            .and(values)
            .and(threshold)
            .par_for_each(|(i, _), o, &v, &tau| *o = shrink(v, tau).max(c2[i]));
        return Ok(out);
    }

    let mut out = soft_threshold(values.view(), threshold.view())?;
    for (mut row, &lb) in out.rows_mut().into_iter().zip(c2.iter()) {
        row.mapv_inplace(|v| v.max(lb));
    }
    Ok(out)
}

/// Robust unmixing solver.
#[derive(Debug, Clone, Default)]
pub struct Huwacb {
    /// Solver options
    options: SolveOptions,
}

impl Huwacb {
    /// Create a new solver with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new solver with the given options.
    pub fn with_options(options: SolveOptions) -> Self {
        Self { options }
    }

    /// The options the solver runs with.
    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    /// Set the residual tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.options.config.tol = tol;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.options.config.max_iterations = max_iterations;
        self
    }

    /// Set whether checkpoints are reported at info level.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.options.config.verbose = verbose;
        self
    }

    /// Set whether large problems run the proximal step in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.options.config.parallel = parallel;
        self
    }

    /// Set the abundance sparsity weight.
    pub fn with_lambda_a(mut self, lambda_a: impl Into<Penalty>) -> Self {
        self.options.lambda_a = lambda_a.into();
        self
    }

    /// Set the initial per-sample penalty.
    pub fn with_rho(mut self, rho: impl Into<Penalty>) -> Self {
        self.options.rho = rho.into();
        self
    }

    /// Set the initial per-coordinate penalty.
    pub fn with_rhov(mut self, rhov: impl Into<Penalty>) -> Self {
        self.options.rhov = rhov.into();
        self
    }

    /// Use the given concave basis instead of building one from the wavelengths.
    pub fn with_concave_base(mut self, basis: Array2<f64>) -> Self {
        self.options.concave_base = Some(basis);
        self
    }

    /// Set the warm start.
    pub fn with_warm_start(mut self, warm_start: WarmStart) -> Self {
        self.options.warm_start = warm_start;
        self
    }

    /// Unmix the observations.
    ///
    /// # Arguments
    ///
    /// * `a` - Dictionary of reference spectra (L×N); pass a matrix without
    ///   columns to fit background and residual only
    /// * `y` - Observations (L×Ny), one sample per column
    /// * `wv` - Wavelengths (L), used to build the concave basis unless one
    ///   was supplied
    ///
    /// # Returns
    ///
    /// * `Result<HuwacbResult>` - The decomposition. Exhausting the iteration
    ///   budget is reported through `status`, not as an error
    ///
    /// # Errors
    ///
    /// * Configuration errors for inconsistent inputs, before iterating
    /// * `HuwacbError::SingularMatrix` if the weighted Gram matrix cannot be
    ///   factored
    pub fn solve(&self, a: &Array2<f64>, y: &Array2<f64>, wv: &Array1<f64>) -> Result<HuwacbResult> {
        let options = &self.options;
        let config = &options.config;
        options.validate()?;

        let basis = self.resolve_basis(y.nrows(), wv)?;
        let problem = StackedProblem::assemble(a, y, basis, &options.lambda_a, &options.rho, &options.rhov)?;
        let warm = self.resolve_warm_start(&problem)?;

        let layout = problem.layout;
        let stopping = StoppingRule::new(config.tol, layout.n_coords(), layout.n_samples);
        let parallel = config.parallel;
        debug!(
            "huwacb: {} bands, {} atoms, {} samples, tol_p = {:.3e}",
            layout.n_bands, layout.n_atoms, layout.n_samples, stopping.tol_p
        );

        let mut projection = WeightedProjection::compute(&problem.operator, &problem.y, &problem.rhov)?;
        let mut state = match warm {
            Some((v0, d0)) => AdmmState::warm_start(&problem, &projection, v0, d0, parallel)?,
            None => AdmmState::cold_start(&problem, &projection, parallel)?,
        };

        let controller = PenaltyController::new();
        let level = if config.verbose { Level::Info } else { Level::Debug };
        let mut window = (state.s.clone(), state.t.clone());
        let mut history = Vec::new();
        let mut last: Option<(usize, ResidualMeasures)> = None;
        let mut refactorizations = 0;
        let mut status = ConvergenceStatus::Running;
        let mut iterations = 0;

        for k in 1..=config.max_iterations {
            state.sweep(&problem, &projection, parallel)?;
            iterations = k;

            if !is_checkpoint(k) {
                continue;
            }

            let measures = state.measure(&window);
            log!(
                level,
                "iter {:5}: res_p = {:.4e} (tol {:.4e}), res_d = {:.4e} (tol {:.4e}), res_d2 = {:.4e}",
                k,
                measures.res_p,
                stopping.tol_p,
                measures.res_d,
                stopping.tol_d,
                measures.res_d2
            );

            if stopping.is_satisfied(measures.res_p, measures.res_d) {
                history.push(record(k, &measures, 0, 0));
                last = Some((k, measures));
                status = ConvergenceStatus::Converged;
                break;
            }

            let update = controller.rebalance(k, &measures, &mut state.rho, &mut state.rhov, &mut state.d);
            if update.rhov_changed() && projection.refresh(&problem.operator, &problem.y, &state.rhov)? {
                refactorizations += 1;
                debug!(
                    "iter {:5}: Rhov changed on {} coordinates, projection refactored",
                    k, update.rhov_updates
                );
            }
            if update.any() {
                state.refresh_threshold(&problem.c1);
            }

            history.push(record(k, &measures, update.rho_updates, update.rhov_updates));
            last = Some((k, measures));
            window = (state.s.clone(), state.t.clone());
        }

        let measures = match last {
            Some((k, measures)) if k == iterations => measures,
            _ => state.measure(&window),
        };

        if !status.is_terminated() {
            status = ConvergenceStatus::MaxIterationsReached;
            warn!(
                "huwacb did not converge in {} iterations: res_p = {:.4e} (tol {:.4e}), res_d = {:.4e} (tol {:.4e})",
                iterations, measures.res_p, stopping.tol_p, measures.res_d, stopping.tol_d
            );
        }

        Ok(extract(
            problem,
            state,
            &measures,
            iterations,
            status,
            stopping,
            refactorizations,
            history,
        ))
    }

    /// The concave basis to use, normalized and scaled.
    fn resolve_basis(&self, n_bands: usize, wv: &Array1<f64>) -> Result<Array2<f64>> {
        let raw = match &self.options.concave_base {
            Some(c) => {
                if c.dim() != (n_bands, n_bands) {
                    return Err(HuwacbError::DimensionMismatch(format!(
                        "CONCAVEBASE must be {}x{}, got {}x{}",
                        n_bands,
                        n_bands,
                        c.nrows(),
                        c.ncols()
                    )));
                }
                c.clone()
            }
            None => {
                if wv.len() != n_bands {
                    return Err(HuwacbError::DimensionMismatch(format!(
                        "wavelength axis has {} entries but observations have {} bands",
                        wv.len(),
                        n_bands
                    )));
                }
                concave_basis(wv)?
            }
        };
        normalize_basis(&raw)
    }

    /// Broadcast the warm-start blocks and stack them.
    ///
    /// # Returns
    ///
    /// * The stacked start point and the unscaled dual, or `None` for a cold start
    fn resolve_warm_start(&self, problem: &StackedProblem) -> Result<Option<(Array2<f64>, Array2<f64>)>> {
        let layout = problem.layout;
        let ny = layout.n_samples;

        let (x0, z0, r0, d0) = match &self.options.warm_start {
            WarmStart::None => return Ok(None),
            WarmStart::Full { x0, z0, r0, d0 } => {
                let z = column_broadcast(z0, layout.n_bands, ny, "Z0")?;
                (x0, z, r0, d0)
            }
            WarmStart::Background { x0, b0, r0, d0 } => {
                let b = column_broadcast(b0, layout.n_bands, ny, "B0")?;
                let (z, _) = solve_dense(&problem.basis, &b, false)?;
                (x0, z, r0, d0)
            }
        };

        let x = column_broadcast(x0, layout.n_atoms, ny, "X0")?;
        let r = column_broadcast(r0, layout.n_bands, ny, "R0")?;
        let d = column_broadcast(d0, layout.n_coords(), ny, "D0")?;
        Ok(Some((problem.stack(&x, &z0, &r), d)))
    }
}

fn record(iteration: usize, measures: &ResidualMeasures, rho_updates: usize, rhov_updates: usize) -> CheckpointRecord {
    CheckpointRecord {
        iteration,
        res_p: measures.res_p,
        res_d: measures.res_d,
        res_d2: measures.res_d2,
        rho_updates,
        rhov_updates,
    }
}

/// Slice the proximal copy into its blocks and unscale the dual.
#[allow(clippy::too_many_arguments)]
fn extract(
    problem: StackedProblem,
    state: AdmmState,
    measures: &ResidualMeasures,
    iterations: usize,
    status: ConvergenceStatus,
    stopping: StoppingRule,
    refactorizations: usize,
    history: Vec<CheckpointRecord>,
) -> HuwacbResult {
    let layout = problem.layout;
    let t = &state.t;

    let abundance = t.slice(s![layout.abundance(), ..]).to_owned();
    let background_coefficients = t.slice(s![layout.background(), ..]).to_owned();
    let residual = t.slice(s![layout.residual(), ..]).mapv(|v| v * TAU1);

    let mut dual = state.d;
    scale_outer(&mut dual, &state.rhov, &state.rho);

    let success = status.is_converged();
    HuwacbResult {
        abundance,
        background_coefficients,
        concave_basis: problem.basis,
        residual,
        dual,
        rho: state.rho,
        rhov: state.rhov,
        res_p: measures.res_p,
        res_d: measures.res_d,
        iterations,
        status,
        success,
        message: status.description(),
        stopping,
        refactorizations,
        history,
    }
}
