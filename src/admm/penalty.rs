//! Adaptive penalty control.
//!
//! Every checkpoint the controller compares primal and dual residuals and
//! rescales the penalties so neither side runs more than an order of magnitude
//! ahead of the other. The per-sample penalty ρ is balanced column by column,
//! the per-coordinate penalty Rhov row by row. The scaled dual variable is
//! rescaled inversely so that the unscaled multiplier `ρ·Rhov·d` is preserved.

use ndarray::{Array1, Array2, Axis, Zip};

/// Iterations between checkpoints (the first checkpoint is iteration 1).
pub const CHECKPOINT_INTERVAL: usize = 10;

/// Residual ratio that triggers a rescale.
pub const BALANCE_RATIO: f64 = 10.0;

/// Factor applied to a penalty when it is rescaled.
pub const RESCALE_FACTOR: f64 = 2.0;

/// Per-coordinate adaptation stops at this iteration.
pub const COORDINATE_ADAPT_CUTOFF: usize = 300;

/// Returns true if iteration `k` (1-based) is a checkpoint.
pub fn is_checkpoint(k: usize) -> bool {
    k == 1 || k % CHECKPOINT_INTERVAL == 0
}

/// Residual measures over one checkpoint window.
#[derive(Debug, Clone)]
pub struct ResidualMeasures {
    /// Primal residual per sample, `||s[:,j] − t[:,j]||`
    pub res_pv: Array1<f64>,

    /// Dual residual estimate per sample
    pub res_dv: Array1<f64>,

    /// Primal residual per coordinate, `||s[i,:] − t[i,:]||`
    pub res_pv2: Array1<f64>,

    /// Dual residual estimate per coordinate
    pub res_dv2: Array1<f64>,

    /// Frobenius norm of `s − t`
    pub res_p: f64,

    /// Dual residual used by the stopping test
    pub res_d: f64,

    /// Norm of the per-sample dual estimates; reported, never used to stop
    pub res_d2: f64,
}

impl ResidualMeasures {
    /// Measure the residuals of the current state against the window start.
    ///
    /// # Arguments
    ///
    /// * `s`, `t` - Current split variables (M×Ny)
    /// * `s0`, `t0` - Split variables at the start of the window
    /// * `rho` - Per-sample penalty (Ny)
    /// * `rhov` - Per-coordinate penalty (M)
    pub fn measure(
        s: &Array2<f64>,
        t: &Array2<f64>,
        s0: &Array2<f64>,
        t0: &Array2<f64>,
        rho: &Array1<f64>,
        rhov: &Array1<f64>,
    ) -> Self {
        let st = s - t;
        let sq_st = st.mapv(|v| v * v);

        // |(t − t0)·(s − s0)| weighted by Rhov² (rows) and by ρ² (columns)
        let mut cross = Array2::<f64>::zeros(s.dim());
        let mut drift_sq = Array2::<f64>::zeros(s.dim());
        Zip::from(&mut cross)
            .and(&mut drift_sq)
            .and(s)
            .and(s0)
            .and(t)
            .and(t0)
            .for_each(|c, dq, &s_ij, &s0_ij, &t_ij, &t0_ij| {
                let tt0 = t_ij - t0_ij;
                *c = (tt0 * (s_ij - s0_ij)).abs();
                *dq = tt0 * tt0;
            });

        let rhov_sq = rhov.mapv(|v| v * v);
        let rho_sq = rho.mapv(|v| v * v);

        let res_pv = sq_st.sum_axis(Axis(0)).mapv(f64::sqrt);
        let res_pv2 = sq_st.sum_axis(Axis(1)).mapv(f64::sqrt);

        let res_dv = rhov_sq.dot(&cross).mapv(f64::sqrt) * rho;
        let res_dv2 = cross.dot(&rho_sq).mapv(f64::sqrt) * rhov;

        let res_p = sq_st.sum().sqrt();
        let res_d = rhov_sq.dot(&drift_sq).dot(&rho_sq).sqrt();
        let res_d2 = res_dv.dot(&res_dv).sqrt();

        Self {
            res_pv,
            res_dv,
            res_pv2,
            res_dv2,
            res_p,
            res_d,
            res_d2,
        }
    }
}

/// Outcome of one rebalancing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PenaltyUpdate {
    /// Samples whose ρ was rescaled
    pub rho_updates: usize,

    /// Coordinates whose Rhov was rescaled
    pub rhov_updates: usize,
}

impl PenaltyUpdate {
    /// Returns true if the projection must be refactored.
    pub fn rhov_changed(&self) -> bool {
        self.rhov_updates > 0
    }

    /// Returns true if the proximal thresholds must be rebuilt.
    pub fn any(&self) -> bool {
        self.rho_updates > 0 || self.rhov_updates > 0
    }
}

/// Residual-balancing controller for ρ and Rhov.
#[derive(Debug, Clone)]
pub struct PenaltyController {
    ratio: f64,
    factor: f64,
    coordinate_cutoff: usize,
}

impl Default for PenaltyController {
    fn default() -> Self {
        Self {
            ratio: BALANCE_RATIO,
            factor: RESCALE_FACTOR,
            coordinate_cutoff: COORDINATE_ADAPT_CUTOFF,
        }
    }
}

impl PenaltyController {
    /// Creates a controller with the fixed balancing constants.
    pub fn new() -> Self {
        Default::default()
    }

    /// Rebalance ρ per sample and, before the cutoff, Rhov per coordinate.
    ///
    /// # Arguments
    ///
    /// * `iteration` - Current iteration (1-based)
    /// * `measures` - Residuals measured at this checkpoint
    /// * `rho` - Per-sample penalty, updated in place
    /// * `rhov` - Per-coordinate penalty, updated in place
    /// * `d` - Scaled dual variable, rescaled inversely in place
    pub fn rebalance(
        &self,
        iteration: usize,
        measures: &ResidualMeasures,
        rho: &mut Array1<f64>,
        rhov: &mut Array1<f64>,
        d: &mut Array2<f64>,
    ) -> PenaltyUpdate {
        let rho_updates = self.rebalance_samples(measures, rho, d);
        let rhov_updates = if iteration < self.coordinate_cutoff {
            self.rebalance_coordinates(measures, rhov, d)
        } else {
            0
        };
        PenaltyUpdate {
            rho_updates,
            rhov_updates,
        }
    }

    /// Rescale ρ[j] and the dual column d[:, j] for unbalanced samples.
    pub fn rebalance_samples(&self, measures: &ResidualMeasures, rho: &mut Array1<f64>, d: &mut Array2<f64>) -> usize {
        let mut updates = 0;
        for (j, mut col) in d.axis_iter_mut(Axis(1)).enumerate() {
            let scale = self.decide(measures.res_pv[j], measures.res_dv[j]);
            if scale != 1.0 {
                rho[j] *= scale;
                col.mapv_inplace(|v| v / scale);
                updates += 1;
            }
        }
        updates
    }

    /// Rescale Rhov[i] and the dual row d[i, :] for unbalanced coordinates.
    pub fn rebalance_coordinates(&self, measures: &ResidualMeasures, rhov: &mut Array1<f64>, d: &mut Array2<f64>) -> usize {
        let mut updates = 0;
        for (i, mut row) in d.axis_iter_mut(Axis(0)).enumerate() {
            let scale = self.decide(measures.res_pv2[i], measures.res_dv2[i]);
            if scale != 1.0 {
                rhov[i] *= scale;
                row.mapv_inplace(|v| v / scale);
                updates += 1;
            }
        }
        updates
    }

    /// Multiplier for a penalty given its primal and dual residuals.
    fn decide(&self, primal: f64, dual: f64) -> f64 {
        if primal > self.ratio * dual {
            self.factor
        } else if dual > self.ratio * primal {
            1.0 / self.factor
        } else {
            1.0
        }
    }
}
