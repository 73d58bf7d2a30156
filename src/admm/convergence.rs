//! Convergence criteria for the ADMM iteration.
//!
//! The iteration stops when both the primal residual `||s − t||_F` and the
//! dual residual estimate fall below `tol · sqrt(M · Ny)`. Running out of
//! iterations is a terminal state, not an error.

use serde::{Deserialize, Serialize};

/// Possible convergence states of the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// Both residuals dropped below their tolerances.
    Converged,

    /// The iteration budget was exhausted first.
    MaxIterationsReached,
}

impl ConvergenceStatus {
    /// Returns true if the iteration has stopped.
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the residual test was met.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged)
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::Running => "Optimization is still running".to_string(),
            ConvergenceStatus::Converged => {
                "Converged: primal and dual residuals below tolerance".to_string()
            }
            ConvergenceStatus::MaxIterationsReached => {
                "Terminated: maximum iterations reached".to_string()
            }
        }
    }
}

/// Residual thresholds derived from the user tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoppingRule {
    /// Threshold on the primal residual
    pub tol_p: f64,

    /// Threshold on the dual residual
    pub tol_d: f64,
}

impl StoppingRule {
    /// Scales `tol` by the square root of the number of state entries.
    ///
    /// # Arguments
    ///
    /// * `tol` - The user tolerance
    /// * `n_coords` - Number of coordinates M = N + 2L
    /// * `n_samples` - Number of samples Ny
    pub fn new(tol: f64, n_coords: usize, n_samples: usize) -> Self {
        let scale = ((n_coords * n_samples) as f64).sqrt();
        Self {
            tol_p: tol * scale,
            tol_d: tol * scale,
        }
    }

    /// Returns true when both residuals are strictly below their thresholds.
    pub fn is_satisfied(&self, res_p: f64, res_d: f64) -> bool {
        res_p < self.tol_p && res_d < self.tol_d
    }
}

/// Residuals recorded at one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Iteration at which the checkpoint ran
    pub iteration: usize,

    /// Primal residual `||s − t||_F`
    pub res_p: f64,

    /// Dual residual used by the stopping test
    pub res_d: f64,

    /// Second dual residual estimate, reported only
    pub res_d2: f64,

    /// Number of samples whose ρ was rescaled
    pub rho_updates: usize,

    /// Number of coordinates whose Rhov was rescaled
    pub rhov_updates: usize,
}

/// Serializable summary of a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Final status
    pub status: ConvergenceStatus,

    /// Number of iterations performed
    pub iterations: usize,

    /// Final primal residual
    pub res_p: f64,

    /// Final dual residual
    pub res_d: f64,

    /// Thresholds the residuals were compared against
    pub tol_p: f64,

    /// Threshold on the dual residual
    pub tol_d: f64,

    /// Number of times the projection was refactored after a Rhov change
    pub refactorizations: usize,
}
