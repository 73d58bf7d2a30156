//! Generalized ADMM for robust unmixing with a concave background.
//!
//! The solver fits every observed spectrum `y_j` as a nonnegative sparse
//! combination of dictionary atoms, plus a concave background spanned by the
//! concave basis, plus a sparse residual that absorbs outliers. All samples
//! are solved jointly with per-sample and per-coordinate adaptive penalties.

mod algorithm;
pub mod config;
pub mod convergence;
mod options;
pub mod penalty;
pub mod problem;
pub mod projection;

pub use algorithm::{Huwacb, HuwacbResult};
pub use config::{AdmmConfig, Penalty, SolveOptions, WarmStart};
pub use convergence::{CheckpointRecord, ConvergenceReport, ConvergenceStatus, StoppingRule};
pub use options::OptionValue;
pub use penalty::{PenaltyController, PenaltyUpdate, ResidualMeasures};
pub use problem::{BlockLayout, StackedProblem, TAU, TAU1};
pub use projection::{FactorMethod, WeightedProjection};
