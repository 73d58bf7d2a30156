//! # huwacb-rs
//!
//! `huwacb-rs` unmixes spectra into a sparse nonnegative combination of
//! library spectra, a concave background and a sparse residual, using a
//! generalized ADMM with adaptive penalties.
//!
//! The library provides:
//! - The [`Huwacb`] solver with warm starts and per-sample penalty adaptation
//! - The concave basis construction used for the background
//! - A name/value option front end and a JSON-serializable configuration
//!
//! ## Basic Usage
//!
//! ```
//! use huwacb_rs::Huwacb;
//! use ndarray::{array, Array2};
//!
//! let a = array![[0.1, 0.6], [0.4, 0.5], [0.7, 0.3], [0.5, 0.4]];
//! let y = array![[0.5], [0.8], [0.95], [0.7]];
//! let wv = array![1.0, 2.0, 3.0, 4.0];
//!
//! let result = Huwacb::new().with_max_iterations(5000).solve(&a, &y, &wv).unwrap();
//! assert_eq!(result.abundance.dim(), (2, 1));
//! let _spectra: Array2<f64> = result.background();
//! ```

// Public modules
pub mod basis;
pub mod error;
pub mod utils;

// Conditional modules

#[cfg(feature = "admm")]
pub mod admm;

// Re-exports for convenience
pub use basis::{concave_basis, normalize_basis};
pub use error::{HuwacbError, Result};

#[cfg(feature = "admm")]
pub use admm::{
    AdmmConfig, ConvergenceStatus, Huwacb, HuwacbResult, OptionValue, Penalty, SolveOptions, WarmStart,
};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
