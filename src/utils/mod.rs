//! Utility functions and helpers for the huwacb-rs library.

pub mod broadcast;
#[cfg(feature = "matrix")]
pub mod matrix_convert;
pub mod shrinkage;

// Re-export commonly used utilities
pub use broadcast::{column_broadcast, outer_divide, scale_outer};
#[cfg(feature = "matrix")]
pub use matrix_convert::{faer_to_ndarray, ndarray_to_faer};
pub use shrinkage::{column_norms, soft_threshold};
