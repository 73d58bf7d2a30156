use thiserror::Error;

/// Error types for the huwacb-rs library.
///
/// Errors fall into two families: configuration errors, raised before the
/// iteration starts, and numerical errors raised by the linear-algebra kernel.
/// Running out of iterations is not an error; see
/// [`ConvergenceStatus`](crate::admm::ConvergenceStatus).
#[derive(Error, Debug)]
pub enum HuwacbError {
    /// Error indicating a mismatch in matrix or vector dimensions.
    #[error("Matrix dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for invalid option or parameter values.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Option name that the solver does not recognize.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Both a background warm start and a coefficient warm start were supplied.
    #[error("Conflicting warm start: {0}")]
    ConflictingWarmStart(String),

    /// Only part of a full warm start was supplied.
    #[error("Incomplete warm start: missing {0}")]
    IncompleteWarmStart(String),

    /// Malformed input that is not a dimension or value problem.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered: {0}")]
    SingularMatrix(String),

    /// A matrix handed to the factorization had non-finite entries.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl HuwacbError {
    /// Returns true for malformed or inconsistent inputs.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            HuwacbError::DimensionMismatch(_)
                | HuwacbError::InvalidParameter(_)
                | HuwacbError::UnknownOption(_)
                | HuwacbError::ConflictingWarmStart(_)
                | HuwacbError::IncompleteWarmStart(_)
                | HuwacbError::InvalidInput(_)
        )
    }

    /// Returns true for failures of the weighted Gram factorization.
    pub fn is_numerical_error(&self) -> bool {
        matches!(
            self,
            HuwacbError::SingularMatrix(_) | HuwacbError::LinearAlgebraError(_)
        )
    }
}

/// Result type alias for huwacb-rs operations.
pub type Result<T> = std::result::Result<T, HuwacbError>;
