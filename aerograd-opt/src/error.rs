use aerograd_core::{FunctionalError, SolveError};
use thiserror::Error;

/// Errors reported by the optimization layer.
///
/// Configuration and index errors are raised before anything is mutated.
/// Solve failures never overwrite previously valid buffers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed sizing, deltas, or settings, detected before any solve.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A query or solve needs a prior solve that has not happened or is stale.
    #[error("{operation} requires {missing}")]
    PrecursorMissing {
        operation: &'static str,
        missing: &'static str,
    },

    #[error("{what} index {index} is out of range ({len} available)")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A caller-supplied buffer disagrees with the expected length.
    #[error("{what}: expected {expected} values, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("case list is full ({capacity} cases)")]
    CapacityExceeded { capacity: usize },

    /// A bounded iteration ran out before converging. Prior state is intact
    /// and the caller may retry with different settings.
    #[error("convergence failure: {0}")]
    ConvergenceFailure(String),

    /// The geometry or operating point is degenerate for the current solve.
    #[error("numerical singularity: {0}")]
    NumericalSingularity(String),
}

impl Error {
    /// Returns `true` for failures the caller can recover from by retrying
    /// with adjusted settings.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConvergenceFailure(_))
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }
}

impl From<SolveError> for Error {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::SizeMismatch {
                what,
                expected,
                actual,
            } => Self::SizeMismatch {
                what,
                expected,
                actual,
            },
            SolveError::InvalidInput(reason) => Self::InvalidConfiguration(reason),
            SolveError::Singular(reason) => Self::NumericalSingularity(reason),
            SolveError::NotConverged {
                iterations,
                residual,
            } => Self::ConvergenceFailure(format!(
                "linear solve not converged after {iterations} refinements (residual {residual:e})"
            )),
            SolveError::Functional(err) => err.into(),
            SolveError::NoSolution(operation) => Self::PrecursorMissing {
                operation,
                missing: "a forward solve",
            },
        }
    }
}

impl From<FunctionalError> for Error {
    fn from(err: FunctionalError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}
