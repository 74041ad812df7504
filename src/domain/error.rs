// Error type shared by every layer of the pipeline.

use std::time::Duration;

/// Errors surfaced by model building, translation, solving and validation.
#[derive(Debug, thiserror::Error)]
pub enum OptError {
    #[error("variable '{name}' is already declared in this model")]
    DuplicateVariable { name: String },

    #[error("variable {variable} is not registered in this model")]
    UnboundVariable { variable: String },

    #[error("variable '{name}' has invalid bounds [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    #[error("invalid coefficient {value} in {context}")]
    InvalidCoefficient { context: String, value: f64 },

    #[error("{backend} cannot express {construct}")]
    UnsupportedConstruct { backend: String, construct: String },

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("solve timed out after {budget:?}")]
    TimedOut { budget: Duration },

    #[error("{backend} failed: {detail}")]
    Failed { backend: String, detail: String },

    #[error("inconsistent solver result: {detail}")]
    InconsistentResult { detail: String },

    #[error("MPS line {line}: {message}")]
    Mps { line: usize, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OptError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            OptError::DuplicateVariable { .. } => "VARIABLE_DUPLICATE",
            OptError::UnboundVariable { .. } => "VARIABLE_UNBOUND",
            OptError::InvalidBounds { .. } => "VARIABLE_INVALID_BOUNDS",
            OptError::InvalidCoefficient { .. } => "COEFFICIENT_INVALID",
            OptError::UnsupportedConstruct { .. } => "CONSTRUCT_UNSUPPORTED",
            OptError::SolverNotAvailable(_) => "SOLVER_NOT_AVAILABLE",
            OptError::TimedOut { .. } => "SOLVER_TIMED_OUT",
            OptError::Failed { .. } => "SOLVER_FAILED",
            OptError::InconsistentResult { .. } => "RESULT_INCONSISTENT",
            OptError::Mps { .. } => "MPS_INVALID",
            OptError::Config(_) => "CONFIG_INVALID",
            OptError::Io(_) => "IO",
        }
    }

    pub(crate) fn failed(backend: impl Into<String>, detail: impl Into<String>) -> Self {
        OptError::Failed {
            backend: backend.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn inconsistent(detail: impl Into<String>) -> Self {
        OptError::InconsistentResult {
            detail: detail.into(),
        }
    }

    /// Timeouts are recoverable: the caller may retry with a larger budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OptError::TimedOut { .. })
    }
}

pub type Result<T> = std::result::Result<T, OptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_offender() {
        let err = OptError::DuplicateVariable {
            name: "x".to_string(),
        };
        assert!(err.to_string().contains("'x'"));
        assert_eq!(err.code(), "VARIABLE_DUPLICATE");

        let err = OptError::UnsupportedConstruct {
            backend: "HiGHS".to_string(),
            construct: "relation !=".to_string(),
        };
        assert_eq!(err.to_string(), "HiGHS cannot express relation !=");
    }

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(OptError::TimedOut {
            budget: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!OptError::failed("bnb", "boom").is_retryable());
        assert!(!OptError::inconsistent("x out of bounds").is_retryable());
    }
}
