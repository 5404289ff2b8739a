use thiserror::Error;

/// Every way a build can fail. A failed build never returns a partial aggregate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    /// No admissible placement exists (empty candidate list, every reference
    /// exhausted, or the attempt budget ran out). `step` is the particle count
    /// or merge index the failing step was trying to reach.
    #[error("infeasible geometry at step {step}: {reason}")]
    InfeasibleGeometry { step: usize, reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Overlap still unresolved after `attempts` rotations (OverlapPolicy::Fail only)
    #[error("overlap unresolved at step {step} after {attempts} rotation attempts")]
    RetryExhausted { step: usize, attempts: usize },
}

impl AggregationError {
    pub fn infeasible(step: usize, reason: impl Into<String>) -> Self {
        Self::InfeasibleGeometry {
            step,
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameters(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, AggregationError>;
