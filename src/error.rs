// THEORY:
// Every failure the engine can report is a typed value. Input problems are
// caught once, when a `GazeSeries` or a detector configuration is built, and
// are never retried or patched over. The detectors themselves cannot fail:
// a recording without saccades or fixations is a valid result, not an error.

use thiserror::Error;

/// Malformed input or configuration, rejected before any detector runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("gaze series is empty")]
    EmptySeries,

    #[error("time is not monotonic at sample {index}: {current} ms follows {previous} ms")]
    NonMonotonicTime {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("sample {index} has a non-finite `{field}` value")]
    NonFiniteValue { index: usize, field: &'static str },

    #[error("sample {index} has unknown tracking status code {code}")]
    UnknownStatus { index: usize, code: i64 },

    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

impl ValidationError {
    pub(crate) fn parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Rejects zero, negative and non-finite values.
pub(crate) fn ensure_positive(parameter: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::parameter(
            parameter,
            format!("must be a positive number, got {value}"),
        ))
    }
}

/// Rejects negative and non-finite values.
pub(crate) fn ensure_non_negative(
    parameter: &'static str,
    value: f64,
) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::parameter(
            parameter,
            format!("must be zero or positive, got {value}"),
        ))
    }
}

/// A label name outside the closed set of gaze labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gaze label `{0}`")]
pub struct InvalidLabelError(pub String);

/// Errors surfaced by the pipeline front-ends.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to parse pipeline configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker pool is no longer accepting recordings")]
    WorkerPoolClosed,

    #[error("worker dropped recording `{0}` before replying")]
    WorkerDropped(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
