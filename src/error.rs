// src/error.rs
// Error types for model construction and simulation requests.
// Stepping itself never fails: singular configurations surface as non-finite lane values, not as errors.

use thiserror::Error;

/// Errors raised while building a model or preparing a run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Time step must be finite and strictly positive.
    #[error("invalid time step: dt = {dt} (must be finite and > 0)")]
    InvalidTimeStep {
        /// The rejected step.
        dt: f64,
    },

    /// A model needs at least one lane.
    #[error("empty batch: at least one pendulum is required")]
    EmptyBatch,

    /// Lane vectors disagree in length.
    #[error("shape mismatch: `{field}` has {actual} lanes, expected {expected}")]
    ShapeMismatch {
        /// Offending field name.
        field: &'static str,
        /// Batch size fixed by `theta1`.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// Run would take more integration steps than allowed.
    #[error("step budget exceeded: {requested} steps requested, limit is {limit}")]
    StepBudgetExceeded {
        /// Steps the run would need.
        requested: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// Run would record more samples than allowed.
    #[error("sample budget exceeded: {requested} samples requested, limit is {limit}")]
    SampleBudgetExceeded {
        /// Samples the run would record.
        requested: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// Invalid run or server configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Chart rendering or encoding failed.
    #[error("plot error: {0}")]
    Plot(String),
}

impl SimulationError {
    /// Creates an invalid time step error.
    #[must_use]
    pub const fn invalid_time_step(dt: f64) -> Self {
        Self::InvalidTimeStep { dt }
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub const fn shape_mismatch(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            field,
            expected,
            actual,
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a plot error.
    #[must_use]
    pub fn plot(reason: impl ToString) -> Self {
        Self::Plot(reason.to_string())
    }
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_time_step() {
        let err = SimulationError::invalid_time_step(-0.5);
        assert!(err.to_string().contains("invalid time step"));
        assert!(err.to_string().contains("-0.5"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = SimulationError::shape_mismatch("theta2", 11, 10);
        let msg = err.to_string();
        assert!(msg.contains("theta2"));
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn error_step_budget() {
        let err = SimulationError::StepBudgetExceeded {
            requested: 5_000_000,
            limit: 1_000_000,
        };
        assert!(err.to_string().contains("step budget exceeded"));
    }

    #[test]
    fn error_sample_budget() {
        let err = SimulationError::SampleBudgetExceeded {
            requested: 10_000_000,
            limit: 2_000_000,
        };
        assert!(err.to_string().contains("sample budget exceeded"));
    }

    #[test]
    fn error_plot_from_display() {
        let err = SimulationError::plot("backend closed");
        assert!(err.to_string().contains("backend closed"));
    }
}
