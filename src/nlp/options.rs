//! Solver options and termination status

use serde::Deserialize;
use std::fmt;

/// Tuning of the interior-point solver
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolverOptions {
    /// Tolerance on the scaled optimality error
    pub tol: f64,

    /// Maximum number of Newton iterations
    pub max_iter: usize,

    /// Wall-clock budget per solve [s]
    pub max_cpu_time: f64,

    /// Initial barrier parameter
    pub mu_init: f64,

    /// Relative relaxation applied to finite variable bounds
    pub bound_relax_factor: f64,

    /// Objective is scaled down so its initial gradient stays below this
    pub obj_scaling_max_gradient: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            tol: 1e-6,
            max_iter: 500,
            max_cpu_time: 0.5,
            mu_init: 0.1,
            bound_relax_factor: 1e-8,
            obj_scaling_max_gradient: 100.0,
        }
    }
}

/// Outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Success,
    MaximumIterationsExceeded,
    MaximumCpuTimeExceeded,
    /// Inconsistent bounds or malformed derivative structure
    InvalidProblemDefinition,
    /// NaN or infinity returned by the problem
    InvalidNumberDetected,
    /// KKT system could not be factorized even with regularization
    ErrorInStepComputation,
    LineSearchFailure,
}

impl SolveStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Success)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Success => "success",
            SolveStatus::MaximumIterationsExceeded => "maximum iterations exceeded",
            SolveStatus::MaximumCpuTimeExceeded => "maximum cpu time exceeded",
            SolveStatus::InvalidProblemDefinition => "invalid problem definition",
            SolveStatus::InvalidNumberDetected => "invalid number detected",
            SolveStatus::ErrorInStepComputation => "error in step computation",
            SolveStatus::LineSearchFailure => "line search failure",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let opts = SolverOptions::default();
        assert_eq!(opts.max_cpu_time, 0.5);
        assert!(opts.tol > 0.0);
    }

    #[test]
    fn test_partial_toml() {
        let opts: SolverOptions = toml::from_str("max_iter = 50").unwrap();
        assert_eq!(opts.max_iter, 50);
        assert_eq!(opts.mu_init, SolverOptions::default().mu_init);
    }

    #[test]
    fn test_status_display() {
        assert!(SolveStatus::Success.is_success());
        assert!(!SolveStatus::MaximumCpuTimeExceeded.is_success());
        assert_eq!(SolveStatus::LineSearchFailure.to_string(), "line search failure");
    }
}
