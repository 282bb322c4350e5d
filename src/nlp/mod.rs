//! Sparse nonlinear programming
//!
//! A small interior-point solver for the smooth, stage-structured problems
//! built by the MPC layer.

pub mod banded;
pub mod interior_point;
pub mod options;
pub mod ordering;
pub mod problem;

pub use interior_point::{InteriorPointSolver, NlpSolution};
pub use options::{SolveStatus, SolverOptions};
pub use problem::{NlpProblem, INFINITE_BOUND};
