//! mpc_controller - receding-horizon nonlinear MPC for path tracking
//!
//! Steering and throttle for a vehicle following a locally fitted cubic
//! reference path, solved every tick as a nonlinear program over a kinematic
//! bicycle model with a curvature-adaptive target speed and compensation of
//! the actuation delay.

// Core modules
pub mod common;
pub mod config;
pub mod utils;

// Algorithm modules
pub mod control;
pub mod nlp;
pub mod path;

// Simulator glue
pub mod simulation;
pub mod telemetry;

// Re-export common types for convenience
pub use common::{Actuation, VehicleState};
pub use common::{Controller, MotionModel};
pub use common::{MpcError, MpcResult};
pub use config::MpcConfig;
pub use control::{MpcController, MpcOutput, TrackingReference};
pub use nlp::SolveStatus;
pub use path::CubicPolynomial;
