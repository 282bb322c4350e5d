//! Nonlinear model predictive control for path tracking
//!
//! The kinematic bicycle model, the tracking cost, the curvature-adaptive
//! target speed and the extraction of latency-compensated commands, tied
//! together by [`MpcController`].

pub mod controller;
pub mod dynamics;
pub mod extractor;
pub mod layout;
pub mod problem;
pub mod reference_speed;

pub use controller::{MpcController, MpcOutput, TrackingReference};
pub use dynamics::{KinematicBicycle, LF};
pub use extractor::{trajectory_mean_squared_curvature, LatencyCompensation};
pub use layout::DecisionLayout;
pub use problem::{CostWeights, MpcProblem};
pub use reference_speed::ReferenceSpeedParams;
