//! Control algorithms module
//!
//! Receding-horizon MPC over a kinematic bicycle model.

pub mod mpc;

pub use mpc::{MpcController, MpcOutput, TrackingReference};
