//! Common types used throughout mpc_controller

use nalgebra::Vector6;

/// Number of state components tracked by the controller
pub const STATE_DIM: usize = 6;

/// Number of actuator components (steering, acceleration)
pub const CONTROL_DIM: usize = 2;

/// Vehicle state in the vehicle's local frame at the time of measurement
///
/// `x`, `y` and `psi` are zero by convention when the reference path has
/// already been expressed relative to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    pub psi: f64,
    /// speed [distance/s]
    pub v: f64,
    /// cross-track error
    pub cte: f64,
    /// heading error [rad]
    pub epsi: f64,
}

impl VehicleState {
    pub fn new(x: f64, y: f64, psi: f64, v: f64, cte: f64, epsi: f64) -> Self {
        Self { x, y, psi, v, cte, epsi }
    }

    /// State of a vehicle sitting at the origin of its own frame
    pub fn local(v: f64, cte: f64, epsi: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, v, cte, epsi)
    }

    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [self.x, self.y, self.psi, self.v, self.cte, self.epsi]
    }

    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::from_column_slice(&self.to_array())
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl From<[f64; STATE_DIM]> for VehicleState {
    fn from(a: [f64; STATE_DIM]) -> Self {
        Self::new(a[0], a[1], a[2], a[3], a[4], a[5])
    }
}

impl From<Vector6<f64>> for VehicleState {
    fn from(v: Vector6<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

/// Actuator command for an Ackermann-steered vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actuation {
    /// steering angle [rad]
    pub steering: f64,
    /// acceleration / throttle in actuator units
    pub acceleration: f64,
}

impl Actuation {
    pub fn new(steering: f64, acceleration: f64) -> Self {
        Self { steering, acceleration }
    }

    pub fn zero() -> Self {
        Self { steering: 0.0, acceleration: 0.0 }
    }
}

impl Default for Actuation {
    fn default() -> Self {
        Self::zero()
    }
}
