//! Telemetry received from the simulator and the replies sent back

use serde::{Deserialize, Serialize};

use crate::common::{MpcResult, VehicleState};
use crate::control::{MpcOutput, TrackingReference};
use crate::path::{polyfit, to_vehicle_frame, CubicPolynomial};

/// mph -> m/s
pub const MPH_TO_MPS: f64 = 1609.34 / 3600.0;

/// Order of the reference polynomial fitted to the waypoints
pub const FIT_ORDER: usize = 3;

/// Vehicle pose and upcoming waypoints, global frame
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub ptsx: Vec<f64>,
    pub ptsy: Vec<f64>,
    pub x: f64,
    pub y: f64,
    /// [rad]
    pub psi: f64,
    /// [mph]
    pub speed: f64,
}

/// What the controller needs for one tick, derived from a telemetry message
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInputs {
    pub state: VehicleState,
    pub reference: TrackingReference,
    /// Waypoints in the vehicle frame
    pub waypoints_x: Vec<f64>,
    pub waypoints_y: Vec<f64>,
}

impl Telemetry {
    /// Waypoints into the vehicle frame, cubic fit and initial errors
    pub fn controller_inputs(&self) -> MpcResult<ControllerInputs> {
        let (xs, ys) = to_vehicle_frame(self.x, self.y, self.psi, &self.ptsx, &self.ptsy)?;
        let coeffs = polyfit(&xs, &ys, FIT_ORDER)?;
        let path = CubicPolynomial::from_slice(coeffs.as_slice())?;

        let cte = path.eval(0.0);
        let epsi = -path.coefficients()[1].atan();
        let state = VehicleState::local(self.speed * MPH_TO_MPS, cte, epsi);

        // polyfit needs at least 4 points, so both ends exist
        let min_x = xs.first().copied().unwrap_or(0.0);
        let max_x = xs.last().copied().unwrap_or(0.0);

        Ok(ControllerInputs {
            state,
            reference: TrackingReference::new(path, min_x, max_x),
            waypoints_x: xs,
            waypoints_y: ys,
        })
    }
}

/// Reply to a telemetry message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SteerCommand {
    /// Normalized to [-1, 1], positive turns right
    pub steering_angle: f64,
    pub throttle: f64,
    /// Predicted trajectory, vehicle frame
    pub mpc_x: Vec<f64>,
    pub mpc_y: Vec<f64>,
    /// Reference waypoints, vehicle frame
    pub next_x: Vec<f64>,
    pub next_y: Vec<f64>,
}

impl SteerCommand {
    /// Command from a controller output; `max_steering` in radians
    pub fn from_output(output: &MpcOutput, max_steering: f64, inputs: &ControllerInputs) -> Self {
        SteerCommand {
            steering_angle: -output.steering / max_steering,
            throttle: output.acceleration,
            mpc_x: output.predicted_x.clone(),
            mpc_y: output.predicted_y.clone(),
            next_x: inputs.waypoints_x.clone(),
            next_y: inputs.waypoints_y.clone(),
        }
    }
}
