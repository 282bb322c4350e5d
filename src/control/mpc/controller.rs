//! Receding-horizon path tracking controller
//!
//! Each call to [`MpcController::solve`] builds the tracking problem for the
//! measured state and the fitted reference polynomial, solves it and reads
//! back the delay-compensated command. A failed solve never raises: the
//! output carries the solver status, zero actuation, empty predictions and a
//! NaN cost, and the caller decides how to fall back.

use std::time::Instant;

use log::{info, warn};

use super::extractor::{
    latency_actuation, predicted_path, trajectory_mean_squared_curvature, LatencyCompensation,
};
use super::layout::DecisionLayout;
use super::problem::MpcProblem;
use crate::common::{Actuation, Controller, MpcResult, VehicleState};
use crate::config::MpcConfig;
use crate::nlp::{InteriorPointSolver, SolveStatus};
use crate::path::CubicPolynomial;

/// Reference for one tick: fitted path and the x range it was fitted over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingReference {
    pub path: CubicPolynomial,
    pub min_x: f64,
    pub max_x: f64,
}

impl TrackingReference {
    pub fn new(path: CubicPolynomial, min_x: f64, max_x: f64) -> Self {
        TrackingReference { path, min_x, max_x }
    }
}

/// Result of one control tick
#[derive(Debug, Clone, PartialEq)]
pub struct MpcOutput {
    /// [rad], within the steering limit
    pub steering: f64,
    pub acceleration: f64,
    pub predicted_x: Vec<f64>,
    pub predicted_y: Vec<f64>,
    /// Objective value, NaN when the solve failed
    pub cost: f64,
    pub target_speed: f64,
    pub status: SolveStatus,
    /// Mean squared curvature of the reference polynomial
    pub path_curvature: f64,
    /// Mean squared curvature of the predicted trajectory, diagnostic only
    pub trajectory_curvature: f64,
    pub iterations: usize,
}

impl MpcOutput {
    fn failed(status: SolveStatus, target_speed: f64, path_curvature: f64, iterations: usize) -> Self {
        MpcOutput {
            steering: 0.0,
            acceleration: 0.0,
            predicted_x: Vec::new(),
            predicted_y: Vec::new(),
            cost: f64::NAN,
            target_speed,
            status,
            path_curvature,
            trajectory_curvature: f64::NAN,
            iterations,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn actuation(&self) -> Actuation {
        Actuation::new(self.steering, self.acceleration)
    }
}

/// Nonlinear MPC controller for a kinematic bicycle
///
/// Horizon, timestep and latency are fixed at construction. `solve` takes
/// `&mut self`, so one instance runs one solve at a time; control several
/// vehicles with one instance each.
#[derive(Debug, Clone)]
pub struct MpcController {
    config: MpcConfig,
    layout: DecisionLayout,
    latency: LatencyCompensation,
    solver: InteriorPointSolver,
    solves: usize,
    failures: usize,
}

impl MpcController {
    pub fn new(config: MpcConfig) -> MpcResult<Self> {
        config.validate()?;
        let layout = DecisionLayout::new(config.horizon);
        let latency = LatencyCompensation::new(config.latency, config.dt);
        let solver = InteriorPointSolver::new(config.solver.clone());
        info!(
            "MPC controller: N = {}, dt = {} s, latency = {} s ({} steps + {:.2})",
            config.horizon, config.dt, config.latency, latency.position, latency.offset
        );
        Ok(MpcController { config, layout, latency, solver, solves: 0, failures: 0 })
    }

    pub fn config(&self) -> &MpcConfig {
        &self.config
    }

    pub fn layout(&self) -> &DecisionLayout {
        &self.layout
    }

    pub fn latency(&self) -> &LatencyCompensation {
        &self.latency
    }

    /// Number of solves run and how many of them failed
    pub fn statistics(&self) -> (usize, usize) {
        (self.solves, self.failures)
    }

    /// Target speed for a reference path over `[min_x, max_x]`
    pub fn target_speed(&self, path: &CubicPolynomial, min_x: f64, max_x: f64) -> f64 {
        self.config.reference_speed.target_speed(path, min_x, max_x)
    }

    /// Solve one tick
    pub fn solve(&mut self, state: &VehicleState, path: &CubicPolynomial, min_x: f64, max_x: f64) -> MpcOutput {
        let start = Instant::now();
        let speed_map = &self.config.reference_speed;
        let path_curvature = speed_map.mean_squared_curvature(path, min_x, max_x);
        let target_speed = speed_map.speed_for(path_curvature);

        let problem = MpcProblem::new(&self.config, *state, *path, target_speed);
        let solution = self.solver.solve(&problem);
        self.solves += 1;

        if !solution.status.is_success() {
            self.failures += 1;
            warn!(
                "MPC solve failed ({}) after {} iterations, target speed {:.2}",
                solution.status, solution.iterations, target_speed
            );
            return MpcOutput::failed(solution.status, target_speed, path_curvature, solution.iterations);
        }

        let x = solution.x.as_slice();
        let actuation = latency_actuation(x, &self.layout, &self.latency);
        let (predicted_x, predicted_y) = predicted_path(x, &self.layout);
        let trajectory_curvature = trajectory_mean_squared_curvature(&predicted_x, &predicted_y, self.config.dt);

        info!(
            "Cost {:.4} steering {:.4} accel {:.4} target speed {:.2} curvature {:.3e} vs {:.3e} ({} it, {:.1} ms)",
            solution.objective,
            actuation.steering,
            actuation.acceleration,
            target_speed,
            path_curvature,
            trajectory_curvature,
            solution.iterations,
            start.elapsed().as_secs_f64() * 1e3
        );

        MpcOutput {
            steering: actuation.steering,
            acceleration: actuation.acceleration,
            predicted_x,
            predicted_y,
            cost: solution.objective,
            target_speed,
            status: solution.status,
            path_curvature,
            trajectory_curvature,
            iterations: solution.iterations,
        }
    }
}

impl Controller for MpcController {
    type State = VehicleState;
    type Reference = TrackingReference;
    type Output = MpcOutput;

    fn compute(&mut self, state: &VehicleState, reference: &TrackingReference) -> MpcOutput {
        self.solve(state, &reference.path, reference.min_x, reference.max_x)
    }

    fn reset(&mut self) {
        self.solves = 0;
        self.failures = 0;
    }
}
