//! Closed-loop simulation helpers
//!
//! A global-frame kinematic bicycle standing in for the vehicle, a synthetic
//! track and a delay line for commands.

use std::collections::VecDeque;

use nalgebra::DMatrix;

use crate::common::{Actuation, MotionModel};
use crate::telemetry::Telemetry;

/// Vehicle pose and speed in the world frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantState {
    pub x: f64,
    pub y: f64,
    pub psi: f64,
    /// [m/s]
    pub v: f64,
}

impl PlantState {
    pub fn new(x: f64, y: f64, psi: f64, v: f64) -> Self {
        PlantState { x, y, psi, v }
    }
}

/// Kinematic bicycle that never drives backwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePlant {
    pub lf: f64,
}

impl VehiclePlant {
    pub fn new(lf: f64) -> Self {
        VehiclePlant { lf }
    }
}

impl MotionModel for VehiclePlant {
    type State = PlantState;
    type Control = Actuation;

    fn propagate(&self, s: &PlantState, u: &Actuation, dt: f64) -> PlantState {
        PlantState {
            x: s.x + s.v * s.psi.cos() * dt,
            y: s.y + s.v * s.psi.sin() * dt,
            psi: s.psi + s.v / self.lf * u.steering * dt,
            v: (s.v + u.acceleration * dt).max(0.0),
        }
    }

    fn jacobian_state(&self, s: &PlantState, u: &Actuation, dt: f64) -> DMatrix<f64> {
        let (sin, cos) = s.psi.sin_cos();
        let mut jac = DMatrix::<f64>::identity(4, 4);
        jac[(0, 2)] = -s.v * sin * dt;
        jac[(0, 3)] = cos * dt;
        jac[(1, 2)] = s.v * cos * dt;
        jac[(1, 3)] = sin * dt;
        jac[(2, 3)] = u.steering * dt / self.lf;
        if s.v + u.acceleration * dt <= 0.0 {
            jac[(3, 3)] = 0.0;
        }
        jac
    }
}

/// Waypoint polyline the simulated vehicle follows
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Track {
    /// Gently winding road along +x
    pub fn sine(length: f64, spacing: f64, amplitude: f64, wavelength: f64) -> Self {
        let count = (length / spacing).floor() as usize + 1;
        let xs: Vec<f64> = (0..count).map(|i| i as f64 * spacing).collect();
        let ys = xs
            .iter()
            .map(|x| amplitude * (2.0 * std::f64::consts::PI * x / wavelength).sin())
            .collect();
        Track { xs, ys }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Index of the waypoint closest to `(x, y)`
    pub fn nearest(&self, x: f64, y: f64) -> usize {
        let dist = |i: usize| (self.xs[i] - x).powi(2) + (self.ys[i] - y).powi(2);
        (0..self.len())
            .min_by(|&a, &b| dist(a).total_cmp(&dist(b)))
            .unwrap_or(0)
    }

    /// Up to `count` waypoints starting just behind the vehicle
    pub fn ahead(&self, x: f64, y: f64, count: usize) -> (Vec<f64>, Vec<f64>) {
        let start = self.nearest(x, y).saturating_sub(1);
        let end = (start + count).min(self.len());
        (self.xs[start..end].to_vec(), self.ys[start..end].to_vec())
    }

    /// Telemetry the simulator would send for this pose
    pub fn telemetry(&self, state: &PlantState, count: usize, mps_to_mph: f64) -> Telemetry {
        let (ptsx, ptsy) = self.ahead(state.x, state.y, count);
        Telemetry { ptsx, ptsy, x: state.x, y: state.y, psi: state.psi, speed: state.v * mps_to_mph }
    }
}

/// Commands waiting for the actuation delay to pass
#[derive(Debug, Clone)]
pub struct CommandDelay {
    delay: f64,
    pending: VecDeque<(f64, Actuation)>,
    active: Actuation,
}

impl CommandDelay {
    pub fn new(delay: f64) -> Self {
        CommandDelay { delay, pending: VecDeque::new(), active: Actuation::zero() }
    }

    pub fn push(&mut self, now: f64, cmd: Actuation) {
        self.pending.push_back((now + self.delay, cmd));
    }

    /// Command acting on the vehicle at time `now`
    pub fn active(&mut self, now: f64) -> Actuation {
        while let Some(&(at, cmd)) = self.pending.front() {
            if at > now {
                break;
            }
            self.active = cmd;
            self.pending.pop_front();
        }
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_straight_and_no_reverse() {
        let plant = VehiclePlant::new(2.67);
        let s = PlantState::new(0.0, 0.0, 0.0, 10.0);
        let next = plant.propagate(&s, &Actuation::new(0.0, -1.0), 0.1);
        assert!((next.x - 1.0).abs() < 1e-12);
        assert!((next.v - 9.9).abs() < 1e-12);

        let slow = PlantState::new(0.0, 0.0, 0.0, 0.05);
        assert_eq!(plant.propagate(&slow, &Actuation::new(0.0, -1.0), 0.1).v, 0.0);
    }

    #[test]
    fn test_plant_jacobian_matches_finite_differences() {
        let plant = VehiclePlant::new(2.67);
        let s = PlantState::new(1.0, 2.0, 0.4, 8.0);
        let u = Actuation::new(0.1, 0.5);
        let dt = 0.05;
        let jac = plant.jacobian_state(&s, &u, dt);
        let h = 1e-6;
        let as_vec = |p: PlantState| [p.x, p.y, p.psi, p.v];
        for j in 0..4 {
            let mut sp = as_vec(s);
            let mut sm = as_vec(s);
            sp[j] += h;
            sm[j] -= h;
            let fp = as_vec(plant.propagate(&PlantState::new(sp[0], sp[1], sp[2], sp[3]), &u, dt));
            let fm = as_vec(plant.propagate(&PlantState::new(sm[0], sm[1], sm[2], sm[3]), &u, dt));
            for i in 0..4 {
                let fd = (fp[i] - fm[i]) / (2.0 * h);
                assert!((jac[(i, j)] - fd).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_track_lookahead() {
        let track = Track::sine(100.0, 5.0, 0.0, 50.0);
        assert_eq!(track.len(), 21);
        assert_eq!(track.nearest(21.0, 0.5), 4);
        let (xs, _) = track.ahead(21.0, 0.5, 6);
        assert_eq!(xs, vec![15.0, 20.0, 25.0, 30.0, 35.0, 40.0]);
        let (xs, _) = track.ahead(99.0, 0.0, 6);
        assert_eq!(xs.len(), 2);
    }

    #[test]
    fn test_command_delay() {
        let mut delay = CommandDelay::new(0.1);
        delay.push(0.0, Actuation::new(0.2, 1.0));
        assert_eq!(delay.active(0.05), Actuation::zero());
        assert_eq!(delay.active(0.1), Actuation::new(0.2, 1.0));
        delay.push(0.1, Actuation::new(-0.1, 0.0));
        assert_eq!(delay.active(0.15), Actuation::new(0.2, 1.0));
        assert_eq!(delay.active(0.3), Actuation::new(-0.1, 0.0));
    }
}
