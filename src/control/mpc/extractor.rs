//! Commands and diagnostics read back from a solved decision vector

use itertools::Itertools;

use super::layout::DecisionLayout;
use crate::common::Actuation;

/// Position inside the control sequence that is active once the actuation
/// delay has elapsed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyCompensation {
    /// Whole control steps covered by the delay
    pub position: usize,
    /// Fraction of the following step, in [0, 1)
    pub offset: f64,
}

impl LatencyCompensation {
    pub fn new(latency: f64, dt: f64) -> Self {
        let steps = latency / dt;
        let position = steps.floor();
        LatencyCompensation { position: position as usize, offset: steps - position }
    }

    /// Linear interpolation between `raw[position]` and `raw[position + 1]`
    pub fn interpolate(&self, raw: &[f64]) -> f64 {
        match (raw.get(self.position), raw.get(self.position + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * self.offset,
            (Some(&a), None) => a,
            _ => raw.last().copied().unwrap_or(0.0),
        }
    }
}

/// Actuation to apply after the delay, from the optimized control blocks
pub fn latency_actuation(x: &[f64], layout: &DecisionLayout, latency: &LatencyCompensation) -> Actuation {
    let steps = layout.steps();
    let delta = &x[layout.delta_start()..layout.delta_start() + steps];
    let accel = &x[layout.a_start()..layout.a_start() + steps];
    Actuation::new(latency.interpolate(delta), latency.interpolate(accel))
}

/// Predicted positions over the horizon
pub fn predicted_path(x: &[f64], layout: &DecisionLayout) -> (Vec<f64>, Vec<f64>) {
    let n = layout.horizon();
    (
        x[layout.x_start()..layout.x_start() + n].to_vec(),
        x[layout.y_start()..layout.y_start() + n].to_vec(),
    )
}

/// Mean squared curvature of a sampled trajectory
///
/// Curvature from central differences at the interior samples, integrated
/// with the trapezoid rule plus a rectangle at each end, normalized by the
/// horizon duration `n * dt`. Samples without motion count as straight.
pub fn trajectory_mean_squared_curvature(xs: &[f64], ys: &[f64], dt: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 3 || !(dt > 0.0) {
        return 0.0;
    }

    let curvature_sq: Vec<f64> = xs
        .iter()
        .zip(ys.iter())
        .tuple_windows()
        .map(|((&x0, &y0), (&x1, &y1), (&x2, &y2))| {
            let dx = (x2 - x0) / (2.0 * dt);
            let dy = (y2 - y0) / (2.0 * dt);
            let d2x = (x2 - 2.0 * x1 + x0) / (dt * dt);
            let d2y = (y2 - 2.0 * y1 + y0) / (dt * dt);
            let speed_sq = dx * dx + dy * dy;
            if speed_sq > 0.0 {
                ((dx * d2y - dy * d2x) / speed_sq.powf(1.5)).powi(2)
            } else {
                0.0
            }
        })
        .collect();

    let first = curvature_sq.first().copied().unwrap_or(0.0);
    let last = curvature_sq.last().copied().unwrap_or(0.0);
    let inner: f64 = curvature_sq
        .iter()
        .tuple_windows()
        .map(|(a, b)| (a + b) * dt / 2.0)
        .sum();

    (first * dt + inner + last * dt) / (n as f64 * dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_split() {
        let lat = LatencyCompensation::new(0.1, 0.05);
        assert_eq!(lat.position, 2);
        assert!(lat.offset.abs() < 1e-12);

        let lat = LatencyCompensation::new(0.075, 0.05);
        assert_eq!(lat.position, 1);
        assert!((lat.offset - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interpolation_endpoints() {
        let raw = [0.1, 0.3, 0.7, 0.2];
        assert_eq!(LatencyCompensation::new(0.0, 0.1).interpolate(&raw), 0.1);
        assert!((LatencyCompensation::new(0.1, 0.1).interpolate(&raw) - 0.3).abs() < 1e-12);
        assert!((LatencyCompensation::new(0.15, 0.1).interpolate(&raw) - 0.5).abs() < 1e-12);
        assert_eq!(LatencyCompensation { position: 3, offset: 0.5 }.interpolate(&raw), 0.2);
        assert_eq!(LatencyCompensation::new(0.0, 0.1).interpolate(&[]), 0.0);
    }

    #[test]
    fn test_actuation_and_path_from_blocks() {
        let layout = DecisionLayout::new(4);
        let mut x = vec![0.0; layout.num_variables()];
        for t in 0..4 {
            x[layout.x_start() + t] = t as f64;
            x[layout.y_start() + t] = -(t as f64);
        }
        x[layout.delta_start()] = 0.2;
        x[layout.delta_start() + 1] = 0.4;
        x[layout.a_start()] = -1.0;
        x[layout.a_start() + 1] = 1.0;

        let lat = LatencyCompensation { position: 0, offset: 0.25 };
        let act = latency_actuation(&x, &layout, &lat);
        assert!((act.steering - 0.25).abs() < 1e-12);
        assert!((act.acceleration + 0.5).abs() < 1e-12);

        let (px, py) = predicted_path(&x, &layout);
        assert_eq!(px, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(py, vec![0.0, -1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_straight_trajectory_has_no_curvature() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.3 * x + 1.0).collect();
        assert!(trajectory_mean_squared_curvature(&xs, &ys, 0.05).abs() < 1e-12);
        assert_eq!(trajectory_mean_squared_curvature(&[0.0; 5], &[0.0; 5], 0.05), 0.0);
    }

    #[test]
    fn test_circle_curvature() {
        // radius 20 circle driven at constant speed
        let (r, dt, omega) = (20.0, 0.05, 0.5);
        let n = 30;
        let xs: Vec<f64> = (0..n).map(|i| r * (omega * i as f64 * dt).sin()).collect();
        let ys: Vec<f64> = (0..n).map(|i| r * (1.0 - (omega * i as f64 * dt).cos())).collect();
        let mean = trajectory_mean_squared_curvature(&xs, &ys, dt);
        // (n - 1) dt of integrated length over n dt of normalization
        let expected = (1.0 / (r * r)) * (n as f64 - 1.0) / n as f64;
        assert!((mean - expected).abs() < 1e-5, "{} vs {}", mean, expected);
    }
}
