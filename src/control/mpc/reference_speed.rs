//! Curvature-adaptive cruising speed
//!
//! The mean squared curvature of the reference polynomial over the fitted
//! domain is mapped through a logistic curve: straight roads get the maximum
//! speed, sharp bends the minimum.

use serde::Deserialize;

use crate::path::CubicPolynomial;

/// Shape of the curvature -> speed map
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ReferenceSpeedParams {
    /// Speed on sharp bends
    pub min_speed: f64,
    /// Speed on straights
    pub max_speed: f64,
    /// Logistic steepness
    pub steepness: f64,
    /// Mean squared curvature at which speed is halfway between the limits
    pub midpoint: f64,
    /// Riemann sum resolution
    pub samples: usize,
}

impl Default for ReferenceSpeedParams {
    fn default() -> Self {
        ReferenceSpeedParams {
            min_speed: 20.0,
            max_speed: 50.0,
            steepness: 5.0e4,
            midpoint: 1.2e-4,
            samples: 1000,
        }
    }
}

impl ReferenceSpeedParams {
    /// Target speed for a given mean squared curvature
    pub fn speed_for(&self, mean_sq_curvature: f64) -> f64 {
        let span = self.max_speed - self.min_speed;
        self.max_speed - span / (1.0 + (-self.steepness * (mean_sq_curvature - self.midpoint)).exp())
    }

    /// Mean of `κ(x)²` over `[min_x, max_x]`
    ///
    /// A reversed domain is reordered; a zero-length one falls back to the
    /// curvature at that point.
    pub fn mean_squared_curvature(&self, path: &CubicPolynomial, min_x: f64, max_x: f64) -> f64 {
        let (lo, hi) = if min_x <= max_x { (min_x, max_x) } else { (max_x, min_x) };
        let length = hi - lo;
        if !(length > 0.0) || self.samples == 0 {
            return path.curvature(lo).powi(2);
        }

        let dx = length / self.samples as f64;
        let integral: f64 = (0..self.samples)
            .map(|i| path.curvature(lo + i as f64 * dx).powi(2) * dx)
            .sum();
        integral / length
    }

    /// Target speed for the path over the given domain
    pub fn target_speed(&self, path: &CubicPolynomial, min_x: f64, max_x: f64) -> f64 {
        self.speed_for(self.mean_squared_curvature(path, min_x, max_x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_path_gets_near_max_speed() {
        let params = ReferenceSpeedParams::default();
        let v = params.target_speed(&CubicPolynomial::new(1.0, 0.3, 0.0, 0.0), 0.0, 50.0);
        // logistic is not exactly saturated at zero curvature
        assert!(v > 49.0 && v <= 50.0, "v = {}", v);
        assert!((v - params.speed_for(0.0)).abs() < 1e-12);
    }

    #[test]
    fn test_tight_bend_gets_min_speed() {
        let params = ReferenceSpeedParams::default();
        let v = params.target_speed(&CubicPolynomial::new(0.0, 0.0, 0.05, 0.0), 0.0, 30.0);
        assert!((v - 20.0).abs() < 1e-6, "v = {}", v);
    }

    #[test]
    fn test_speed_map_monotone_and_bounded() {
        let params = ReferenceSpeedParams::default();
        let mut last = f64::INFINITY;
        for i in 0..200 {
            let c = i as f64 * 2.0e-6;
            let v = params.speed_for(c);
            assert!(v <= last + 1e-12);
            assert!(v >= params.min_speed && v <= params.max_speed);
            last = v;
        }
    }

    #[test]
    fn test_constant_curvature_mean() {
        // y = 0.01 x² has curvature 0.02 at the origin
        let params = ReferenceSpeedParams { samples: 10_000, ..Default::default() };
        let path = CubicPolynomial::new(0.0, 0.0, 0.01, 0.0);
        let mean = params.mean_squared_curvature(&path, -0.01, 0.01);
        assert!((mean - 4.0e-4).abs() < 1e-8);
    }

    #[test]
    fn test_degenerate_domains() {
        let params = ReferenceSpeedParams::default();
        let path = CubicPolynomial::new(0.0, 0.2, 0.003, -0.0001);
        let forward = params.mean_squared_curvature(&path, 0.0, 40.0);
        let reversed = params.mean_squared_curvature(&path, 40.0, 0.0);
        assert_eq!(forward, reversed);

        let point = params.mean_squared_curvature(&path, 5.0, 5.0);
        assert!((point - path.curvature(5.0).powi(2)).abs() < 1e-15);
    }
}
