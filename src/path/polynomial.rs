//! Polynomial reference paths
//!
//! The controller tracks a cubic `y = c0 + c1 x + c2 x² + c3 x³` fitted to
//! the next few waypoints in the vehicle frame.

use nalgebra::{DMatrix, DVector};

use crate::common::{MpcError, MpcResult};

/// Cubic reference path `y(x)` with analytic derivatives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicPolynomial {
    coeffs: [f64; 4],
}

impl CubicPolynomial {
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Self { coeffs: [c0, c1, c2, c3] }
    }

    /// Straight line along the x axis
    pub fn zero() -> Self {
        Self { coeffs: [0.0; 4] }
    }

    /// Build from a fitted coefficient vector, lowest power first.
    ///
    /// Missing high-order terms are treated as zero; extra terms are rejected.
    pub fn from_slice(coeffs: &[f64]) -> MpcResult<Self> {
        if coeffs.len() > 4 {
            return Err(MpcError::DegenerateInput(format!(
                "expected at most 4 coefficients for a cubic, got {}",
                coeffs.len()
            )));
        }
        let mut c = [0.0; 4];
        c[..coeffs.len()].copy_from_slice(coeffs);
        Ok(Self { coeffs: c })
    }

    pub fn coefficients(&self) -> [f64; 4] {
        self.coeffs
    }

    pub fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    pub fn eval(&self, x: f64) -> f64 {
        let [c0, c1, c2, c3] = self.coeffs;
        c0 + x * (c1 + x * (c2 + x * c3))
    }

    /// dy/dx
    pub fn derivative(&self, x: f64) -> f64 {
        let [_, c1, c2, c3] = self.coeffs;
        c1 + 2.0 * c2 * x + 3.0 * c3 * x * x
    }

    /// d²y/dx²
    pub fn second_derivative(&self, x: f64) -> f64 {
        2.0 * self.coeffs[2] + 6.0 * self.coeffs[3] * x
    }

    /// d³y/dx³
    pub fn third_derivative(&self) -> f64 {
        6.0 * self.coeffs[3]
    }

    /// Tangent direction of the path at `x` [rad]
    pub fn desired_heading(&self, x: f64) -> f64 {
        self.derivative(x).atan()
    }

    /// Signed curvature `y'' / (1 + y'²)^1.5`
    pub fn curvature(&self, x: f64) -> f64 {
        let d = self.derivative(x);
        self.second_derivative(x) / (1.0 + d * d).powf(1.5)
    }
}

impl Default for CubicPolynomial {
    fn default() -> Self {
        Self::zero()
    }
}

/// Evaluate a polynomial given its coefficients, lowest power first
pub fn polyeval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Least-squares polynomial fit of `order` through `(xs, ys)`
///
/// Solved with a Householder QR of the Vandermonde matrix. Returns the
/// coefficients lowest power first.
pub fn polyfit(xs: &[f64], ys: &[f64], order: usize) -> MpcResult<DVector<f64>> {
    if xs.len() != ys.len() {
        return Err(MpcError::DegenerateInput(format!(
            "x and y point counts differ ({} vs {})",
            xs.len(),
            ys.len()
        )));
    }
    if order < 1 {
        return Err(MpcError::DegenerateInput("polynomial order must be at least 1".to_string()));
    }
    if xs.len() < order + 1 {
        return Err(MpcError::DegenerateInput(format!(
            "need at least {} points for an order {} fit, got {}",
            order + 1,
            order,
            xs.len()
        )));
    }

    let rows = xs.len();
    let cols = order + 1;
    let mut a = DMatrix::<f64>::zeros(rows, cols);
    for (j, &x) in xs.iter().enumerate() {
        a[(j, 0)] = 1.0;
        for i in 0..order {
            a[(j, i + 1)] = a[(j, i)] * x;
        }
    }
    let b = DVector::from_column_slice(ys);

    let qr = a.qr();
    let qtb = qr.q().transpose() * b;
    let coeffs = qr
        .r()
        .solve_upper_triangular(&qtb)
        .ok_or_else(|| MpcError::DegenerateInput("waypoints do not determine a unique fit".to_string()))?;

    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(MpcError::DegenerateInput("polynomial fit produced non-finite coefficients".to_string()));
    }
    Ok(coeffs)
}
