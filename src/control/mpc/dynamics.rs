//! Discrete kinematic bicycle model in the path-tracking frame
//!
//! One forward-Euler step maps `(x, y, psi, v, cte, epsi)` and the controls
//! `(delta, a)` to the next state:
//!
//! ```text
//! x'    = x + v cos(psi) dt
//! y'    = y + v sin(psi) dt
//! psi'  = psi + v / Lf * delta * dt
//! v'    = v + a dt
//! cte'  = (f(x) - y) + v sin(epsi) dt
//! epsi' = (psi - atan(f'(x))) + v * delta / Lf * dt
//! ```
//!
//! where `f` is the reference polynomial. First and second derivatives are
//! given in closed form so the optimizer gets exact sparse derivatives.

use nalgebra::{SMatrix, SVector};

use crate::path::CubicPolynomial;

/// Distance between the front axle and the center of gravity [m]
pub const LF: f64 = 2.67;

// Local indices inside a stage vector
pub const X: usize = 0;
pub const Y: usize = 1;
pub const PSI: usize = 2;
pub const V: usize = 3;
pub const CTE: usize = 4;
pub const EPSI: usize = 5;
pub const DELTA: usize = 6;
pub const ACCEL: usize = 7;

/// `(x, y, psi, v, cte, epsi, delta, a)` of one horizon step
pub type StageVector = SVector<f64, 8>;

/// Stage entries each predicted component depends on
pub const JACOBIAN_PATTERN: [&[usize]; 6] = [
    &[X, PSI, V],
    &[Y, PSI, V],
    &[PSI, V, DELTA],
    &[V, ACCEL],
    &[X, Y, V, EPSI],
    &[X, PSI, V, DELTA],
];

/// Lower-triangle entries that can be nonzero in any component's Hessian
pub const HESSIAN_PATTERN: [(usize, usize); 6] =
    [(X, X), (PSI, PSI), (V, PSI), (EPSI, V), (EPSI, EPSI), (DELTA, V)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBicycle {
    pub lf: f64,
    pub dt: f64,
}

impl KinematicBicycle {
    pub fn new(lf: f64, dt: f64) -> Self {
        KinematicBicycle { lf, dt }
    }

    /// Next state predicted from a stage
    pub fn predict(&self, z: &StageVector, path: &CubicPolynomial) -> SVector<f64, 6> {
        let dt = self.dt;
        let (x, y, psi, v, epsi) = (z[X], z[Y], z[PSI], z[V], z[EPSI]);
        let (delta, a) = (z[DELTA], z[ACCEL]);

        SVector::<f64, 6>::new(
            x + v * psi.cos() * dt,
            y + v * psi.sin() * dt,
            psi + v / self.lf * delta * dt,
            v + a * dt,
            (path.eval(x) - y) + v * epsi.sin() * dt,
            (psi - path.desired_heading(x)) + v * delta / self.lf * dt,
        )
    }

    /// Jacobian of [`predict`](Self::predict) with respect to the stage
    pub fn jacobian(&self, z: &StageVector, path: &CubicPolynomial) -> SMatrix<f64, 6, 8> {
        let dt = self.dt;
        let (x, psi, v, epsi, delta) = (z[X], z[PSI], z[V], z[EPSI], z[DELTA]);
        let d1 = path.derivative(x);
        let d2 = path.second_derivative(x);
        let (s, c) = psi.sin_cos();

        let mut jac = SMatrix::<f64, 6, 8>::zeros();
        jac[(0, X)] = 1.0;
        jac[(0, PSI)] = -v * s * dt;
        jac[(0, V)] = c * dt;

        jac[(1, Y)] = 1.0;
        jac[(1, PSI)] = v * c * dt;
        jac[(1, V)] = s * dt;

        jac[(2, PSI)] = 1.0;
        jac[(2, V)] = delta * dt / self.lf;
        jac[(2, DELTA)] = v * dt / self.lf;

        jac[(3, V)] = 1.0;
        jac[(3, ACCEL)] = dt;

        jac[(4, X)] = d1;
        jac[(4, Y)] = -1.0;
        jac[(4, V)] = epsi.sin() * dt;
        jac[(4, EPSI)] = v * epsi.cos() * dt;

        jac[(5, X)] = -d2 / (1.0 + d1 * d1);
        jac[(5, PSI)] = 1.0;
        jac[(5, V)] = delta * dt / self.lf;
        jac[(5, DELTA)] = v * dt / self.lf;

        jac
    }

    /// `Σ_k w_k ∇²predict_k`, values in [`HESSIAN_PATTERN`] order
    pub fn weighted_hessian(&self, z: &StageVector, path: &CubicPolynomial, w: &[f64; 6]) -> [f64; 6] {
        let dt = self.dt;
        let (x, psi, v, epsi) = (z[X], z[PSI], z[V], z[EPSI]);
        let d1 = path.derivative(x);
        let d2 = path.second_derivative(x);
        let d3 = path.third_derivative();
        let (s, c) = psi.sin_cos();
        let q = 1.0 + d1 * d1;

        let xx = w[4] * d2 - w[5] * (d3 * q - 2.0 * d1 * d2 * d2) / (q * q);
        let psi_psi = -w[0] * v * c * dt - w[1] * v * s * dt;
        let v_psi = -w[0] * s * dt + w[1] * c * dt;
        let epsi_v = w[4] * epsi.cos() * dt;
        let epsi_epsi = -w[4] * v * epsi.sin() * dt;
        let delta_v = (w[2] + w[5]) * dt / self.lf;

        [xx, psi_psi, v_psi, epsi_v, epsi_epsi, delta_v]
    }
}
