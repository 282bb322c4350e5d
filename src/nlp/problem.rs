//! Interface between an optimization model and the NLP solver

/// Bounds at or beyond this magnitude are treated as infinite
pub const INFINITE_BOUND: f64 = 1.0e19;

/// Smooth nonlinear program
///
/// ```text
/// min f(x)  s.t.  g_l <= g(x) <= g_u,  x_l <= x <= x_u
/// ```
///
/// Rows with `g_l == g_u` are equality constraints. Derivatives are given in
/// sparse triplet form: the structure once, the values at every evaluation,
/// in the same order. The Hessian of the Lagrangian
/// `obj_factor * ∇²f + Σ λ_i ∇²g_i` is given as its lower triangle
/// (`row >= col`); repeated entries are summed.
pub trait NlpProblem {
    fn num_variables(&self) -> usize;

    fn num_constraints(&self) -> usize;

    fn variable_bounds(&self, x_l: &mut [f64], x_u: &mut [f64]);

    fn constraint_bounds(&self, g_l: &mut [f64], g_u: &mut [f64]);

    /// Starting point, need not be feasible
    fn initial_point(&self, x: &mut [f64]);

    fn objective(&self, x: &[f64]) -> f64;

    fn objective_gradient(&self, x: &[f64], grad: &mut [f64]);

    fn constraints(&self, x: &[f64], g: &mut [f64]);

    /// `(row, col)` pairs of the constraint Jacobian
    fn jacobian_structure(&self) -> Vec<(usize, usize)>;

    fn jacobian_values(&self, x: &[f64], values: &mut [f64]);

    /// `(row, col)` pairs of the lower triangle of the Lagrangian Hessian
    fn hessian_structure(&self) -> Vec<(usize, usize)>;

    fn hessian_values(&self, x: &[f64], obj_factor: f64, lambda: &[f64], values: &mut [f64]);
}

/// Whether a lower bound is finite
pub fn has_lower(bound: f64) -> bool {
    bound > -INFINITE_BOUND
}

/// Whether an upper bound is finite
pub fn has_upper(bound: f64) -> bool {
    bound < INFINITE_BOUND
}
