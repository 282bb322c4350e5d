//! Primal-dual interior-point method for smooth nonlinear programs
//!
//! Log-barrier formulation with a monotone barrier update, Newton steps on the
//! reduced KKT system and an ℓ1 exact-penalty merit line search. Two-sided
//! constraint rows get a bounded slack variable, equality rows are used
//! directly. The KKT matrix is reordered once per solve with reverse
//! Cuthill-McKee and factorized as a band matrix, which keeps the cost per
//! iteration linear in the horizon length for optimal-control problems.

use std::time::Instant;

use log::{debug, trace};
use nalgebra::DVector;

use super::banded::{BandMatrix, BandedLu};
use super::options::{SolveStatus, SolverOptions};
use super::ordering::{bandwidth, invert, reverse_cuthill_mckee};
use super::problem::{has_lower, has_upper, NlpProblem};

// Barrier update
const KAPPA_EPSILON: f64 = 10.0;
const KAPPA_MU: f64 = 0.2;
const THETA_MU: f64 = 1.5;

// Step acceptance
const TAU_MIN: f64 = 0.99;
const ARMIJO_ETA: f64 = 1e-4;
const PENALTY_RHO: f64 = 0.1;
const MAX_BACKTRACKS: usize = 40;

// Regularization
const CURVATURE_EPS: f64 = 1e-8;
const DELTA_W_FIRST: f64 = 1e-4;
const DELTA_W_MIN: f64 = 1e-20;
const DELTA_W_MAX: f64 = 1e40;
const DELTA_C: f64 = 1e-8;

// Multipliers and scaling
const KAPPA_SIGMA: f64 = 1e10;
const S_MAX: f64 = 100.0;
const CONSTR_MULT_INIT_MAX: f64 = 1e3;
const PUSH_KAPPA: f64 = 1e-2;

/// Result of [`InteriorPointSolver::solve`]
#[derive(Debug, Clone)]
pub struct NlpSolution {
    pub status: SolveStatus,
    /// Final (or last) iterate, within the original variable bounds
    pub x: DVector<f64>,
    /// Unscaled objective at `x`
    pub objective: f64,
    /// `g(x)`
    pub constraint_values: DVector<f64>,
    /// Constraint multipliers
    pub multipliers: DVector<f64>,
    pub iterations: usize,
}

/// Newton direction together with the factorization that produced it
struct Direction {
    lu: BandedLu,
    dx: DVector<f64>,
    dl: DVector<f64>,
    curvature: f64,
}

/// Sizes, bounds and KKT ordering fixed for the whole solve
struct Structure {
    n: usize,
    m: usize,
    nx: usize,
    /// Row index of each slack variable
    slack_row: Vec<usize>,
    /// Right-hand side of equality rows (unused for slack rows)
    row_target: Vec<f64>,
    row_has_slack: Vec<bool>,
    x_l: Vec<f64>,
    x_u: Vec<f64>,
    orig_l: Vec<f64>,
    orig_u: Vec<f64>,
    jac: Vec<(usize, usize)>,
    hess: Vec<(usize, usize)>,
    /// KKT index -> position in the band matrix
    inv: Vec<usize>,
    band: usize,
}

fn relax_lower(l: f64, factor: f64) -> f64 {
    if has_lower(l) { l - factor * l.abs().max(1.0) } else { l }
}

fn relax_upper(u: f64, factor: f64) -> f64 {
    if has_upper(u) { u + factor * u.abs().max(1.0) } else { u }
}

/// Move a starting value strictly inside its bounds
fn push_interior(l: f64, u: f64, v: f64) -> f64 {
    let v = if v.is_finite() { v } else { 0.0 };
    match (has_lower(l), has_upper(u)) {
        (true, true) => {
            let pl = (PUSH_KAPPA * l.abs().max(1.0)).min(PUSH_KAPPA * (u - l));
            let pu = (PUSH_KAPPA * u.abs().max(1.0)).min(PUSH_KAPPA * (u - l));
            v.max(l + pl).min(u - pu)
        }
        (true, false) => v.max(l + PUSH_KAPPA * l.abs().max(1.0)),
        (false, true) => v.min(u - PUSH_KAPPA * u.abs().max(1.0)),
        (false, false) => v,
    }
}

fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, e| acc.max(e.abs()))
}

fn l1_norm(v: &DVector<f64>) -> f64 {
    v.iter().map(|e| e.abs()).sum()
}

fn all_finite(v: &[f64]) -> bool {
    v.iter().all(|e| e.is_finite())
}

impl Structure {
    fn new<P: NlpProblem>(problem: &P, relax: f64) -> Result<Self, SolveStatus> {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let mut xl = vec![0.0; n];
        let mut xu = vec![0.0; n];
        problem.variable_bounds(&mut xl, &mut xu);
        let mut gl = vec![0.0; m];
        let mut gu = vec![0.0; m];
        problem.constraint_bounds(&mut gl, &mut gu);

        let inconsistent = |l: f64, u: f64| l.is_nan() || u.is_nan() || l > u;
        if xl.iter().zip(&xu).any(|(&l, &u)| inconsistent(l, u))
            || gl.iter().zip(&gu).any(|(&l, &u)| inconsistent(l, u))
        {
            return Err(SolveStatus::InvalidProblemDefinition);
        }

        let mut slack_row = Vec::new();
        let mut row_target = vec![0.0; m];
        let mut row_has_slack = vec![false; m];
        for i in 0..m {
            if gl[i] == gu[i] {
                if !gl[i].is_finite() || !has_lower(gl[i]) || !has_upper(gu[i]) {
                    return Err(SolveStatus::InvalidProblemDefinition);
                }
                row_target[i] = gl[i];
            } else {
                row_has_slack[i] = true;
                slack_row.push(i);
            }
        }
        let nx = n + slack_row.len();

        let mut x_l = Vec::with_capacity(nx);
        let mut x_u = Vec::with_capacity(nx);
        for j in 0..n {
            x_l.push(relax_lower(xl[j], relax));
            x_u.push(relax_upper(xu[j], relax));
        }
        for &row in &slack_row {
            x_l.push(relax_lower(gl[row], relax));
            x_u.push(relax_upper(gu[row], relax));
        }

        let jac = problem.jacobian_structure();
        let hess = problem.hessian_structure();
        if jac.iter().any(|&(r, c)| r >= m || c >= n) || hess.iter().any(|&(r, c)| r >= n || c > r) {
            return Err(SolveStatus::InvalidProblemDefinition);
        }

        let mut edges = Vec::with_capacity(hess.len() + jac.len() + slack_row.len());
        edges.extend(hess.iter().filter(|&&(r, c)| r != c).copied());
        edges.extend(jac.iter().map(|&(r, c)| (nx + r, c)));
        edges.extend(slack_row.iter().enumerate().map(|(k, &row)| (nx + row, n + k)));

        let perm = reverse_cuthill_mckee(nx + m, &edges);
        let inv = invert(&perm);
        let band = bandwidth(&inv, &edges);
        trace!("KKT dimension {} reordered to half bandwidth {}", nx + m, band);

        Ok(Structure {
            n,
            m,
            nx,
            slack_row,
            row_target,
            row_has_slack,
            x_l,
            x_u,
            orig_l: xl,
            orig_u: xu,
            jac,
            hess,
            inv,
            band,
        })
    }

    /// Objective and constraint residual `c(x)`, `None` on non-finite values
    fn evaluate<P: NlpProblem>(&self, problem: &P, x: &DVector<f64>) -> Option<(f64, DVector<f64>)> {
        let xs = &x.as_slice()[..self.n];
        let f = problem.objective(xs);
        let mut g = vec![0.0; self.m];
        problem.constraints(xs, &mut g);
        if !f.is_finite() || !all_finite(&g) {
            return None;
        }
        let mut c = DVector::from_vec(g);
        for i in 0..self.m {
            if !self.row_has_slack[i] {
                c[i] -= self.row_target[i];
            }
        }
        for (k, &row) in self.slack_row.iter().enumerate() {
            c[row] -= x[self.n + k];
        }
        Some((f, c))
    }

    fn gradient<P: NlpProblem>(&self, problem: &P, x: &DVector<f64>, scale: f64) -> DVector<f64> {
        let mut grad = vec![0.0; self.n];
        problem.objective_gradient(&x.as_slice()[..self.n], &mut grad);
        let mut full = DVector::zeros(self.nx);
        for j in 0..self.n {
            full[j] = scale * grad[j];
        }
        full
    }

    /// `Jᵀ λ` including the slack columns
    fn jt_mul(&self, jv: &[f64], lambda: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.nx);
        for (k, &(r, c)) in self.jac.iter().enumerate() {
            out[c] += jv[k] * lambda[r];
        }
        for (k, &row) in self.slack_row.iter().enumerate() {
            out[self.n + k] -= lambda[row];
        }
        out
    }

    /// Σ ln(x - l) + Σ ln(u - x), `None` outside the interior
    fn barrier(&self, x: &DVector<f64>) -> Option<f64> {
        let mut sum = 0.0;
        for j in 0..self.nx {
            if has_lower(self.x_l[j]) {
                let s = x[j] - self.x_l[j];
                if s <= 0.0 {
                    return None;
                }
                sum += s.ln();
            }
            if has_upper(self.x_u[j]) {
                let s = self.x_u[j] - x[j];
                if s <= 0.0 {
                    return None;
                }
                sum += s.ln();
            }
        }
        Some(sum)
    }

    /// ℓ1 merit value and residual at a trial point
    fn merit<P: NlpProblem>(
        &self,
        problem: &P,
        x: &DVector<f64>,
        scale: f64,
        mu: f64,
        nu: f64,
    ) -> Option<(f64, DVector<f64>)> {
        let b = self.barrier(x)?;
        let (f, c) = self.evaluate(problem, x)?;
        Some((scale * f - mu * b + nu * l1_norm(&c), c))
    }

    fn sigma(&self, x: &DVector<f64>, zl: &DVector<f64>, zu: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.nx, |j, _| {
            let mut s = 0.0;
            if has_lower(self.x_l[j]) {
                s += zl[j] / (x[j] - self.x_l[j]);
            }
            if has_upper(self.x_u[j]) {
                s += zu[j] / (self.x_u[j] - x[j]);
            }
            s
        })
    }

    /// Gradient of the barrier objective
    fn barrier_gradient(&self, grad: &DVector<f64>, x: &DVector<f64>, mu: f64) -> DVector<f64> {
        DVector::from_fn(self.nx, |j, _| {
            let mut g = grad[j];
            if has_lower(self.x_l[j]) {
                g -= mu / (x[j] - self.x_l[j]);
            }
            if has_upper(self.x_u[j]) {
                g += mu / (self.x_u[j] - x[j]);
            }
            g
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn optimality_error(
        &self,
        x: &DVector<f64>,
        grad: &DVector<f64>,
        jtl: &DVector<f64>,
        c: &DVector<f64>,
        lambda: &DVector<f64>,
        zl: &DVector<f64>,
        zu: &DVector<f64>,
        mu: f64,
    ) -> f64 {
        let dual = max_abs(&(grad + jtl - zl + zu));
        let primal = max_abs(c);

        let mut compl: f64 = 0.0;
        for j in 0..self.nx {
            if has_lower(self.x_l[j]) {
                compl = compl.max((zl[j] * (x[j] - self.x_l[j]) - mu).abs());
            }
            if has_upper(self.x_u[j]) {
                compl = compl.max((zu[j] * (self.x_u[j] - x[j]) - mu).abs());
            }
        }

        let z_sum = l1_norm(zl) + l1_norm(zu);
        let s_d = S_MAX.max((l1_norm(lambda) + z_sum) / (self.m + self.nx).max(1) as f64) / S_MAX;
        let s_c = S_MAX.max(z_sum / self.nx.max(1) as f64) / S_MAX;
        (dual / s_d).max(primal).max(compl / s_c)
    }

    /// KKT matrix `[W + Σ + δw I, Jᵀ; J, -δc I]` in band form
    fn assemble(
        &self,
        hv: Option<&[f64]>,
        jv: &[f64],
        diag: &DVector<f64>,
        dw: f64,
        dc: f64,
    ) -> Option<BandMatrix> {
        let p = &self.inv;
        let mut a = BandMatrix::zeros(self.nx + self.m, self.band, self.band);
        let mut ok = true;

        for j in 0..self.nx {
            ok &= a.add(p[j], p[j], diag[j] + dw);
        }
        if let Some(hv) = hv {
            for (k, &(r, c)) in self.hess.iter().enumerate() {
                ok &= a.add(p[r], p[c], hv[k]);
                if r != c {
                    ok &= a.add(p[c], p[r], hv[k]);
                }
            }
        }
        for (k, &(r, c)) in self.jac.iter().enumerate() {
            let row = self.nx + r;
            ok &= a.add(p[row], p[c], jv[k]);
            ok &= a.add(p[c], p[row], jv[k]);
        }
        for (k, &row) in self.slack_row.iter().enumerate() {
            let (i, j) = (self.nx + row, self.n + k);
            ok &= a.add(p[i], p[j], -1.0);
            ok &= a.add(p[j], p[i], -1.0);
        }
        if dc > 0.0 {
            for i in 0..self.m {
                ok &= a.add(p[self.nx + i], p[self.nx + i], -dc);
            }
        }

        if ok { Some(a) } else { None }
    }

    fn solve_kkt(&self, lu: &BandedLu, rhs: &DVector<f64>) -> DVector<f64> {
        let dim = self.nx + self.m;
        let mut b = vec![0.0; dim];
        for k in 0..dim {
            b[self.inv[k]] = rhs[k];
        }
        lu.solve_in_place(&mut b);
        DVector::from_fn(dim, |k, _| b[self.inv[k]])
    }

    /// `dxᵀ (W + Σ + δw I) dx`
    fn curvature(&self, hv: &[f64], diag: &DVector<f64>, dw: f64, dx: &DVector<f64>) -> f64 {
        let mut q = 0.0;
        for j in 0..self.nx {
            q += (diag[j] + dw) * dx[j] * dx[j];
        }
        for (k, &(r, c)) in self.hess.iter().enumerate() {
            let w = if r == c { 1.0 } else { 2.0 };
            q += w * hv[k] * dx[r] * dx[c];
        }
        q
    }

    /// Largest step in (0, 1] keeping `x + α d` a fraction `tau` inside the bounds
    fn max_primal_step(&self, x: &DVector<f64>, d: &DVector<f64>, tau: f64) -> f64 {
        let mut alpha: f64 = 1.0;
        for j in 0..self.nx {
            if d[j] < 0.0 && has_lower(self.x_l[j]) {
                alpha = alpha.min(-tau * (x[j] - self.x_l[j]) / d[j]);
            }
            if d[j] > 0.0 && has_upper(self.x_u[j]) {
                alpha = alpha.min(tau * (self.x_u[j] - x[j]) / d[j]);
            }
        }
        alpha
    }

    /// Bound multiplier steps implied by a primal direction
    fn bound_multiplier_steps(
        &self,
        x: &DVector<f64>,
        d: &DVector<f64>,
        zl: &DVector<f64>,
        zu: &DVector<f64>,
        mu: f64,
    ) -> (DVector<f64>, DVector<f64>) {
        let mut dzl = DVector::zeros(self.nx);
        let mut dzu = DVector::zeros(self.nx);
        for j in 0..self.nx {
            if has_lower(self.x_l[j]) {
                let s = x[j] - self.x_l[j];
                dzl[j] = mu / s - zl[j] - zl[j] / s * d[j];
            }
            if has_upper(self.x_u[j]) {
                let s = self.x_u[j] - x[j];
                dzu[j] = mu / s - zu[j] + zu[j] / s * d[j];
            }
        }
        (dzl, dzu)
    }

    /// Keep bound multipliers within a factor of the primal-dual central path
    fn safeguard_multipliers(&self, x: &DVector<f64>, zl: &mut DVector<f64>, zu: &mut DVector<f64>, mu: f64) {
        for j in 0..self.nx {
            if has_lower(self.x_l[j]) {
                let s = x[j] - self.x_l[j];
                zl[j] = zl[j].max(mu / (KAPPA_SIGMA * s)).min(KAPPA_SIGMA * mu / s);
            }
            if has_upper(self.x_u[j]) {
                let s = self.x_u[j] - x[j];
                zu[j] = zu[j].max(mu / (KAPPA_SIGMA * s)).min(KAPPA_SIGMA * mu / s);
            }
        }
    }
}

fn max_dual_step(z: &DVector<f64>, dz: &DVector<f64>, tau: f64) -> f64 {
    let mut alpha: f64 = 1.0;
    for j in 0..z.len() {
        if dz[j] < 0.0 && z[j] > 0.0 {
            alpha = alpha.min(-tau * z[j] / dz[j]);
        }
    }
    alpha
}

fn next_regularization(dw: f64, last_dw: f64) -> Option<f64> {
    let next = if dw == 0.0 {
        if last_dw == 0.0 { DELTA_W_FIRST } else { (last_dw / 3.0).max(DELTA_W_MIN) }
    } else if last_dw == 0.0 {
        dw * 100.0
    } else {
        dw * 8.0
    };
    if next > DELTA_W_MAX { None } else { Some(next) }
}

/// Interior-point NLP solver
#[derive(Debug, Clone, Default)]
pub struct InteriorPointSolver {
    options: SolverOptions,
}

impl InteriorPointSolver {
    pub fn new(options: SolverOptions) -> Self {
        InteriorPointSolver { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solve `problem` from its initial point
    pub fn solve<P: NlpProblem>(&self, problem: &P) -> NlpSolution {
        let start = Instant::now();
        let opts = &self.options;

        let mut x0 = vec![0.0; problem.num_variables()];
        problem.initial_point(&mut x0);

        let st = match Structure::new(problem, opts.bound_relax_factor) {
            Ok(st) => st,
            Err(status) => {
                debug!("rejected problem: {}", status);
                let m = problem.num_constraints();
                return NlpSolution {
                    status,
                    x: DVector::from_vec(x0),
                    objective: f64::NAN,
                    constraint_values: DVector::zeros(m),
                    multipliers: DVector::zeros(m),
                    iterations: 0,
                };
            }
        };
        let (n, m, nx) = (st.n, st.m, st.nx);

        // Starting point pushed into the interior, slacks from g(x0)
        let mut g0 = vec![0.0; m];
        problem.constraints(&x0, &mut g0);
        let mut x = DVector::zeros(nx);
        for j in 0..n {
            x[j] = push_interior(st.x_l[j], st.x_u[j], x0[j]);
        }
        for (k, &row) in st.slack_row.iter().enumerate() {
            x[n + k] = push_interior(st.x_l[n + k], st.x_u[n + k], g0[row]);
        }

        let mut zl = DVector::from_fn(nx, |j, _| if has_lower(st.x_l[j]) { 1.0 } else { 0.0 });
        let mut zu = DVector::from_fn(nx, |j, _| if has_upper(st.x_u[j]) { 1.0 } else { 0.0 });
        let mut lambda = DVector::zeros(m);
        let mut mu = opts.mu_init;
        let mut nu: f64 = 1.0;
        let mut last_dw = 0.0;
        let mut jv = vec![0.0; st.jac.len()];
        let mut hv = vec![0.0; st.hess.len()];

        let raw_grad = st.gradient(problem, &x, 1.0);
        let grad_max = max_abs(&raw_grad);
        let scale = if !grad_max.is_finite() {
            1.0
        } else if grad_max > opts.obj_scaling_max_gradient {
            opts.obj_scaling_max_gradient / grad_max
        } else {
            1.0
        };

        // Least-squares estimate of the constraint multipliers
        if m > 0 && grad_max.is_finite() {
            problem.jacobian_values(&x.as_slice()[..n], &mut jv);
            if all_finite(&jv) {
                let ones = DVector::from_element(nx, 1.0);
                if let Some(lu) = st.assemble(None, &jv, &ones, 0.0, 0.0).and_then(BandMatrix::factorize) {
                    let mut rhs = DVector::zeros(nx + m);
                    for j in 0..nx {
                        rhs[j] = -(scale * raw_grad[j] - zl[j] + zu[j]);
                    }
                    let sol = st.solve_kkt(&lu, &rhs);
                    let init = sol.rows(nx, m).into_owned();
                    if all_finite(init.as_slice()) && max_abs(&init) <= CONSTR_MULT_INIT_MAX {
                        lambda = init;
                    }
                }
            }
        }

        let mut iter = 0;
        let status = loop {
            if start.elapsed().as_secs_f64() >= opts.max_cpu_time {
                break SolveStatus::MaximumCpuTimeExceeded;
            }

            let (f_raw, c) = match st.evaluate(problem, &x) {
                Some(v) => v,
                None => break SolveStatus::InvalidNumberDetected,
            };
            let f = scale * f_raw;
            let grad = st.gradient(problem, &x, scale);
            problem.jacobian_values(&x.as_slice()[..n], &mut jv);
            if !all_finite(grad.as_slice()) || !all_finite(&jv) {
                break SolveStatus::InvalidNumberDetected;
            }
            let jtl = st.jt_mul(&jv, &lambda);

            let err = st.optimality_error(&x, &grad, &jtl, &c, &lambda, &zl, &zu, 0.0);
            debug!(
                "iter {:3} obj {:+.6e} inf_pr {:.2e} err {:.2e} mu {:.1e}",
                iter,
                f_raw,
                max_abs(&c),
                err,
                mu
            );
            if err <= opts.tol {
                break SolveStatus::Success;
            }
            if iter >= opts.max_iter {
                break SolveStatus::MaximumIterationsExceeded;
            }

            let mu_min = opts.tol / 10.0;
            while mu > mu_min
                && st.optimality_error(&x, &grad, &jtl, &c, &lambda, &zl, &zu, mu) <= KAPPA_EPSILON * mu
            {
                mu = mu_min.max((KAPPA_MU * mu).min(mu.powf(THETA_MU)));
            }

            problem.hessian_values(&x.as_slice()[..n], scale, lambda.as_slice(), &mut hv);
            if !all_finite(&hv) {
                break SolveStatus::InvalidNumberDetected;
            }

            let sigma = st.sigma(&x, &zl, &zu);
            let gb = st.barrier_gradient(&grad, &x, mu);
            let mut rhs = DVector::zeros(nx + m);
            for j in 0..nx {
                rhs[j] = -(gb[j] + jtl[j]);
            }
            for i in 0..m {
                rhs[nx + i] = -c[i];
            }

            let dir = match self.direction(&st, &hv, &jv, &sigma, &rhs, mu, &mut last_dw) {
                Some(d) => d,
                None => break SolveStatus::ErrorInStepComputation,
            };

            // Penalty parameter large enough for a descent direction
            let tau = TAU_MIN.max(1.0 - mu);
            let c1 = l1_norm(&c);
            let gbdx = gb.dot(&dir.dx);
            if c1 > 0.0 {
                let nu_trial = (gbdx + 0.5 * dir.curvature.max(0.0)) / ((1.0 - PENALTY_RHO) * c1);
                if nu < nu_trial {
                    nu = nu_trial + 1.0;
                }
            }
            let d_phi = gbdx - nu * c1;
            let phi0 = match st.barrier(&x) {
                Some(b) => f - mu * b + nu * c1,
                None => break SolveStatus::InvalidNumberDetected,
            };

            let alpha_max = st.max_primal_step(&x, &dir.dx, tau);
            let accepted = self.line_search(
                problem, &st, &x, &dir, &rhs, &c, phi0, d_phi, alpha_max, tau, scale, mu, nu,
            );
            let (d, alpha, dl) = match accepted {
                Some(step) => step,
                None => {
                    let step_size = alpha_max * max_abs(&dir.dx);
                    if step_size <= 1e4 * f64::EPSILON * (1.0 + max_abs(&x)) {
                        (dir.dx.clone(), alpha_max, dir.dl.clone())
                    } else {
                        break SolveStatus::LineSearchFailure;
                    }
                }
            };

            let (dzl, dzu) = st.bound_multiplier_steps(&x, &d, &zl, &zu, mu);
            let alpha_z = max_dual_step(&zl, &dzl, tau).min(max_dual_step(&zu, &dzu, tau));
            trace!("alpha_pr {:.3e} alpha_du {:.3e}", alpha, alpha_z);

            x += alpha * &d;
            lambda += alpha * &dl;
            zl += alpha_z * &dzl;
            zu += alpha_z * &dzu;
            st.safeguard_multipliers(&x, &mut zl, &mut zu, mu);
            iter += 1;
        };

        // Honour the original variable bounds
        let mut x_final = DVector::from_fn(n, |j, _| x[j]);
        for j in 0..n {
            x_final[j] = x_final[j].max(st.orig_l[j]).min(st.orig_u[j]);
        }
        let objective = problem.objective(x_final.as_slice());
        let mut g = vec![0.0; m];
        problem.constraints(x_final.as_slice(), &mut g);

        debug!(
            "solver finished: {} after {} iterations in {:.1} ms",
            status,
            iter,
            start.elapsed().as_secs_f64() * 1e3
        );

        NlpSolution {
            status,
            x: x_final,
            objective,
            constraint_values: DVector::from_vec(g),
            multipliers: lambda / scale,
            iterations: iter,
        }
    }

    /// Newton direction with inertia-free regularization
    #[allow(clippy::too_many_arguments)]
    fn direction(
        &self,
        st: &Structure,
        hv: &[f64],
        jv: &[f64],
        sigma: &DVector<f64>,
        rhs: &DVector<f64>,
        mu: f64,
        last_dw: &mut f64,
    ) -> Option<Direction> {
        let mut dw = 0.0;
        let mut dc = 0.0;
        loop {
            let solved = st
                .assemble(Some(hv), jv, sigma, dw, dc)
                .and_then(BandMatrix::factorize)
                .map(|lu| {
                    let sol = st.solve_kkt(&lu, rhs);
                    (lu, sol)
                })
                .filter(|(_, sol)| all_finite(sol.as_slice()));

            match solved {
                None => {
                    if dc == 0.0 {
                        dc = DELTA_C * mu.powf(0.25);
                    } else {
                        dw = next_regularization(dw, *last_dw)?;
                    }
                }
                Some((lu, sol)) => {
                    let dx = sol.rows(0, st.nx).into_owned();
                    let dl = sol.rows(st.nx, st.m).into_owned();
                    let curvature = st.curvature(hv, sigma, dw, &dx);
                    if curvature >= CURVATURE_EPS * dx.norm_squared() {
                        if dw > 0.0 {
                            *last_dw = dw;
                        }
                        return Some(Direction { lu, dx, dl, curvature });
                    }
                    dw = next_regularization(dw, *last_dw)?;
                }
            }
        }
    }

    /// Backtracking on the merit function with one second-order correction
    #[allow(clippy::too_many_arguments)]
    fn line_search<P: NlpProblem>(
        &self,
        problem: &P,
        st: &Structure,
        x: &DVector<f64>,
        dir: &Direction,
        rhs: &DVector<f64>,
        c: &DVector<f64>,
        phi0: f64,
        d_phi: f64,
        alpha_max: f64,
        tau: f64,
        scale: f64,
        mu: f64,
        nu: f64,
    ) -> Option<(DVector<f64>, f64, DVector<f64>)> {
        let mut alpha = alpha_max;
        let c1 = l1_norm(c);

        for trial in 0..MAX_BACKTRACKS {
            let xt = x + alpha * &dir.dx;
            if let Some((phi, ct)) = st.merit(problem, &xt, scale, mu, nu) {
                if phi <= phi0 + ARMIJO_ETA * alpha * d_phi {
                    return Some((dir.dx.clone(), alpha, dir.dl.clone()));
                }

                if trial == 0 && l1_norm(&ct) >= c1 {
                    let mut soc_rhs = rhs.clone();
                    for i in 0..st.m {
                        soc_rhs[st.nx + i] = -(alpha * c[i] + ct[i]);
                    }
                    let sol = st.solve_kkt(&dir.lu, &soc_rhs);
                    if all_finite(sol.as_slice()) {
                        let dx_soc = sol.rows(0, st.nx).into_owned();
                        let dl_soc = sol.rows(st.nx, st.m).into_owned();
                        let alpha_soc = st.max_primal_step(x, &dx_soc, tau);
                        let x_soc = x + alpha_soc * &dx_soc;
                        if let Some((phi_soc, _)) = st.merit(problem, &x_soc, scale, mu, nu) {
                            if phi_soc <= phi0 + ARMIJO_ETA * alpha * d_phi {
                                trace!("second-order correction accepted");
                                return Some((dx_soc, alpha_soc, dl_soc));
                            }
                        }
                    }
                }
            }
            alpha *= 0.5;
        }
        None
    }
}
