//! Cost and constraints of the receding-horizon tracking problem

use serde::Deserialize;

use super::dynamics::{KinematicBicycle, StageVector, HESSIAN_PATTERN, JACOBIAN_PATTERN};
use super::layout::DecisionLayout;
use crate::common::{VehicleState, STATE_DIM};
use crate::config::MpcConfig;
use crate::nlp::{NlpProblem, INFINITE_BOUND};
use crate::path::CubicPolynomial;

/// Weights of the quadratic tracking cost
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CostWeights {
    pub cte: f64,
    pub epsi: f64,
    /// on `(v - v_ref)²`
    pub speed: f64,
    pub steering: f64,
    pub acceleration: f64,
    /// on `(δ[t+1] - δ[t])²`
    pub steering_rate: f64,
    /// on `(a[t+1] - a[t])²`
    pub acceleration_rate: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            cte: 1.0,
            epsi: 1.0,
            speed: 0.1,
            steering: 100.0,
            acceleration: 5.0,
            steering_rate: 5.0e6,
            acceleration_rate: 0.0,
        }
    }
}

/// One tick's optimal-control problem over the flat decision vector
#[derive(Debug, Clone)]
pub struct MpcProblem {
    layout: DecisionLayout,
    model: KinematicBicycle,
    weights: CostWeights,
    max_steering: f64,
    min_acceleration: f64,
    max_acceleration: f64,
    state: VehicleState,
    path: CubicPolynomial,
    target_speed: f64,
}

impl MpcProblem {
    pub fn new(config: &MpcConfig, state: VehicleState, path: CubicPolynomial, target_speed: f64) -> Self {
        MpcProblem {
            layout: DecisionLayout::new(config.horizon),
            model: KinematicBicycle::new(config.lf, config.dt),
            weights: config.weights,
            max_steering: config.max_steering(),
            min_acceleration: config.min_acceleration,
            max_acceleration: config.max_acceleration,
            state,
            path,
            target_speed,
        }
    }

    pub fn layout(&self) -> &DecisionLayout {
        &self.layout
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    /// Global index of stage entry `j` (see [`super::dynamics`]) at step `t`
    fn stage_index(&self, j: usize, t: usize) -> usize {
        if j < STATE_DIM {
            self.layout.state(j, t)
        } else {
            self.layout.control(j - STATE_DIM, t)
        }
    }

    fn stage(&self, x: &[f64], t: usize) -> StageVector {
        StageVector::from_fn(|j, _| x[self.stage_index(j, t)])
    }

    /// Row of the dynamics residual of component `k` between steps `t` and `t + 1`
    fn dynamics_row(&self, k: usize, t: usize) -> usize {
        self.layout.state(k, t + 1)
    }

    fn control_pairs(&self) -> [(usize, f64, f64); 2] {
        let w = &self.weights;
        [
            (self.layout.delta_start(), w.steering, w.steering_rate),
            (self.layout.a_start(), w.acceleration, w.acceleration_rate),
        ]
    }
}

impl NlpProblem for MpcProblem {
    fn num_variables(&self) -> usize {
        self.layout.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.layout.num_constraints()
    }

    fn variable_bounds(&self, x_l: &mut [f64], x_u: &mut [f64]) {
        let (delta, a, end) = (self.layout.delta_start(), self.layout.a_start(), self.num_variables());
        for i in 0..delta {
            x_l[i] = -INFINITE_BOUND;
            x_u[i] = INFINITE_BOUND;
        }
        for i in delta..a {
            x_l[i] = -self.max_steering;
            x_u[i] = self.max_steering;
        }
        for i in a..end {
            x_l[i] = self.min_acceleration;
            x_u[i] = self.max_acceleration;
        }
    }

    fn constraint_bounds(&self, g_l: &mut [f64], g_u: &mut [f64]) {
        g_l.iter_mut().for_each(|g| *g = 0.0);
        g_u.iter_mut().for_each(|g| *g = 0.0);
        for (k, &value) in self.state.to_array().iter().enumerate() {
            let row = self.layout.state_start(k);
            g_l[row] = value;
            g_u[row] = value;
        }
    }

    fn initial_point(&self, x: &mut [f64]) {
        x.iter_mut().for_each(|v| *v = 0.0);
        for (k, &value) in self.state.to_array().iter().enumerate() {
            x[self.layout.state_start(k)] = value;
        }
    }

    fn objective(&self, x: &[f64]) -> f64 {
        let l = &self.layout;
        let w = &self.weights;
        let n = l.horizon();
        let mut cost = 0.0;

        for t in 0..n {
            cost += w.cte * x[l.cte_start() + t].powi(2);
            cost += w.epsi * x[l.epsi_start() + t].powi(2);
            cost += w.speed * (x[l.v_start() + t] - self.target_speed).powi(2);
        }
        for (start, weight, rate) in self.control_pairs() {
            for t in 0..l.steps() {
                cost += weight * x[start + t].powi(2);
            }
            for t in 0..l.steps().saturating_sub(1) {
                cost += rate * (x[start + t + 1] - x[start + t]).powi(2);
            }
        }
        cost
    }

    fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
        let l = &self.layout;
        let w = &self.weights;
        grad.iter_mut().for_each(|g| *g = 0.0);

        for t in 0..l.horizon() {
            grad[l.cte_start() + t] = 2.0 * w.cte * x[l.cte_start() + t];
            grad[l.epsi_start() + t] = 2.0 * w.epsi * x[l.epsi_start() + t];
            grad[l.v_start() + t] = 2.0 * w.speed * (x[l.v_start() + t] - self.target_speed);
        }
        for (start, weight, rate) in self.control_pairs() {
            for t in 0..l.steps() {
                grad[start + t] += 2.0 * weight * x[start + t];
            }
            for t in 0..l.steps().saturating_sub(1) {
                let d = 2.0 * rate * (x[start + t + 1] - x[start + t]);
                grad[start + t + 1] += d;
                grad[start + t] -= d;
            }
        }
    }

    fn constraints(&self, x: &[f64], g: &mut [f64]) {
        for k in 0..STATE_DIM {
            let row = self.layout.state_start(k);
            g[row] = x[row];
        }
        for t in 0..self.layout.steps() {
            let predicted = self.model.predict(&self.stage(x, t), &self.path);
            for k in 0..STATE_DIM {
                let row = self.dynamics_row(k, t);
                g[row] = x[self.layout.state(k, t + 1)] - predicted[k];
            }
        }
    }

    fn jacobian_structure(&self) -> Vec<(usize, usize)> {
        let mut entries = Vec::new();
        for k in 0..STATE_DIM {
            let row = self.layout.state_start(k);
            entries.push((row, row));
        }
        for t in 0..self.layout.steps() {
            for (k, deps) in JACOBIAN_PATTERN.iter().enumerate() {
                let row = self.dynamics_row(k, t);
                entries.push((row, self.layout.state(k, t + 1)));
                entries.extend(deps.iter().map(|&j| (row, self.stage_index(j, t))));
            }
        }
        entries
    }

    fn jacobian_values(&self, x: &[f64], values: &mut [f64]) {
        let mut idx = 0;
        for _ in 0..STATE_DIM {
            values[idx] = 1.0;
            idx += 1;
        }
        for t in 0..self.layout.steps() {
            let jac = self.model.jacobian(&self.stage(x, t), &self.path);
            for (k, deps) in JACOBIAN_PATTERN.iter().enumerate() {
                values[idx] = 1.0;
                idx += 1;
                for &j in deps.iter() {
                    values[idx] = -jac[(k, j)];
                    idx += 1;
                }
            }
        }
    }

    fn hessian_structure(&self) -> Vec<(usize, usize)> {
        let l = &self.layout;
        let mut entries = Vec::new();
        for t in 0..l.horizon() {
            for start in [l.cte_start(), l.epsi_start(), l.v_start()] {
                entries.push((start + t, start + t));
            }
        }
        for (start, _, _) in self.control_pairs() {
            for t in 0..l.steps() {
                entries.push((start + t, start + t));
            }
            for t in 0..l.steps().saturating_sub(1) {
                entries.push((start + t + 1, start + t));
            }
        }
        for t in 0..l.steps() {
            entries.extend(
                HESSIAN_PATTERN
                    .iter()
                    .map(|&(r, c)| (self.stage_index(r, t), self.stage_index(c, t))),
            );
        }
        entries
    }

    fn hessian_values(&self, x: &[f64], obj_factor: f64, lambda: &[f64], values: &mut [f64]) {
        let l = &self.layout;
        let w = &self.weights;
        let steps = l.steps();
        let mut idx = 0;

        for _ in 0..l.horizon() {
            for weight in [w.cte, w.epsi, w.speed] {
                values[idx] = 2.0 * obj_factor * weight;
                idx += 1;
            }
        }
        for (_, weight, rate) in self.control_pairs() {
            for t in 0..steps {
                // each interior control appears in two rate terms
                let mut pairs = 0.0;
                if t > 0 {
                    pairs += 1.0;
                }
                if t + 1 < steps {
                    pairs += 1.0;
                }
                values[idx] = 2.0 * obj_factor * (weight + pairs * rate);
                idx += 1;
            }
            for _ in 0..steps.saturating_sub(1) {
                values[idx] = -2.0 * obj_factor * rate;
                idx += 1;
            }
        }

        // residual is next - predicted
        for t in 0..steps {
            let mut mult = [0.0; STATE_DIM];
            for (k, m) in mult.iter_mut().enumerate() {
                *m = -lambda[self.dynamics_row(k, t)];
            }
            let h = self.model.weighted_hessian(&self.stage(x, t), &self.path, &mult);
            for v in h.iter() {
                values[idx] = *v;
                idx += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_problem() -> MpcProblem {
        let config = MpcConfig { horizon: 6, ..Default::default() };
        let state = VehicleState::local(8.0, 0.4, -0.05);
        MpcProblem::new(&config, state, CubicPolynomial::new(0.4, 0.05, -0.01, 0.001), 30.0)
    }

    fn point(p: &MpcProblem) -> Vec<f64> {
        (0..p.num_variables()).map(|i| 0.1 * ((i as f64) * 0.37).sin() + 0.05).collect()
    }

    #[test]
    fn test_initial_rows_pinned_to_state() {
        let p = small_problem();
        let (mut g_l, mut g_u) = (vec![1.0; 36], vec![1.0; 36]);
        p.constraint_bounds(&mut g_l, &mut g_u);
        assert_eq!(g_l[p.layout().v_start()], 8.0);
        assert_eq!(g_u[p.layout().cte_start()], 0.4);
        assert_eq!(g_l[p.layout().epsi_start()], -0.05);
        assert_eq!(g_l[1], 0.0);
        assert_eq!(g_u[p.layout().v_start() + 3], 0.0);

        let mut x0 = vec![0.0; p.num_variables()];
        p.initial_point(&mut x0);
        let mut g = vec![0.0; 36];
        p.constraints(&x0, &mut g);
        for k in 0..STATE_DIM {
            let row = p.layout().state_start(k);
            assert_eq!(g[row], g_l[row]);
        }
    }

    #[test]
    fn test_control_bounds() {
        let p = small_problem();
        let nv = p.num_variables();
        let (mut x_l, mut x_u) = (vec![0.0; nv], vec![0.0; nv]);
        p.variable_bounds(&mut x_l, &mut x_u);
        assert_eq!(x_l[0], -INFINITE_BOUND);
        assert!((x_u[p.layout().delta_start()] - 25f64.to_radians()).abs() < 1e-15);
        assert_eq!(x_l[p.layout().a_start()], -1.0);
        assert_eq!(x_u[nv - 1], 1.0);
    }

    #[test]
    fn test_objective_counts_every_term() {
        let p = small_problem();
        let l = *p.layout();
        let mut x = vec![0.0; p.num_variables()];
        x[l.cte_start() + 2] = 1.0;
        x[l.delta_start() + 1] = 0.1;
        // speed term at all 6 steps plus cte, steering and two steering-rate pairs
        let expected = 6.0 * 0.1 * 900.0 + 1.0 + 100.0 * 0.01 + 2.0 * 5.0e6 * 0.01;
        assert!((p.objective(&x) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let p = small_problem();
        let x = point(&p);
        let mut grad = vec![0.0; x.len()];
        p.objective_gradient(&x, &mut grad);
        let h = 1e-6;
        for i in 0..x.len() {
            let (mut xp, mut xm) = (x.clone(), x.clone());
            xp[i] += h;
            xm[i] -= h;
            let fd = (p.objective(&xp) - p.objective(&xm)) / (2.0 * h);
            assert!((grad[i] - fd).abs() < 1e-3 * (1.0 + fd.abs()), "grad[{}]: {} vs {}", i, grad[i], fd);
        }
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let p = small_problem();
        let (nv, m) = (p.num_variables(), p.num_constraints());
        let x = point(&p);
        let structure = p.jacobian_structure();
        let mut values = vec![0.0; structure.len()];
        p.jacobian_values(&x, &mut values);

        let mut dense = vec![vec![0.0; nv]; m];
        for (&(r, c), &v) in structure.iter().zip(values.iter()) {
            dense[r][c] += v;
        }

        let h = 1e-6;
        for i in 0..nv {
            let (mut xp, mut xm) = (x.clone(), x.clone());
            xp[i] += h;
            xm[i] -= h;
            let (mut gp, mut gm) = (vec![0.0; m], vec![0.0; m]);
            p.constraints(&xp, &mut gp);
            p.constraints(&xm, &mut gm);
            for r in 0..m {
                let fd = (gp[r] - gm[r]) / (2.0 * h);
                assert!((dense[r][i] - fd).abs() < 1e-6, "J[{},{}]: {} vs {}", r, i, dense[r][i], fd);
            }
        }
    }

    #[test]
    fn test_hessian_lower_triangle() {
        let p = small_problem();
        assert!(p.hessian_structure().iter().all(|&(r, c)| r >= c));
        assert!(p.jacobian_structure().iter().all(|&(r, c)| r < 36 && c < p.num_variables()));
    }

    #[test]
    fn test_lagrangian_hessian_matches_finite_differences() {
        let p = small_problem();
        let (nv, m) = (p.num_variables(), p.num_constraints());
        let x = point(&p);
        let lambda: Vec<f64> = (0..m).map(|i| ((i as f64) * 0.71).cos()).collect();
        let obj_factor = 0.5;

        let lagrangian_grad = |x: &[f64]| {
            let mut g = vec![0.0; nv];
            p.objective_gradient(x, &mut g);
            g.iter_mut().for_each(|v| *v *= obj_factor);
            let structure = p.jacobian_structure();
            let mut values = vec![0.0; structure.len()];
            p.jacobian_values(x, &mut values);
            for (&(r, c), &v) in structure.iter().zip(values.iter()) {
                g[c] += lambda[r] * v;
            }
            g
        };

        let structure = p.hessian_structure();
        let mut values = vec![0.0; structure.len()];
        p.hessian_values(&x, obj_factor, &lambda, &mut values);
        let mut dense = vec![vec![0.0; nv]; nv];
        for (&(r, c), &v) in structure.iter().zip(values.iter()) {
            dense[r][c] += v;
            if r != c {
                dense[c][r] += v;
            }
        }

        let h = 1e-5;
        for i in 0..nv {
            let (mut xp, mut xm) = (x.clone(), x.clone());
            xp[i] += h;
            xm[i] -= h;
            let (gp, gm) = (lagrangian_grad(&xp), lagrangian_grad(&xm));
            for r in 0..nv {
                let fd = (gp[r] - gm[r]) / (2.0 * h);
                assert!(
                    (dense[r][i] - fd).abs() < 1e-4 * (1.0 + fd.abs()),
                    "H[{},{}]: {} vs {}",
                    r,
                    i,
                    dense[r][i],
                    fd
                );
            }
        }
    }
}
