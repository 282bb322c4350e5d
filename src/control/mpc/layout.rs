//! Placement of states and controls inside the flat decision vector

use crate::common::{CONTROL_DIM, STATE_DIM};

/// Offsets of the state and control blocks for a horizon of `n` steps
///
/// Six blocks of `n` states (`x, y, psi, v, cte, epsi`) followed by two
/// blocks of `n - 1` controls (`delta, a`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionLayout {
    n: usize,
}

impl DecisionLayout {
    pub fn new(horizon: usize) -> Self {
        DecisionLayout { n: horizon }
    }

    pub fn horizon(&self) -> usize {
        self.n
    }

    /// Number of control steps
    pub fn steps(&self) -> usize {
        self.n.saturating_sub(1)
    }

    pub fn x_start(&self) -> usize {
        0
    }

    pub fn y_start(&self) -> usize {
        self.n
    }

    pub fn psi_start(&self) -> usize {
        2 * self.n
    }

    pub fn v_start(&self) -> usize {
        3 * self.n
    }

    pub fn cte_start(&self) -> usize {
        4 * self.n
    }

    pub fn epsi_start(&self) -> usize {
        5 * self.n
    }

    pub fn delta_start(&self) -> usize {
        STATE_DIM * self.n
    }

    pub fn a_start(&self) -> usize {
        STATE_DIM * self.n + self.steps()
    }

    /// Start of state component `k` (0..6)
    pub fn state_start(&self, k: usize) -> usize {
        k * self.n
    }

    /// Index of state component `k` at step `t`
    pub fn state(&self, k: usize, t: usize) -> usize {
        k * self.n + t
    }

    /// Index of control component `k` (0 = delta, 1 = a) at step `t`
    pub fn control(&self, k: usize, t: usize) -> usize {
        STATE_DIM * self.n + k * self.steps() + t
    }

    pub fn num_variables(&self) -> usize {
        STATE_DIM * self.n + CONTROL_DIM * self.steps()
    }

    pub fn num_constraints(&self) -> usize {
        STATE_DIM * self.n
    }
}
