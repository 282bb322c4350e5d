//! Common traits defining interfaces for controllers and vehicle models

/// Trait for vehicle/robot motion models
pub trait MotionModel {
    /// State type
    type State;
    /// Control type
    type Control;

    /// Propagate state forward in time
    fn propagate(&self, state: &Self::State, control: &Self::Control, dt: f64) -> Self::State;

    /// Compute Jacobian with respect to state
    fn jacobian_state(&self, state: &Self::State, control: &Self::Control, dt: f64)
        -> nalgebra::DMatrix<f64>;
}

/// Trait for controllers (PID, LQR, MPC, etc.)
pub trait Controller {
    /// State type
    type State;
    /// Reference/target type
    type Reference;
    /// Output control type
    type Output;

    /// Compute control output
    fn compute(&mut self, state: &Self::State, reference: &Self::Reference) -> Self::Output;

    /// Reset controller state
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that traits compile correctly
    struct HoldController {
        last: f64,
    }

    impl Controller for HoldController {
        type State = f64;
        type Reference = f64;
        type Output = f64;

        fn compute(&mut self, state: &f64, reference: &f64) -> f64 {
            self.last = reference - state;
            self.last
        }

        fn reset(&mut self) {
            self.last = 0.0;
        }
    }

    #[test]
    fn test_controller_trait() {
        let mut ctrl = HoldController { last: 0.0 };
        assert_eq!(ctrl.compute(&1.0, &3.0), 2.0);
        ctrl.reset();
        assert_eq!(ctrl.last, 0.0);
    }
}
