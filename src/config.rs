//! Controller configuration and parameter file loading

use std::fs::read_to_string;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::common::{MpcError, MpcResult};
use crate::control::mpc::{CostWeights, ReferenceSpeedParams};
use crate::nlp::SolverOptions;

/// Everything that is fixed for the lifetime of an [`crate::control::MpcController`]
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MpcConfig {
    /// Number of predicted states (N)
    pub horizon: usize,
    /// Time between predicted states [s]
    pub dt: f64,
    /// Distance from front axle to center of gravity [m]
    pub lf: f64,
    /// Actuation delay compensated when extracting commands [s]
    pub latency: f64,
    /// Steering limit, symmetric [deg]
    pub max_steering_deg: f64,
    pub min_acceleration: f64,
    pub max_acceleration: f64,
    pub weights: CostWeights,
    pub reference_speed: ReferenceSpeedParams,
    pub solver: SolverOptions,
}

impl Default for MpcConfig {
    fn default() -> Self {
        MpcConfig {
            horizon: 40,
            dt: 0.05,
            lf: crate::control::mpc::LF,
            latency: 0.1,
            max_steering_deg: 25.0,
            min_acceleration: -1.0,
            max_acceleration: 1.0,
            weights: CostWeights::default(),
            reference_speed: ReferenceSpeedParams::default(),
            solver: SolverOptions::default(),
        }
    }
}

impl MpcConfig {
    /// Steering limit [rad]
    pub fn max_steering(&self) -> f64 {
        self.max_steering_deg.to_radians()
    }

    /// Whole steps and fractional remainder of the latency
    pub fn latency_split(&self) -> (usize, f64) {
        let steps = self.latency / self.dt;
        let position = steps.floor();
        (position as usize, steps - position)
    }

    /// Check the values the controller cannot run with
    ///
    /// Actuator limits are not checked here; inconsistent limits are left to
    /// the solver, which reports them as an invalid problem.
    pub fn validate(&self) -> MpcResult<()> {
        let invalid = |msg: String| Err(MpcError::InvalidConfig(msg));

        if self.horizon < 3 {
            return invalid(format!("horizon must be at least 3, got {}", self.horizon));
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return invalid(format!("dt must be positive, got {}", self.dt));
        }
        if !(self.lf > 0.0) || !self.lf.is_finite() {
            return invalid(format!("lf must be positive, got {}", self.lf));
        }
        if !(self.latency >= 0.0) || !self.latency.is_finite() {
            return invalid(format!("latency must be non-negative, got {}", self.latency));
        }
        let (position, _) = self.latency_split();
        if position + 1 >= self.horizon - 1 {
            return invalid(format!(
                "latency of {} s reaches beyond the {} control steps of the horizon",
                self.latency,
                self.horizon - 1
            ));
        }
        if self.reference_speed.samples == 0 {
            return invalid("reference speed samples must be at least 1".to_string());
        }
        if self.solver.max_cpu_time.is_nan() || self.solver.tol.is_nan() {
            return invalid("solver options must not be NaN".to_string());
        }
        Ok(())
    }
}

/// Load a TOML parameter file into any deserializable parameter struct
pub fn load<P, Q>(path: Q) -> MpcResult<P>
where
    P: DeserializeOwned,
    Q: AsRef<Path>,
{
    let params_str = read_to_string(path)?;
    Ok(toml::from_str(params_str.as_str())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MpcConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.max_steering() - 0.436332).abs() < 1e-6);
    }

    #[test]
    fn test_latency_split() {
        let config = MpcConfig { latency: 0.12, ..Default::default() };
        let (position, offset) = config.latency_split();
        assert_eq!(position, 2);
        assert!((offset - 0.4).abs() < 1e-9);

        let config = MpcConfig { latency: 0.0, ..Default::default() };
        assert_eq!(config.latency_split(), (0, 0.0));
    }

    #[test]
    fn test_rejects_bad_values() {
        let short = MpcConfig { horizon: 2, ..Default::default() };
        assert!(matches!(short.validate(), Err(MpcError::InvalidConfig(_))));

        let no_dt = MpcConfig { dt: 0.0, ..Default::default() };
        assert!(no_dt.validate().is_err());

        let negative = MpcConfig { latency: -0.1, ..Default::default() };
        assert!(negative.validate().is_err());

        let too_late = MpcConfig { horizon: 5, dt: 0.1, latency: 0.35, ..Default::default() };
        assert!(too_late.validate().is_err());
    }

    #[test]
    fn test_inverted_limits_pass_validation() {
        let config = MpcConfig { min_acceleration: 1.0, max_acceleration: -1.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: MpcConfig = toml::from_str(
            r#"
            horizon = 20
            latency = 0.0

            [weights]
            steering_rate = 1000.0

            [solver]
            max_cpu_time = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.horizon, 20);
        assert_eq!(config.dt, 0.05);
        assert_eq!(config.weights.steering_rate, 1000.0);
        assert_eq!(config.weights.steering, 100.0);
        assert_eq!(config.solver.max_cpu_time, 2.0);
        assert_eq!(config.solver.max_iter, 500);
    }

    #[test]
    fn test_load_missing_file() {
        let res: MpcResult<MpcConfig> = load("does/not/exist.toml");
        assert!(matches!(res, Err(MpcError::ConfigLoad(_))));
    }

    #[test]
    fn test_load_params_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/params/mpc.toml");
        let config: MpcConfig = load(path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.horizon, 40);
    }
}
