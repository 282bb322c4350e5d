//! Message in, reply out

use log::{debug, warn};

use super::codec::{decode_event, encode_steer, extract_payload, is_event, manual_reply, Event};
use super::messages::SteerCommand;
use crate::common::MpcResult;
use crate::control::{MpcController, MpcOutput};

/// Drives an [`MpcController`] from simulator messages
#[derive(Debug)]
pub struct TelemetryHandler {
    controller: MpcController,
    last_output: Option<MpcOutput>,
}

impl TelemetryHandler {
    pub fn new(controller: MpcController) -> Self {
        TelemetryHandler { controller, last_output: None }
    }

    pub fn controller(&self) -> &MpcController {
        &self.controller
    }

    /// Output of the most recent solve
    pub fn last_output(&self) -> Option<&MpcOutput> {
        self.last_output.as_ref()
    }

    /// Reply to one message, `None` when no reply is due
    ///
    /// An event without data gets the manual-mode reply. A failed solve
    /// still answers, with zero steering and throttle.
    pub fn handle(&mut self, msg: &str) -> MpcResult<Option<String>> {
        if !is_event(msg) {
            return Ok(None);
        }
        let payload = match extract_payload(msg) {
            Some(p) => p,
            None => return Ok(Some(manual_reply())),
        };

        let telemetry = match decode_event(payload)? {
            Event::Telemetry(t) => t,
            Event::Other(name) => {
                debug!("Ignoring event {}", name);
                return Ok(None);
            }
        };

        let inputs = telemetry.controller_inputs()?;
        let output = self.controller.solve(
            &inputs.state,
            &inputs.reference.path,
            inputs.reference.min_x,
            inputs.reference.max_x,
        );
        if !output.is_success() {
            warn!("No valid solution at ({:.2}, {:.2}), sending zero actuation", telemetry.x, telemetry.y);
        }

        let cmd = SteerCommand::from_output(&output, self.controller.config().max_steering(), &inputs);
        self.last_output = Some(output);
        Ok(Some(encode_steer(&cmd)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MpcConfig;

    fn handler(max_cpu_time: f64) -> TelemetryHandler {
        let mut config = MpcConfig { horizon: 10, ..Default::default() };
        config.solver.max_cpu_time = max_cpu_time;
        TelemetryHandler::new(MpcController::new(config).unwrap())
    }

    #[test]
    fn test_manual_and_non_event_messages() {
        let mut h = handler(30.0);
        assert_eq!(h.handle("42[\"telemetry\",null]").unwrap(), Some(manual_reply()));
        assert_eq!(h.handle("3").unwrap(), None);
        assert_eq!(h.handle(r#"42["reset",{}]"#).unwrap(), None);
        assert!(h.last_output().is_none());
    }

    #[test]
    fn test_failed_solve_replies_with_zero_actuation() {
        let mut h = handler(0.0);
        let msg = r#"42["telemetry",{"ptsx":[5,10,15,20,25],"ptsy":[0.5,0.6,0.7,0.8,0.9],"x":0,"y":0,"psi":0,"speed":20}]"#;
        let reply = h.handle(msg).unwrap().unwrap();
        let (_, cmd): (String, SteerCommand) = serde_json::from_str(&reply[2..]).unwrap();
        assert_eq!(cmd.steering_angle, 0.0);
        assert_eq!(cmd.throttle, 0.0);
        assert!(cmd.mpc_x.is_empty());
        assert_eq!(cmd.next_x.len(), 5);
        assert!(h.last_output().unwrap().cost.is_nan());
    }

    #[test]
    fn test_bad_telemetry_is_an_error() {
        let mut h = handler(30.0);
        let msg = r#"42["telemetry",{"ptsx":[1,2],"ptsy":[0,0],"x":0,"y":0,"psi":0,"speed":20}]"#;
        assert!(h.handle(msg).is_err());
    }
}
