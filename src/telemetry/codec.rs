//! socket.io style framing
//!
//! Event messages are `42` followed by a JSON array `["event", {...}]`.

use serde_json::Value;

use super::messages::{SteerCommand, Telemetry};
use crate::common::MpcResult;

/// Decoded event payload
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Telemetry(Telemetry),
    /// Any other event, by name
    Other(String),
}

/// Whether the message is a socket.io event at all
pub fn is_event(msg: &str) -> bool {
    msg.len() > 2 && msg.starts_with("42")
}

/// JSON array carried by an event message
///
/// `None` when the message carries no data: a `null` anywhere in it (the
/// simulator in manual mode), or no `[ ... }]` span.
pub fn extract_payload(msg: &str) -> Option<&str> {
    if msg.contains("null") {
        return None;
    }
    let start = msg.find('[')?;
    let end = msg.rfind("}]")?;
    if end < start {
        return None;
    }
    Some(&msg[start..end + 2])
}

pub fn decode_event(payload: &str) -> MpcResult<Event> {
    let (name, data): (String, Value) = serde_json::from_str(payload)?;
    if name == "telemetry" {
        Ok(Event::Telemetry(serde_json::from_value(data)?))
    } else {
        Ok(Event::Other(name))
    }
}

pub fn encode_steer(cmd: &SteerCommand) -> MpcResult<String> {
    Ok(format!("42[\"steer\",{}]", serde_json::to_string(cmd)?))
}

/// Reply when the simulator is driven by hand
pub fn manual_reply() -> String {
    "42[\"manual\",{}]".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TELEMETRY: &str = r#"42["telemetry",{"ptsx":[1.0,2.0,3.0,4.0],"ptsy":[0.5,0.5,0.5,0.5],"x":0.0,"y":0.0,"psi":0.0,"speed":20.0}]"#;

    #[test]
    fn test_extract_payload() {
        assert!(is_event(TELEMETRY));
        let payload = extract_payload(TELEMETRY).unwrap();
        assert!(payload.starts_with("[\"telemetry\""));
        assert!(payload.ends_with("}]"));
    }

    #[test]
    fn test_null_or_empty_payload() {
        assert_eq!(extract_payload("42[\"telemetry\",null]"), None);
        assert_eq!(extract_payload("42"), None);
        assert!(!is_event("2probe"));
    }

    #[test]
    fn test_decode_events() {
        let event = decode_event(extract_payload(TELEMETRY).unwrap()).unwrap();
        match event {
            Event::Telemetry(t) => assert_eq!(t.speed, 20.0),
            other => panic!("unexpected event {:?}", other),
        }
        let other = decode_event(r#"["reset",{}]"#).unwrap();
        assert_eq!(other, Event::Other("reset".to_string()));
        assert!(decode_event(r#"["telemetry",{"x":1}]"#).is_err());
    }

    #[test]
    fn test_encode_steer() {
        let cmd = SteerCommand {
            steering_angle: -0.5,
            throttle: 0.25,
            mpc_x: vec![0.0, 1.0],
            mpc_y: vec![0.0, 0.0],
            next_x: vec![],
            next_y: vec![],
        };
        let msg = encode_steer(&cmd).unwrap();
        assert!(msg.starts_with("42[\"steer\",{"));
        let (name, back): (String, SteerCommand) = serde_json::from_str(&msg[2..]).unwrap();
        assert_eq!(name, "steer");
        assert_eq!(back, cmd);
        assert_eq!(manual_reply(), r#"42["manual",{}]"#);
    }
}
