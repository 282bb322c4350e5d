//! Simulator telemetry codec
//!
//! Decodes the simulator's socket.io event messages into controller inputs
//! and encodes the steering replies. The transport itself is left to the
//! caller.

pub mod codec;
pub mod handler;
pub mod messages;

pub use codec::{decode_event, encode_steer, extract_payload, manual_reply, Event};
pub use handler::TelemetryHandler;
pub use messages::{ControllerInputs, SteerCommand, Telemetry};
