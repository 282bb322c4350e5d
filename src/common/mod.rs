//! Common types, traits, and error definitions for mpc_controller
//!
//! This module provides the foundational building blocks shared by the
//! controller, the solver glue and the telemetry codec.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
