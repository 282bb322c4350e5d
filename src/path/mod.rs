//! Reference path utilities

pub mod frame;
pub mod polynomial;

pub use frame::to_vehicle_frame;
pub use polynomial::{polyeval, polyfit, CubicPolynomial};
