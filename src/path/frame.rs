//! World to vehicle frame conversion of waypoints

use crate::common::{MpcError, MpcResult};

/// Express global waypoints in the frame of a vehicle at `(px, py)` heading `psi`
///
/// The vehicle ends up at the origin looking along +x, so a path straight
/// ahead lies on the x axis.
pub fn to_vehicle_frame(
    px: f64,
    py: f64,
    psi: f64,
    ptsx: &[f64],
    ptsy: &[f64],
) -> MpcResult<(Vec<f64>, Vec<f64>)> {
    if ptsx.len() != ptsy.len() {
        return Err(MpcError::DegenerateInput(format!(
            "waypoint x and y counts differ ({} vs {})",
            ptsx.len(),
            ptsy.len()
        )));
    }

    let (sin, cos) = (-psi).sin_cos();
    let (xs, ys) = ptsx
        .iter()
        .zip(ptsy.iter())
        .map(|(&gx, &gy)| {
            let dx = gx - px;
            let dy = gy - py;
            (dx * cos - dy * sin, dx * sin + dy * cos)
        })
        .unzip();
    Ok((xs, ys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_translation_only() {
        let (xs, ys) = to_vehicle_frame(1.0, 2.0, 0.0, &[3.0], &[5.0]).unwrap();
        assert!((xs[0] - 2.0).abs() < 1e-12);
        assert!((ys[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_ahead_lands_on_x_axis() {
        // Vehicle looking north, point 10 m north of it
        let (xs, ys) = to_vehicle_frame(0.0, 0.0, FRAC_PI_2, &[0.0], &[10.0]).unwrap();
        assert!((xs[0] - 10.0).abs() < 1e-9);
        assert!(ys[0].abs() < 1e-9);
    }

    #[test]
    fn test_point_on_left_is_positive_y() {
        let (xs, ys) = to_vehicle_frame(0.0, 0.0, 0.0, &[0.0], &[4.0]).unwrap();
        assert!(xs[0].abs() < 1e-12);
        assert!(ys[0] > 0.0);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(to_vehicle_frame(0.0, 0.0, 0.0, &[0.0, 1.0], &[0.0]).is_err());
    }
}
