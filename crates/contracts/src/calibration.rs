//! Geometry primitives and the two-point calibration estimate

use serde::{Deserialize, Serialize};
use std::fmt;

/// 3D point, real-world (metres) or projective (pixels + depth)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Real-world probe on the optical axis, one unit in front of the sensor
pub const PRINCIPAL_PROBE: Point3 = Point3::new(0.0, 0.0, -1.0);

/// Real-world probe one unit off-axis in X and Y, same depth as [`PRINCIPAL_PROBE`]
pub const FOCAL_PROBE: Point3 = Point3::new(1.0, 1.0, -1.0);

/// Intrinsics estimate derived from two projective probes
///
/// A finite-difference estimate under an ideal pinhole model without lens
/// distortion. Diagnostic only; not a substitute for a full calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEstimate {
    /// (cx, cy) in pixels
    pub principal_point: (f64, f64),

    /// (fx, fy) in pixels
    pub focal_length: (f64, f64),
}

impl CalibrationEstimate {
    /// Derive the estimate from the projections of [`PRINCIPAL_PROBE`] and [`FOCAL_PROBE`].
    ///
    /// The projective X axis is mirrored relative to real-world X, so `fx` is negated;
    /// `fy` is not.
    pub fn from_probes(principal: Point3, focal: Point3) -> Self {
        let (cx, cy) = (principal.x, principal.y);
        Self {
            principal_point: (cx, cy),
            focal_length: (-(focal.x - cx), focal.y - cy),
        }
    }

    #[inline]
    pub fn cx(&self) -> f64 {
        self.principal_point.0
    }

    #[inline]
    pub fn cy(&self) -> f64 {
        self.principal_point.1
    }

    #[inline]
    pub fn fx(&self) -> f64 {
        self.focal_length.0
    }

    #[inline]
    pub fn fy(&self) -> f64 {
        self.focal_length.1
    }
}

impl fmt::Display for CalibrationEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cx:{:.3}, cy:{:.3}, fx:{:.3}, fy:{:.3}",
            self.cx(),
            self.cy(),
            self.fx(),
            self.fy()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_probes_negates_x() {
        let estimate = CalibrationEstimate::from_probes(
            Point3::new(320.0, 240.0, 1.0),
            Point3::new(-255.0, 815.0, 1.0),
        );
        assert_eq!(estimate.principal_point, (320.0, 240.0));
        assert_eq!(estimate.focal_length, (575.0, 575.0));
    }

    #[test]
    fn test_display_uses_three_decimals() {
        let estimate = CalibrationEstimate {
            principal_point: (320.0, 240.5),
            focal_length: (575.8159, 575.8159),
        };
        assert_eq!(
            estimate.to_string(),
            "cx:320.000, cy:240.500, fx:575.816, fy:575.816"
        );
    }
}
