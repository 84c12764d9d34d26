//! Cubic Hermite curve between two oriented waypoints

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Curvature reported for straight sections, so that consumers dividing by
/// curvature never divide by zero.
pub const MIN_CURVATURE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cubic Hermite curve parameterised over `t` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermiteCurve {
    start: Vector2<f64>,
    end: Vector2<f64>,
    start_tangent: Vector2<f64>,
    end_tangent: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HermiteCurve {
    /// Create a curve leaving `start` along `start_heading_rad` and arriving
    /// at `end` along `end_heading_rad`.
    pub fn new(
        start: Vector2<f64>,
        start_heading_rad: f64,
        start_curviness: f64,
        end: Vector2<f64>,
        end_heading_rad: f64,
        end_curviness: f64,
    ) -> Self {
        Self {
            start,
            end,
            start_tangent: start_curviness
                * Vector2::new(start_heading_rad.cos(), start_heading_rad.sin()),
            end_tangent: end_curviness
                * Vector2::new(end_heading_rad.cos(), end_heading_rad.sin()),
        }
    }

    /// Position at `t`.
    pub fn point(&self, t: f64) -> Vector2<f64> {
        let t2 = t * t;
        let t3 = t2 * t;

        (2.0 * t3 - 3.0 * t2 + 1.0) * self.start
            + (t3 - 2.0 * t2 + t) * self.start_tangent
            + (-2.0 * t3 + 3.0 * t2) * self.end
            + (t3 - t2) * self.end_tangent
    }

    /// First derivative with respect to `t`.
    pub fn derivative(&self, t: f64) -> Vector2<f64> {
        let t2 = t * t;

        (6.0 * t2 - 6.0 * t) * (self.start - self.end)
            + (3.0 * t2 - 4.0 * t + 1.0) * self.start_tangent
            + (3.0 * t2 - 2.0 * t) * self.end_tangent
    }

    /// Second derivative with respect to `t`.
    pub fn second_derivative(&self, t: f64) -> Vector2<f64> {
        (12.0 * t - 6.0) * (self.start - self.end)
            + (6.0 * t - 4.0) * self.start_tangent
            + (6.0 * t - 2.0) * self.end_tangent
    }

    /// Direction of travel at `t`, or `None` where the curve is stationary.
    pub fn heading(&self, t: f64) -> Option<f64> {
        let d = self.derivative(t);
        if d.norm_squared() > 0.0 {
            Some(d.y.atan2(d.x))
        }
        else {
            None
        }
    }

    /// Signed curvature at `t`, positive when turning counter-clockwise.
    pub fn curvature(&self, t: f64) -> f64 {
        let d = self.derivative(t);
        let dd = self.second_derivative(t);

        let cross = d.x * dd.y - d.y * dd.x;
        if cross == 0.0 {
            return MIN_CURVATURE;
        }

        cross / d.norm().powi(3)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_endpoints_and_tangents() {
        let curve = HermiteCurve::new(
            Vector2::new(0.0, 0.0), 0.0, 2.0,
            Vector2::new(1.0, 1.0), PI / 2.0, 2.0,
        );

        assert_eq!(curve.point(0.0), Vector2::new(0.0, 0.0));
        assert!((curve.point(1.0) - Vector2::new(1.0, 1.0)).norm() < 1e-12);
        assert!((curve.derivative(0.0) - Vector2::new(2.0, 0.0)).norm() < 1e-12);
        assert!((curve.derivative(1.0) - Vector2::new(0.0, 2.0)).norm() < 1e-12);
        assert!((curve.heading(0.5).unwrap() - PI / 4.0).abs() < 1e-12);

        // Left hand turn
        assert!(curve.curvature(0.5) > 0.0);
    }

    #[test]
    fn test_derivatives_match_finite_difference() {
        let curve = HermiteCurve::new(
            Vector2::new(0.0, 0.0), 0.3, 1.5,
            Vector2::new(2.0, -1.0), -1.0, 0.7,
        );

        let h = 1e-6;
        for &t in [0.1, 0.4, 0.77].iter() {
            let fd = (curve.point(t + h) - curve.point(t - h)) / (2.0 * h);
            assert!((fd - curve.derivative(t)).norm() < 1e-6);

            let fd2 = (curve.derivative(t + h) - curve.derivative(t - h)) / (2.0 * h);
            assert!((fd2 - curve.second_derivative(t)).norm() < 1e-5);
        }
    }

    #[test]
    fn test_straight_line() {
        let curve = HermiteCurve::new(
            Vector2::new(0.0, 0.0), 0.0, 1.0,
            Vector2::new(3.0, 0.0), 0.0, 1.0,
        );

        assert_eq!(curve.curvature(0.3), MIN_CURVATURE);
        assert_eq!(curve.heading(0.3), Some(0.0));
    }

    #[test]
    fn test_circle_curvature() {
        // Unit quarter circle, the tangent length is the usual cubic fit
        let curve = HermiteCurve::new(
            Vector2::new(1.0, 0.0), PI / 2.0, 1.6568,
            Vector2::new(0.0, 1.0), PI, 1.6568,
        );

        assert!((curve.point(0.5).norm() - 1.0).abs() < 0.01);
        assert!((curve.curvature(0.5) - 1.0).abs() < 0.05);
    }
}
