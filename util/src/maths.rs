//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// `num_traits::Float` does not provide this so it mirrors the std
/// implementation for `f64`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    let wrapped = rem_euclid(angle + pi, tau) - pi;

    // rem_euclid maps exactly +pi onto -pi, keep the upper bound inclusive
    if wrapped == -pi { pi } else { wrapped }
}

/// Get the shortest signed angle which takes `from` onto `to`.
///
/// Positive values are counter-clockwise.
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float
{
    wrap_pi(to - from)
}

/// Normalised sinc function, `sin(x)/x` with `sinc(0) = 1`.
pub fn sinc<T>(x: T) -> T
where
    T: Float
{
    if x.abs() < T::epsilon() {
        T::one()
    }
    else {
        x.sin() / x
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < 1e-12);
        assert!((wrap_pi(PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(2.5 * PI) - 0.5 * PI).abs() < 1e-12);
        assert!((wrap_pi(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
        assert!((wrap_pi(-1.5 * PI) - 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_ang_dist() {
        assert!((ang_dist(0.1f64, 0.3) - 0.2).abs() < 1e-12);
        assert!((ang_dist(0.3f64, 0.1) + 0.2).abs() < 1e-12);

        // Crossing the wrap point takes the short way round
        assert!((ang_dist(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_sinc() {
        assert_eq!(sinc(0f64), 1f64);
        assert!((sinc(PI / 2.0) - 2.0 / PI).abs() < 1e-12);
    }
}
