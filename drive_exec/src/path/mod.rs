//! # Path
//!
//! Smooth paths between oriented waypoints, with a velocity profile along them.
//!
//! Generation happens in three steps:
//!
//! 1. Each pair of waypoints is joined by a cubic Hermite curve, leaving and arriving along the
//!    waypoint headings.
//! 2. The curve is walked to place points at (nearly) uniform spacing. Each new point is found by
//!    narrowing a window over the curve parameter until the chord from the previous point is
//!    within tolerance of the spacing.
//! 3. Velocities are assigned from the curvature and the acceleration limit, forwards and then
//!    backwards, and integrated to give the time each point is reached.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod hermite;
mod params;
mod store;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::{Deserialize, Serialize};

// Internal
pub use hermite::*;
pub use params::PathParams;
pub use store::*;
use crate::pose::Pose;
use util::maths::ang_dist;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Limit on the number of window narrowing steps used to place a single point.
const MAX_SEARCH_STEPS: usize = 200;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An oriented point the path must pass through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub pose: Pose,

    /// Overrides the path's curviness for the tangent at this waypoint
    #[serde(default)]
    pub curviness_m: Option<f64>,

    /// Caps the path velocity at this waypoint
    #[serde(default)]
    pub max_vel_ms: Option<f64>,
}

/// A single point of a generated path.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathPoint {
    /// Position and heading. The velocity fields mirror `velocity_ms` and
    /// `ang_vel_rads` so the pose can be used directly as a target.
    pub pose: Pose,

    /// Signed curvature, positive turning left
    pub curvature_m: f64,

    /// Time from the start of the path at which this point is reached
    pub time_s: f64,

    /// Distance along the path from the start
    pub distance_m: f64,

    pub velocity_ms: f64,

    /// Acceleration over the segment leaving this point
    pub accel_mss: f64,

    pub ang_vel_rads: f64,

    /// Angular acceleration over the segment leaving this point
    pub ang_accel_radss: f64,
}

/// A generated path.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Path {
    points: Vec<PathPoint>,

    params: PathParams,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Invalid path parameters: {0}")]
    InvalidParams(String),

    #[error("A path needs at least two waypoints, found {0}")]
    TooFewWaypoints(usize),

    #[error("Waypoints {0} and {1} are at the same position")]
    CoincidentWaypoints(usize, usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            curviness_m: None,
            max_vel_ms: None,
        }
    }

    pub fn with_curviness(mut self, curviness_m: f64) -> Self {
        self.curviness_m = Some(curviness_m);
        self
    }

    pub fn with_max_vel(mut self, max_vel_ms: f64) -> Self {
        self.max_vel_ms = Some(max_vel_ms);
        self
    }
}

impl From<Pose> for Waypoint {
    fn from(pose: Pose) -> Self {
        Self::new(pose)
    }
}

impl Path {
    /// Generate a path between two poses.
    pub fn between(start: Pose, end: Pose, params: &PathParams) -> Result<Self, PathError> {
        Self::generate(&[start.into(), end.into()], params)
    }

    /// Generate a path passing through all the waypoints in order.
    pub fn generate(waypoints: &[Waypoint], params: &PathParams) -> Result<Self, PathError> {
        params.validate()?;

        if waypoints.len() < 2 {
            return Err(PathError::TooFewWaypoints(waypoints.len()));
        }

        // Place the points of each segment, the first point of each segment after the first is
        // the last point of the previous one
        let mut points: Vec<PathPoint> = Vec::new();
        let mut caps: Vec<f64> = Vec::new();
        for (i, pair) in waypoints.windows(2).enumerate() {
            if pair[0].pose.distance(&pair[1].pose) <= params.max_spacing_error_m {
                return Err(PathError::CoincidentWaypoints(i, i + 1));
            }

            let (seg_points, seg_caps) = sample_segment(&pair[0], &pair[1], params);
            let skip = if points.is_empty() { 0 } else { 1 };
            points.extend(seg_points.into_iter().skip(skip));
            caps.extend(seg_caps.into_iter().skip(skip));
        }

        let mut path = Self {
            points,
            params: *params,
        };
        path.parameterise(&caps);

        debug!(
            "Generated path through {} waypoints: {} points, {:.3} m, {:.3} s",
            waypoints.len(),
            path.len(),
            path.length(),
            path.total_time()
        );

        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&PathPoint> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&PathPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PathPoint> {
        self.points.last()
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Time taken to traverse the path.
    pub fn total_time(&self) -> f64 {
        self.points.last().map(|p| p.time_s).unwrap_or(0.0)
    }

    /// Length of the path.
    pub fn length(&self) -> f64 {
        self.points.last().map(|p| p.distance_m).unwrap_or(0.0)
    }

    /// The point reached at `t_s`, interpolated between the points either side.
    ///
    /// Times before the start or after the end give the first or last point.
    pub fn sample_at_time(&self, t_s: f64) -> Option<PathPoint> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if t_s <= first.time_s {
            return Some(*first);
        }
        if t_s >= last.time_s {
            return Some(*last);
        }

        // Index of the first point reached after t
        let next = self.points.partition_point(|p| p.time_s <= t_s);
        let p0 = &self.points[next - 1];
        let p1 = &self.points[next];

        let dt = p1.time_s - p0.time_s;
        let f = if dt > 0.0 { (t_s - p0.time_s) / dt } else { 0.0 };

        Some(interpolate(p0, p1, f))
    }

    /// Index of the path point closest to `pose`, searching forward from `from`.
    ///
    /// The search stops once the distance starts increasing, so the robot cannot skip ahead to a
    /// later part of a path that loops back near itself.
    pub fn closest_index(&self, pose: &Pose, from: usize) -> usize {
        if self.points.is_empty() {
            return 0;
        }
        let from = from.min(self.points.len() - 1);

        let mut closest = from;
        let mut nearest = proximity(pose, &self.points[from].pose);
        let mut last = nearest;

        for (i, p) in self.points.iter().enumerate().skip(from + 1) {
            let prox = proximity(pose, &p.pose);
            if prox < nearest {
                nearest = prox;
                closest = i;
            }
            else if prox > last {
                break;
            }
            last = prox;
        }

        closest
    }

    /// Index of the first point at or after `from` where the path leaves the circle of radius
    /// `lookahead_m` around `pose`, or `None` if the path does not cross it.
    pub fn lookahead_index(&self, pose: &Pose, from: usize, lookahead_m: f64) -> Option<usize> {
        let radius2 = lookahead_m * lookahead_m;

        for i in from..self.points.len().saturating_sub(1) {
            let first = radius2 - proximity(pose, &self.points[i].pose);
            let second = radius2 - proximity(pose, &self.points[i + 1].pose);

            // One inside the circle and the other outside
            if first * second < 0.0 {
                return Some(i + 1);
            }
        }

        None
    }

    /// Assign velocity, time and acceleration to the placed points.
    ///
    /// `caps` holds the curvature (and waypoint) velocity limit of each point.
    fn parameterise(&mut self, caps: &[f64]) {
        let n = self.points.len();
        let a = self.params.max_accel_mss;

        // Arc length
        for i in 1..n {
            let ds = self.points[i - 1].pose.distance(&self.points[i].pose);
            self.points[i].distance_m = self.points[i - 1].distance_m + ds;
        }

        let ds = |pts: &Vec<PathPoint>, i: usize| pts[i + 1].distance_m - pts[i].distance_m;

        // Start and finish at rest
        let mut vels: Vec<f64> = caps.to_vec();
        vels[0] = 0.0;
        vels[n - 1] = 0.0;

        // Forward pass, limited by acceleration from the previous point
        for i in 1..n {
            let reachable = (vels[i - 1].powi(2) + 2.0 * a * ds(&self.points, i - 1)).sqrt();
            vels[i] = vels[i].min(reachable);
        }

        // Backward pass, limited by deceleration into the next point
        for i in (0..n - 1).rev() {
            let reachable = (vels[i + 1].powi(2) + 2.0 * a * ds(&self.points, i)).sqrt();
            vels[i] = vels[i].min(reachable);
        }

        for (p, v) in self.points.iter_mut().zip(vels.iter()) {
            p.velocity_ms = *v;
            p.ang_vel_rads = v * p.curvature_m;
            p.pose.lin_vel_ms = p.velocity_ms;
            p.pose.ang_vel_rads = p.ang_vel_rads;
        }

        // Time and the accelerations over each segment
        for i in 0..n - 1 {
            let avg_vel = 0.5 * (self.points[i].velocity_ms + self.points[i + 1].velocity_ms);
            let dt = if avg_vel > 0.0 {
                ds(&self.points, i) / avg_vel
            }
            else {
                warn!("Path segment {} has no velocity, time will not advance over it", i);
                0.0
            };

            self.points[i + 1].time_s = self.points[i].time_s + dt;

            if dt > 0.0 {
                self.points[i].accel_mss =
                    (self.points[i + 1].velocity_ms - self.points[i].velocity_ms) / dt;
                self.points[i].ang_accel_radss =
                    (self.points[i + 1].ang_vel_rads - self.points[i].ang_vel_rads) / dt;
            }
        }

        self.points[n - 1].accel_mss = 0.0;
        self.points[n - 1].ang_accel_radss = 0.0;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Place points along the curve between two waypoints, returning the points (with pose and
/// curvature) and the velocity cap at each.
fn sample_segment(
    start: &Waypoint,
    end: &Waypoint,
    params: &PathParams,
) -> (Vec<PathPoint>, Vec<f64>) {
    let curve = HermiteCurve::new(
        start.pose.position2(),
        start.pose.heading_rad,
        start.curviness_m.unwrap_or(params.curviness_m),
        end.pose.position2(),
        end.pose.heading_rad,
        end.curviness_m.unwrap_or(params.curviness_m),
    );

    let end_position = end.pose.position2();
    let scaling = params.binary_search_scaling;

    let mut points = vec![make_point(&curve, 0.0, Some(start.pose.heading_rad))];
    let mut caps = vec![velocity_cap(params, points[0].curvature_m, start.max_vel_ms)];

    let mut t0 = 0.0;
    while (end_position - points[points.len() - 1].pose.position2()).norm()
        > params.spacing_m + params.max_spacing_error_m
    {
        let last = points[points.len() - 1].pose.position2();

        // Narrow the window [t0, t2] until the candidate is the right distance away
        let mut t2 = 1.0;
        let mut t1 = t0 * scaling + t2 * (1.0 - scaling);
        let mut dist = (curve.point(t1) - last).norm();
        let mut steps = 0;
        while (dist - params.spacing_m).abs() > params.max_spacing_error_m {
            if dist > params.spacing_m {
                t2 = t1;
            }
            else {
                t0 = t1;
            }
            t1 = t0 * scaling + t2 * (1.0 - scaling);
            dist = (curve.point(t1) - last).norm();

            steps += 1;
            if steps >= MAX_SEARCH_STEPS {
                warn!(
                    "Point placement did not converge at t = {:.6}, spacing error {:.2e} m",
                    t1,
                    dist - params.spacing_m
                );
                break;
            }
        }

        // A window that collapsed without moving means the curve cannot be walked any further
        if t1 <= t0 && dist < params.max_spacing_error_m {
            warn!("Point placement stalled at t = {:.6}, jumping to the end", t1);
            break;
        }
        t0 = t1;

        let point = make_point(&curve, t1, None);
        caps.push(velocity_cap(params, point.curvature_m, None));
        points.push(point);
    }

    // The end of the segment is exactly the waypoint
    let mut last = make_point(&curve, 1.0, Some(end.pose.heading_rad));
    last.pose.x_m = end.pose.x_m;
    last.pose.y_m = end.pose.y_m;
    caps.push(velocity_cap(params, last.curvature_m, end.max_vel_ms));
    points.push(last);

    (points, caps)
}

fn make_point(curve: &HermiteCurve, t: f64, heading_rad: Option<f64>) -> PathPoint {
    let position = curve.point(t);
    let heading_rad = heading_rad.or_else(|| curve.heading(t)).unwrap_or(0.0);

    PathPoint {
        pose: Pose::new(position.x, position.y, heading_rad),
        curvature_m: curve.curvature(t),
        ..Default::default()
    }
}

/// Velocity limit at a point, slowing down so the outer wheel stays within
/// the velocity limit on curves.
fn velocity_cap(params: &PathParams, curvature_m: f64, hint_ms: Option<f64>) -> f64 {
    let curve_cap = params.max_vel_ms / (curvature_m.abs() * params.track_width_m);
    let cap = params.max_vel_ms.min(curve_cap);

    match hint_ms {
        Some(h) => cap.min(h.abs()),
        None => cap,
    }
}

/// Squared distance between two poses.
fn proximity(a: &Pose, b: &Pose) -> f64 {
    let dx = b.x_m - a.x_m;
    let dy = b.y_m - a.y_m;
    dx * dx + dy * dy
}

fn interpolate(p0: &PathPoint, p1: &PathPoint, f: f64) -> PathPoint {
    let lerp = |a: f64, b: f64| a + f * (b - a);

    let velocity_ms = lerp(p0.velocity_ms, p1.velocity_ms);
    let ang_vel_rads = lerp(p0.ang_vel_rads, p1.ang_vel_rads);

    PathPoint {
        pose: Pose {
            x_m: lerp(p0.pose.x_m, p1.pose.x_m),
            y_m: lerp(p0.pose.y_m, p1.pose.y_m),
            heading_rad: p0.pose.heading_rad
                + f * ang_dist(p0.pose.heading_rad, p1.pose.heading_rad),
            lin_vel_ms: velocity_ms,
            ang_vel_rads,
        },
        curvature_m: lerp(p0.curvature_m, p1.curvature_m),
        time_s: lerp(p0.time_s, p1.time_s),
        distance_m: lerp(p0.distance_m, p1.distance_m),
        velocity_ms,
        accel_mss: p0.accel_mss,
        ang_vel_rads,
        ang_accel_radss: p0.ang_accel_radss,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn params() -> PathParams {
        PathParams {
            curviness_m: 1.0,
            max_vel_ms: 1.5,
            max_accel_mss: 3.0,
            track_width_m: 0.3,
            spacing_m: 0.0127,
            max_spacing_error_m: 0.00127,
            binary_search_scaling: 0.75,
        }
    }

    fn s_bend() -> Path {
        Path::between(
            Pose::new(0.0, 0.0, 0.0),
            Pose::new(1.5, 1.0, 0.0),
            &params(),
        )
        .unwrap()
    }

    #[test]
    fn test_spacing_and_endpoints() {
        let p = params();
        let path = s_bend();
        let pts = path.points();

        assert!(pts.len() > 100);

        // Exactly on the waypoints
        assert_eq!(pts[0].pose.x_m, 0.0);
        assert_eq!(pts[0].pose.y_m, 0.0);
        assert_eq!(pts[0].pose.heading_rad, 0.0);
        let last = pts[pts.len() - 1];
        assert_eq!(last.pose.x_m, 1.5);
        assert_eq!(last.pose.y_m, 1.0);
        assert_eq!(last.pose.heading_rad, 0.0);

        // Even spacing, apart from the final segment which may be short
        for w in pts[..pts.len() - 1].windows(2) {
            let d = w[0].pose.distance(&w[1].pose);
            assert!(
                (d - p.spacing_m).abs() <= p.max_spacing_error_m + 1e-12,
                "spacing {} out of tolerance", d
            );
        }
        let final_seg = pts[pts.len() - 2].pose.distance(&last.pose);
        assert!(final_seg <= p.spacing_m + p.max_spacing_error_m);
    }

    #[test]
    fn test_velocity_profile() {
        let p = params();
        let path = s_bend();
        let pts = path.points();

        assert_eq!(pts[0].velocity_ms, 0.0);
        assert_eq!(pts[pts.len() - 1].velocity_ms, 0.0);
        assert_eq!(pts[pts.len() - 1].accel_mss, 0.0);

        for (i, w) in pts.windows(2).enumerate() {
            let ds = w[1].distance_m - w[0].distance_m;
            assert!(ds > 0.0);

            // Acceleration limit between neighbours
            let dv2 = (w[1].velocity_ms.powi(2) - w[0].velocity_ms.powi(2)).abs();
            assert!(dv2 <= 2.0 * p.max_accel_mss * ds + 1e-9, "point {}", i);

            // Time increases
            assert!(w[1].time_s > w[0].time_s);
        }

        for pt in pts {
            assert!(pt.velocity_ms <= p.max_vel_ms + 1e-12);
            assert!(pt.velocity_ms <= p.max_vel_ms / (pt.curvature_m.abs() * p.track_width_m) + 1e-9);
            assert!((pt.ang_vel_rads - pt.velocity_ms * pt.curvature_m).abs() < 1e-12);
        }

        // The S bend turns left then right
        assert!(pts[pts.len() / 4].curvature_m > 0.0);
        assert!(pts[3 * pts.len() / 4].curvature_m < 0.0);
    }

    #[test]
    fn test_straight_path_reaches_max_velocity() {
        let path = Path::between(
            Pose::new(0.0, 0.0, PI / 2.0),
            Pose::new(0.0, 3.0, PI / 2.0),
            &params(),
        )
        .unwrap();

        let peak = path.points().iter().map(|p| p.velocity_ms).fold(0.0, f64::max);
        assert!((peak - 1.5).abs() < 1e-9);

        // Trapezoid: 0.5 s up, 0.5 s down, cruise over the remaining 2.25 m
        assert!((path.total_time() - (1.0 + 2.25 / 1.5)).abs() < 0.02);
        assert!((path.length() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_multiple_waypoints_and_hints() {
        let waypoints = [
            Waypoint::new(Pose::new(0.0, 0.0, 0.0)),
            Waypoint::new(Pose::new(1.0, 0.0, 0.0)).with_max_vel(0.2),
            Waypoint::new(Pose::new(2.0, 0.5, PI / 4.0)).with_curviness(0.5),
        ];
        let path = Path::generate(&waypoints, &params()).unwrap();

        // The middle waypoint is in the path and slow
        let mid = path.points().iter()
            .find(|p| p.pose.x_m == 1.0 && p.pose.y_m == 0.0)
            .unwrap();
        assert!(mid.velocity_ms <= 0.2);

        let last = path.last().unwrap();
        assert_eq!(last.pose.x_m, 2.0);
        assert_eq!(last.pose.heading_rad, PI / 4.0);
    }

    #[test]
    fn test_errors() {
        let mut p = params();

        match Path::generate(&[Waypoint::new(Pose::default())], &p) {
            Err(PathError::TooFewWaypoints(1)) => (),
            r => panic!("Unexpected {:?}", r),
        }

        match Path::between(Pose::new(1.0, 1.0, 0.0), Pose::new(1.0, 1.0, 2.0), &p) {
            Err(PathError::CoincidentWaypoints(0, 1)) => (),
            r => panic!("Unexpected {:?}", r),
        }

        p.spacing_m = 0.0;
        match Path::between(Pose::default(), Pose::new(1.0, 0.0, 0.0), &p) {
            Err(PathError::InvalidParams(_)) => (),
            r => panic!("Unexpected {:?}", r),
        }
    }

    #[test]
    fn test_queries() {
        let path = s_bend();

        // Sampling by time
        let total = path.total_time();
        assert_eq!(path.sample_at_time(-1.0).unwrap(), *path.first().unwrap());
        assert_eq!(path.sample_at_time(total + 1.0).unwrap(), *path.last().unwrap());
        let mid = path.sample_at_time(0.5 * total).unwrap();
        assert!(mid.distance_m > 0.0 && mid.distance_m < path.length());
        assert!((mid.time_s - 0.5 * total).abs() < 1e-9);

        // Closest point search
        let target = path.point(50).unwrap().pose;
        let offset = Pose::new(target.x_m, target.y_m + 0.001, 0.0);
        assert_eq!(path.closest_index(&offset, 0), 50);
        assert_eq!(path.closest_index(&offset, 40), 50);

        // Lookahead point is about the lookahead distance away
        let idx = path.lookahead_index(&path.first().unwrap().pose, 0, 0.25).unwrap();
        let d = path.first().unwrap().pose.distance(&path.point(idx).unwrap().pose);
        assert!((d - 0.25).abs() < 0.02);
        assert!(path.lookahead_index(&path.first().unwrap().pose, 0, 100.0).is_none());
    }
}
