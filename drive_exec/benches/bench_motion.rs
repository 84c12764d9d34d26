//! # Motion Planning Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_lib::{
    path::{Path, PathParams, Waypoint},
    pose::Pose,
    profile::{MotionConstraints, MotionProfile, SCurveProfile, TrapezoidalProfile},
};

fn path_benchmark(c: &mut Criterion) {
    let params = PathParams {
        curviness_m: 1.0,
        max_vel_ms: 1.0,
        max_accel_mss: 2.0,
        track_width_m: 0.3,
        spacing_m: 0.0127,
        max_spacing_error_m: 0.00127,
        binary_search_scaling: 0.75,
    };

    // A slalom through four gates
    let waypoints = vec![
        Waypoint::new(Pose::new(0.0, 0.0, 0.0)),
        Waypoint::new(Pose::new(1.0, 0.6, 0.0)),
        Waypoint::new(Pose::new(2.0, -0.6, 0.0)).with_curviness(1.5),
        Waypoint::new(Pose::new(3.0, 0.6, 0.0)).with_max_vel(0.5),
        Waypoint::new(Pose::new(4.0, 0.0, 0.0)),
    ];

    c.bench_function("Path::generate", |b| {
        b.iter(|| Path::generate(black_box(&waypoints), &params).unwrap())
    });

    let path = Path::generate(&waypoints, &params).unwrap();
    let total_s = path.total_time();

    c.bench_function("Path::sample_at_time", |b| {
        b.iter(|| {
            for i in 0..100 {
                black_box(path.sample_at_time(total_s * i as f64 / 100.0));
            }
        })
    });

    // Walking the closest point along the path as a follower would
    let poses: Vec<Pose> = (0..100)
        .filter_map(|i| path.sample_at_time(total_s * i as f64 / 100.0))
        .map(|p| Pose::new(p.pose.x_m + 0.02, p.pose.y_m - 0.02, p.pose.heading_rad))
        .collect();

    c.bench_function("Path::closest_index", |b| {
        b.iter(|| {
            let mut closest = 0;
            for pose in &poses {
                closest = path.closest_index(black_box(pose), closest);
            }
            closest
        })
    });
}

fn profile_benchmark(c: &mut Criterion) {
    let constraints = MotionConstraints::new(1.0, 2.0, 10.0);

    let mut s_curve = SCurveProfile::new(constraints);
    c.bench_function("SCurveProfile::set_parameters", |b| {
        b.iter(|| s_curve.set_parameters(black_box(2.5), None))
    });

    let mut trapezoidal = TrapezoidalProfile::new(constraints);
    trapezoidal.set_parameters(2.5, None);
    s_curve.set_parameters(2.5, None);

    c.bench_function("SCurveProfile::sample", |b| {
        let total_s = s_curve.total_time();
        b.iter(|| {
            for i in 0..100 {
                black_box(s_curve.sample(total_s * i as f64 / 100.0));
            }
        })
    });

    c.bench_function("TrapezoidalProfile::sample", |b| {
        let total_s = trapezoidal.total_time();
        b.iter(|| {
            for i in 0..100 {
                black_box(trapezoidal.sample(total_s * i as f64 / 100.0));
            }
        })
    });

    c.bench_function("SCurveProfile::time_at_position", |b| {
        b.iter(|| s_curve.time_at_position(black_box(1.3)))
    });
}

criterion_group!(benches, path_benchmark, profile_benchmark);
criterion_main!(benches);
