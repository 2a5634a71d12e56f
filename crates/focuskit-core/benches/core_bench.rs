//! Benchmarks for the compensation hot paths.
//!
//! Run with: cargo bench -p focuskit-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use focuskit_core::{CalibrationTable, HeightSurface, SurfacePoint};
use std::path::Path;

fn bench_lookup(c: &mut Criterion) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/calibration/default_lens.json");
    let table = CalibrationTable::load_from_file(&path).expect("default lens table");

    c.bench_function("calibration_lookup_low_end", |b| {
        b.iter(|| table.lookup(black_box(5.55)))
    });
    c.bench_function("calibration_lookup_high_end", |b| {
        b.iter(|| table.lookup(black_box(32.95)))
    });
}

fn bench_interpolate(c: &mut Criterion) {
    let mut surface = HeightSurface::create_zero_surface(1600, 1500, 50, 0).expect("grid");
    for i in 0..surface.len() {
        surface.update_point(i, SurfacePoint::new(0.0, 0.0, (i % 7) as f32 * 0.1));
    }
    surface.sort_points();

    c.bench_function("surface_interpolate_center", |b| {
        b.iter(|| surface.interpolate(black_box(812.5), black_box(740.0)))
    });
    c.bench_function("surface_interpolate_far_corner", |b| {
        b.iter(|| surface.interpolate(black_box(1599.0), black_box(1499.0)))
    });
}

criterion_group!(benches, bench_lookup, bench_interpolate);
criterion_main!(benches);
