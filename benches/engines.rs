// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num::Complex;

use fractals::{convert, escape, presets, subdivision, CancellationToken, Point};

fn chaos_game(c: &mut Criterion) {
    let fern = presets::barnsley_fern();
    let token = CancellationToken::new();
    c.bench_function("fern 100k points", move |b| {
        b.iter(|| fern.generate_seeded(black_box(100_000), 42, &token))
    });
}

fn escape_time(c: &mut Criterion) {
    let engine = escape::EscapeTimeEngine::new(
        200,
        150,
        Complex::new(-2.0, -1.5),
        Complex::new(1.0, 1.5),
        256,
    )
    .unwrap();
    let token = CancellationToken::new();
    c.bench_function("mandelbrot 200x150", move |b| {
        b.iter(|| engine.compute(&token))
    });
}

fn subdivide(c: &mut Criterion) {
    let token = CancellationToken::new();
    c.bench_function("koch order 7", move |b| {
        b.iter(|| subdivision::koch(black_box(7), 1.0, &token))
    });
}

fn display_buffers(c: &mut Criterion) {
    let points: Vec<Point> = (0..2_000_000)
        .map(|i| Point::new(i as f64, -(i as f64)))
        .collect();
    c.bench_function("display buffers 2M points", move |b| {
        b.iter(|| convert::to_display_buffers(&points, convert::default_threads()))
    });
}

criterion_group!(benches, chaos_game, escape_time, subdivide, display_buffers);
criterion_main!(benches);
