// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning a point cloud into the separate x and y buffers that
//! plotting layers want.  For a few million points this is worth
//! spreading across threads: the cloud is cut into contiguous batches,
//! each batch is paired with the matching slices of the output
//! buffers, and a handful of workers pull batches off a shared queue
//! until it runs dry.  Every batch owns its own output range, so the
//! order in which workers finish doesn't matter.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{FractalError, Result};
use crate::geometry::Point;

/// Points per batch; clouds smaller than this are converted inline.
pub const BATCH_SIZE: usize = 500_000;

/// Never use more workers than this, however many cores there are.
pub const MAX_THREADS: usize = 8;

/// A point cloud, split by coordinate and narrowed to `f32`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayBuffers {
    /// Horizontal coordinates, in cloud order.
    pub xs: Vec<f32>,
    /// Vertical coordinates, in cloud order.
    pub ys: Vec<f32>,
}

/// The number of workers to use when the caller has no opinion.
pub fn default_threads() -> usize {
    num_cpus::get().min(MAX_THREADS).max(1)
}

/// Split `points` into coordinate buffers using up to `threads`
/// workers.
pub fn to_display_buffers(points: &[Point], threads: usize) -> Result<DisplayBuffers> {
    to_display_buffers_in_batches(points, threads, BATCH_SIZE)
}

/// As `to_display_buffers`, with an explicit batch size.
pub fn to_display_buffers_in_batches(
    points: &[Point],
    threads: usize,
    batch_size: usize,
) -> Result<DisplayBuffers> {
    if batch_size == 0 {
        return Err(FractalError::invalid("batch size must be positive"));
    }

    let mut xs = vec![0.0_f32; points.len()];
    let mut ys = vec![0.0_f32; points.len()];
    let workers = threads.min(MAX_THREADS);

    if points.len() < batch_size || workers <= 1 {
        convert_batch(points, &mut xs, &mut ys);
        return Ok(DisplayBuffers { xs, ys });
    }

    debug!(
        points = points.len(),
        batch_size, workers, "converting point cloud in parallel"
    );
    {
        let batches = points
            .chunks(batch_size)
            .zip(xs.chunks_mut(batch_size))
            .zip(ys.chunks_mut(batch_size));
        let queue = Arc::new(Mutex::new(batches));
        crossbeam::scope(|spawner| {
            for _ in 0..workers {
                let queue = queue.clone();
                spawner.spawn(move |_| loop {
                    // A worker that panicked mid-batch poisons the lock, but
                    // the queue itself is still sound.
                    let batch = {
                        queue
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .next()
                    };
                    match batch {
                        Some(((src, x_out), y_out)) => convert_batch(src, x_out, y_out),
                        None => break,
                    }
                });
            }
        })
        .map_err(|_| FractalError::WorkerPanicked)?;
    }
    Ok(DisplayBuffers { xs, ys })
}

fn convert_batch(src: &[Point], xs: &mut [f32], ys: &mut [f32]) {
    for ((p, x), y) in src.iter().zip(xs.iter_mut()).zip(ys.iter_mut()) {
        *x = p.x as f32;
        *y = p.y as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiral(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.01;
                Point::new(t * t.cos(), t * t.sin())
            })
            .collect()
    }

    #[test]
    fn small_clouds_convert_inline() {
        let points = vec![Point::new(1.5, -2.0), Point::new(0.25, 4.0)];
        let buffers = to_display_buffers(&points, 4).unwrap();
        assert_eq!(buffers.xs, vec![1.5, 0.25]);
        assert_eq!(buffers.ys, vec![-2.0, 4.0]);
    }

    #[test]
    fn parallel_conversion_matches_inline_conversion() {
        let points = spiral(10_007);
        let inline = to_display_buffers_in_batches(&points, 1, 64).unwrap();
        let parallel = to_display_buffers_in_batches(&points, 4, 64).unwrap();
        assert_eq!(inline, parallel);
        assert_eq!(parallel.xs.len(), 10_007);
        assert_eq!(parallel.xs[5_000], points[5_000].x as f32);
        assert_eq!(parallel.ys[10_006], points[10_006].y as f32);
    }

    #[test]
    fn more_workers_than_batches_is_fine() {
        let points = spiral(100);
        let buffers = to_display_buffers_in_batches(&points, 8, 60).unwrap();
        assert_eq!(buffers.xs.len(), 100);
        assert_eq!(buffers.ys[99], points[99].y as f32);
    }

    #[test]
    fn empty_cloud_gives_empty_buffers() {
        let buffers = to_display_buffers(&[], 8).unwrap();
        assert!(buffers.xs.is_empty() && buffers.ys.is_empty());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(to_display_buffers_in_batches(&spiral(3), 2, 0).is_err());
    }

    #[test]
    fn default_threads_is_bounded() {
        let n = default_threads();
        assert!(n >= 1 && n <= MAX_THREADS);
    }
}
