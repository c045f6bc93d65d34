// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The chaos-game Sierpinski triangle: the simplest chaos game there
//! is.  Pick a corner of the triangle at random, move halfway there,
//! repeat.  Every move is a contraction toward a corner, so there is
//! nothing to verify and nothing that can diverge.

use rand::Rng;
use tracing::{debug, info};

use crate::cancel::{CancellationToken, Generated};
use crate::geometry::{PointCloud, Triangle, PREALLOCATION_LIMIT};

/// Moves made before anything is recorded.
pub const SIERPINSKI_WARMUP: usize = 20;

/// Record `n_points` steps of the chaos game on the unit equilateral
/// triangle, after a warm-up, starting from its centroid.
pub fn sierpinski_chaos<R: Rng + ?Sized>(
    n_points: usize,
    rng: &mut R,
    cancel: &CancellationToken,
) -> Generated<PointCloud> {
    let triangle = Triangle::equilateral(1.0);
    let corners = triangle.vertices();
    let mut current = triangle.centroid();
    debug!(n_points, "starting Sierpinski chaos game");

    for _ in 0..SIERPINSKI_WARMUP {
        if cancel.is_cancelled() {
            info!("Sierpinski chaos game cancelled during warm-up");
            return Generated::Cancelled(Vec::new());
        }
        current = current.midpoint(corners[rng.gen_range(0, 3)]);
    }

    let mut points: PointCloud = Vec::with_capacity(n_points.min(PREALLOCATION_LIMIT));
    for _ in 0..n_points {
        if cancel.is_cancelled() {
            info!(recorded = points.len(), "Sierpinski chaos game cancelled");
            return Generated::Cancelled(points);
        }
        current = current.midpoint(corners[rng.gen_range(0, 3)]);
        points.push(current);
    }
    Generated::Complete(points)
}
