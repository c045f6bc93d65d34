// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractals built by geometric subdivision: the Koch snowflake and the
//! recursive Sierpinski triangle.
//!
//! Both are exponential in their order, so both check the cancellation
//! token at every node of the recursion.  When it trips, the whole
//! tree unwinds through `?` without visiting any remaining siblings,
//! and whatever had been produced is thrown away: a partial snowflake
//! looks enough like a whole one to fool a caller, so we never hand one
//! out.

use std::f64::consts::FRAC_PI_3;

use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, Generated};
use crate::error::{FractalError, Result};
use crate::geometry::{Point, PointCloud, Triangle, PREALLOCATION_LIMIT};

// Signals that the token tripped somewhere down the tree.
struct Interrupted;

type Descent = std::result::Result<(), Interrupted>;

fn reject<T>(reason: String) -> Result<T> {
    let e = FractalError::invalid(reason);
    warn!(error = %e, "rejected subdivision request");
    Err(e)
}

/// The number of points `koch` produces for an order, if it fits.
pub fn koch_len(order: u32) -> Option<usize> {
    4usize
        .checked_pow(order)
        .and_then(|n| n.checked_mul(3))
        .and_then(|n| n.checked_add(1))
}

/// The number of triangles `sierpinski` produces for an order, if it
/// fits.
pub fn sierpinski_len(order: u32) -> Option<usize> {
    3usize.checked_pow(order)
}

/// The Koch snowflake: an equilateral triangle with side `side_length`
/// and one vertex on the origin, each edge replaced `order` times over
/// by four edges a third as long, the middle two shaped into an
/// outward-pointing spike.
///
/// The points trace the closed curve: `3·4^order + 1` of them, the last
/// equal to the first.
pub fn koch(
    order: i32,
    side_length: f64,
    cancel: &CancellationToken,
) -> Result<Generated<PointCloud>> {
    if order < 0 {
        return reject(format!("order must be non-negative, got {}", order));
    }
    if !(side_length > 0.0) || !side_length.is_finite() {
        return reject(format!(
            "side length must be positive and finite, got {}",
            side_length
        ));
    }
    let depth = order as u32;
    let len = match koch_len(depth) {
        Some(len) => len,
        None => return reject(format!("order {} is too large to represent", order)),
    };
    debug!(order, side_length, points = len, "generating Koch snowflake");

    let Triangle(v1, v2, v3) = Triangle::equilateral(side_length);
    let mut points: PointCloud = Vec::with_capacity(len.min(PREALLOCATION_LIMIT));
    points.push(v1);

    let traced = [(v1, v2), (v2, v3), (v3, v1)]
        .iter()
        .try_for_each(|&(start, end)| {
            koch_segment(start, end, depth, &mut points, &|| cancel.is_cancelled())
        });

    match traced {
        Ok(()) => Ok(Generated::Complete(points)),
        Err(Interrupted) => {
            info!(order, "Koch generation cancelled");
            Ok(Generated::Cancelled(Vec::new()))
        }
    }
}

// Emits every point of the segment after `p1`, up to and including
// `p2`.
fn koch_segment<F: Fn() -> bool>(
    p1: Point,
    p2: Point,
    depth: u32,
    points: &mut PointCloud,
    stop: &F,
) -> Descent {
    if stop() {
        return Err(Interrupted);
    }
    if depth == 0 {
        points.push(p2);
        return Ok(());
    }

    let third = (p2 - p1) / 3.0;
    let pa = p1 + third;
    let pc = p1 + third * 2.0;
    // Clockwise, so the spike points away from a counter-clockwise
    // base triangle.
    let pd = pa + third.rotate(-FRAC_PI_3);

    koch_segment(p1, pa, depth - 1, points, stop)?;
    koch_segment(pa, pd, depth - 1, points, stop)?;
    koch_segment(pd, pc, depth - 1, points, stop)?;
    koch_segment(pc, p2, depth - 1, points, stop)
}

/// The Sierpinski triangle by subdivision: starting from the unit
/// equilateral triangle, `order` times over, replace each triangle with
/// the three corner triangles its edge midpoints cut off, dropping the
/// inverted one in the middle.  Returns `3^order` triangle outlines.
pub fn sierpinski(order: i32, cancel: &CancellationToken) -> Result<Generated<Vec<Triangle>>> {
    if order < 0 {
        return reject(format!("order must be non-negative, got {}", order));
    }
    let depth = order as u32;
    let len = match sierpinski_len(depth) {
        Some(len) => len,
        None => return reject(format!("order {} is too large to represent", order)),
    };
    debug!(order, triangles = len, "generating Sierpinski triangle");

    let mut triangles = Vec::with_capacity(len.min(PREALLOCATION_LIMIT));
    let stop = || cancel.is_cancelled();
    match sierpinski_node(Triangle::equilateral(1.0), depth, &mut triangles, &stop) {
        Ok(()) => Ok(Generated::Complete(triangles)),
        Err(Interrupted) => {
            info!(order, "Sierpinski generation cancelled");
            Ok(Generated::Cancelled(Vec::new()))
        }
    }
}

fn sierpinski_node<F: Fn() -> bool>(
    triangle: Triangle,
    depth: u32,
    triangles: &mut Vec<Triangle>,
    stop: &F,
) -> Descent {
    if stop() {
        return Err(Interrupted);
    }
    if depth == 0 {
        triangles.push(triangle);
        return Ok(());
    }

    let Triangle(v0, v1, v2) = triangle;
    let m01 = v0.midpoint(v1);
    let m12 = v1.midpoint(v2);
    let m20 = v2.midpoint(v0);

    sierpinski_node(Triangle(v0, m01, m20), depth - 1, triangles, stop)?;
    sierpinski_node(Triangle(m01, v1, m12), depth - 1, triangles, stop)?;
    sierpinski_node(Triangle(m20, m12, v2), depth - 1, triangles, stop)
}
