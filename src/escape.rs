// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time rendering of the Mandelbrot set.
//!
//! Take a point `c` on the complex plane, start `z` at zero, and
//! repeatedly replace `z` with `z² + c`.  For some `c` the magnitude of
//! `z` grows without bound; once it passes 2 it is guaranteed to, so
//! we stop and record how many iterations that took.  For the rest `z`
//! stays small forever, and those points make up the set.  We can't
//! iterate forever, so we give up after `max_iter` steps and record
//! `max_iter`, meaning "as far as we can tell, this one is inside."

use std::ops::Index;

use num::Complex;
use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, Generated};
use crate::error::{FractalError, Result};
use crate::planes::{Pixel, PlaneMapper};

/// The number of iterations of `z ← z² + c`, starting from zero, that
/// run before `|z|` exceeds 2, or `max_iter` if it never does.
#[inline]
pub fn escape_count(c: Complex<f64>, max_iter: u32) -> u32 {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    let mut n = 0;
    while n < max_iter && z.norm_sqr() <= 4.0 {
        z = z * z + c;
        n += 1;
    }
    n
}

/// One escape count per pixel, row-major.  Row 0 samples the minimum
/// imaginary edge of the window.
#[derive(Clone, Debug, PartialEq)]
pub struct EscapeGrid {
    width: usize,
    height: usize,
    max_iter: u32,
    counts: Vec<u32>,
}

impl EscapeGrid {
    fn zeroed(width: usize, height: usize, max_iter: u32) -> Self {
        EscapeGrid {
            width,
            height,
            max_iter,
            counts: vec![0; width * height],
        }
    }

    /// Columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The iteration cap the grid was computed with.  Cells holding this
    /// value never escaped.
    pub fn max_iter(&self) -> u32 {
        self.max_iter
    }

    /// The count at a cell, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row < self.height && col < self.width {
            Some(self.counts[row * self.width + col])
        } else {
            None
        }
    }

    /// One row of counts.
    ///
    /// # Panics
    ///
    /// If `row` is not less than the height.
    pub fn row(&self, row: usize) -> &[u32] {
        &self.counts[row * self.width..(row + 1) * self.width]
    }

    /// The rows, from the minimum imaginary edge up.
    pub fn rows(&self) -> std::slice::Chunks<'_, u32> {
        self.counts.chunks(self.width)
    }

    /// The whole buffer, row-major.
    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }

    /// Take the buffer, row-major.
    pub fn into_vec(self) -> Vec<u32> {
        self.counts
    }
}

impl Index<(usize, usize)> for EscapeGrid {
    type Output = u32;

    /// Indexed `[(row, col)]`.
    fn index(&self, (row, col): (usize, usize)) -> &u32 {
        assert!(col < self.width, "column {} out of range", col);
        &self.counts[row * self.width + col]
    }
}

/// A window onto the complex plane, a pixel grid, and an iteration
/// cap.  Once built it can only compute; nothing about it changes.
#[derive(Debug, Clone)]
pub struct EscapeTimeEngine {
    plane: PlaneMapper,
    max_iter: u32,
}

impl EscapeTimeEngine {
    /// Requires the width and height of the grid, the left-lower and
    /// right-upper corners of the window, and the iteration cap.  Fails
    /// if either grid dimension or the cap is zero, or the window has no
    /// area.
    pub fn new(
        width: usize,
        height: usize,
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
        max_iter: u32,
    ) -> Result<Self> {
        if max_iter == 0 {
            let e = FractalError::invalid("max_iter must be positive");
            warn!(error = %e, "rejected escape-time request");
            return Err(e);
        }
        match PlaneMapper::new(width, height, leftlower, rightupper) {
            Ok(plane) => Ok(EscapeTimeEngine { plane, max_iter }),
            Err(e) => {
                warn!(error = %e, "rejected escape-time request");
                Err(e)
            }
        }
    }

    /// The pixel-to-plane mapping in use.
    pub fn plane(&self) -> &PlaneMapper {
        &self.plane
    }

    /// The iteration cap.
    pub fn max_iter(&self) -> u32 {
        self.max_iter
    }

    /// Fill a grid with escape counts.  The token is checked before each
    /// row; if it was set the grid comes back `Cancelled` with every
    /// unfinished row still zero.
    pub fn compute(&self, cancel: &CancellationToken) -> Generated<EscapeGrid> {
        self.compute_until(&|| cancel.is_cancelled())
    }

    pub(crate) fn compute_until<F: Fn() -> bool>(&self, stop: &F) -> Generated<EscapeGrid> {
        let (width, height) = (self.plane.width(), self.plane.height());
        debug!(width, height, max_iter = self.max_iter, "computing escape times");

        let mut grid = EscapeGrid::zeroed(width, height, self.max_iter);
        for (row, cells) in grid.counts.chunks_mut(width).enumerate() {
            if stop() {
                info!(rows_done = row, "escape-time computation cancelled");
                return Generated::Cancelled(grid);
            }
            for (col, cell) in cells.iter_mut().enumerate() {
                let c = self.plane.pixel_to_point(Pixel { row, col });
                *cell = escape_count(c, self.max_iter);
            }
        }
        Generated::Complete(grid)
    }
}

/// Build an engine for the window `[xmin, xmax] × [ymin, ymax]` and run
/// it, all in one go.
#[allow(clippy::too_many_arguments)]
pub fn compute(
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    width: usize,
    height: usize,
    max_iter: u32,
    cancel: &CancellationToken,
) -> Result<Generated<EscapeGrid>> {
    let engine = EscapeTimeEngine::new(
        width,
        height,
        Complex::new(xmin, ymin),
        Complex::new(xmax, ymax),
        max_iter,
    )?;
    Ok(engine.compute(cancel))
}
