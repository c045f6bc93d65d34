// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a grid of pixels with an origin at 0,0 and a rectangle on
//! the complex plane defined by its left-lower and right-upper
//! corners.
//!
//! Pixels here are addressed by row and column.  Row 0 is the
//! *minimum* imaginary edge of the plane, so "up" on the complex
//! plane is "down" in the buffer; whoever puts the buffer on a screen
//! is responsible for flipping it.
use num::Complex;

use crate::error::{FractalError, Result};

/// The width and height, in pixels, of a grid anchored at 0,0.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// The left-lower and right-upper corners of a window onto the complex
/// plane, treating the real part as x and the imaginary part as y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlane(pub Complex<f64>, pub Complex<f64>);

/// A row and column on the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel {
    /// Counted up from the minimum imaginary edge.
    pub row: usize,
    /// Counted up from the minimum real edge.
    pub col: usize,
}

/// Maps pixels to sample points and back.  Samples are evenly spaced
/// and include both edges of the window: the first column samples
/// exactly the left edge, the last column exactly the right edge.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// Width and height of the pixel grid.
    pub integral_plane: IntegralPlane,
    /// The window being sampled.
    pub complex_plane: ComplexPlane,
    // Distance between neighbouring samples, along each axis.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Takes the size of the pixel grid and two corners describing the
    /// complex window.  The window must have positive width and height,
    /// and so must the grid.
    pub fn new(
        width: usize,
        height: usize,
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
    ) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(FractalError::invalid(format!(
                "the pixel grid must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        if width.checked_mul(height).is_none() {
            return Err(FractalError::invalid(format!(
                "a {}x{} pixel grid has more cells than can be addressed",
                width, height
            )));
        }

        let corners = [leftlower.re, leftlower.im, rightupper.re, rightupper.im];
        if corners.iter().any(|v| !v.is_finite()) {
            return Err(FractalError::invalid(
                "the corners of the complex plane must be finite",
            ));
        }

        if leftlower.re >= rightupper.re {
            return Err(FractalError::invalid(
                "the left lower corner is not to the left of the right upper corner",
            ));
        }

        if leftlower.im >= rightupper.im {
            return Err(FractalError::invalid(
                "the left lower corner is not lower than the right upper corner",
            ));
        }

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            complex_plane: ComplexPlane(leftlower, rightupper),
            steps: (
                step(leftlower.re, rightupper.re, width),
                step(leftlower.im, rightupper.im, height),
            ),
        })
    }

    /// The width of the pixel grid.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// The height of the pixel grid.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// The total number of pixels.  Used to size buffers; `new` has
    /// already checked that the product fits.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.  Never true for
    /// a successfully constructed mapper.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The real coordinate sampled by a column.
    #[inline]
    pub fn column_to_re(&self, col: usize) -> f64 {
        sample(
            self.complex_plane.0.re,
            self.complex_plane.1.re,
            self.steps.0,
            col,
            self.integral_plane.0,
        )
    }

    /// The imaginary coordinate sampled by a row.
    #[inline]
    pub fn row_to_im(&self, row: usize) -> f64 {
        sample(
            self.complex_plane.0.im,
            self.complex_plane.1.im,
            self.steps.1,
            row,
            self.integral_plane.1,
        )
    }

    /// The complex number a pixel samples.
    #[inline]
    pub fn pixel_to_point(&self, pixel: Pixel) -> Complex<f64> {
        Complex::new(self.column_to_re(pixel.col), self.row_to_im(pixel.row))
    }

    /// The pixel whose sample is nearest to a point, or `None` if the
    /// point lies outside the window.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let col = nearest(self.complex_plane.0.re, self.steps.0, point.re, self.width())?;
        let row = nearest(self.complex_plane.0.im, self.steps.1, point.im, self.height())?;
        Some(Pixel { row, col })
    }
}

fn step(low: f64, high: f64, samples: usize) -> f64 {
    if samples > 1 {
        (high - low) / ((samples - 1) as f64)
    } else {
        0.0
    }
}

#[inline]
fn sample(low: f64, high: f64, step: f64, index: usize, samples: usize) -> f64 {
    // Pin the last sample to the edge rather than trusting the
    // accumulated rounding in `index * step`.
    if samples > 1 && index == samples - 1 {
        high
    } else {
        low + (index as f64) * step
    }
}

fn nearest(low: f64, step: f64, value: f64, samples: usize) -> Option<usize> {
    if samples == 1 {
        return if value == low { Some(0) } else { None };
    }
    let index = ((value - low) / step).round();
    if index < 0.0 || index > ((samples - 1) as f64) || index.is_nan() {
        return None;
    }
    Some(index as usize)
}
