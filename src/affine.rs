// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The affine map, the one building block every iterated function
//! system is made of.

use crate::geometry::Point;

/// `x' = a·x + b·y + e`, `y' = c·x + d·y + f`.  The linear part is
/// the matrix `[[a, b], [c, d]]`; `(e, f)` is the translation.  Any
/// finite coefficients make a valid map.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineTransform2D {
    /// Row 0, column 0 of the linear part.
    pub a: f64,
    /// Row 0, column 1 of the linear part.
    pub b: f64,
    /// Row 1, column 0 of the linear part.
    pub c: f64,
    /// Row 1, column 1 of the linear part.
    pub d: f64,
    /// Horizontal translation.
    pub e: f64,
    /// Vertical translation.
    pub f: f64,
}

impl AffineTransform2D {
    /// Coefficients in the conventional `a, b, c, d, e, f` order.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        AffineTransform2D { a, b, c, d, e, f }
    }

    /// The map that leaves every point where it is.
    pub const fn identity() -> Self {
        AffineTransform2D::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Apply the map to a coordinate pair.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.e,
            self.c * x + self.d * y + self.f,
        )
    }

    /// Apply the map to a point.
    #[inline]
    pub fn apply_point(&self, p: Point) -> Point {
        let (x, y) = self.apply(p.x, p.y);
        Point::new(x, y)
    }

    /// The 2×2 linear part, row-major.
    pub fn linear_part(&self) -> [[f64; 2]; 2] {
        [[self.a, self.b], [self.c, self.d]]
    }
}
