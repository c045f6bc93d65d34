// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Points on the real plane and the shapes built from them.  The
//! escape-time engine works on the complex plane and uses
//! `num::Complex` directly; everything else uses these.

use std::ops::{Add, Div, Mul, Sub};

/// A point (or a vector, depending on who's asking) on the real
/// cartesian plane.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

/// The output of the point-producing generators, in generation order.
pub type PointCloud = Vec<Point>;

// Generators reserve at most this many elements up front; bigger
// requests grow as they go.
pub(crate) const PREALLOCATION_LIMIT: usize = 1 << 20;

impl Point {
    /// Constructor.
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// The origin, where every chaos game starts unless told otherwise.
    pub const fn origin() -> Self {
        Point { x: 0.0, y: 0.0 }
    }

    /// Halfway between this point and another.
    pub fn midpoint(self, other: Point) -> Point {
        (self + other) / 2.0
    }

    /// Rotate this vector about the origin.  Positive angles are
    /// counter-clockwise.
    pub fn rotate(self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(cos * self.x - sin * self.y, sin * self.x + cos * self.y)
    }

    /// True if neither component is NaN or infinite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Three vertices describing the outline of a triangle.  There is no
/// fill information; a triangle is three edges to draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle(pub Point, pub Point, pub Point);

impl Triangle {
    /// The equilateral triangle with one vertex at the origin, one on
    /// the positive x axis, and the apex above them.
    pub fn equilateral(side: f64) -> Self {
        let height = side * 3.0_f64.sqrt() / 2.0;
        Triangle(
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side / 2.0, height),
        )
    }

    /// The vertices, in order.
    pub fn vertices(&self) -> [Point; 3] {
        [self.0, self.1, self.2]
    }

    /// The closed polyline tracing this triangle's edges: the three
    /// vertices followed by the first one again.
    pub fn outline(&self) -> [Point; 4] {
        [self.0, self.1, self.2, self.0]
    }

    /// The center of mass.
    pub fn centroid(&self) -> Point {
        (self.0 + self.1 + self.2) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn rotating_a_quarter_turn_swaps_axes() {
        let p = Point::new(1.0, 0.0).rotate(std::f64::consts::FRAC_PI_2);
        assert!(p.x.abs() < EPS);
        assert!((p.y - 1.0).abs() < EPS);
    }

    #[test]
    fn midpoint_is_halfway() {
        let m = Point::new(0.0, 0.0).midpoint(Point::new(2.0, -4.0));
        assert_eq!(m, Point::new(1.0, -2.0));
    }

    #[test]
    fn equilateral_triangle_has_equal_sides() {
        let t = Triangle::equilateral(2.0);
        let [a, b, c] = t.vertices();
        assert!((a.distance(b) - 2.0).abs() < EPS);
        assert!((b.distance(c) - 2.0).abs() < EPS);
        assert!((c.distance(a) - 2.0).abs() < EPS);
    }

    #[test]
    fn outline_closes_on_first_vertex() {
        let t = Triangle::equilateral(1.0);
        let outline = t.outline();
        assert_eq!(outline[0], outline[3]);
        assert_eq!(outline[1], t.1);
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(std::f64::NAN, 2.0).is_finite());
        assert!(!Point::new(1.0, std::f64::INFINITY).is_finite());
    }
}
