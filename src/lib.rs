#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal generation engine
//!
//! Three families of classical fractal, and the machinery to produce
//! them:
//!
//! * Iterated function systems.  A handful of affine maps, each picked
//!   at random with some probability and applied to a point over and
//!   over: the chaos game.  If every map shrinks distances the points
//!   settle onto the system's attractor, which for the right maps is a
//!   fern, a triangle, a dragon.  [`contraction`] tells you whether
//!   your maps are guaranteed to settle; [`IfsEngine`] plays the game.
//!
//! * Escape-time sets.  [`EscapeTimeEngine`] samples a window of the
//!   complex plane and records, for each sample, how long the orbit of
//!   `z ← z² + c` takes to leave the disc of radius two: the
//!   Mandelbrot set.
//!
//! * Recursive subdivision.  [`subdivision::koch`] replaces every edge
//!   of a triangle with four smaller ones, over and over;
//!   [`subdivision::sierpinski`] keeps cutting triangles into three
//!   corners.  [`chaos::sierpinski_chaos`] gets a Sierpinski triangle
//!   the stochastic way instead.
//!
//! Every generator is a synchronous, single-threaded computation that
//! takes a [`CancellationToken`] and watches it at safe points.  The
//! token is owned by the caller, who may set it from any thread; a
//! generator that notices returns [`Generated::Cancelled`] rather than
//! an error.

pub mod affine;
pub mod cancel;
pub mod chaos;
pub mod contraction;
pub mod convert;
pub mod error;
pub mod escape;
pub mod geometry;
pub mod ifs;
pub mod planes;
pub mod presets;
pub mod subdivision;

pub use crate::affine::AffineTransform2D;
pub use crate::cancel::{CancellationToken, Generated};
pub use crate::contraction::{ContractionReport, TransformReport};
pub use crate::error::{FractalError, Result};
pub use crate::escape::{EscapeGrid, EscapeTimeEngine};
pub use crate::geometry::{Point, PointCloud, Triangle};
pub use crate::ifs::{IfsEngine, OrbitLimits};
