// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contraction analysis.
//!
//! An IFS is only guaranteed to have a bounded attractor when every
//! map in it shrinks distances.  For an affine map that is a question
//! about its linear part alone: the translation moves everything by
//! the same amount and can't stretch anything.  The largest factor by
//! which a matrix `M` can stretch a vector is its spectral norm, the
//! largest singular value, which is the square root of the largest
//! eigenvalue of `MᵗM`.
//!
//! `MᵗM` is a symmetric 2×2, so we solve its characteristic polynomial
//! in closed form rather than reaching for a general SVD.

use std::fmt;

use tracing::debug;

use crate::affine::AffineTransform2D;
use crate::error::{FractalError, Result};

/// The verdict on a single transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformReport {
    /// Position of the transform in the analyzed sequence.
    pub index: usize,
    /// Largest singular value of the linear part.
    pub spectral_norm: f64,
    /// `spectral_norm < 1.0`.  A norm of exactly one is not a
    /// contraction.
    pub is_contraction: bool,
}

/// The verdict on a whole set of transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractionReport {
    /// One entry per transform, in input order.
    pub transforms: Vec<TransformReport>,
    /// True iff every transform is a contraction.
    pub is_guaranteed_fractal: bool,
}

/// Largest singular value of the transform's linear part.
pub fn spectral_norm(t: &AffineTransform2D) -> f64 {
    let [[a, b], [c, d]] = t.linear_part();
    // MᵗM = [[p, r], [r, q]]
    let p = a * a + c * c;
    let q = b * b + d * d;
    let r = a * b + c * d;
    let lambda = (p + q) / 2.0 + ((p - q) / 2.0).hypot(r);
    // Rounding can push a zero eigenvalue a hair below zero.
    lambda.max(0.0).sqrt()
}

/// Examine every transform and report which of them are contractions.
/// An empty sequence has nothing to report and is rejected.
pub fn analyze(transforms: &[AffineTransform2D]) -> Result<ContractionReport> {
    if transforms.is_empty() {
        return Err(FractalError::invalid(
            "cannot analyze an empty set of transforms",
        ));
    }

    let transforms: Vec<TransformReport> = transforms
        .iter()
        .enumerate()
        .map(|(index, t)| {
            let spectral_norm = spectral_norm(t);
            TransformReport {
                index,
                spectral_norm,
                is_contraction: spectral_norm < 1.0,
            }
        })
        .collect();
    let is_guaranteed_fractal = transforms.iter().all(|t| t.is_contraction);

    debug!(
        transforms = transforms.len(),
        is_guaranteed_fractal, "contraction analysis complete"
    );
    Ok(ContractionReport {
        transforms,
        is_guaranteed_fractal,
    })
}

impl ContractionReport {
    /// The transforms that fail the contraction test.
    pub fn offenders(&self) -> impl Iterator<Item = &TransformReport> {
        self.transforms.iter().filter(|t| !t.is_contraction)
    }
}

impl fmt::Display for TransformReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Transform {}: norm = {:.4} -> {}",
            self.index + 1,
            self.spectral_norm,
            if self.is_contraction {
                "OK (contraction)"
            } else {
                "WARNING: not a contraction"
            }
        )
    }
}

impl fmt::Display for ContractionReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for t in &self.transforms {
            writeln!(f, "{}", t)?;
        }
        if self.is_guaranteed_fractal {
            write!(
                f,
                "All transforms are contractions; the system has a bounded attractor."
            )
        } else {
            write!(
                f,
                "Some transforms expand space (norm >= 1); the attractor may be unbounded or missing."
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;

    const EPS: f64 = 1e-12;

    #[test]
    fn identity_has_norm_one_and_is_not_a_contraction() {
        let t = AffineTransform2D::identity();
        assert_eq!(spectral_norm(&t), 1.0);
        let report = analyze(&[t]).unwrap();
        assert!(!report.transforms[0].is_contraction);
        assert!(!report.is_guaranteed_fractal);
    }

    #[test]
    fn zero_map_has_norm_zero() {
        let t = AffineTransform2D::new(0.0, 0.0, 0.0, 0.0, 3.0, 4.0);
        assert_eq!(spectral_norm(&t), 0.0);
    }

    #[test]
    fn diagonal_norm_is_largest_entry() {
        let t = AffineTransform2D::new(0.3, 0.0, 0.0, -0.7, 0.0, 0.0);
        assert!((spectral_norm(&t) - 0.7).abs() < EPS);
    }

    #[test]
    fn rotation_scaled_by_k_has_norm_k() {
        let (s, c) = 0.9_f64.sin_cos();
        let k = 0.5;
        let t = AffineTransform2D::new(k * c, -k * s, k * s, k * c, 1.0, 1.0);
        assert!((spectral_norm(&t) - k).abs() < EPS);
    }

    #[test]
    fn shear_norm_matches_known_value() {
        // [[1, 1], [0, 1]] has singular values (1 ± √5) / 2 in magnitude.
        let t = AffineTransform2D::new(1.0, 1.0, 0.0, 1.0, 0.0, 0.0);
        let golden = (1.0 + 5.0_f64.sqrt()) / 2.0;
        assert!((spectral_norm(&t) - golden).abs() < EPS);
    }

    #[test]
    fn barnsley_fern_is_guaranteed() {
        let fern = presets::barnsley_fern();
        let report = analyze(&fern.transforms()).unwrap();
        assert_eq!(report.transforms.len(), 4);
        assert!(report.transforms.iter().all(|t| t.is_contraction));
        assert!(report.is_guaranteed_fractal);
        assert_eq!(report.offenders().count(), 0);
    }

    #[test]
    fn one_expanding_map_spoils_the_guarantee() {
        let shrink = AffineTransform2D::new(0.5, 0.0, 0.0, 0.5, 0.0, 0.0);
        let grow = AffineTransform2D::new(1.5, 0.0, 0.0, 0.2, 0.0, 0.0);
        let report = analyze(&[shrink, grow]).unwrap();
        assert!(report.transforms[0].is_contraction);
        assert!(!report.transforms[1].is_contraction);
        assert!(!report.is_guaranteed_fractal);
        let offenders: Vec<usize> = report.offenders().map(|t| t.index).collect();
        assert_eq!(offenders, vec![1]);
    }

    #[test]
    fn empty_input_is_rejected() {
        match analyze(&[]) {
            Err(FractalError::InvalidInput { .. }) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn report_renders_one_line_per_transform() {
        let report = analyze(&[AffineTransform2D::identity()]).unwrap();
        let text = format!("{}", report);
        assert!(text.starts_with("Transform 1: norm = 1.0000 -> WARNING"));
        assert_eq!(text.lines().count(), 2);
    }
}
