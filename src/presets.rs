// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Well-known iterated function systems.

use crate::affine::AffineTransform2D;
use crate::ifs::IfsEngine;

/// The four maps of Barnsley's fern: stem, successively smaller
/// leaflets, largest left-hand leaflet, largest right-hand leaflet.
pub const BARNSLEY_FERN_TRANSFORMS: [AffineTransform2D; 4] = [
    AffineTransform2D::new(0.0, 0.0, 0.0, 0.16, 0.0, 0.0),
    AffineTransform2D::new(0.85, 0.04, -0.04, 0.85, 0.0, 1.6),
    AffineTransform2D::new(0.2, -0.26, 0.23, 0.22, 0.0, 1.6),
    AffineTransform2D::new(-0.15, 0.28, 0.26, 0.24, 0.0, 0.44),
];

/// Barnsley's weights for the fern maps, in the same order.
pub const BARNSLEY_FERN_PROBABILITIES: [f64; 4] = [0.01, 0.85, 0.07, 0.07];

/// Barnsley's fern, ready to generate.
pub fn barnsley_fern() -> IfsEngine {
    let mut ifs = IfsEngine::new();
    for (t, p) in BARNSLEY_FERN_TRANSFORMS
        .iter()
        .zip(BARNSLEY_FERN_PROBABILITIES.iter())
    {
        ifs.add_weighted_transform(*t, *p);
    }
    ifs
}

/// The Sierpinski triangle as an IFS: three half-scale copies of the
/// unit equilateral triangle, one at each corner, equally likely.
pub fn sierpinski_ifs() -> IfsEngine {
    let height = 3.0_f64.sqrt() / 2.0;
    let mut ifs = IfsEngine::new();
    ifs.add_transform(AffineTransform2D::new(0.5, 0.0, 0.0, 0.5, 0.0, 0.0))
        .add_transform(AffineTransform2D::new(0.5, 0.0, 0.0, 0.5, 0.5, 0.0))
        .add_transform(AffineTransform2D::new(0.5, 0.0, 0.0, 0.5, 0.25, height / 2.0));
    ifs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;

    #[test]
    fn fern_weights_sum_to_one() {
        let fern = barnsley_fern();
        let total: f64 = fern.probabilities().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(fern.weighted_transforms().len(), 4);
    }

    #[test]
    fn sierpinski_ifs_is_contractive_and_inside_the_triangle() {
        let ifs = sierpinski_ifs();
        assert!(ifs.check_contraction().unwrap().is_guaranteed_fractal);
        let points = ifs
            .generate_seeded(5_000, 11, &CancellationToken::new())
            .unwrap()
            .into_inner();
        let height = 3.0_f64.sqrt() / 2.0;
        assert!(points
            .iter()
            .all(|p| p.x >= 0.0 && p.x <= 1.0 && p.y >= 0.0 && p.y <= height));
    }
}
