// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Iterated function systems, rendered with the chaos game.
//!
//! The chaos game starts at the origin and, over and over, picks one
//! of the system's affine maps at random (weighted by its
//! probability), applies it to the current point, and records where
//! it lands.  If every map is a contraction the orbit is pulled onto
//! the system's attractor within a few dozen steps, after which every
//! recorded point lies on (or vanishingly close to) the fractal.
//!
//! Nothing stops a user from supplying maps that expand, in which case
//! the orbit wanders off toward infinity.  We don't treat that as an
//! error.  Points that land too far out aren't recorded, and an orbit
//! that gets absurdly far out (or stops being a number at all) is
//! yanked back to the origin to try again.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::affine::AffineTransform2D;
use crate::cancel::{CancellationToken, Generated};
use crate::contraction::{self, ContractionReport};
use crate::error::{FractalError, Result};
use crate::geometry::{Point, PointCloud, PREALLOCATION_LIMIT};

/// Iterations run from the origin before anything is recorded.
pub const WARMUP_ITERATIONS: usize = 100;

/// Points with either coordinate at or beyond this magnitude are not
/// recorded.
pub const DISCARD_BOUND: f64 = 1e4;

/// An orbit with either coordinate beyond this magnitude is reset to
/// the origin.
pub const RESET_BOUND: f64 = 1e15;

/// The knobs governing how the chaos game treats divergent orbits.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrbitLimits {
    /// Discarded iterations before recording starts.
    pub warmup: usize,
    /// Recording cutoff: see [`DISCARD_BOUND`].
    pub discard_bound: f64,
    /// Reset cutoff: see [`RESET_BOUND`].
    pub reset_bound: f64,
}

impl Default for OrbitLimits {
    fn default() -> Self {
        OrbitLimits {
            warmup: WARMUP_ITERATIONS,
            discard_bound: DISCARD_BOUND,
            reset_bound: RESET_BOUND,
        }
    }
}

impl OrbitLimits {
    #[inline]
    fn keeps(&self, p: Point) -> bool {
        p.x.abs() < self.discard_bound && p.y.abs() < self.discard_bound
    }

    /// Where the orbit continues from after landing on `p`.
    #[inline]
    fn settle(&self, p: Point) -> Point {
        if !p.is_finite() || p.x.abs() > self.reset_bound || p.y.abs() > self.reset_bound {
            Point::origin()
        } else {
            p
        }
    }
}

/// An affine map and the (not necessarily normalized) weight with
/// which the chaos game picks it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeightedTransform {
    /// The map.
    pub transform: AffineTransform2D,
    /// Its relative weight.
    pub probability: f64,
}

/// Owns a weighted set of transforms and runs the chaos game over
/// them.  Generating doesn't change the engine, so one engine can
/// serve any number of requests.
#[derive(Clone, Debug, Default)]
pub struct IfsEngine {
    set: Vec<WeightedTransform>,
    limits: OrbitLimits,
}

impl IfsEngine {
    /// An engine with no transforms and the default [`OrbitLimits`].
    pub fn new() -> Self {
        IfsEngine::default()
    }

    /// Replace the divergence limits.
    pub fn with_limits(mut self, limits: OrbitLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The divergence limits in force.
    pub fn limits(&self) -> OrbitLimits {
        self.limits
    }

    /// Append a transform with weight 1.0.
    pub fn add_transform(&mut self, transform: AffineTransform2D) -> &mut Self {
        self.add_weighted_transform(transform, 1.0)
    }

    /// Append a transform with an explicit weight.  Weights are checked
    /// when generating, not here.
    pub fn add_weighted_transform(
        &mut self,
        transform: AffineTransform2D,
        probability: f64,
    ) -> &mut Self {
        self.set.push(WeightedTransform {
            transform,
            probability,
        });
        self
    }

    /// The weighted set, in insertion order.
    pub fn weighted_transforms(&self) -> &[WeightedTransform] {
        &self.set
    }

    /// Just the transforms, in insertion order.
    ///
    /// Allocates; it exists for feeding the contraction analyzer.
    pub fn transforms(&self) -> Vec<AffineTransform2D> {
        self.set.iter().map(|w| w.transform).collect()
    }

    /// The weights as supplied.
    pub fn probabilities(&self) -> Vec<f64> {
        self.set.iter().map(|w| w.probability).collect()
    }

    /// The weights divided by their sum, after the same validation as
    /// `generate` performs.
    pub fn normalized_probabilities(&self) -> Result<Vec<f64>> {
        let (scale, total) = self.validated_total()?;
        Ok(self
            .set
            .iter()
            .map(|w| w.probability / scale / total)
            .collect())
    }

    /// Run the contraction analyzer over this engine's transforms.
    pub fn check_contraction(&self) -> Result<ContractionReport> {
        contraction::analyze(&self.transforms())
    }

    // Weights are summed after dividing by the largest, so finite
    // weights never overflow.  Returns that divisor and the scaled sum.
    fn validated_total(&self) -> Result<(f64, f64)> {
        if self.set.is_empty() {
            return Err(FractalError::invalid("the transform set is empty"));
        }
        if let Some((i, w)) = self
            .set
            .iter()
            .enumerate()
            .find(|(_, w)| !w.probability.is_finite() || w.probability < 0.0)
        {
            return Err(FractalError::invalid(format!(
                "probability of transform {} is {}; probabilities must be finite and non-negative",
                i + 1,
                w.probability
            )));
        }
        let scale = self
            .set
            .iter()
            .map(|w| w.probability)
            .fold(0.0, f64::max);
        if scale <= 0.0 {
            return Err(FractalError::invalid(
                "every probability is zero; at least one must be positive",
            ));
        }
        let total: f64 = self.set.iter().map(|w| w.probability / scale).sum();
        Ok((scale, total))
    }

    /// The running sum of the normalized weights.  Monotonic; the last
    /// entry is one, give or take rounding.
    pub fn cumulative_table(&self) -> Result<Vec<f64>> {
        let (scale, total) = self.validated_total()?;
        Ok(self
            .set
            .iter()
            .scan(0.0, |acc, w| {
                *acc += w.probability / scale / total;
                Some(*acc)
            })
            .collect())
    }

    /// Play the chaos game for `n_points` iterations after the warm-up,
    /// drawing from `rng`.  At most `n_points` points come back; fewer
    /// if some of them landed outside the discard bound, or if the
    /// token was set, in which case the result is `Cancelled` and holds
    /// whatever had been recorded.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        n_points: usize,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<Generated<PointCloud>> {
        let cumulative = self.cumulative_table().map_err(|e| {
            warn!(error = %e, "rejected IFS generation request");
            e
        })?;
        debug!(
            n_points,
            transforms = self.set.len(),
            "starting chaos game"
        );

        Ok(self.play(n_points, &cumulative, rng, &|| cancel.is_cancelled()))
    }

    // The game itself.  `stop` is consulted before every move, warm-up
    // included.
    pub(crate) fn play<R: Rng + ?Sized, F: Fn() -> bool>(
        &self,
        n_points: usize,
        cumulative: &[f64],
        rng: &mut R,
        stop: &F,
    ) -> Generated<PointCloud> {
        let mut current = Point::origin();
        for _ in 0..self.limits.warmup {
            if stop() {
                info!("chaos game cancelled during warm-up");
                return Generated::Cancelled(Vec::new());
            }
            current = self.limits.settle(self.step(current, cumulative, rng));
        }

        let mut points: PointCloud = Vec::with_capacity(n_points.min(PREALLOCATION_LIMIT));
        for _ in 0..n_points {
            if stop() {
                info!(recorded = points.len(), "chaos game cancelled");
                return Generated::Cancelled(points);
            }
            let next = self.step(current, cumulative, rng);
            if self.limits.keeps(next) {
                points.push(next);
            }
            current = self.limits.settle(next);
        }

        debug!(
            recorded = points.len(),
            discarded = n_points - points.len(),
            "chaos game complete"
        );
        Generated::Complete(points)
    }

    /// `generate` with a fresh generator seeded from `seed`.  The same
    /// seed over the same engine always produces the same points.
    pub fn generate_seeded(
        &self,
        n_points: usize,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<Generated<PointCloud>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate(n_points, &mut rng, cancel)
    }

    #[inline]
    fn step<R: Rng + ?Sized>(&self, current: Point, cumulative: &[f64], rng: &mut R) -> Point {
        let index = select(cumulative, rng.gen::<f64>());
        self.set[index].transform.apply_point(current)
    }
}

/// The first index whose cumulative weight is at least `r`.  Ties go to
/// the lower index.  If rounding left the table's last entry short of
/// `r`, the last index wins.  `cumulative` must be non-empty and
/// monotonic.
#[inline]
pub fn select(cumulative: &[f64], r: f64) -> usize {
    let index = cumulative.partition_point(|&c| c < r);
    index.min(cumulative.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;
    use std::cell::Cell;

    fn square(scale: f64) -> AffineTransform2D {
        AffineTransform2D::new(scale, 0.0, 0.0, scale, 0.0, 0.0)
    }

    fn is_invalid<T: std::fmt::Debug>(r: Result<T>) -> bool {
        match r {
            Err(FractalError::InvalidInput { .. }) => true,
            _ => false,
        }
    }

    #[test]
    fn select_picks_first_index_satisfying() {
        let table = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(select(&table, 0.0), 0);
        assert_eq!(select(&table, 0.1), 0);
        assert_eq!(select(&table, 0.25), 0);
        assert_eq!(select(&table, 0.2500001), 1);
        assert_eq!(select(&table, 0.75), 2);
        assert_eq!(select(&table, 0.99), 3);
    }

    #[test]
    fn select_skips_zero_weight_entries() {
        // Weight 0 for index 1 leaves it the same cumulative value as 0.
        let table = [0.5, 0.5, 1.0];
        assert_eq!(select(&table, 0.5), 0);
        assert_eq!(select(&table, 0.6), 2);
    }

    #[test]
    fn select_falls_back_to_last_on_rounding_shortfall() {
        let table = [0.3, 0.9999999];
        assert_eq!(select(&table, 0.99999995), 1);
    }

    #[test]
    fn equal_weights_normalize_to_uniform() {
        let mut ifs = IfsEngine::new();
        for _ in 0..4 {
            ifs.add_weighted_transform(square(0.5), 2.0);
        }
        assert_eq!(ifs.normalized_probabilities().unwrap(), vec![0.25; 4]);
        assert_eq!(ifs.cumulative_table().unwrap(), vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn default_weight_is_one() {
        let mut ifs = IfsEngine::new();
        ifs.add_transform(square(0.5));
        assert_eq!(ifs.probabilities(), vec![1.0]);
    }

    #[test]
    fn unnormalized_weights_match_normalized_weights() {
        let token = CancellationToken::new();
        let fern = presets::barnsley_fern();
        let mut uniform_a = IfsEngine::new();
        let mut uniform_b = IfsEngine::new();
        for t in fern.transforms() {
            uniform_a.add_weighted_transform(t, 2.0);
            uniform_b.add_weighted_transform(t, 0.25);
        }
        let a = uniform_a.generate_seeded(2_000, 7, &token).unwrap();
        let b = uniform_b.generate_seeded(2_000, 7, &token).unwrap();
        assert!(a.is_complete());
        assert_eq!(a, b);
    }

    #[test]
    fn constant_map_only_ever_yields_the_origin() {
        let mut ifs = IfsEngine::new();
        ifs.add_weighted_transform(AffineTransform2D::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0), 1.0);
        let points = ifs
            .generate_seeded(1_000, 42, &CancellationToken::new())
            .unwrap()
            .into_inner();
        assert_eq!(points.len(), 1_000);
        assert!(points.iter().all(|p| *p == Point::origin()));
    }

    #[test]
    fn never_returns_more_than_requested() {
        let fern = presets::barnsley_fern();
        let token = CancellationToken::new();
        for &n in &[0usize, 1, 17, 5_000] {
            let result = fern.generate_seeded(n, n as u64, &token).unwrap();
            assert!(result.is_complete());
            assert!(result.get().len() <= n);
        }
        assert!(fern.generate_seeded(0, 3, &token).unwrap().get().is_empty());
    }

    #[test]
    fn same_seed_same_points() {
        let fern = presets::barnsley_fern();
        let token = CancellationToken::new();
        let a = fern.generate_seeded(500, 99, &token).unwrap();
        let b = fern.generate_seeded(500, 99, &token).unwrap();
        let c = fern.generate_seeded(500, 100, &token).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn fern_stays_inside_its_known_bounds() {
        let points = presets::barnsley_fern()
            .generate_seeded(20_000, 5, &CancellationToken::new())
            .unwrap()
            .into_inner();
        assert_eq!(points.len(), 20_000);
        for p in &points {
            assert!(p.x > -2.8 && p.x < 2.8, "x out of range: {:?}", p);
            assert!(p.y > -0.1 && p.y < 10.1, "y out of range: {:?}", p);
        }
    }

    #[test]
    fn expanding_orbits_are_discarded_and_reset() {
        // x -> 2x + 1 runs away from the origin, passes the discard
        // bound after 14 steps and the reset bound after 50, then starts
        // over from the origin.
        let mut ifs = IfsEngine::new();
        ifs.add_transform(AffineTransform2D::new(2.0, 0.0, 0.0, 2.0, 1.0, 1.0));
        let points = ifs
            .generate_seeded(1_000, 1, &CancellationToken::new())
            .unwrap()
            .into_inner();
        assert!(points.len() < 1_000);
        assert!(!points.is_empty());
        assert!(points
            .iter()
            .all(|p| p.x.abs() < DISCARD_BOUND && p.y.abs() < DISCARD_BOUND));
    }

    #[test]
    fn non_finite_orbits_are_reset() {
        let mut ifs = IfsEngine::new();
        ifs.add_transform(AffineTransform2D::new(
            std::f64::NAN,
            0.0,
            0.0,
            1.0,
            0.0,
            0.0,
        ));
        let points = ifs
            .generate_seeded(100, 1, &CancellationToken::new())
            .unwrap()
            .into_inner();
        assert!(points.is_empty());
    }

    #[test]
    fn custom_limits_tighten_the_discard_bound() {
        let mut ifs = IfsEngine::new().with_limits(OrbitLimits {
            discard_bound: 0.5,
            ..OrbitLimits::default()
        });
        ifs.add_transform(AffineTransform2D::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0));
        let result = ifs
            .generate_seeded(50, 1, &CancellationToken::new())
            .unwrap();
        assert!(result.is_complete());
        assert!(result.get().is_empty());
    }

    #[test]
    fn empty_set_is_rejected() {
        let ifs = IfsEngine::new();
        assert!(is_invalid(ifs.generate_seeded(10, 1, &CancellationToken::new())));
    }

    #[test]
    fn negative_probability_is_rejected() {
        let mut ifs = IfsEngine::new();
        ifs.add_weighted_transform(square(0.5), 1.0);
        ifs.add_weighted_transform(square(0.5), -0.5);
        assert!(is_invalid(ifs.generate_seeded(10, 1, &CancellationToken::new())));
        assert_eq!(ifs.weighted_transforms().len(), 2);
    }

    #[test]
    fn all_zero_probabilities_are_rejected() {
        let mut ifs = IfsEngine::new();
        ifs.add_weighted_transform(square(0.5), 0.0);
        ifs.add_weighted_transform(square(0.5), 0.0);
        assert!(is_invalid(ifs.generate_seeded(10, 1, &CancellationToken::new())));
    }

    #[test]
    fn nan_probability_is_rejected() {
        let mut ifs = IfsEngine::new();
        ifs.add_weighted_transform(square(0.5), std::f64::NAN);
        assert!(is_invalid(ifs.normalized_probabilities()));
    }

    #[test]
    fn cancelled_before_start_yields_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let result = presets::barnsley_fern()
            .generate_seeded(10_000, 1, &token)
            .unwrap();
        assert!(result.is_cancelled());
        assert!(result.get().is_empty());
    }

    #[test]
    fn cancelled_partway_keeps_what_was_recorded() {
        let fern = presets::barnsley_fern();
        let cumulative = fern.cumulative_table().unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        // The warm-up takes the first hundred checks; trip forty moves
        // into the recorded run.
        let calls = Cell::new(0);
        let trip = WARMUP_ITERATIONS + 41;
        let result = fern.play(1_000, &cumulative, &mut rng, &|| {
            calls.set(calls.get() + 1);
            calls.get() >= trip
        });
        assert!(result.is_cancelled());
        let points = result.into_inner();
        assert!(!points.is_empty());
        assert!(points.len() <= 40);
        assert_eq!(calls.get(), trip);
    }

    #[test]
    fn cancelled_run_matches_the_start_of_a_full_run() {
        let fern = presets::barnsley_fern();
        let cumulative = fern.cumulative_table().unwrap();
        let full = fern
            .play(300, &cumulative, &mut StdRng::seed_from_u64(4), &|| false)
            .into_inner();
        let calls = Cell::new(0);
        let partial = fern
            .play(300, &cumulative, &mut StdRng::seed_from_u64(4), &|| {
                calls.set(calls.get() + 1);
                calls.get() > WARMUP_ITERATIONS + 120
            })
            .into_inner();
        assert_eq!(partial.len(), 120);
        assert_eq!(&full[..120], &partial[..]);
    }

    #[test]
    fn huge_finite_weights_are_normalized_without_overflow() {
        let mut ifs = IfsEngine::new();
        ifs.add_weighted_transform(square(0.5), 1e308);
        ifs.add_weighted_transform(square(0.5), 1e308);
        assert_eq!(ifs.normalized_probabilities().unwrap(), vec![0.5, 0.5]);
        let result = ifs.generate_seeded(50, 1, &CancellationToken::new()).unwrap();
        assert_eq!(result.get().len(), 50);
    }

    #[test]
    fn check_contraction_covers_every_transform() {
        let mut ifs = IfsEngine::new();
        ifs.add_transform(square(0.5));
        ifs.add_transform(square(1.0));
        let report = ifs.check_contraction().unwrap();
        assert_eq!(report.transforms.len(), 2);
        assert!(!report.is_guaranteed_fractal);
    }
}
