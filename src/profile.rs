//! Elevation profile analysis: smoothing, windowed grades and totals.
//!
//! Raw altimeter data is noisy; this module turns it into stable statistics
//! usable for both numeric summaries and color-graded rendering:
//! - Centered moving-average smoothing with an adaptive window
//! - Windowed slope estimation over the geodesic surface distance, with
//!   outlier clamping
//! - Ascent/descent totals with a noise floor
//!
//! All functions are pure and total over well-formed input. Degenerate
//! input (fewer than 2 points, mismatched series lengths) yields
//! [`ElevationProfile::empty`], never an error: callers must treat
//! "no profile" as a valid state.

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geo_utils::surface_distance;
use crate::{GeoPoint, TrackSegment};

/// Configuration for elevation profile analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Upper bound on the smoothing half-window, in samples.
    /// Default: 5
    pub max_smoothing_window: usize,

    /// How many samples it takes to grow the smoothing window by one.
    /// The effective half-window is `min(max, count / divisor + 2)`.
    /// Default: 20
    pub smoothing_growth_divisor: usize,

    /// Upper bound on the grade half-window, in samples.
    /// Default: 5
    pub max_grade_window: usize,

    /// How many samples it takes to grow the grade window by one.
    /// The effective half-window is `min(max, count / divisor + 1)`.
    /// Default: 10
    pub grade_growth_divisor: usize,

    /// Minimum horizontal run for a grade to be computed at all; shorter
    /// windows yield grade 0 to avoid division blow-up on near-stationary
    /// points. Default: 5.0 meters
    pub min_grade_run_m: f64,

    /// Grades are clamped to `[-clamp, clamp]` to suppress GPS/altimeter
    /// artifacts; real-world grades essentially never exceed 45%.
    /// Default: 0.45
    pub grade_clamp: f64,

    /// Point-to-point elevation changes at or below this magnitude do not
    /// count towards ascent/descent totals. Default: 1.0 meters
    pub ascent_noise_floor_m: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_smoothing_window: 5,
            smoothing_growth_divisor: 20,
            max_grade_window: 5,
            grade_growth_divisor: 10,
            min_grade_run_m: 5.0,
            grade_clamp: 0.45,
            ascent_noise_floor_m: 1.0,
        }
    }
}

/// Derived view of one segment's elevation data. Computed on demand from
/// the segment's points, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    /// Smoothed elevation series, same length and order as the input points
    pub elevations: Vec<f64>,
    /// Signed grade per interval, same length as the input; the final
    /// element duplicates the second-to-last
    pub grades: Vec<f64>,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub max_grade: f64,
    pub min_grade: f64,
    pub total_ascent: f64,
    pub total_descent: f64,
}

impl ElevationProfile {
    /// The degenerate profile: what a segment with fewer than two points
    /// produces. A valid state, not a failure.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elevations.is_empty()
    }
}

/// Smooth an elevation series with a centered moving average.
///
/// The half-window adapts to the series length
/// (`min(max, count / divisor + 2)`, default `min(5, count/20 + 2)`).
/// Edge samples use a truncated window rather than synthetic padding, and
/// every output averages *original* values only, so index `i` never depends
/// on already-smoothed neighbors.
///
/// # Example
/// ```
/// use track_exporter::{smooth_elevations, ProfileConfig};
///
/// let flat = vec![100.0; 8];
/// assert_eq!(smooth_elevations(&flat, &ProfileConfig::default()), flat);
/// ```
pub fn smooth_elevations(elevations: &[f64], config: &ProfileConfig) -> Vec<f64> {
    let count = elevations.len();
    if count == 0 {
        return Vec::new();
    }

    let window = config
        .max_smoothing_window
        .min(count / config.smoothing_growth_divisor.max(1) + 2);

    (0..count)
        .map(|i| {
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(count - 1);
            let slice = &elevations[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Compute the elevation profile for an ordered sequence of samples.
///
/// Smooths the altitude series, then derives grades and totals from the
/// smoothed values. Fewer than two points yields the empty profile.
pub fn compute_profile(points: &[GeoPoint], config: &ProfileConfig) -> ElevationProfile {
    let raw: Vec<f64> = points.iter().map(|p| p.altitude).collect();
    let smoothed = smooth_elevations(&raw, config);
    profile_from_smoothed(points, &smoothed, config)
}

/// Derive grades and totals from points and an already-smoothed elevation
/// series of the same length.
///
/// The grade for interval `i` compares a *windowed* pair rather than
/// adjacent points: sample `max(0, i-w)` against `min(n-1, i+w)` with
/// `w = min(max, count / divisor + 1)`, using their geodesic surface
/// distance as the run and their smoothed-elevation difference as the rise.
/// Ascent/descent instead accumulate point-to-point smoothed deltas above
/// the noise floor.
///
/// A length mismatch or fewer than two points yields the empty profile.
pub fn profile_from_smoothed(
    points: &[GeoPoint],
    smoothed: &[f64],
    config: &ProfileConfig,
) -> ElevationProfile {
    let count = points.len();
    if count < 2 || smoothed.len() != count {
        debug!(
            "degenerate profile input: {} point(s), {} elevation(s)",
            count,
            smoothed.len()
        );
        return ElevationProfile::empty();
    }

    let window = config
        .max_grade_window
        .min(count / config.grade_growth_divisor.max(1) + 1);

    let mut grades = Vec::with_capacity(count);
    let mut max_grade = f64::MIN;
    let mut min_grade = f64::MAX;

    for i in 0..count - 1 {
        let lo = i.saturating_sub(window);
        let hi = (i + window).min(count - 1);
        let run = surface_distance(&points[lo], &points[hi]);

        let grade = if run > config.min_grade_run_m {
            let rise = smoothed[hi] - smoothed[lo];
            (rise / run).clamp(-config.grade_clamp, config.grade_clamp)
        } else {
            0.0
        };

        max_grade = max_grade.max(grade);
        min_grade = min_grade.min(grade);
        grades.push(grade);
    }

    // Keep the series the same length as the input; the trailing interval
    // has no forward pair, so it repeats the previous value.
    grades.push(grades[count - 2]);

    let mut total_ascent = 0.0;
    let mut total_descent = 0.0;
    for pair in smoothed.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > config.ascent_noise_floor_m {
            total_ascent += delta;
        } else if delta < -config.ascent_noise_floor_m {
            total_descent += -delta;
        }
    }

    let mut min_elevation = f64::MAX;
    let mut max_elevation = f64::MIN;
    for &e in smoothed {
        min_elevation = min_elevation.min(e);
        max_elevation = max_elevation.max(e);
    }

    ElevationProfile {
        elevations: smoothed.to_vec(),
        grades,
        min_elevation,
        max_elevation,
        max_grade,
        min_grade,
        total_ascent,
        total_descent,
    }
}

/// Compute profiles for every segment of a track, in segment order.
pub fn compute_profiles(segments: &[TrackSegment], config: &ProfileConfig) -> Vec<ElevationProfile> {
    segments
        .iter()
        .map(|s| compute_profile(&s.points, config))
        .collect()
}

/// Parallel variant of [`compute_profiles`]. Falls back to sequential for
/// small inputs where the fan-out overhead is not worth it.
#[cfg(feature = "parallel")]
pub fn compute_profiles_parallel(
    segments: &[TrackSegment],
    config: &ProfileConfig,
) -> Vec<ElevationProfile> {
    let total: usize = segments.iter().map(TrackSegment::len).sum();
    if total < 10_000 {
        return compute_profiles(segments, config);
    }

    segments
        .par_iter()
        .map(|s| compute_profile(&s.points, config))
        .collect()
}
