//! Render-layer output: colored polyline pieces for the map surface.
//!
//! The map layer draws a route as one short polyline piece per point
//! interval, colored by grade band. This module produces that plain data;
//! no drawing happens here and nothing inherits from a renderer type.
//!
//! Near-flat intervals that still carry a visible elevation change are
//! nudged into the first non-flat band *for color selection only*; the
//! numeric grades and totals in [`ElevationProfile`] are never touched by
//! this cosmetic adjustment.

use serde::{Deserialize, Serialize};

use crate::grade::{color_for_grade, Color};
use crate::profile::ElevationProfile;
use crate::GeoPoint;

/// Configuration for render output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// An interval whose grade magnitude is below the boosted grade but
    /// whose smoothed elevation change exceeds this gets the boosted grade
    /// for coloring, so gentle climbs don't paint as dead flat.
    /// Default: 0.5 meters
    pub flat_boost_delta_m: f64,

    /// Grade magnitude substituted when the boost applies.
    /// Default: 0.01
    pub boosted_grade: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            flat_boost_delta_m: 0.5,
            boosted_grade: 0.01,
        }
    }
}

/// One drawable interval: two endpoints, the numeric grade and the band
/// color the map should use for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSegment {
    pub start: GeoPoint,
    pub end: GeoPoint,
    /// The analyzer's grade for this interval, unmodified
    pub grade: f64,
    pub color: Color,
}

/// Build the colored polyline pieces for one track segment.
///
/// Piece `i` spans input points `i` and `i + 1` and carries the color for
/// grade `i`, so output order mirrors input order. Returns an empty vector
/// when the profile is empty or does not belong to `points`.
pub fn build_render_segments(
    points: &[GeoPoint],
    profile: &ElevationProfile,
    config: &RenderConfig,
) -> Vec<RenderSegment> {
    if points.len() < 2 || profile.elevations.len() != points.len() {
        return Vec::new();
    }

    (0..points.len() - 1)
        .map(|i| {
            let grade = profile.grades[i];
            let delta = profile.elevations[i + 1] - profile.elevations[i];

            let color_grade = if grade.abs() < config.boosted_grade
                && delta.abs() > config.flat_boost_delta_m
            {
                config.boosted_grade.copysign(delta)
            } else {
                grade
            };

            RenderSegment {
                start: points[i],
                end: points[i + 1],
                grade,
                color: color_for_grade(color_grade),
            }
        })
        .collect()
}
