//! Elevation extrema markers for the map layer.
//!
//! Picks the geometrically most significant local maxima and minima of an
//! elevation series so the renderer can pin summit/valley annotations. A
//! deterministic function of the series, independent of any drawing code.

use serde::{Deserialize, Serialize};

/// Configuration for marker selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Samples on each side contributing to the local window average.
    /// Default: 10
    pub half_window: usize,

    /// Minimum deviation from the local window average for an extremum to
    /// qualify. Default: 10.0 meters
    pub min_deviation_m: f64,

    /// At most this many markers, keeping the largest deviations.
    /// Default: 5
    pub max_markers: usize,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            half_window: 10,
            min_deviation_m: 10.0,
            max_markers: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Local elevation maximum
    Peak,
    /// Local elevation minimum
    Dip,
}

/// A marker candidate: where it sits and how far it stands out from its
/// surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationMarker {
    /// Index into the elevation series (and thus into the segment's points)
    pub index: usize,
    pub elevation: f64,
    /// Signed distance from the local window average; positive for peaks
    pub deviation: f64,
    pub kind: MarkerKind,
}

/// Select marker candidates from an elevation series.
///
/// A sample qualifies when it is a local extremum and deviates from the
/// average of its surrounding window by at least
/// [`MarkerConfig::min_deviation_m`]. The result keeps the
/// [`MarkerConfig::max_markers`] largest deviations, returned in series
/// order. Fewer than three samples can hold no interior extremum, so the
/// result is empty.
pub fn select_markers(elevations: &[f64], config: &MarkerConfig) -> Vec<ElevationMarker> {
    let count = elevations.len();
    if count < 3 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for i in 1..count - 1 {
        let prev = elevations[i - 1];
        let here = elevations[i];
        let next = elevations[i + 1];

        // Strict rise on the left, non-strict on the right: a flat-topped
        // extremum yields one marker at its first sample, not one per sample.
        let kind = if here > prev && here >= next {
            MarkerKind::Peak
        } else if here < prev && here <= next {
            MarkerKind::Dip
        } else {
            continue;
        };

        let lo = i.saturating_sub(config.half_window);
        let hi = (i + config.half_window).min(count - 1);
        let window = &elevations[lo..=hi];
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let deviation = here - mean;

        let significant = match kind {
            MarkerKind::Peak => deviation >= config.min_deviation_m,
            MarkerKind::Dip => deviation <= -config.min_deviation_m,
        };
        if significant {
            candidates.push(ElevationMarker {
                index: i,
                elevation: here,
                deviation,
                kind,
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.deviation
            .abs()
            .partial_cmp(&a.deviation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(config.max_markers);
    candidates.sort_by_key(|m| m.index);
    candidates
}
