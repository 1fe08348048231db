//! Human-readable profile summaries and unit preference helpers.
//!
//! Formatting only; every number here was already computed by the profile
//! analyzer. The unit preference itself is owned by the app settings layer,
//! which passes [`Units`] in where it matters (export file names, display
//! conversion).

use serde::{Deserialize, Serialize};

use crate::profile::ElevationProfile;

/// The user's unit preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Metric,
    Imperial,
}

impl Units {
    /// Token used in export file names.
    pub fn token(self) -> &'static str {
        match self {
            Units::Metric => "km",
            Units::Imperial => "mi",
        }
    }
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * 3.28084
}

pub fn km_to_miles(km: f64) -> f64 {
    km * 0.621371
}

/// Multi-line summary of a segment's elevation statistics, in meters with
/// grades as percentages to one decimal.
///
/// # Example
/// ```
/// use track_exporter::{format_profile_summary, ElevationProfile};
///
/// let summary = format_profile_summary(&ElevationProfile {
///     elevations: vec![100.0, 110.0],
///     grades: vec![0.05, 0.05],
///     total_ascent: 10.0,
///     max_grade: 0.05,
///     min_grade: 0.05,
///     ..ElevationProfile::default()
/// });
/// assert!(summary.contains("Total ascent: 10.0 m"));
/// assert!(summary.contains("Max grade: 5.0%"));
/// ```
pub fn format_profile_summary(profile: &ElevationProfile) -> String {
    if profile.is_empty() {
        return "No elevation data available".to_string();
    }

    format!(
        "Total ascent: {:.1} m\nTotal descent: {:.1} m\nMax grade: {:.1}%\nMin grade: {:.1}%",
        profile.total_ascent,
        profile.total_descent,
        profile.max_grade * 100.0,
        profile.min_grade * 100.0,
    )
}
