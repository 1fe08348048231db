//! # Track Exporter
//!
//! GPX track encoding and elevation profile analysis for recorded workouts.
//!
//! This library provides the data pipeline behind a workout export app:
//! - Bidirectional conversion between GPX 1.1 XML and an in-memory track
//!   model with multi-segment support
//! - Noise-tolerant elevation smoothing, windowed grade estimation and
//!   ascent/descent totals
//! - Grade-band classification and per-interval colors for gradient-colored
//!   route rendering, plus elevation extrema markers
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel profile computation with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use track_exporter::{compute_profile, parse_gpx, ProfileConfig};
//!
//! let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <gpx version="1.1" xmlns="http://www.topografix.com/GPX/1/1">
//!   <trk><name>Morning Run</name><trkseg>
//!     <trkpt lat="51.5074" lon="-0.1278"><ele>12.0</ele><time>2024-05-01T06:00:00Z</time></trkpt>
//!     <trkpt lat="51.5080" lon="-0.1290"><ele>14.5</ele><time>2024-05-01T06:01:00Z</time></trkpt>
//!     <trkpt lat="51.5090" lon="-0.1300"><ele>13.0</ele><time>2024-05-01T06:02:00Z</time></trkpt>
//!   </trkseg></trk>
//! </gpx>"#;
//!
//! let track = parse_gpx(gpx.as_bytes()).unwrap().expect("track has points");
//! assert_eq!(track.segments.len(), 1);
//!
//! let profile = compute_profile(&track.segments[0].points, &ProfileConfig::default());
//! assert_eq!(profile.elevations.len(), 3);
//! ```
//!
//! The library performs no I/O: the health-data store hands in completed
//! batches of [`GeoPoint`]s, the map layer consumes [`render::RenderSegment`]s
//! and [`markers::ElevationMarker`]s, and the caller persists the generated
//! GPX text itself. Diagnostics go through the [`log`] facade; install a
//! logger to capture them, or leave it absent for silence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackError};

// Geographic utilities (surface distance)
pub mod geo_utils;

// GPX 1.1 wire format (parse / generate / export)
pub mod gpx;
pub use gpx::{export_track, generate_gpx, parse_gpx, parse_gpx_at, GpxExport};

// Elevation profile analysis (smoothing, grades, ascent/descent totals)
pub mod profile;
#[cfg(feature = "parallel")]
pub use profile::compute_profiles_parallel;
pub use profile::{
    compute_profile, compute_profiles, smooth_elevations, ElevationProfile, ProfileConfig,
};

// Grade classification for gradient-colored rendering
pub mod grade;
pub use grade::{classify_grade, color_for_grade, Color, GradeBand};

// Elevation extrema markers for the map layer
pub mod markers;
pub use markers::{select_markers, ElevationMarker, MarkerConfig, MarkerKind};

// Render-layer output (colored polyline pieces)
pub mod render;
pub use render::{build_render_segments, RenderConfig, RenderSegment};

// Summary formatting and unit preference helpers
pub mod summary;
pub use summary::{format_profile_summary, Units};

// ============================================================================
// Core Types
// ============================================================================

/// A recorded location sample with altitude and timestamp.
///
/// Altitude comes straight from the device altimeter and may be noisy;
/// the profile analyzer is responsible for smoothing it.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use track_exporter::GeoPoint;
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
/// let point = GeoPoint::new(51.5074, -0.1278, 12.0, t); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level in meters
    pub altitude: f64,
    /// Moment the sample was recorded
    pub timestamp: DateTime<Utc>,
}

impl GeoPoint {
    /// Create a new geo point.
    pub fn new(latitude: f64, longitude: f64, altitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            timestamp,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A contiguous run of recorded points with no gap.
///
/// A pause/resume in recording is represented by starting a new segment,
/// never by a sentinel point. Segments may be empty; every consumer in this
/// crate handles that without failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub points: Vec<GeoPoint>,
}

impl TrackSegment {
    /// Create a segment from an ordered batch of points.
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The kind of activity a track records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Running,
    Walking,
    Hiking,
    Cycling,
    Other,
}

impl ActivityKind {
    /// Infer the activity kind from the track name, falling back to an
    /// explicit type field, falling back to [`ActivityKind::Other`].
    ///
    /// Matching is a case-insensitive substring test, so `"Morning Run"`,
    /// `"running"` and `"RUN #4"` all map to [`ActivityKind::Running`].
    ///
    /// # Example
    /// ```
    /// use track_exporter::ActivityKind;
    ///
    /// assert_eq!(ActivityKind::infer("Evening Bike Loop", None), ActivityKind::Cycling);
    /// assert_eq!(ActivityKind::infer("Lunch break", Some("hiking")), ActivityKind::Hiking);
    /// assert_eq!(ActivityKind::infer("Workout", None), ActivityKind::Other);
    /// ```
    pub fn infer(name: &str, explicit_type: Option<&str>) -> Self {
        Self::from_label(name)
            .or_else(|| explicit_type.and_then(Self::from_label))
            .unwrap_or(ActivityKind::Other)
    }

    /// Case-insensitive substring match against the known activity labels.
    fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if lower.contains("run") {
            Some(ActivityKind::Running)
        } else if lower.contains("bike") || lower.contains("cycling") {
            Some(ActivityKind::Cycling)
        } else if lower.contains("hik") {
            Some(ActivityKind::Hiking)
        } else if lower.contains("walk") {
            Some(ActivityKind::Walking)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActivityKind::Running => "Running",
            ActivityKind::Walking => "Walking",
            ActivityKind::Hiking => "Hiking",
            ActivityKind::Cycling => "Cycling",
            ActivityKind::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// A recorded activity: name, kind, start time and one or more segments.
///
/// A track with zero non-empty segments is valid in memory but cannot be
/// exported; [`generate_gpx`] rejects it with [`TrackError::EmptyTrack`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub kind: ActivityKind,
    pub start_time: DateTime<Utc>,
    pub segments: Vec<TrackSegment>,
}

impl Track {
    /// Build a single-segment track from a completed batch of samples, the
    /// shape the health-data store delivers a workout route in.
    ///
    /// The start time is taken from the first sample; an empty batch gets
    /// the Unix epoch, and such a track is not exportable anyway.
    pub fn from_points(name: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        let name = name.into();
        let start_time = points
            .first()
            .map(|p| p.timestamp)
            .unwrap_or(DateTime::UNIX_EPOCH);
        Self {
            kind: ActivityKind::infer(&name, None),
            name,
            start_time,
            segments: vec![TrackSegment::new(points)],
        }
    }

    /// Total number of points across all segments.
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(TrackSegment::len).sum()
    }

    /// Whether the track carries at least one point and may be exported.
    pub fn is_exportable(&self) -> bool {
        self.segments.iter().any(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_point_validity() {
        assert!(GeoPoint::new(51.5, -0.12, 10.0, t0()).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0, 0.0, t0()).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0, 0.0, t0()).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0, 0.0, t0()).is_valid());
    }

    #[test]
    fn test_activity_kind_inference_order() {
        // Name wins over the explicit type field
        assert_eq!(
            ActivityKind::infer("Sunday run", Some("cycling")),
            ActivityKind::Running
        );
        // Explicit type fills in when the name says nothing
        assert_eq!(
            ActivityKind::infer("Sunday outing", Some("cycling")),
            ActivityKind::Cycling
        );
        assert_eq!(ActivityKind::infer("Sunday outing", None), ActivityKind::Other);
    }

    #[test]
    fn test_activity_kind_case_insensitive() {
        assert_eq!(ActivityKind::infer("RUNNING", None), ActivityKind::Running);
        assert_eq!(ActivityKind::infer("Hike to the lake", None), ActivityKind::Hiking);
        assert_eq!(ActivityKind::infer("evening walk", None), ActivityKind::Walking);
        assert_eq!(ActivityKind::infer("Bike commute", None), ActivityKind::Cycling);
    }

    #[test]
    fn test_track_from_points() {
        let points = vec![
            GeoPoint::new(51.5, -0.12, 10.0, t0()),
            GeoPoint::new(51.6, -0.13, 11.0, t0()),
        ];
        let track = Track::from_points("Morning Run", points);
        assert_eq!(track.kind, ActivityKind::Running);
        assert_eq!(track.start_time, t0());
        assert_eq!(track.segments.len(), 1);
        assert_eq!(track.point_count(), 2);
        assert!(track.is_exportable());
    }

    #[test]
    fn test_empty_track_not_exportable() {
        let track = Track::from_points("Empty", vec![]);
        assert_eq!(track.start_time, DateTime::UNIX_EPOCH);
        assert!(!track.is_exportable());

        let segmented = Track {
            name: String::new(),
            kind: ActivityKind::Other,
            start_time: DateTime::UNIX_EPOCH,
            segments: vec![TrackSegment::default(), TrackSegment::default()],
        };
        assert!(!segmented.is_exportable());
    }
}
