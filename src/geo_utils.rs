//! Geographic utilities shared by the profile analyzer.

use geo::{Distance, Haversine, Point};

use crate::GeoPoint;

/// Haversine surface distance between two samples, in meters.
///
/// Altitude is ignored on purpose: grade computation wants the horizontal
/// run, and the vertical component comes from the smoothed elevation series.
pub fn surface_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    Haversine::distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Total surface distance along an ordered sequence of samples, in meters.
pub fn path_distance(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| surface_distance(&w[0], &w[1]))
        .sum()
}
