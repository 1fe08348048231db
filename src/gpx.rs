//! GPX 1.1 wire format: parsing, generation and export naming.
//!
//! Parsing walks the XML event stream with an explicit state machine
//! ([`ParserState`]) instead of a DOM or object-wide flags, so element names
//! that appear at several nesting levels (`<time>` lives both under
//! `<metadata>` and under `<trkpt>`) are always scoped to the right owner.
//!
//! Generation is deterministic: the same [`Track`] always serializes to the
//! same byte sequence, and coordinates/elevations are written with full
//! floating-point precision so a parse/generate round trip is lossless.

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;

use crate::error::{Result, TrackError};
use crate::summary::Units;
use crate::{ActivityKind, GeoPoint, Track, TrackSegment};

/// GPX 1.1 namespace written on the root element.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

const CREATOR: &str = "track-exporter";

// ============================================================================
// Parsing
// ============================================================================

/// Where the parser currently is in the document.
///
/// Transitions: `Outside -> InTrack -> InSegment -> InPoint` on `<trk>`,
/// `<trkseg>`, `<trkpt>`, and back out on the matching end tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Outside,
    InTrack,
    InSegment,
    InPoint,
}

/// Which element's character data is currently being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    TrackName,
    TrackType,
    TrackTime,
    PointElevation,
    PointTime,
}

/// Accumulator for the `<trkpt>` being read.
#[derive(Debug, Default)]
struct PendingPoint {
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
}

impl PendingPoint {
    fn from_attributes(start: &BytesStart<'_>) -> Self {
        let mut pending = Self::default();
        for attr in start.attributes().flatten() {
            let value = match attr.unescape_value() {
                Ok(v) => v,
                Err(_) => continue,
            };
            match attr.key.as_ref() {
                b"lat" => pending.latitude = value.trim().parse().ok(),
                b"lon" => pending.longitude = value.trim().parse().ok(),
                _ => {}
            }
        }
        pending
    }

    /// Close out the point. Missing or unparsable coordinates drop the
    /// point; missing elevation defaults to 0, missing time to `parsed_at`.
    fn finish(self, parsed_at: DateTime<Utc>) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(
                lat,
                lon,
                self.elevation.unwrap_or(0.0),
                self.time.unwrap_or(parsed_at),
            )),
            _ => {
                debug!("dropping trkpt without usable lat/lon attributes");
                None
            }
        }
    }
}

/// Parse a GPX 1.1 document into a [`Track`].
///
/// Returns `Ok(None)` for a well-formed document that contains no usable
/// points ("no track", distinct from a malformed document). The track name
/// is left empty when the document has none; the caller is expected to
/// substitute a fallback such as the originating file name.
///
/// Points with a missing `<time>` child get the current instant; use
/// [`parse_gpx_at`] to inject the fallback instant explicitly.
pub fn parse_gpx(bytes: &[u8]) -> Result<Option<Track>> {
    parse_gpx_at(bytes, Utc::now())
}

/// Same as [`parse_gpx`], with the fallback instant for timestamp-less
/// points supplied by the caller. Parsing itself is deterministic.
pub fn parse_gpx_at(bytes: &[u8], parsed_at: DateTime<Utc>) -> Result<Option<Track>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut state = ParserState::Outside;
    let mut capture = Capture::None;
    let mut text = String::new();

    let mut track_name = String::new();
    let mut track_type = String::new();
    let mut track_time: Option<DateTime<Utc>> = None;
    let mut segments: Vec<TrackSegment> = Vec::new();
    let mut current_segment: Vec<GeoPoint> = Vec::new();
    let mut pending = PendingPoint::default();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(TrackError::MalformedDocument {
                    message: e.to_string(),
                    position: reader.buffer_position() as u64,
                });
            }
        };

        match event {
            Event::Start(ref e) => {
                capture = Capture::None;
                text.clear();
                match e.name().as_ref() {
                    b"trk" if state == ParserState::Outside => state = ParserState::InTrack,
                    b"trkseg" if state == ParserState::InTrack => {
                        state = ParserState::InSegment;
                        current_segment.clear();
                    }
                    b"trkpt" if state == ParserState::InSegment => {
                        state = ParserState::InPoint;
                        pending = PendingPoint::from_attributes(e);
                    }
                    b"name" if state == ParserState::InTrack => capture = Capture::TrackName,
                    b"type" if state == ParserState::InTrack => capture = Capture::TrackType,
                    b"ele" if state == ParserState::InPoint => capture = Capture::PointElevation,
                    // A point's <time> is scoped to the point; it must never
                    // overwrite the track-level recording date.
                    b"time" if state == ParserState::InPoint => capture = Capture::PointTime,
                    b"time" => capture = Capture::TrackTime,
                    _ => {}
                }
            }

            Event::Empty(ref e) => {
                // Self-closing <trkpt .../> carries only its attributes.
                if e.name().as_ref() == b"trkpt" && state == ParserState::InSegment {
                    if let Some(point) = PendingPoint::from_attributes(e).finish(parsed_at) {
                        current_segment.push(point);
                    }
                }
            }

            Event::Text(ref e) => {
                if capture != Capture::None {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }

            Event::End(ref e) => {
                match e.name().as_ref() {
                    b"trkpt" if state == ParserState::InPoint => {
                        if let Some(point) = std::mem::take(&mut pending).finish(parsed_at) {
                            current_segment.push(point);
                        }
                        state = ParserState::InSegment;
                    }
                    // Every closed <trkseg> becomes one segment in document
                    // order, empty ones included.
                    b"trkseg" if state == ParserState::InSegment => {
                        segments.push(TrackSegment::new(std::mem::take(&mut current_segment)));
                        state = ParserState::InTrack;
                    }
                    b"trk" if state == ParserState::InTrack => state = ParserState::Outside,
                    b"name" if capture == Capture::TrackName => {
                        if track_name.is_empty() {
                            track_name = text.trim().to_string();
                        }
                    }
                    b"type" if capture == Capture::TrackType => {
                        if track_type.is_empty() {
                            track_type = text.trim().to_string();
                        }
                    }
                    b"time" if capture == Capture::TrackTime => {
                        if track_time.is_none() {
                            track_time = parse_iso8601(text.trim());
                        }
                    }
                    b"time" if capture == Capture::PointTime => {
                        pending.time = parse_iso8601(text.trim());
                    }
                    b"ele" if capture == Capture::PointElevation => {
                        pending.elevation = text.trim().parse().ok();
                    }
                    _ => {}
                }
                capture = Capture::None;
                text.clear();
            }

            Event::Eof => {
                if state != ParserState::Outside {
                    return Err(TrackError::MalformedDocument {
                        message: "unexpected end of document".to_string(),
                        position: reader.buffer_position() as u64,
                    });
                }
                break;
            }

            _ => {}
        }

        buf.clear();
    }

    if !segments.iter().any(|s| !s.is_empty()) {
        debug!("parsed GPX document contains no usable points");
        return Ok(None);
    }

    let explicit = (!track_type.is_empty()).then_some(track_type.as_str());
    let kind = ActivityKind::infer(&track_name, explicit);
    let start_time = track_time
        .or_else(|| {
            segments
                .iter()
                .find_map(|s| s.points.first().map(|p| p.timestamp))
        })
        .unwrap_or(parsed_at);

    debug!(
        "parsed GPX track: {} segment(s), {} point(s)",
        segments.len(),
        segments.iter().map(TrackSegment::len).sum::<usize>()
    );

    Ok(Some(Track {
        name: track_name,
        kind,
        start_time,
        segments,
    }))
}

/// RFC 3339 / ISO-8601. Malformed values become `None` so the caller's
/// fallback applies.
fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Generation
// ============================================================================

/// Serialize a [`Track`] as a GPX 1.1 document.
///
/// One `<trk>` with one `<trkseg>` per segment (empty segments included, so
/// the segment structure survives a round trip), each `<trkpt>` carrying
/// `lat`/`lon` attributes plus `<ele>` and second-precision RFC 3339
/// `<time>` children in original point order.
///
/// Fails with [`TrackError::EmptyTrack`] when no segment has any points.
pub fn generate_gpx(track: &Track) -> Result<String> {
    if !track.is_exportable() {
        return Err(TrackError::EmptyTrack);
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(TrackError::internal)?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("version", "1.1"));
    gpx.push_attribute(("creator", CREATOR));
    gpx.push_attribute(("xmlns", GPX_NAMESPACE));
    writer
        .write_event(Event::Start(gpx))
        .map_err(TrackError::internal)?;

    write_element(
        &mut writer,
        "metadata",
        |writer| write_text_element(writer, "time", &format_iso8601(track.start_time)),
    )?;

    write_element(&mut writer, "trk", |writer| {
        let name = format!("{} {}", track.kind, track.start_time.format("%Y-%m-%d %H:%M"));
        write_text_element(writer, "name", &name)?;
        for segment in &track.segments {
            write_element(writer, "trkseg", |writer| {
                for point in &segment.points {
                    write_point(writer, point)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })?;

    writer
        .write_event(Event::End(BytesEnd::new("gpx")))
        .map_err(TrackError::internal)?;

    String::from_utf8(writer.into_inner()).map_err(TrackError::internal)
}

fn write_point(writer: &mut Writer<Vec<u8>>, point: &GeoPoint) -> Result<()> {
    let mut trkpt = BytesStart::new("trkpt");
    // Display on f64 prints the shortest representation that parses back to
    // the same value, which keeps the round trip exact without rounding.
    trkpt.push_attribute(("lat", point.latitude.to_string().as_str()));
    trkpt.push_attribute(("lon", point.longitude.to_string().as_str()));
    writer
        .write_event(Event::Start(trkpt))
        .map_err(TrackError::internal)?;

    write_text_element(writer, "ele", &point.altitude.to_string())?;
    write_text_element(writer, "time", &format_iso8601(point.timestamp))?;

    writer
        .write_event(Event::End(BytesEnd::new("trkpt")))
        .map_err(TrackError::internal)
}

fn write_element<F>(writer: &mut Writer<Vec<u8>>, name: &str, body: F) -> Result<()>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<()>,
{
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(TrackError::internal)?;
    body(writer)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(TrackError::internal)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(TrackError::internal)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(TrackError::internal)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(TrackError::internal)
}

/// Second precision is the wire precision for GPX timestamps.
fn format_iso8601(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Export
// ============================================================================

/// A generated export: the suggested file name and the complete document.
///
/// Persisting the text (and doing so atomically) is the calling layer's
/// contract; the library only ever returns a complete string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpxExport {
    pub file_name: String,
    pub xml: String,
}

/// File name convention for exported tracks:
/// `{ActivityKind}_{yyyy-MM-dd_HH-mm-ss}_{unit}[_{N}segments].gpx`.
///
/// The segment-count suffix is present only when the document has more than
/// one `<trkseg>`.
pub fn export_file_name(
    kind: ActivityKind,
    start_time: DateTime<Utc>,
    units: Units,
    segment_count: usize,
) -> String {
    let stamp = start_time.format("%Y-%m-%d_%H-%M-%S");
    if segment_count > 1 {
        format!("{}_{}_{}_{}segments.gpx", kind, stamp, units.token(), segment_count)
    } else {
        format!("{}_{}_{}.gpx", kind, stamp, units.token())
    }
}

/// Validate, serialize and name an export in one call.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use track_exporter::{export_track, GeoPoint, Track, Units};
///
/// let t = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
/// let track = Track::from_points("Morning Run", vec![
///     GeoPoint::new(51.5074, -0.1278, 12.0, t),
///     GeoPoint::new(51.5080, -0.1290, 14.5, t),
/// ]);
///
/// let export = export_track(&track, Units::Metric).unwrap();
/// assert_eq!(export.file_name, "Running_2024-05-01_06-00-00_km.gpx");
/// assert!(export.xml.contains("<trkpt"));
/// ```
pub fn export_track(track: &Track, units: Units) -> Result<GpxExport> {
    let xml = generate_gpx(track)?;
    let file_name = export_file_name(track.kind, track.start_time, units, track.segments.len());
    info!(
        "exported {} ({} points, {} segment(s))",
        file_name,
        track.point_count(),
        track.segments.len()
    );
    Ok(GpxExport { file_name, xml })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 10, 8, 0, 0).unwrap()
    }

    fn point(lat: f64, lon: f64, ele: f64, offset_secs: i64) -> GeoPoint {
        GeoPoint::new(lat, lon, ele, t0() + chrono::Duration::seconds(offset_secs))
    }

    fn parse_fixed(bytes: &[u8]) -> Result<Option<Track>> {
        parse_gpx_at(bytes, t0())
    }

    #[test]
    fn test_parse_three_point_scenario() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><time>2023-06-10T08:00:00Z</time></metadata>
  <trk>
    <name>Coastal run</name>
    <trkseg>
      <trkpt lat="37.0" lon="-122.0"><ele>10</ele><time>2023-06-10T08:00:00Z</time></trkpt>
      <trkpt lat="37.001" lon="-122.0"><ele>15</ele><time>2023-06-10T08:01:00Z</time></trkpt>
      <trkpt lat="37.002" lon="-122.0"><ele>8</ele><time>2023-06-10T08:02:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let track = parse_fixed(gpx.as_bytes()).unwrap().unwrap();
        assert_eq!(track.segments.len(), 1);
        assert_eq!(track.kind, ActivityKind::Running);
        assert_eq!(track.start_time, t0());

        let points = &track.segments[0].points;
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].latitude, 37.0);
        assert_eq!(points[1].latitude, 37.001);
        assert_eq!(points[2].latitude, 37.002);
        assert_eq!(points[0].altitude, 10.0);
        assert_eq!(points[1].altitude, 15.0);
        assert_eq!(points[2].altitude, 8.0);
        assert_eq!(points[1].timestamp, t0() + chrono::Duration::seconds(60));

        // Re-serializing reproduces the same coordinates, elevations and
        // timestamps to the second.
        let regenerated = generate_gpx(&track).unwrap();
        let reparsed = parse_fixed(regenerated.as_bytes()).unwrap().unwrap();
        assert_eq!(reparsed.segments.len(), 1);
        for (a, b) in points.iter().zip(&reparsed.segments[0].points) {
            assert_eq!(a.latitude, b.latitude);
            assert_eq!(a.longitude, b.longitude);
            assert_eq!(a.altitude, b.altitude);
            assert_eq!(a.timestamp.timestamp(), b.timestamp.timestamp());
        }
    }

    #[test]
    fn test_round_trip_multi_segment() {
        let track = Track {
            name: "Alpine hike".to_string(),
            kind: ActivityKind::Hiking,
            start_time: t0(),
            segments: vec![
                TrackSegment::new(vec![
                    point(46.55731, 8.56123, 1432.7, 0),
                    point(46.55812, 8.56244, 1441.2, 30),
                    point(46.55907, 8.56379, 1455.9, 61),
                ]),
                TrackSegment::new(vec![]),
                TrackSegment::new(vec![
                    point(46.56102, 8.56633, 1480.4, 600),
                    point(46.56155, 8.56701, 1478.1, 645),
                ]),
            ],
        };

        let xml = generate_gpx(&track).unwrap();
        let reparsed = parse_fixed(xml.as_bytes()).unwrap().unwrap();

        // Empty middle segment survives the round trip.
        assert_eq!(reparsed.segments.len(), 3);
        assert!(reparsed.segments[1].is_empty());
        assert_eq!(reparsed.kind, ActivityKind::Hiking);
        assert_eq!(reparsed.start_time, t0());

        for (orig, back) in track.segments.iter().zip(&reparsed.segments) {
            assert_eq!(orig.len(), back.len());
            for (a, b) in orig.points.iter().zip(&back.points) {
                assert_eq!(a.latitude, b.latitude);
                assert_eq!(a.longitude, b.longitude);
                assert_eq!(a.altitude, b.altitude);
                assert_eq!(a.timestamp.timestamp(), b.timestamp.timestamp());
            }
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let track = Track::from_points("ride", vec![point(47.1, 8.2, 400.0, 0)]);
        assert_eq!(generate_gpx(&track).unwrap(), generate_gpx(&track).unwrap());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let err = parse_fixed(b"<gpx><trk><trkseg></trk></gpx>").unwrap_err();
        assert!(matches!(err, TrackError::MalformedDocument { .. }));

        let err = parse_fixed(b"<gpx><trk>").unwrap_err();
        assert!(matches!(err, TrackError::MalformedDocument { .. }));
    }

    #[test]
    fn test_empty_document_is_not_an_error() {
        // Well-formed but trackless: "no route data", not a parse failure.
        assert_eq!(parse_fixed(b"<gpx></gpx>").unwrap(), None);

        let empty_seg = b"<gpx><trk><name>x</name><trkseg></trkseg></trk></gpx>";
        assert_eq!(parse_fixed(empty_seg).unwrap(), None);
    }

    #[test]
    fn test_point_without_coordinates_is_dropped() {
        let gpx = br#"<gpx><trk><trkseg>
            <trkpt lon="-122.0"><ele>10</ele></trkpt>
            <trkpt lat="oops" lon="-122.0"><ele>11</ele></trkpt>
            <trkpt lat="37.002" lon="-122.0"><ele>12</ele></trkpt>
        </trkseg></trk></gpx>"#;

        let track = parse_fixed(gpx).unwrap().unwrap();
        assert_eq!(track.segments[0].len(), 1);
        assert_eq!(track.segments[0].points[0].latitude, 37.002);
    }

    #[test]
    fn test_missing_ele_and_time_defaults() {
        let gpx = br#"<gpx><trk><trkseg>
            <trkpt lat="37.0" lon="-122.0"/>
            <trkpt lat="37.001" lon="-122.0"><ele>not-a-number</ele><time>garbage</time></trkpt>
        </trkseg></trk></gpx>"#;

        let track = parse_fixed(gpx).unwrap().unwrap();
        let points = &track.segments[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].altitude, 0.0);
        assert_eq!(points[0].timestamp, t0());
        assert_eq!(points[1].altitude, 0.0);
        assert_eq!(points[1].timestamp, t0());
    }

    #[test]
    fn test_point_time_never_overwrites_track_time() {
        let gpx = br#"<gpx>
            <metadata><time>2023-06-10T08:00:00Z</time></metadata>
            <trk><trkseg>
              <trkpt lat="37.0" lon="-122.0"><time>2023-06-10T09:30:00Z</time></trkpt>
            </trkseg></trk></gpx>"#;

        let track = parse_fixed(gpx).unwrap().unwrap();
        assert_eq!(track.start_time, t0());
        assert_eq!(
            track.segments[0].points[0].timestamp,
            Utc.with_ymd_and_hms(2023, 6, 10, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_start_time_falls_back_to_first_point() {
        let gpx = br#"<gpx><trk><trkseg>
            <trkpt lat="37.0" lon="-122.0"><time>2023-06-10T09:30:00Z</time></trkpt>
        </trkseg></trk></gpx>"#;

        let track = parse_fixed(gpx).unwrap().unwrap();
        assert_eq!(
            track.start_time,
            Utc.with_ymd_and_hms(2023, 6, 10, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_kind_falls_back_to_type_element() {
        let gpx = br#"<gpx><trk><name>Saturday outing</name><type>cycling</type><trkseg>
            <trkpt lat="37.0" lon="-122.0"/>
        </trkseg></trk></gpx>"#;

        let track = parse_fixed(gpx).unwrap().unwrap();
        assert_eq!(track.name, "Saturday outing");
        assert_eq!(track.kind, ActivityKind::Cycling);
    }

    #[test]
    fn test_missing_name_stays_empty_for_caller_fallback() {
        let gpx = br#"<gpx><trk><trkseg><trkpt lat="1.0" lon="2.0"/></trkseg></trk></gpx>"#;
        let track = parse_fixed(gpx).unwrap().unwrap();
        assert!(track.name.is_empty());
        assert_eq!(track.kind, ActivityKind::Other);
    }

    #[test]
    fn test_generate_rejects_empty_track() {
        let track = Track::from_points("nothing", vec![]);
        assert_eq!(generate_gpx(&track).unwrap_err(), TrackError::EmptyTrack);
    }

    #[test]
    fn test_generated_name_is_kind_and_start_time() {
        let track = Track::from_points("bike to work", vec![point(47.0, 8.0, 410.0, 0)]);
        let xml = generate_gpx(&track).unwrap();
        assert!(xml.contains("<name>Cycling 2023-06-10 08:00</name>"));
        assert!(xml.contains(GPX_NAMESPACE));
        assert!(xml.contains("<time>2023-06-10T08:00:00Z</time>"));
    }

    #[test]
    fn test_export_file_name_convention() {
        assert_eq!(
            export_file_name(ActivityKind::Running, t0(), Units::Metric, 1),
            "Running_2023-06-10_08-00-00_km.gpx"
        );
        assert_eq!(
            export_file_name(ActivityKind::Hiking, t0(), Units::Imperial, 3),
            "Hiking_2023-06-10_08-00-00_mi_3segments.gpx"
        );
    }

    #[test]
    fn test_export_track_bundles_name_and_xml() {
        let track = Track::from_points(
            "trail hike",
            vec![point(46.5, 8.5, 1200.0, 0), point(46.6, 8.6, 1250.0, 60)],
        );
        let export = export_track(&track, Units::Metric).unwrap();
        assert_eq!(export.file_name, "Hiking_2023-06-10_08-00-00_km.gpx");
        assert!(export.xml.starts_with("<?xml"));

        let err = export_track(&Track::from_points("x", vec![]), Units::Metric).unwrap_err();
        assert_eq!(err, TrackError::EmptyTrack);
    }
}
