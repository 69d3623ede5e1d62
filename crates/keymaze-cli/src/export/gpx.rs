//! GPX 1.1 export of a processed track

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geo_types::{Point, Rect};
use gpx::{Gpx, GpxVersion, Metadata, Time, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;

use crate::error::{KeymazeError, Result};
use crate::track::GeoPoint;

const CREATOR: &str = concat!("keymaze-cli ", env!("CARGO_PKG_VERSION"));

fn timestamp(secs: i64) -> Result<Time> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map(Time::from)
        .map_err(|e| KeymazeError::Export(format!("Invalid point time {}: {}", secs, e)))
}

/// Build the GPX document for one track
///
/// Point times are rebuilt by accumulating deltas from `start` (epoch
/// seconds); `zoffset` is added to every elevation.
pub fn build_gpx(name: &str, start: i64, points: &[GeoPoint], zoffset: i32) -> Result<Gpx> {
    let mut segment = TrackSegment::new();
    let mut tenths = start * 10;
    let mut bounds: Option<(f64, f64, f64, f64)> = None;

    for p in points {
        tenths += i64::from(p.delta);

        let mut waypoint = Waypoint::new(Point::new(p.lon, p.lat));
        waypoint.elevation = Some(f64::from(p.alt) + f64::from(zoffset));
        waypoint.time = Some(timestamp(tenths / 10)?);
        waypoint.symbol = Some("Waypoint".to_string());
        segment.points.push(waypoint);

        bounds = Some(match bounds {
            None => (p.lon, p.lat, p.lon, p.lat),
            Some((min_lon, min_lat, max_lon, max_lat)) => (
                min_lon.min(p.lon),
                min_lat.min(p.lat),
                max_lon.max(p.lon),
                max_lat.max(p.lat),
            ),
        });
    }

    let mut track = Track::new();
    track.name = Some(name.to_string());
    track.number = Some(1);
    track.segments.push(segment);

    let mut metadata = Metadata::default();
    metadata.time = Some(OffsetDateTime::now_utc().into());
    metadata.bounds = bounds.map(|(min_lon, min_lat, max_lon, max_lat)| {
        Rect::new((min_lon, min_lat), (max_lon, max_lat))
    });

    let mut doc = Gpx::default();
    doc.version = GpxVersion::Gpx11;
    doc.creator = Some(CREATOR.to_string());
    doc.metadata = Some(metadata);
    doc.tracks.push(track);
    Ok(doc)
}

/// Write a track as GPX to any writer
pub fn write_gpx<W: Write>(
    writer: W,
    name: &str,
    start: i64,
    points: &[GeoPoint],
    zoffset: i32,
) -> Result<()> {
    let doc = build_gpx(name, start, points, zoffset)?;
    gpx::write(&doc, writer).map_err(|e| KeymazeError::Export(e.to_string()))
}

/// Write a track as GPX to `path`, naming the track after the file
pub fn export_gpx(path: &Path, start: i64, points: &[GeoPoint], zoffset: i32) -> Result<()> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());

    let mut out = BufWriter::new(File::create(path)?);
    write_gpx(&mut out, &name, start, points, zoffset)?;
    out.flush()?;

    tracing::info!(path = %path.display(), points = points.len(), "GPX written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn point(lat: f64, lon: f64, alt: i16, delta: u8) -> GeoPoint {
        GeoPoint {
            lat,
            lon,
            alt,
            speed: 0,
            heart: 0,
            delta,
        }
    }

    #[test]
    fn test_build_gpx_points() {
        let points = [
            point(45.0, 5.0, 200, 10),
            point(45.001, 5.002, 210, 25),
        ];
        let doc = build_gpx("morning", 1_234_567_890, &points, 12).unwrap();

        let track = &doc.tracks[0];
        assert_eq!(track.name.as_deref(), Some("morning"));
        let wps = &track.segments[0].points;
        assert_eq!(wps.len(), 2);
        assert_eq!(wps[0].point().y(), 45.0);
        assert_eq!(wps[0].point().x(), 5.0);
        assert_eq!(wps[0].elevation, Some(212.0));
        assert_eq!(wps[1].elevation, Some(222.0));
        assert_eq!(wps[0].symbol.as_deref(), Some("Waypoint"));

        // 1234567890.0 + 1.0 s, then + 2.5 s (floored)
        let t0 = OffsetDateTime::from(wps[0].time.clone().unwrap());
        let t1 = OffsetDateTime::from(wps[1].time.clone().unwrap());
        assert_eq!(t0, OffsetDateTime::from_unix_timestamp(1_234_567_891).unwrap());
        assert_eq!(t1, OffsetDateTime::from_unix_timestamp(1_234_567_893).unwrap());

        let bounds = doc.metadata.unwrap().bounds.unwrap();
        assert_eq!(bounds.min().x, 5.0);
        assert_eq!(bounds.max().y, 45.001);
    }

    #[test]
    fn test_export_file_reads_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("ride.gpx");
        let points: Vec<GeoPoint> = (0..5)
            .map(|i| point(43.6 + f64::from(i) * 0.001, 1.44, 150, 10))
            .collect();

        export_gpx(&path, 1_300_000_000, &points, 0).unwrap();

        let file = File::open(&path).unwrap();
        let doc = gpx::read(BufReader::new(file)).unwrap();
        assert_eq!(doc.tracks.len(), 1);
        assert_eq!(doc.tracks[0].name.as_deref(), Some("ride"));
        assert_eq!(doc.tracks[0].segments[0].points.len(), 5);
    }

    #[test]
    fn test_empty_track_has_no_bounds() {
        let doc = build_gpx("empty", 0, &[], 0).unwrap();
        assert!(doc.metadata.unwrap().bounds.is_none());
        assert!(doc.tracks[0].segments[0].points.is_empty());
    }
}
