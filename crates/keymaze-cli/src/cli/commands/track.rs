//! Track recovery and export

use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::cli::{Context, OutputFormat};
use crate::error::{KeymazeError, Result};
use crate::export::export_gpx;
use crate::models::CatalogSummary;
use crate::track::{parse_trims, reduce, trim, GeoPoint};

/// Which tracks to recover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelection {
    All,
    /// Track number as displayed in the catalog (1-based)
    Number(u32),
}

impl FromStr for TrackSelection {
    type Err = KeymazeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self::Number(n)),
            _ => Err(KeymazeError::invalid_param(format!(
                "track must be a number or 'all', got \"{}\"",
                s
            ))),
        }
    }
}

/// Post-processing and export options
#[derive(Debug, Clone, Default)]
pub struct TrackOptions {
    pub gpx: Option<PathBuf>,
    pub trim: Option<String>,
    pub angle: f64,
    pub zoffset: i32,
}

impl TrackOptions {
    fn is_single_track_only(&self) -> bool {
        self.gpx.is_some() || self.trim.is_some()
    }
}

#[derive(Serialize)]
struct TrackOutput<'a> {
    number: u32,
    track: u16,
    start: i64,
    points: &'a [GeoPoint],
}

/// Recover the points of the selected tracks, then optionally export one
pub fn recover(ctx: &Context, selection: TrackSelection, opts: &TrackOptions) -> Result<()> {
    if selection == TrackSelection::All && opts.is_single_track_only() {
        return Err(KeymazeError::invalid_param(
            "Cannot trim or export several tracks",
        ));
    }
    let trims = opts.trim.as_deref().map(parse_trims).transpose()?;

    let (mut cache, record, catalog) = ctx.load_catalog()?;
    let selected = select_tracks(&catalog, selection)?;

    let mut outputs = Vec::with_capacity(selected.len());
    for summary in selected {
        let entry = &summary.entry;
        info!(track = entry.track, "Recovering trackpoints");
        let mut points = cache.get_trackpoints(record.device, entry.track)?;

        if let Some(trims) = &trims {
            let total = points.len();
            points = trim(&points, entry.start, entry.time, trims);
            info!(total, kept = points.len(), "Track trimmed");
        }

        let reduced = reduce(&points, opts.angle);
        info!(count = points.len(), reduced = reduced.len(), "Track reduced");
        outputs.push((summary, reduced));
    }

    if let Some(path) = &opts.gpx {
        if let Some((summary, points)) = outputs.first() {
            export_gpx(path, summary.entry.start, points, opts.zoffset)?;
            println!("Exported {} points to {}", points.len(), path.display());
        }
        return Ok(());
    }

    if ctx.format == OutputFormat::Json {
        let json: Vec<TrackOutput> = outputs
            .iter()
            .map(|(summary, points)| TrackOutput {
                number: summary.entry.display_number(),
                track: summary.entry.track,
                start: summary.entry.start,
                points,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for (summary, points) in &outputs {
        println!(
            "Track {:>3}: {} points",
            summary.entry.display_number(),
            points.len()
        );
    }
    Ok(())
}

/// Resolve a selection against the catalog
fn select_tracks(
    catalog: &[CatalogSummary],
    selection: TrackSelection,
) -> Result<Vec<&CatalogSummary>> {
    match selection {
        TrackSelection::All => Ok(catalog.iter().collect()),
        TrackSelection::Number(n) => catalog
            .iter()
            .find(|s| s.entry.display_number() == n)
            .map(|s| vec![s])
            .ok_or_else(|| KeymazeError::TrackNotFound(n.to_string())),
    }
}
