//! Activity catalog command

use crate::cli::{Context, OutputFormat};
use crate::error::Result;
use crate::models::CatalogSummary;

/// Show the activity catalog
pub fn show(ctx: &Context) -> Result<()> {
    let (_, _, mut catalog) = ctx.load_catalog()?;
    catalog.sort_by_key(|s| s.entry.index);

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    print_catalog(&catalog);
    Ok(())
}

pub(crate) fn print_catalog(catalog: &[CatalogSummary]) {
    if catalog.is_empty() {
        println!("No activities recorded.");
        return;
    }

    println!(
        "{:>3}  {:<10}  {:<5}  {:<5}  {:>8}  {:>9}  {:>7}  {:>7}",
        "#", "Day", "Start", "End", "Duration", "Distance", "AltMin", "AltMax"
    );
    println!("{}", "-".repeat(72));
    for summary in catalog {
        println!("{}", format_row(summary));
    }
    println!("\nTotal: {} activities", catalog.len());
}

fn format_row(summary: &CatalogSummary) -> String {
    let entry = &summary.entry;
    let (day, start, end) = match entry.start_local() {
        Some(start) => {
            let end = start + chrono::Duration::seconds(i64::from(entry.time));
            (
                start.format("%Y-%m-%d").to_string(),
                start.format("%H:%M").to_string(),
                end.format("%H:%M").to_string(),
            )
        }
        None => ("-".to_string(), "-".to_string(), "-".to_string()),
    };
    let altitude = |alt: Option<i32>| alt.map_or_else(|| "-".to_string(), |m| format!("{}m", m));

    format!(
        "{:>3}  {:<10}  {:<5}  {:<5}  {:>8}  {:>7.2}km  {:>7}  {:>7}",
        entry.display_number(),
        day,
        start,
        end,
        summary.duration_formatted(),
        entry.distance_km(),
        altitude(summary.alt_min),
        altitude(summary.alt_max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogEntry, DeviceId};

    fn summary(cached: bool) -> CatalogSummary {
        CatalogSummary {
            device: DeviceId(1),
            entry: CatalogEntry {
                start: 1_250_000_000,
                time: 3600,
                distance: 12_346,
                kcal: 700,
                max_speed: 300,
                max_heart: 180,
                avg_heart: 150,
                cumul_plus: 0,
                cumul_minus: 0,
                track: 4,
                index: 2,
            },
            alt_min: cached.then_some(120),
            alt_max: cached.then_some(480),
            duration: cached.then_some(3720),
        }
    }

    #[test]
    fn test_row_with_cached_points() {
        let row = format_row(&summary(true));
        assert!(row.starts_with("  3  "));
        assert!(row.contains("01h02m"));
        assert!(row.contains("12.35km"));
        assert!(row.contains("120m"));
        assert!(row.trim_end().ends_with("480m"));
    }

    #[test]
    fn test_row_without_cached_points() {
        let row = format_row(&summary(false));
        assert!(!row.contains("480m"));
        assert!(row.trim_end().ends_with('-'));
    }
}
