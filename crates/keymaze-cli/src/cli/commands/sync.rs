//! Sync commands for keymaze-cli

use tracing::info;

use crate::cli::{Context, OutputFormat};
use crate::error::{KeymazeError, Result};
use crate::storage::{open_store, CacheCounts};

use super::catalog::print_catalog;

/// Download every track not cached yet
pub fn run(ctx: &Context) -> Result<()> {
    if ctx.offline {
        return Err(KeymazeError::invalid_param(
            "Cannot sync from device in offline mode",
        ));
    }

    let (mut cache, record, before) = ctx.load_catalog()?;
    let pending = before.iter().filter(|s| !s.is_cached()).count();
    if pending == 0 {
        println!("All {} tracks are already cached.", before.len());
        return Ok(());
    }

    println!("Loading {} track(s) from device...", pending);
    let mut catalog = cache.sync_tracks(record.device, &before)?;
    info!(tracks = pending, "Sync complete");

    catalog.sort_by_key(|s| s.entry.index);
    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        print_catalog(&catalog);
    }
    Ok(())
}

/// Show the store location and contents
pub fn status(ctx: &Context) -> Result<()> {
    if !ctx.storage.exists() {
        println!("No store found at: {}", ctx.storage.display());
        println!("Run 'keymaze info' with the watch connected to create it.");
        return Ok(());
    }

    let counts: CacheCounts = open_store(&ctx.storage)?.counts()?;

    if ctx.format == OutputFormat::Json {
        let status = serde_json::json!({
            "storage": ctx.storage.display().to_string(),
            "devices": counts.devices,
            "catalog_entries": counts.catalog_entries,
            "points": counts.points,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Store:      {}", ctx.storage.display());
    println!("Devices:    {}", counts.devices);
    println!("Activities: {}", counts.catalog_entries);
    println!("Points:     {}", counts.points);
    Ok(())
}
