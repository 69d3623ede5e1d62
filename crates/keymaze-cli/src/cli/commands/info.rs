//! Owner information command

use crate::cli::{Context, OutputFormat};
use crate::error::Result;

/// Show the device and owner information
pub fn show(ctx: &Context) -> Result<()> {
    let mut cache = ctx.open_cache()?;
    let info = cache.get_information()?;

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let id = &info.identity;
    println!(" Device:   {}", id.name);
    println!(" Owner:    {}", id.user);
    println!(" S/N:      {}", id.serial_number);
    println!(" Gender:   {}", id.gender);
    println!(" Age:      {}", id.age);
    println!(" Weight:   {} kg", id.weight);
    println!(" Height:   {} cm", id.height);
    println!(
        " Birthday: {}",
        id.birthday
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    Ok(())
}
