//! Serial port listing

use crate::cli::{Context, OutputFormat};
use crate::device::available_ports;
use crate::error::Result;

/// List the serial ports the watch cable may be attached to
pub fn list(ctx: &Context) -> Result<()> {
    let ports = available_ports()?;

    if ctx.format == OutputFormat::Json {
        let json: Vec<_> = ports
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "type": p.kind,
                    "description": p.description,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("{:<30} {:<10} {}", "Port", "Type", "Description");
    println!("{}", "-".repeat(60));
    for port in &ports {
        println!(
            "{:<30} {:<10} {}",
            port.name,
            port.kind,
            port.description.as_deref().unwrap_or("-")
        );
    }

    println!("\nTotal: {} port(s)", ports.len());
    Ok(())
}
