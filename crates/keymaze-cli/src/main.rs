use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keymaze_cli::cli::commands::{self, TrackOptions, TrackSelection};
use keymaze_cli::cli::{Context, OutputFormat};
use keymaze_cli::config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keymaze")]
#[command(author, version, about = "Communicate with Keymaze 500/700 GPS watches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Serial port name
    #[arg(short, long, global = true, env = "KEYMAZE_PORT")]
    port: Option<String>,

    /// Path of the data store
    #[arg(short, long, global = true, env = "KEYMAZE_STORAGE")]
    storage: Option<PathBuf>,

    /// Use cached information only
    #[arg(short, long, global = true)]
    offline: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show owner information
    Info,
    /// Show the activity catalog
    Catalog,
    /// Load all new tracks from the device
    Sync,
    /// Show the data store contents
    Status,
    /// List serial ports
    Ports,
    /// Retrieve the points of a track
    Track {
        /// Track number as shown in the catalog, or "all"
        track: String,
        /// Export to GPX, output file name
        #[arg(short = 'x', long)]
        gpx: Option<PathBuf>,
        /// Trim the track, start[,end] with [+-][hh:][mm:]ss
        #[arg(short = 'T', long, allow_hyphen_values = true)]
        trim: Option<String>,
        /// Drop points turning by less than this many degrees
        #[arg(short, long, default_value = "0")]
        angle: f64,
        /// Offset added to elevations on export (meters)
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        zoffset: i32,
    },
}

fn init_tracing(verbosity: u8) {
    let mut filter = EnvFilter::from_default_env();

    // Only apply defaults if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        if let Ok(directive) = level.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> keymaze_cli::Result<()> {
    let storage = match cli.storage {
        Some(path) => path,
        None => config::default_storage_path()?,
    };
    let ctx = Context {
        port: cli
            .port
            .unwrap_or_else(|| config::default_port().to_string()),
        storage,
        offline: cli.offline,
        format: cli.format,
    };

    match cli.command {
        Commands::Info => commands::show_info(&ctx),
        Commands::Catalog => commands::show_catalog(&ctx),
        Commands::Sync => commands::sync_run(&ctx),
        Commands::Status => commands::sync_status(&ctx),
        Commands::Ports => commands::list_ports(&ctx),
        Commands::Track {
            track,
            gpx,
            trim,
            angle,
            zoffset,
        } => {
            let selection: TrackSelection = track.parse()?;
            let opts = TrackOptions {
                gpx,
                trim,
                angle,
                zoffset,
            };
            commands::recover_track(&ctx, selection, &opts)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", keymaze_cli::error::format_user_error(&e));
        std::process::exit(1);
    }
}
