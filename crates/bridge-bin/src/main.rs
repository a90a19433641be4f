//! Telemetry Bridge - buffers InsightCore events locally and forwards them to a remote sink.

mod app;

use std::path::PathBuf;

use bridge_config_and_utils::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};
use event_structurer::DEFAULT_CONTEXT;

/// Telemetry bridge command-line interface.
#[derive(Parser)]
#[command(name = "telemetry-bridge")]
#[command(about = "Store-and-forward bridge for telemetry events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for the queue, audit log and config. Defaults to ~/.telemetry-bridge
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Delivery endpoint. Overrides the config file and BRIDGE_ENDPOINT_URL.
    #[arg(long, global = true)]
    endpoint_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the delivery loop until interrupted
    Run,
    /// Drain the queue once and exit
    Drain,
    /// Enqueue one JSON object
    Enqueue {
        /// Packet as a JSON object
        payload: String,

        /// Structure the payload as raw insight data with this event type
        #[arg(long)]
        event_type: Option<String>,

        /// Context for structured events
        #[arg(long, default_value = DEFAULT_CONTEXT)]
        context: String,
    },
    /// Produce simulated task events, then drain them
    Simulate {
        /// Number of events to produce
        #[arg(short, long, default_value_t = 12)]
        events: u32,
    },
    /// Show queue depth and the oldest pending record
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(url) = cli.endpoint_url {
        config.endpoint_url = url;
    }
    config.validate()?;

    init_logging(&config.log_level, Some(&paths.log_file()));

    match cli.command {
        Some(Commands::Run) | None => app::run_service(&config, &paths).await?,
        Some(Commands::Drain) => app::drain_once(&config, &paths).await?,
        Some(Commands::Enqueue {
            payload,
            event_type,
            context,
        }) => app::enqueue(&config, &paths, &payload, event_type.as_deref(), &context).await?,
        Some(Commands::Simulate { events }) => app::simulate(&config, &paths, events).await?,
        Some(Commands::Status) => app::status(&config, &paths).await?,
    }

    Ok(())
}
