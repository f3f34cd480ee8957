use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "geotrack-cli", version, about = "Geotrack CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracking service in the foreground until Ctrl-C
    Run {
        /// Origin latitude for the simulated provider
        #[arg(long, default_value_t = 40.4168)]
        latitude: f64,
        /// Origin longitude for the simulated provider
        #[arg(long, default_value_t = -3.7038)]
        longitude: f64,
    },
    /// Tracking status from the persisted record
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Last recorded location
    Last {
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            latitude,
            longitude,
        } => commands::track::run(latitude, longitude),
        Commands::Status { json } => commands::query::status(json),
        Commands::Last { json } => commands::query::last(json),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
