use std::error::Error;

use clap::Subcommand;
use geotrack_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show a single value
    Get { key: String },
    /// Set a value and persist it
    Set { key: String, value: String },
    /// Show the whole configuration
    List {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => {
                    println!("{value}");
                    Ok(())
                }
                None => Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            Ok(())
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                for key in [
                    "collector.endpoint",
                    "collector.name",
                    "provider.interval_ms",
                    "provider.min_displacement_m",
                    "require_confirmation",
                ] {
                    if let Some(value) = config.get(key) {
                        println!("{key} = {value}");
                    }
                }
            }
            Ok(())
        }
    }
}
