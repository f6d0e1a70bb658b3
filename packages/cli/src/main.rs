#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the incident map.
//!
//! Reads the incident ledger, resolves any zip codes missing from the
//! coordinates cache, and renders the filtered incidents as an HTML map.
//! Runs with the embedded Dallas configuration unless `--config` names a
//! TOML file.
//!
//! Uses `indicatif-log-bridge` (via [`incident_map_cli_utils::init_logger`])
//! so log lines and progress bars never fight for the terminal.

mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use incident_map_cache::paths::project_root;
use incident_map_source::config::RunConfig;

use crate::pipeline::Stage;

/// Geocode incident zip codes and render them as an interactive map.
#[derive(Parser)]
#[command(name = "incident_map")]
#[command(about = "Geocode incident zip codes and render them as an interactive map")]
struct Cli {
    /// Run configuration (TOML). Defaults to the built-in Dallas config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Incident CSV to read instead of `[data].input`.
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Coordinates cache to use instead of `[data].cache`.
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Where to write the map instead of `[data].output`.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Year to map instead of `[filter].year`.
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Skip confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Geocode, aggregate and render the map (default).
    Run,
    /// Only fill the coordinates cache.
    Geocode,
    /// Delete the coordinates cache.
    ClearCache,
}

impl Cli {
    /// Loads the configuration and applies command-line overrides.
    ///
    /// Paths from the config file are relative to the project root; paths
    /// given on the command line are used as given.
    fn load_config(&self) -> Result<RunConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_path(path)?,
            None => RunConfig::embedded_default(),
        };
        config.resolve_paths(&project_root());

        if let Some(input) = &self.input {
            config.data.input.clone_from(input);
        }
        if let Some(cache) = &self.cache {
            config.data.cache.clone_from(cache);
        }
        if let Some(output) = &self.output {
            config.data.output.clone_from(output);
        }
        if let Some(year) = self.year {
            config.filter.year = year;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = incident_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = cli.load_config()?;

    log::info!("Incident map: {}", config.map_title());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => pipeline::run(&multi, &config, cli.yes, Stage::Map).await,
        Commands::Geocode => pipeline::run(&multi, &config, cli.yes, Stage::GeocodeOnly).await,
        Commands::ClearCache => pipeline::clear_cache(&multi, &config, cli.yes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run_with_embedded_config() {
        let cli = Cli::try_parse_from(["incident_map"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(!cli.yes);

        let config = cli.load_config().unwrap();
        assert_eq!(config.filter.year, 2024);
        assert!(config.data.cache.is_absolute());
        assert!(config.data.cache.ends_with("dallas_zip_coordinates.json"));
    }

    #[test]
    fn overrides_apply_after_subcommand() {
        let cli = Cli::try_parse_from([
            "incident_map",
            "geocode",
            "--year",
            "2023",
            "--cache",
            "coords.json",
            "-y",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Geocode));
        assert!(cli.yes);

        let config = cli.load_config().unwrap();
        assert_eq!(config.filter.year, 2023);
        assert_eq!(config.map_title(), "Dallas Property Crimes Map - 2023");
        assert_eq!(config.data.cache, PathBuf::from("coords.json"));
    }

    #[test]
    fn clear_cache_subcommand_parses() {
        let cli = Cli::try_parse_from(["incident_map", "clear-cache"]).unwrap();
        assert_eq!(cli.command, Some(Commands::ClearCache));
    }
}
