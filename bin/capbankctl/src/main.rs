//! ---
//! cb_section: "04-cli"
//! cb_subsection: "binary"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Operator CLI for capacitor-bank unbalance studies."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use capbank_config::{init_tracing, AppConfig, LoadedAppConfig};
use capbank_logging as logging;
use clap::{Parser, Subcommand};

mod inspect;
mod study;

const SERVICE_NAME: &str = "capbankctl";
const CONFIG_CANDIDATES: [&str; 2] = ["capbank.toml", "configs/capbank.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Capacitor bank unbalance study utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (falls back to CAPBANK_CONFIG, ./capbank.toml, ./configs/capbank.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the supported protection topologies.
    Topologies,
    /// Print the reference nameplate of a topology.
    Preset(inspect::PresetArgs),
    /// Check a nameplate arrangement against its topology's constraints.
    Validate(inspect::ValidateArgs),
    /// Sweep one bank and export its reports.
    Sweep(study::SweepArgs),
    /// Sweep every study of the configuration file.
    Run(study::RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_ref())?;
    // Held until `main` returns so the log file is flushed.
    let _tracing = match &loaded {
        Some(loaded) => Some(init_tracing(SERVICE_NAME, &loaded.config.logging)?),
        None => {
            logging::init();
            None
        }
    };

    match cli.command {
        Commands::Topologies => inspect::topologies(),
        Commands::Preset(args) => inspect::preset(args)?,
        Commands::Validate(args) => inspect::validate(args)?,
        Commands::Sweep(args) => study::sweep(args, loaded.as_ref())?,
        Commands::Run(args) => study::run(args, loaded.as_ref())?,
    }
    Ok(())
}

/// An explicit `--config` must load; the default locations are optional.
fn load_config(explicit: Option<&PathBuf>) -> Result<Option<LoadedAppConfig>> {
    if let Some(path) = explicit {
        let config = AppConfig::from_path(path)?;
        return Ok(Some(LoadedAppConfig {
            config,
            source: path.clone(),
        }));
    }
    let env_set = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    let any_candidate = CONFIG_CANDIDATES
        .iter()
        .any(|candidate| PathBuf::from(candidate).exists());
    if env_set || any_candidate {
        AppConfig::load_with_source(&CONFIG_CANDIDATES).map(Some)
    } else {
        Ok(None)
    }
}
