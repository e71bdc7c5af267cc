//! ---
//! cb_section: "04-cli"
//! cb_subsection: "binary"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Topology listing, preset printing and arrangement validation."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use capbank_engine::{
    io::load_nameplate_from_file,
    model::{BankNameplate, Topology},
    presets, validation,
};
use capbank_logging::{log_system_event, LogContext, SystemEventOutcome};
use clap::{Args, ValueEnum};
use strum::IntoEnumIterator;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug, Args)]
pub struct PresetArgs {
    /// Topology key, e.g. `yy_internal_fuses`.
    #[arg(long, value_name = "TOPOLOGY")]
    pub topology: Topology,
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, value_name = "TOPOLOGY")]
    pub topology: Topology,
    /// Nameplate file (YAML or JSON). The topology preset is used when omitted.
    #[arg(long, value_name = "FILE")]
    pub nameplate: Option<PathBuf>,
}

pub fn topologies() {
    println!("{:<26} {:<28} {:<6} PARAMETERS", "KEY", "LABEL", "INDEX");
    for topology in Topology::iter() {
        let parameters = topology
            .required_parameters()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<26} {:<28} {:<6} {}",
            topology.key(),
            topology.label(),
            topology.fault_kind().symbol(),
            parameters
        );
    }
}

pub fn preset(args: PresetArgs) -> Result<()> {
    let nameplate = presets::preset(args.topology);
    let rendered = match args.format {
        OutputFormat::Yaml => serde_yaml::to_string(&nameplate)?,
        OutputFormat::Json => serde_json::to_string_pretty(&nameplate)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let nameplate = resolve_nameplate(args.topology, args.nameplate.as_ref())?;
    let report = validation::validate(args.topology, &nameplate.arrangement);
    let ctx = LogContext::new(args.topology.key(), nameplate.grounding.flag());

    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    if report.is_valid() {
        println!("{}: arrangement is valid", args.topology.key());
        log_system_event(
            &ctx,
            "arrangement.validate",
            "arrangement accepted",
            SystemEventOutcome::Success,
        );
        return Ok(());
    }

    for error in &report.errors {
        println!("error: {error}");
    }
    log_system_event(
        &ctx,
        "arrangement.validate",
        "arrangement rejected",
        SystemEventOutcome::Fault,
    );
    Err(anyhow!(
        "{} violates {} constraint(s)",
        args.topology.key(),
        report.errors.len()
    ))
}

pub fn resolve_nameplate(topology: Topology, path: Option<&PathBuf>) -> Result<BankNameplate> {
    match path {
        Some(path) => load_nameplate_from_file(path)
            .with_context(|| format!("unable to load nameplate {}", path.display())),
        None => Ok(presets::preset(topology)),
    }
}
