//! ---
//! cb_section: "04-cli"
//! cb_subsection: "binary"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Single-bank sweeps and configured study runs."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use capbank_config::{AppConfig, LoadedAppConfig};
use capbank_engine::{
    analyze_bank, analyze_bank_with_export,
    io::parse_fault_indices,
    model::{Cell, Grounding, Topology},
    AnalysisOptions, UnbalanceRequest, UnbalanceSummary,
};
use capbank_logging::{log_system_event, LogContext, SystemEventOutcome};
use clap::Args;

use crate::inspect::resolve_nameplate;

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[arg(long, value_name = "TOPOLOGY")]
    pub topology: Topology,
    /// Nameplate file (YAML or JSON). The topology preset is used when omitted.
    #[arg(long, value_name = "FILE")]
    pub nameplate: Option<PathBuf>,
    /// Override the nameplate grounding flag (0 grounded, 1 ungrounded).
    #[arg(long, value_name = "G", value_parser = clap::value_parser!(u8).range(0..=1))]
    pub grounding: Option<u8>,
    /// Comma separated fault indices, e.g. `0,2,5` or `0,3,SU`.
    #[arg(long, value_name = "LIST")]
    pub indices: Option<String>,
    /// Append the all-units-blown row (external-fuse H-bridge only).
    #[arg(long)]
    pub sentinel: bool,
    /// Report directory (defaults to the configured export directory).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Print the table without writing reports.
    #[arg(long)]
    pub no_export: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run only the named study.
    #[arg(long, value_name = "NAME")]
    pub study: Option<String>,
}

pub fn sweep(args: SweepArgs, loaded: Option<&LoadedAppConfig>) -> Result<()> {
    let config = loaded.map(|loaded| &loaded.config);
    let options = config
        .map(AppConfig::analysis_options)
        .unwrap_or_default();

    let mut nameplate = resolve_nameplate(args.topology, args.nameplate.as_ref())?;
    if let Some(flag) = args.grounding {
        let grounding = Grounding::try_from(flag).map_err(|err| anyhow!(err))?;
        nameplate = nameplate.with_grounding(grounding);
    }
    let mut request = UnbalanceRequest::new(args.topology, nameplate).with_sentinel(args.sentinel);
    if let Some(list) = &args.indices {
        request = request.with_fault_indices(parse_fault_indices(
            args.topology.fault_kind(),
            list,
        )?);
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        config
            .map(|config| config.export.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("reports"))
    });
    let export_dir = (!args.no_export).then_some(output_dir.as_path());
    execute(&request, &options, export_dir)
}

pub fn run(args: RunArgs, loaded: Option<&LoadedAppConfig>) -> Result<()> {
    let loaded = loaded.ok_or_else(|| {
        anyhow!(
            "`run` needs a configuration file (--config or {})",
            AppConfig::ENV_CONFIG_PATH
        )
    })?;
    let config = &loaded.config;
    let options = config.analysis_options();

    let selected: Vec<_> = match &args.study {
        Some(name) => {
            let study = config
                .study(name)
                .ok_or_else(|| anyhow!("study '{name}' is not configured"))?;
            vec![(name.clone(), study)]
        }
        None => config
            .studies
            .iter()
            .map(|(name, study)| (name.clone(), study))
            .collect(),
    };
    if selected.is_empty() {
        println!("no studies configured in {}", loaded.source.display());
        return Ok(());
    }

    for (name, study) in selected {
        if let Some(description) = &study.description {
            println!("## {name}: {description}");
        }
        let request = study.request(&name, loaded.base_dir())?;
        let output_dir = study.output_dir(&name, &config.export);
        execute(&request, &options, Some(&output_dir))?;
    }
    Ok(())
}

fn execute(
    request: &UnbalanceRequest,
    options: &AnalysisOptions,
    export_dir: Option<&Path>,
) -> Result<()> {
    let ctx = LogContext::new(request.topology.key(), request.nameplate.grounding.flag())
        .with_study(request.study.as_deref());

    let outcome = match export_dir {
        Some(dir) => analyze_bank_with_export(request, options, Some(dir)),
        None => analyze_bank(request, options),
    };
    match outcome {
        Ok(summary) => {
            print_summary(&summary);
            if let Some(dir) = export_dir {
                println!("reports written to {}", dir.display());
            }
            log_system_event(
                &ctx,
                "study.sweep",
                "sweep completed",
                SystemEventOutcome::Success,
            );
            Ok(())
        }
        Err(err) => {
            log_system_event(
                &ctx,
                "study.sweep",
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
            Err(err.into())
        }
    }
}

fn print_summary(summary: &UnbalanceSummary) {
    let table = &summary.per_unit;
    let title = summary.study.as_deref().unwrap_or(summary.topology.label());
    println!("# {title} ({}, {})", summary.topology.key(), summary.grounding);
    for warning in &summary.warnings {
        println!("warning: {warning}");
    }

    let Some(first) = table.rows.first() else {
        return;
    };
    let mut header = format!("{:>4}", table.fault_kind.symbol());
    for quantity in first.values.keys() {
        header.push_str(&format!(" {:>9}", quantity.to_string()));
    }
    println!("{header}");

    for row in &table.rows {
        let mut line = format!("{:>4}", row.index.label());
        for cell in row.values.values() {
            let rendered = match cell {
                Cell::Value(value) => format!("{value:.4}"),
                Cell::ShortCircuit => "SC".to_string(),
            };
            line.push_str(&format!(" {rendered:>9}"));
        }
        if summary
            .critical
            .as_ref()
            .is_some_and(|critical| critical.index == row.index)
        {
            line.push_str("  <- critical");
        }
        println!("{line}");
    }

    match &summary.critical {
        Some(critical) => println!(
            "critical row: {} (ratio {:.4}, from {})",
            critical.index, critical.ratio, critical.source
        ),
        None => println!("critical row: none within the unit-voltage limit"),
    }
}
