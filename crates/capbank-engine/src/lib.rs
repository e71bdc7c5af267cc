//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Capacitor-bank unbalance engine: validation, bases, sweeps, conversion and export."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
pub mod basis;
pub mod convert;
pub mod critical;
pub mod errors;
pub mod export;
pub mod io;
pub mod model;
pub mod models;
pub mod presets;
pub mod sweep;
pub mod validation;

use std::path::Path;

use capbank_logging::{cb_info, cb_warn, LogContext};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    basis::Basis,
    convert::{PhysicalTable, UnitConverter},
    critical::{CriticalRow, CriticalRowPolicy},
    export::{ExportSettings, ReportExporter},
    model::{BankNameplate, FaultIndex, Grounding, Topology, UnbalanceTable},
    models::build_model,
    sweep::{FaultDomain, SweepEngine},
    validation::ConstraintWarning,
};

pub use errors::{Result, UnbalanceError};

/// One bank to analyse.
#[derive(Debug, Clone)]
pub struct UnbalanceRequest {
    pub study: Option<String>,
    pub topology: Topology,
    pub nameplate: BankNameplate,
    /// Explicit indices; `None` sweeps the model's default domain.
    pub fault_indices: Option<Vec<FaultIndex>>,
    /// Append the `SU` row to the default domain.
    pub include_sentinel: bool,
}

impl UnbalanceRequest {
    pub fn new(topology: Topology, nameplate: BankNameplate) -> Self {
        Self {
            study: None,
            topology,
            nameplate,
            fault_indices: None,
            include_sentinel: false,
        }
    }

    pub fn with_study(mut self, study: impl Into<String>) -> Self {
        self.study = Some(study.into());
        self
    }

    pub fn with_fault_indices(mut self, indices: Vec<FaultIndex>) -> Self {
        self.fault_indices = Some(indices);
        self
    }

    pub fn with_sentinel(mut self, include: bool) -> Self {
        self.include_sentinel = include;
        self
    }

    pub fn domain(&self) -> FaultDomain {
        match (&self.fault_indices, self.include_sentinel) {
            (Some(indices), include) => {
                let mut indices = indices.clone();
                if include && !indices.contains(&FaultIndex::AllUnitsBlown) {
                    indices.push(FaultIndex::AllUnitsBlown);
                }
                FaultDomain::Explicit(indices)
            }
            (None, true) => FaultDomain::DefaultWithSentinel,
            (None, false) => FaultDomain::Default,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub critical: CriticalRowPolicy,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnbalanceSummary {
    pub timestamp: DateTime<Utc>,
    pub study: Option<String>,
    pub topology: Topology,
    pub grounding: Grounding,
    pub basis: Basis,
    pub warnings: Vec<ConstraintWarning>,
    pub per_unit: UnbalanceTable,
    pub physical: PhysicalTable,
    pub critical: Option<CriticalRow>,
}

impl UnbalanceSummary {
    pub fn exporter<'a>(&'a self, settings: &'a ExportSettings) -> ReportExporter<'a> {
        ReportExporter::new(self, settings)
    }
}

/// Validates, sweeps and converts one bank without writing any file.
pub fn analyze_bank(
    request: &UnbalanceRequest,
    options: &AnalysisOptions,
) -> Result<UnbalanceSummary> {
    let topology = request.topology;
    let nameplate = &request.nameplate;
    let grounding = nameplate.grounding;
    let ctx =
        LogContext::new(topology.key(), grounding.flag()).with_study(request.study.as_deref());

    cb_info!(context = ctx, "Validating {} arrangement...", topology.key());
    let warnings = validation::validate(topology, &nameplate.arrangement).into_result()?;
    for warning in &warnings {
        cb_warn!(context = ctx, "topology advisory: {warning}");
    }

    cb_info!(context = ctx, "Deriving bank bases...");
    let basis = Basis::from_nameplate(nameplate)?;

    cb_info!(
        context = ctx,
        "Sweeping {} fault domain...",
        topology.fault_kind().symbol()
    );
    let model = build_model(topology, nameplate)?;
    let mut engine = SweepEngine::new(model.as_ref());
    if let Some(study) = request.study.as_deref() {
        engine = engine.with_study(study);
    }
    let per_unit = engine.run(grounding, &request.domain())?;

    cb_info!(
        context = ctx,
        "Converting {} rows to SI units...",
        per_unit.len()
    );
    let physical = UnitConverter::new(&basis).convert(&per_unit);
    let critical = options.critical.locate(&physical);
    match &critical {
        Some(row) => cb_info!(
            context = ctx,
            "Critical row at {} (ratio {:.4} <= {:.2})",
            row.index, row.ratio, options.critical.max_ratio
        ),
        None => cb_info!(
            context = ctx,
            "No row within the {:.2} unit-voltage limit",
            options.critical.max_ratio
        ),
    }

    Ok(UnbalanceSummary {
        timestamp: Utc::now(),
        study: request.study.clone(),
        topology,
        grounding,
        basis,
        warnings,
        per_unit,
        physical,
        critical,
    })
}

/// Runs [`analyze_bank`] and exports the reports.
/// When `output_dir` is `None`, the default `reports/` directory is used.
pub fn analyze_bank_with_export(
    request: &UnbalanceRequest,
    options: &AnalysisOptions,
    output_dir: Option<&Path>,
) -> Result<UnbalanceSummary> {
    let summary = analyze_bank(request, options)?;
    let default_dir = Path::new("reports");
    let output_dir = output_dir.unwrap_or(default_dir);
    summary.exporter(&options.export).export_all(output_dir)?;
    Ok(summary)
}
