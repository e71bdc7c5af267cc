//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "JSON, CSV and LaTeX export of unbalance summaries."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    convert::{Column, PhysicalQuantity},
    errors::Result,
    model::{Cell, Quantity},
    UnbalanceSummary,
};

fn default_true() -> bool {
    true
}

fn default_decimals() -> usize {
    2
}

fn default_decimal_separator() -> char {
    ','
}

fn default_secondary_offsets() -> Vec<usize> {
    vec![2]
}

/// Which artifacts to write and how to render numbers in the LaTeX table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_true")]
    pub json: bool,
    #[serde(default = "default_true")]
    pub csv: bool,
    #[serde(default = "default_true")]
    pub latex: bool,
    #[serde(default = "default_decimals")]
    pub decimals: usize,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    /// Rows above the critical row that get secondary emphasis.
    #[serde(default = "default_secondary_offsets")]
    pub secondary_offsets: Vec<usize>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            json: true,
            csv: true,
            latex: true,
            decimals: default_decimals(),
            decimal_separator: default_decimal_separator(),
            secondary_offsets: default_secondary_offsets(),
        }
    }
}

#[derive(Debug)]
pub struct ReportExporter<'a> {
    summary: &'a UnbalanceSummary,
    settings: &'a ExportSettings,
}

impl<'a> ReportExporter<'a> {
    pub fn new(summary: &'a UnbalanceSummary, settings: &'a ExportSettings) -> Self {
        Self { summary, settings }
    }

    /// Writes the enabled artifacts and returns their paths.
    pub fn export_all(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let stem = format!("{}_unbalance", self.summary.topology.key());
        let mut written = Vec::new();

        if self.settings.json {
            let timestamp = self.summary.timestamp.to_rfc3339();
            let envelope = ReportEnvelope {
                timestamp: &timestamp,
                topology: self.summary.topology.key(),
                schema: summary_schema(),
                data: self.summary,
            };
            let path = output_dir.join(format!("{stem}.json"));
            write_json(&path, &envelope)?;
            written.push(path);
        }
        if self.settings.csv {
            let path = output_dir.join(format!("{stem}.csv"));
            self.write_csv(&path)?;
            written.push(path);
        }
        if self.settings.latex {
            let path = output_dir.join(format!("{stem}.tex"));
            fs::write(&path, self.render_latex())?;
            written.push(path);
        }

        info!("Reports exported to {}", output_dir.display());
        Ok(written)
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let table = &self.summary.physical;
        let columns = table.columns();
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![table.fault_kind.symbol().to_string()];
        header.extend(columns.iter().map(ToString::to_string));
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![row.index.label()];
            record.extend(
                columns
                    .iter()
                    .map(|column| {
                        row.get(*column)
                            .map(|cell| cell.to_string())
                            .unwrap_or_default()
                    }),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Booktabs `tabular` body; needs `booktabs` and `xcolor` in the preamble.
    pub fn render_latex(&self) -> String {
        let table = &self.summary.physical;
        let columns = table.columns();
        let critical = self.summary.critical.as_ref().map(|row| row.position);
        let secondary = self
            .summary
            .critical
            .as_ref()
            .map(|row| row.offset_positions(&self.settings.secondary_offsets))
            .unwrap_or_default();

        let mut out = String::new();
        out.push_str(&format!("\\begin{{tabular}}{{r{}}}\n", "r".repeat(columns.len())));
        out.push_str("\\toprule\n");
        let mut header = vec![format!("${}$", table.fault_kind.symbol())];
        header.extend(columns.iter().map(|column| latex_header(*column)));
        out.push_str(&header.join(" & "));
        out.push_str(" \\\\\n\\midrule\n");

        for (position, row) in table.rows.iter().enumerate() {
            let color = if Some(position) == critical {
                Some("red")
            } else if secondary.contains(&position) {
                Some("blue")
            } else {
                None
            };
            let mut cells = vec![row.index.label()];
            cells.extend(columns.iter().map(|column| match row.get(*column) {
                Some(cell) => self.format_cell(*column, cell),
                None => String::new(),
            }));
            let line: Vec<String> = match color {
                Some(color) => cells
                    .into_iter()
                    .map(|cell| format!("\\textcolor{{{color}}}{{{cell}}}"))
                    .collect(),
                None => cells,
            };
            out.push_str(&line.join(" & "));
            out.push_str(" \\\\\n");
        }

        out.push_str("\\bottomrule\n\\end{tabular}\n");
        out
    }

    fn format_cell(&self, column: Column, cell: Cell) -> String {
        match cell {
            Cell::ShortCircuit => "SC".to_string(),
            Cell::Value(value) => {
                let (scale, _) = display_unit(column);
                let text = format!("{:.*}", self.settings.decimals, value * scale);
                if self.settings.decimal_separator == '.' {
                    text
                } else {
                    text.replace('.', &self.settings.decimal_separator.to_string())
                }
            }
        }
    }
}

/// Scale and unit label used when a column is shown in a report.
fn display_unit(column: Column) -> (f64, &'static str) {
    match column {
        Column::PerUnit(_) | Column::Physical(PhysicalQuantity::RatedUnitVoltage) => (1.0, "p.u."),
        Column::Physical(
            PhysicalQuantity::PhaseCapacitance
            | PhysicalQuantity::UnitCapacitance
            | PhysicalQuantity::LegCapacitance,
        ) => (1e6, "$\\mu$F"),
        Column::Physical(PhysicalQuantity::NeutralVoltage) => (1.0, "V"),
        Column::Physical(
            PhysicalQuantity::PhaseVoltage
            | PhysicalQuantity::TapVoltage
            | PhysicalQuantity::UnitVoltage,
        ) => (1e-3, "kV"),
        Column::Physical(
            PhysicalQuantity::NeutralCurrent
            | PhysicalQuantity::GroundCurrent
            | PhysicalQuantity::PhaseCurrent
            | PhysicalQuantity::BridgeCurrent,
        ) => (1.0, "A"),
    }
}

fn latex_header(column: Column) -> String {
    let symbol = match column {
        Column::PerUnit(quantity) => quantity_symbol(quantity),
        Column::Physical(PhysicalQuantity::RatedUnitVoltage) => "V_{cu2}".to_string(),
        Column::Physical(physical) => {
            let name = physical.to_string();
            let base = name.split('_').next().unwrap_or(&name).to_string();
            base.parse::<Quantity>()
                .map(quantity_symbol)
                .unwrap_or(base)
        }
    };
    let (_, unit) = display_unit(column);
    format!("${symbol}$ ({unit})")
}

/// `Vcu` becomes `V_{cu}`.
fn quantity_symbol(quantity: Quantity) -> String {
    let name = quantity.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(head) if name.len() > 1 => format!("{head}_{{{}}}", chars.as_str()),
        _ => name,
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    topology: &'a str,
    schema: serde_json::Value,
    data: &'a T,
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn summary_schema() -> serde_json::Value {
    let cell = json!({"oneOf": [{"type": "number"}, {"const": "SC"}]});
    let index = json!({"oneOf": [{"type": "integer", "minimum": 0}, {"const": "SU"}]});
    let table = json!({
        "type": "object",
        "properties": {
            "topology": {"type": "string"},
            "grounding": {"enum": [0, 1]},
            "fault_kind": {"enum": ["failed_elements", "failed_units"]},
            "rows": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": index,
                        "values": {"type": "object", "additionalProperties": cell}
                    },
                    "required": ["index", "values"]
                }
            }
        },
        "required": ["topology", "grounding", "fault_kind", "rows"]
    });
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "UnbalanceSummary",
        "type": "object",
        "properties": {
            "timestamp": {"type": "string", "format": "date-time"},
            "study": {"type": ["string", "null"]},
            "topology": {"type": "string"},
            "grounding": {"enum": [0, 1]},
            "basis": {"type": "object"},
            "warnings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "rule": {"type": "string"},
                        "detail": {"type": "string"}
                    },
                    "required": ["rule", "detail"]
                }
            },
            "per_unit": table.clone(),
            "physical": table,
            "critical": {
                "type": ["object", "null"],
                "properties": {
                    "index": index,
                    "position": {"type": "integer", "minimum": 0},
                    "ratio": {"type": "number"},
                    "source": {"type": "string"}
                }
            }
        },
        "required": ["timestamp", "topology", "grounding", "basis", "per_unit", "physical"],
    })
}
