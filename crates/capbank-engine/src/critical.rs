//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Critical-row detection on converted unbalance tables."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use serde::{Deserialize, Serialize};

use crate::{
    convert::{Column, PhysicalQuantity, PhysicalTable},
    model::{FaultIndex, Quantity},
};

fn default_max_ratio() -> f64 {
    1.10
}

/// Highest unit-voltage ratio a bank may carry before the row is out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalRowPolicy {
    #[serde(default = "default_max_ratio")]
    pub max_ratio: f64,
}

impl Default for CriticalRowPolicy {
    fn default() -> Self {
        Self {
            max_ratio: default_max_ratio(),
        }
    }
}

/// The most severe row still within the allowed unit voltage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalRow {
    pub index: FaultIndex,
    /// Row position in sweep order.
    pub position: usize,
    pub ratio: f64,
    pub source: Column,
}

impl CriticalRowPolicy {
    /// Ratio column used for the search: `Vcu2` when the bank has a rating, else per-unit `Vcu`.
    pub fn source_column(table: &PhysicalTable) -> Column {
        let rated = Column::Physical(PhysicalQuantity::RatedUnitVoltage);
        if table.has_column(rated) {
            rated
        } else {
            Column::PerUnit(Quantity::Vcu)
        }
    }

    /// Largest ratio not above `max_ratio`; the earliest row wins a tie.
    pub fn locate(&self, table: &PhysicalTable) -> Option<CriticalRow> {
        let source = Self::source_column(table);
        let mut best: Option<CriticalRow> = None;
        for (position, row) in table.rows.iter().enumerate() {
            let Some(ratio) = row.value(source) else {
                continue;
            };
            if !ratio.is_finite() || ratio > self.max_ratio {
                continue;
            }
            if best.as_ref().map_or(true, |current| ratio > current.ratio) {
                best = Some(CriticalRow {
                    index: row.index,
                    position,
                    ratio,
                    source,
                });
            }
        }
        best
    }
}

impl CriticalRow {
    /// Up to `lookback` rows immediately before the critical row, oldest first.
    pub fn predecessors(&self, table: &PhysicalTable, lookback: usize) -> Vec<FaultIndex> {
        let end = self.position.min(table.rows.len());
        let start = end.saturating_sub(lookback);
        table.rows[start..end]
            .iter()
            .map(|row| row.index)
            .collect()
    }

    /// Positions `offset` rows above the critical row, skipping offsets past the top.
    pub fn offset_positions(&self, offsets: &[usize]) -> Vec<usize> {
        offsets
            .iter()
            .filter(|offset| **offset > 0)
            .filter_map(|offset| self.position.checked_sub(*offset))
            .collect()
    }
}
