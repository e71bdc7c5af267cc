//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Per-unit to SI conversion of unbalance tables."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use strum::{Display, EnumIter};

use crate::{
    basis::Basis,
    model::{Cell, FaultIndex, FaultKind, Grounding, Quantity, Topology, UnbalanceTable},
};

/// Column derived from a per-unit quantity and a basis value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PhysicalQuantity {
    #[strum(serialize = "Cp_F")]
    PhaseCapacitance,
    #[strum(serialize = "Cu_F")]
    UnitCapacitance,
    #[strum(serialize = "Chn_F")]
    LegCapacitance,
    #[strum(serialize = "Vng_V")]
    NeutralVoltage,
    #[strum(serialize = "Vln_V")]
    PhaseVoltage,
    #[strum(serialize = "Vhn_V")]
    TapVoltage,
    #[strum(serialize = "Vcu_V")]
    UnitVoltage,
    /// Unit voltage relative to the unit's rated voltage.
    #[strum(serialize = "Vcu2")]
    RatedUnitVoltage,
    #[strum(serialize = "In_A")]
    NeutralCurrent,
    #[strum(serialize = "Ig_A")]
    GroundCurrent,
    #[strum(serialize = "Iph_A")]
    PhaseCurrent,
    #[strum(serialize = "Ih_A")]
    BridgeCurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    PerUnit(Quantity),
    Physical(PhysicalQuantity),
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::PerUnit(quantity) => write!(f, "{quantity}"),
            Column::Physical(quantity) => write!(f, "{quantity}"),
        }
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalRow {
    pub index: FaultIndex,
    pub values: IndexMap<Column, Cell>,
}

impl PhysicalRow {
    pub fn get(&self, column: Column) -> Option<Cell> {
        self.values.get(&column).copied()
    }

    pub fn value(&self, column: Column) -> Option<f64> {
        self.get(column).and_then(|cell| cell.value())
    }
}

/// Per-unit columns with their SI counterparts; row order of the source table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalTable {
    pub topology: Topology,
    pub grounding: Grounding,
    pub fault_kind: FaultKind,
    pub rows: Vec<PhysicalRow>,
}

impl PhysicalTable {
    pub fn indices(&self) -> Vec<FaultIndex> {
        self.rows.iter().map(|row| row.index).collect()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.rows.iter().any(|row| row.values.contains_key(&column))
    }

    /// Column order of the first row, extended by columns that only appear later.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = Vec::new();
        for row in &self.rows {
            for column in row.values.keys() {
                if !columns.contains(column) {
                    columns.push(*column);
                }
            }
        }
        columns
    }
}

/// Rescales per-unit columns by the matching [`Basis`] quantity.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter<'a> {
    basis: &'a Basis,
}

impl<'a> UnitConverter<'a> {
    pub fn new(basis: &'a Basis) -> Self {
        Self { basis }
    }

    pub fn convert(&self, table: &UnbalanceTable) -> PhysicalTable {
        PhysicalTable {
            topology: table.topology,
            grounding: table.grounding,
            fault_kind: table.fault_kind,
            rows: table
                .rows
                .iter()
                .map(|row| PhysicalRow {
                    index: row.index,
                    values: self.expand(
                        row.values
                            .iter()
                            .map(|(quantity, cell)| (Column::PerUnit(*quantity), *cell)),
                    ),
                })
                .collect(),
        }
    }

    /// Rebuilds every physical column of an already converted table.
    pub fn apply(&self, table: &PhysicalTable) -> PhysicalTable {
        PhysicalTable {
            topology: table.topology,
            grounding: table.grounding,
            fault_kind: table.fault_kind,
            rows: table
                .rows
                .iter()
                .map(|row| PhysicalRow {
                    index: row.index,
                    values: self.expand(
                        row.values
                            .iter()
                            .filter(|(column, _)| matches!(column, Column::PerUnit(_)))
                            .map(|(column, cell)| (*column, *cell)),
                    ),
                })
                .collect(),
        }
    }

    fn expand(&self, cells: impl Iterator<Item = (Column, Cell)>) -> IndexMap<Column, Cell> {
        let mut values = IndexMap::new();
        for (column, cell) in cells {
            values.insert(column, cell);
            if let Column::PerUnit(quantity) = column {
                for (physical, scale) in self.scales(quantity) {
                    values.insert(Column::Physical(physical), cell.map(|v| v * scale));
                }
            }
        }
        values
    }

    /// Physical columns derived from `quantity` with their scale factors.
    pub fn scales(&self, quantity: Quantity) -> Vec<(PhysicalQuantity, f64)> {
        let b = self.basis;
        let leg = b.leg;
        match quantity {
            Quantity::Cp => vec![(PhysicalQuantity::PhaseCapacitance, b.phase_capacitance_f)],
            Quantity::Cu => vec![(PhysicalQuantity::UnitCapacitance, b.unit_capacitance_f)],
            Quantity::Chn => leg
                .map(|leg| (PhysicalQuantity::LegCapacitance, leg.capacitance_f))
                .into_iter()
                .collect(),
            Quantity::Vng => vec![(PhysicalQuantity::NeutralVoltage, b.phase_voltage_v)],
            Quantity::Vln => vec![(PhysicalQuantity::PhaseVoltage, b.phase_voltage_v)],
            Quantity::Vhn => leg
                .map(|leg| (PhysicalQuantity::TapVoltage, leg.voltage_v))
                .into_iter()
                .collect(),
            Quantity::Vcu => std::iter::once((PhysicalQuantity::UnitVoltage, b.unit_voltage_v))
                .chain(
                    b.rated_voltage_ratio()
                        .map(|ratio| (PhysicalQuantity::RatedUnitVoltage, ratio)),
                )
                .collect(),
            Quantity::In => vec![(PhysicalQuantity::NeutralCurrent, b.bank_current_a)],
            Quantity::Ig => vec![(PhysicalQuantity::GroundCurrent, b.bank_current_a)],
            Quantity::Iph => vec![(PhysicalQuantity::PhaseCurrent, b.bank_current_a)],
            Quantity::Ih => vec![(PhysicalQuantity::BridgeCurrent, b.bank_current_a)],
            _ => Vec::new(),
        }
    }
}
