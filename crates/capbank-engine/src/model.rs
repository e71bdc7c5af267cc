//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Nameplate, topology and per-unit table types."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Protection topology of a three-phase shunt capacitor bank.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum Topology {
    #[serde(rename = "yy_internal_fuses")]
    #[strum(serialize = "yy_internal_fuses")]
    DoubleWyeInternalFuses,
    #[serde(rename = "y_internal_fuses")]
    #[strum(serialize = "y_internal_fuses")]
    SingleWyeInternalFuses,
    #[serde(rename = "h_bridge_internal_fuses")]
    #[strum(serialize = "h_bridge_internal_fuses")]
    HBridgeInternalFuses,
    #[serde(rename = "yy_external_fuses")]
    #[strum(serialize = "yy_external_fuses")]
    DoubleWyeExternalFuses,
    #[serde(rename = "h_bridge_external_fuses")]
    #[strum(serialize = "h_bridge_external_fuses")]
    HBridgeExternalFuses,
}

impl Topology {
    pub fn key(&self) -> &'static str {
        self.into()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Topology::DoubleWyeInternalFuses => "Double wye, internal fuses",
            Topology::SingleWyeInternalFuses => "Single wye, internal fuses",
            Topology::HBridgeInternalFuses => "H-bridge, internal fuses",
            Topology::DoubleWyeExternalFuses => "Double wye, external fuses",
            Topology::HBridgeExternalFuses => "H-bridge, external fuses",
        }
    }

    pub fn fault_kind(&self) -> FaultKind {
        if self.has_internal_fuses() {
            FaultKind::FailedElements
        } else {
            FaultKind::FailedUnits
        }
    }

    pub fn has_internal_fuses(&self) -> bool {
        matches!(
            self,
            Topology::DoubleWyeInternalFuses
                | Topology::SingleWyeInternalFuses
                | Topology::HBridgeInternalFuses
        )
    }

    /// Structural parameters the topology's formulas read.
    pub fn required_parameters(&self) -> &'static [Parameter] {
        use Parameter::*;
        match self {
            Topology::DoubleWyeInternalFuses | Topology::SingleWyeInternalFuses => {
                &[S, Pt, Pa, P, N, Su]
            }
            Topology::HBridgeInternalFuses => &[S, St, Pt, Pa, P, N, Su],
            Topology::DoubleWyeExternalFuses => &[S, Pt, Pa],
            Topology::HBridgeExternalFuses => &[S, St, Pt, Pa],
        }
    }
}

/// Neutral grounding flag `G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Grounding {
    /// `G = 0`, neutral solidly grounded.
    Grounded,
    /// `G = 1`, neutral isolated.
    #[default]
    Ungrounded,
}

impl Grounding {
    pub fn flag(&self) -> u8 {
        match self {
            Grounding::Grounded => 0,
            Grounding::Ungrounded => 1,
        }
    }

    pub fn factor(&self) -> f64 {
        f64::from(self.flag())
    }
}

impl TryFrom<u8> for Grounding {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Grounding::Grounded),
            1 => Ok(Grounding::Ungrounded),
            other => Err(format!(
                "grounding flag must be 0 (grounded) or 1 (ungrounded), got {other}"
            )),
        }
    }
}

impl From<Grounding> for u8 {
    fn from(value: Grounding) -> Self {
        value.flag()
    }
}

impl fmt::Display for Grounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G={}", self.flag())
    }
}

/// Structural parameter names as printed on bank drawings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Parameter {
    S,
    St,
    Pt,
    Pa,
    P,
    N,
    Su,
}

/// Series/parallel arrangement of the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Arrangement {
    /// Series groups per phase.
    #[serde(rename = "S")]
    pub s: u32,
    /// Series groups between the H-bridge tap and neutral.
    #[serde(rename = "St", default, skip_serializing_if = "Option::is_none")]
    pub st: Option<u32>,
    /// Parallel units per phase.
    #[serde(rename = "Pt")]
    pub pt: u32,
    /// Parallel units in the branch under study (left wye or left H leg).
    #[serde(rename = "Pa")]
    pub pa: u32,
    /// Parallel units in the affected group.
    #[serde(rename = "P", default, skip_serializing_if = "Option::is_none")]
    pub p: Option<u32>,
    /// Elements in parallel per cell.
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Series cells per unit.
    #[serde(rename = "Su", default, skip_serializing_if = "Option::is_none")]
    pub su: Option<u32>,
}

impl Arrangement {
    pub fn get(&self, parameter: Parameter) -> Option<u32> {
        match parameter {
            Parameter::S => Some(self.s),
            Parameter::St => self.st,
            Parameter::Pt => Some(self.pt),
            Parameter::Pa => Some(self.pa),
            Parameter::P => self.p,
            Parameter::N => self.n,
            Parameter::Su => self.su,
        }
    }
}

/// Bank nameplate and arrangement. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankNameplate {
    /// Working line-to-line voltage in volts.
    pub line_voltage_v: f64,
    /// Three-phase reactive power in VAr at the working voltage.
    pub reactive_power_var: f64,
    pub frequency_hz: f64,
    /// Line-to-line voltage rating of the bank, used for the `Vcu2` ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_voltage_v: Option<f64>,
    #[serde(rename = "G", default)]
    pub grounding: Grounding,
    #[serde(flatten)]
    pub arrangement: Arrangement,
    /// Per-unit unit capacitance used by external-fuse tables for `Iu`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cu_fixed: Option<f64>,
}

impl BankNameplate {
    /// Reactive power at the rated voltage, `Q * (V_rated / V_ll)^2`.
    pub fn rated_power_var(&self) -> Option<f64> {
        self.rated_voltage_v
            .map(|rated| self.reactive_power_var * (rated / self.line_voltage_v).powi(2))
    }

    pub fn with_grounding(mut self, grounding: Grounding) -> Self {
        self.grounding = grounding;
        self
    }
}

/// Physical meaning of the sweep index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// `f`: failed elements within one cell.
    FailedElements,
    /// `n`: failed (fuse-blown) parallel units.
    FailedUnits,
}

impl FaultKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            FaultKind::FailedElements => "f",
            FaultKind::FailedUnits => "n",
        }
    }

    pub fn index(&self, count: u32) -> FaultIndex {
        match self {
            FaultKind::FailedElements => FaultIndex::FailedElements(count),
            FaultKind::FailedUnits => FaultIndex::FailedUnits(count),
        }
    }
}

/// One point of a progressive-failure sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultIndex {
    FailedElements(u32),
    FailedUnits(u32),
    /// The `SU` row of the H-bridge external-fuse table.
    AllUnitsBlown,
}

impl FaultIndex {
    pub fn count(&self) -> Option<u32> {
        match self {
            FaultIndex::FailedElements(count) | FaultIndex::FailedUnits(count) => Some(*count),
            FaultIndex::AllUnitsBlown => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, FaultIndex::AllUnitsBlown)
    }

    /// Label used in exported tables: the bare count, or `SU`.
    pub fn label(&self) -> String {
        match self.count() {
            Some(count) => count.to_string(),
            None => "SU".to_string(),
        }
    }

    /// Sweep order: ascending count, sentinel last.
    pub fn sort_key(&self) -> u64 {
        self.count().map_or(u64::MAX, u64::from)
    }
}

impl fmt::Display for FaultIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultIndex::FailedElements(count) => write!(f, "f={count}"),
            FaultIndex::FailedUnits(count) => write!(f, "n={count}"),
            FaultIndex::AllUnitsBlown => f.write_str("SU"),
        }
    }
}

impl Serialize for FaultIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.count() {
            Some(count) => serializer.serialize_u32(count),
            None => serializer.serialize_str("SU"),
        }
    }
}

/// Per-unit quantity computed by the unbalance models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Quantity {
    /// Remaining capacitance of the faulted cell.
    Ci,
    /// Voltage across the faulted cell relative to its healthy value.
    Vg,
    /// Capacitance of the affected unit.
    Cu,
    /// Capacitance of the affected parallel group.
    Cg,
    /// Capacitance of the affected series string.
    Cs,
    /// Capacitance of the affected phase.
    Cp,
    /// Capacitance of the H-bridge leg from tap to neutral.
    Chn,
    /// Neutral-to-ground voltage shift.
    Vng,
    /// Line-to-neutral voltage of the affected phase.
    Vln,
    /// Tap-to-neutral voltage of the H-bridge.
    Vhn,
    /// Voltage on the remaining units of the affected group.
    Vcu,
    /// Voltage on the remaining elements of the affected cell.
    Ve,
    Iu,
    Ist,
    Iy,
    Iph,
    Ig,
    In,
    Ih,
}

impl Quantity {
    /// Quantities that measure a departure from balance and read 0.0 on a healthy bank.
    pub fn is_unbalance_signal(&self) -> bool {
        matches!(
            self,
            Quantity::Vng | Quantity::Ig | Quantity::In | Quantity::Ih
        )
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Table cell: a number, or the short-circuit marker of the sentinel row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Value(f64),
    ShortCircuit,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Value(value) => Some(*value),
            Cell::ShortCircuit => None,
        }
    }

    pub fn map(self, op: impl FnOnce(f64) -> f64) -> Cell {
        match self {
            Cell::Value(value) => Cell::from(op(value)),
            Cell::ShortCircuit => Cell::ShortCircuit,
        }
    }
}

impl From<f64> for Cell {
    /// Stores `-0.0` as `0.0` so balanced unbalance signals print unsigned.
    fn from(value: f64) -> Self {
        Cell::Value(value + 0.0)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(value) => write!(f, "{value}"),
            Cell::ShortCircuit => f.write_str("SC"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Value(value) => serializer.serialize_f64(*value),
            Cell::ShortCircuit => serializer.serialize_str("SC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnbalanceRow {
    pub index: FaultIndex,
    pub values: IndexMap<Quantity, Cell>,
}

impl UnbalanceRow {
    pub fn new(index: FaultIndex) -> Self {
        Self {
            index,
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, quantity: Quantity, value: impl Into<Cell>) -> Self {
        self.values.insert(quantity, value.into());
        self
    }

    pub fn get(&self, quantity: Quantity) -> Option<Cell> {
        self.values.get(&quantity).copied()
    }

    /// Numeric value of a quantity; `None` when absent or short-circuit.
    pub fn value(&self, quantity: Quantity) -> Option<f64> {
        self.get(quantity).and_then(|cell| cell.value())
    }

}

/// Rows in ascending sweep order; the order encodes fault progression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnbalanceTable {
    pub topology: Topology,
    pub grounding: Grounding,
    pub fault_kind: FaultKind,
    pub rows: Vec<UnbalanceRow>,
}

impl UnbalanceTable {
    pub fn indices(&self) -> Vec<FaultIndex> {
        self.rows.iter().map(|row| row.index).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
