//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Unbalance model capability set and shared equivalent-circuit helpers."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
//! One model per protection topology. A model is built once from an
//! [`Arrangement`] and is then a stateless map from fault index to per-unit row.
mod double_wye_external;
mod double_wye_internal;
mod h_bridge_external;
mod h_bridge_internal;
mod single_wye_internal;

pub use double_wye_external::DoubleWyeExternalFuses;
pub use double_wye_internal::DoubleWyeInternalFuses;
pub use h_bridge_external::HBridgeExternalFuses;
pub use h_bridge_internal::HBridgeInternalFuses;
pub use single_wye_internal::SingleWyeInternalFuses;

use crate::{
    errors::{Result, UnbalanceError},
    model::{
        Arrangement, BankNameplate, FaultIndex, FaultKind, Grounding, Parameter, Quantity,
        Topology, UnbalanceRow,
    },
    validation::{self, ValidationReport},
};

/// Below this magnitude a denominator is treated as zero.
const ZERO_TOLERANCE: f64 = 1e-12;

pub trait UnbalanceModel: Send + Sync {
    fn topology(&self) -> Topology;

    fn arrangement(&self) -> &Arrangement;

    /// Columns of every numeric row, in table order.
    fn columns(&self) -> &'static [Quantity];

    /// Largest fault count the formulas accept (`N` or `Pa`).
    fn max_count(&self) -> u32;

    fn compute_row(&self, index: FaultIndex, grounding: Grounding) -> Result<UnbalanceRow>;

    fn fault_kind(&self) -> FaultKind {
        self.topology().fault_kind()
    }

    fn supports_sentinel(&self) -> bool {
        false
    }

    /// `0..max_count`, excluding the fully faulted count.
    fn default_domain(&self) -> Vec<FaultIndex> {
        let kind = self.fault_kind();
        (0..self.max_count()).map(|count| kind.index(count)).collect()
    }

    fn validate(&self) -> ValidationReport {
        validation::validate(self.topology(), self.arrangement())
    }

    /// Checks that `index` belongs to this model's domain and returns its count.
    fn resolve_count(&self, index: FaultIndex) -> Result<u32> {
        let topology = self.topology();
        let count = match (self.fault_kind(), index) {
            (FaultKind::FailedElements, FaultIndex::FailedElements(count))
            | (FaultKind::FailedUnits, FaultIndex::FailedUnits(count)) => count,
            _ => return Err(UnbalanceError::MismatchedFaultIndex { topology, index }),
        };
        let max = self.max_count();
        if count > max {
            return Err(UnbalanceError::OutOfRangeFaultIndex {
                topology,
                index,
                min: 0,
                max,
            });
        }
        Ok(count)
    }
}

/// Builds the model for `topology` from the nameplate arrangement, failing
/// when a required parameter is absent.
pub fn build_model(
    topology: Topology,
    nameplate: &BankNameplate,
) -> Result<Box<dyn UnbalanceModel>> {
    let arrangement = &nameplate.arrangement;
    let unit_capacitance = nameplate.cu_fixed.unwrap_or(1.0);
    let model: Box<dyn UnbalanceModel> = match topology {
        Topology::DoubleWyeInternalFuses => Box::new(DoubleWyeInternalFuses::new(arrangement)?),
        Topology::SingleWyeInternalFuses => Box::new(SingleWyeInternalFuses::new(arrangement)?),
        Topology::HBridgeInternalFuses => Box::new(HBridgeInternalFuses::new(arrangement)?),
        Topology::DoubleWyeExternalFuses => Box::new(
            DoubleWyeExternalFuses::new(arrangement)?.with_unit_capacitance(unit_capacitance),
        ),
        Topology::HBridgeExternalFuses => Box::new(
            HBridgeExternalFuses::new(arrangement)?.with_unit_capacitance(unit_capacitance),
        ),
    };
    Ok(model)
}

pub(crate) fn require(
    topology: Topology,
    arrangement: &Arrangement,
    parameter: Parameter,
) -> Result<f64> {
    arrangement
        .get(parameter)
        .map(f64::from)
        .ok_or(UnbalanceError::MissingParameter {
            topology,
            parameter,
        })
}

/// Division that reports a vanishing denominator instead of producing inf/NaN.
pub(crate) fn ratio(
    topology: Topology,
    stage: &'static str,
    numerator: f64,
    denominator: f64,
) -> Result<f64> {
    if denominator.abs() < ZERO_TOLERANCE || !denominator.is_finite() {
        return Err(UnbalanceError::DegenerateTopology { topology, stage });
    }
    Ok(numerator / denominator)
}

/// `count` equal series sections, one of them derated to `c`: `count*c / (c*(count-1) + 1)`.
pub(crate) fn series_combine(
    topology: Topology,
    stage: &'static str,
    count: f64,
    c: f64,
) -> Result<f64> {
    ratio(topology, stage, count * c, c * (count - 1.0) + 1.0)
}

/// Neutral shift of an isolated wye with one phase at `cp` per unit.
pub(crate) fn neutral_shift(cp: f64, grounding: Grounding) -> f64 {
    grounding.factor() * (3.0 / (2.0 + cp) - 1.0)
}

pub(crate) fn ground_current(grounding: Grounding, iph: f64) -> f64 {
    (1.0 - grounding.factor()) * (1.0 - iph)
}

/// Neutral current between the wyes of a double-wye bank.
pub(crate) fn neutral_current(vng: f64, grounding: Grounding, pt: f64, pa: f64) -> f64 {
    3.0 * vng * grounding.factor() * (pt - pa) / pt
}

/// Element voltage after `f` of `n` elements in one of `su` series cells failed.
pub(crate) fn element_voltage_ratio(su: f64, n: f64, f: f64) -> f64 {
    su * n / ((su - 1.0) * (n - f) + n)
}

/// Unit voltage of a wye string: `Vln*Cs/Cg`, or `Vln*S` once the group is fully collapsed.
pub(crate) fn wye_unit_voltage(vln: f64, cs: f64, cg: f64, s: f64) -> f64 {
    if cg.abs() < ZERO_TOLERANCE {
        vln * s
    } else {
        vln * cs / cg
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::{Quantity, UnbalanceRow};

    pub const TOLERANCE: f64 = 1e-9;

    pub fn value(row: &UnbalanceRow, quantity: Quantity) -> f64 {
        row.value(quantity)
            .unwrap_or_else(|| panic!("{quantity} missing at {}", row.index))
    }

    pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    /// Every column except the unbalance signals reads 1.0 on a healthy bank.
    pub fn assert_balanced(row: &UnbalanceRow) {
        for (quantity, cell) in &row.values {
            let value = cell.value().unwrap_or(f64::NAN);
            let expected = if quantity.is_unbalance_signal() { 0.0 } else { 1.0 };
            assert!(
                (value - expected).abs() <= TOLERANCE,
                "{quantity} = {value} at baseline, expected {expected}"
            );
        }
    }
}
