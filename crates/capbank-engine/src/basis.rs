//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Nominal voltage, current and capacitance bases from nameplate data."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::f64::consts::PI;

use serde::Serialize;

use crate::{
    errors::{Result, UnbalanceError},
    model::BankNameplate,
};

/// Bases for one level of the bank hierarchy below the unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelBasis {
    pub capacitance_f: f64,
    pub voltage_v: f64,
    pub current_a: f64,
}

/// H-bridge leg from the tap to neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegBasis {
    pub capacitance_f: f64,
    pub voltage_v: f64,
}

/// SI bases derived from a nameplate. Computed once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Basis {
    pub line_voltage_v: f64,
    pub phase_voltage_v: f64,
    pub bank_current_a: f64,
    pub phase_capacitance_f: f64,
    pub unit_capacitance_f: f64,
    pub unit_voltage_v: f64,
    pub unit_current_a: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<LevelBasis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<LevelBasis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg: Option<LegBasis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated_unit_voltage_v: Option<f64>,
    /// Three-phase reactive power at the rated voltage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated_power_var: Option<f64>,
}

impl Basis {
    pub fn from_nameplate(nameplate: &BankNameplate) -> Result<Self> {
        let line_voltage = positive("line_voltage_v", nameplate.line_voltage_v)?;
        let reactive_power = positive("reactive_power_var", nameplate.reactive_power_var)?;
        let frequency = positive("frequency_hz", nameplate.frequency_hz)?;
        let arrangement = &nameplate.arrangement;
        let series = positive("S", f64::from(arrangement.s))?;
        let parallel = positive("Pt", f64::from(arrangement.pt))?;

        let sqrt3 = 3f64.sqrt();
        let phase_voltage = positive("phase_voltage", line_voltage / sqrt3)?;
        let bank_current = reactive_power / (sqrt3 * line_voltage);
        let phase_capacitance =
            (reactive_power / 3.0) / (2.0 * PI * frequency * phase_voltage.powi(2));

        let unit_capacitance = phase_capacitance * series / parallel;
        let unit_voltage = phase_voltage / series;
        let unit_current = bank_current / parallel;

        let group = arrangement
            .su
            .map(|su| positive("Su", f64::from(su)))
            .transpose()?
            .map(|su| LevelBasis {
                capacitance_f: unit_capacitance * su,
                voltage_v: unit_voltage / su,
                current_a: unit_current,
            });

        let element = match (group, arrangement.n) {
            (Some(group), Some(n)) => {
                let n = positive("N", f64::from(n))?;
                Some(LevelBasis {
                    capacitance_f: group.capacitance_f / n,
                    voltage_v: group.voltage_v,
                    current_a: group.current_a / n,
                })
            }
            _ => None,
        };

        let leg = arrangement
            .st
            .map(|st| positive("St", f64::from(st)))
            .transpose()?
            .map(|st| LegBasis {
                capacitance_f: phase_capacitance * series / st,
                voltage_v: phase_voltage * st / series,
            });

        let rated_unit_voltage = nameplate
            .rated_voltage_v
            .map(|rated| positive("rated_voltage_v", rated))
            .transpose()?
            .map(|rated| rated / sqrt3 / series);
        let rated_power = rated_unit_voltage.and(nameplate.rated_power_var());

        Ok(Self {
            line_voltage_v: line_voltage,
            phase_voltage_v: phase_voltage,
            bank_current_a: bank_current,
            phase_capacitance_f: phase_capacitance,
            unit_capacitance_f: unit_capacitance,
            unit_voltage_v: unit_voltage,
            unit_current_a: unit_current,
            group,
            element,
            leg,
            rated_unit_voltage_v: rated_unit_voltage,
            rated_power_var: rated_power,
        })
    }

    /// Working unit voltage over its rating, when the nameplate carries one.
    pub fn rated_voltage_ratio(&self) -> Option<f64> {
        self.rated_unit_voltage_v
            .map(|rated| self.unit_voltage_v / rated)
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(UnbalanceError::InvalidNameplate {
            field,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Arrangement, Grounding};

    fn nameplate() -> BankNameplate {
        BankNameplate {
            line_voltage_v: 69_000.0,
            reactive_power_var: 15_000_000.0,
            frequency_hz: 60.0,
            rated_voltage_v: Some(72_500.0),
            grounding: Grounding::Ungrounded,
            arrangement: Arrangement {
                s: 4,
                st: None,
                pt: 6,
                pa: 6,
                p: Some(3),
                n: Some(14),
                su: Some(3),
            },
            cu_fixed: None,
        }
    }

    fn close(a: f64, b: f64, rel: f64) -> bool {
        ((a - b) / b).abs() < rel
    }

    #[test]
    fn phase_bases_follow_nameplate() {
        let basis = Basis::from_nameplate(&nameplate()).unwrap();
        assert!(close(basis.phase_voltage_v, 39_837.17, 1e-6));
        assert!(close(basis.bank_current_a, 125.51, 1e-4));
        assert!(close(basis.phase_capacitance_f, 8.357e-6, 1e-3));
        assert!(close(basis.unit_voltage_v, basis.phase_voltage_v / 4.0, 1e-12));
        assert!(close(
            basis.unit_capacitance_f,
            basis.phase_capacitance_f * 4.0 / 6.0,
            1e-12
        ));
    }

    #[test]
    fn lower_levels_follow_series_counts() {
        let basis = Basis::from_nameplate(&nameplate()).unwrap();
        let group = basis.group.unwrap();
        let element = basis.element.unwrap();
        assert!(close(group.capacitance_f, basis.unit_capacitance_f * 3.0, 1e-12));
        assert!(close(group.voltage_v, basis.unit_voltage_v / 3.0, 1e-12));
        assert!(close(element.capacitance_f, group.capacitance_f / 14.0, 1e-12));
        assert!(close(element.current_a, basis.unit_current_a / 14.0, 1e-12));
        assert!(basis.leg.is_none());
        assert!(close(basis.rated_voltage_ratio().unwrap(), 69.0 / 72.5, 1e-12));
    }

    #[test]
    fn rated_power_scales_with_voltage_squared() {
        let basis = Basis::from_nameplate(&nameplate()).unwrap();
        let expected = 15_000_000.0 * (72_500.0f64 / 69_000.0).powi(2);
        assert!(close(basis.rated_power_var.unwrap(), expected, 1e-12));
        assert!(close(basis.rated_power_var.unwrap(), 16_560_333.96, 1e-9));

        let mut unrated = nameplate();
        unrated.rated_voltage_v = None;
        let basis = Basis::from_nameplate(&unrated).unwrap();
        assert!(basis.rated_power_var.is_none());
        assert!(basis.rated_unit_voltage_v.is_none());
    }

    #[test]
    fn rejects_non_positive_inputs() {
        let mut bad = nameplate();
        bad.frequency_hz = 0.0;
        assert!(matches!(
            Basis::from_nameplate(&bad),
            Err(UnbalanceError::InvalidNameplate { field: "frequency_hz", .. })
        ));

        let mut bad = nameplate();
        bad.arrangement.pt = 0;
        assert!(matches!(
            Basis::from_nameplate(&bad),
            Err(UnbalanceError::InvalidNameplate { field: "Pt", .. })
        ));

        let mut bad = nameplate();
        bad.line_voltage_v = f64::NAN;
        assert!(Basis::from_nameplate(&bad).is_err());
    }
}
