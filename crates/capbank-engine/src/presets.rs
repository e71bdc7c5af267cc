//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Reference nameplates, one per protection topology."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use strum::IntoEnumIterator;

use crate::model::{Arrangement, BankNameplate, Grounding, Topology};

const LINE_VOLTAGE_V: f64 = 69_000.0;
const REACTIVE_POWER_VAR: f64 = 15_000_000.0;
const FREQUENCY_HZ: f64 = 60.0;

/// Reference 69 kV / 15 MVAr / 60 Hz bank for `topology`.
pub fn preset(topology: Topology) -> BankNameplate {
    let (grounding, arrangement) = match topology {
        Topology::DoubleWyeInternalFuses => (
            Grounding::Ungrounded,
            Arrangement {
                s: 4,
                st: None,
                pt: 11,
                pa: 6,
                p: Some(3),
                n: Some(14),
                su: Some(3),
            },
        ),
        Topology::SingleWyeInternalFuses => (
            Grounding::Ungrounded,
            Arrangement {
                s: 4,
                st: None,
                pt: 6,
                pa: 6,
                p: Some(3),
                n: Some(14),
                su: Some(3),
            },
        ),
        Topology::HBridgeInternalFuses => (
            Grounding::Grounded,
            Arrangement {
                s: 7,
                st: Some(3),
                pt: 9,
                pa: 5,
                p: Some(2),
                n: Some(16),
                su: Some(3),
            },
        ),
        Topology::DoubleWyeExternalFuses => (
            Grounding::Ungrounded,
            Arrangement {
                s: 4,
                pt: 14,
                pa: 8,
                ..Arrangement::default()
            },
        ),
        Topology::HBridgeExternalFuses => (
            Grounding::Ungrounded,
            Arrangement {
                s: 5,
                st: Some(3),
                pt: 15,
                pa: 8,
                ..Arrangement::default()
            },
        ),
    };

    BankNameplate {
        line_voltage_v: LINE_VOLTAGE_V,
        reactive_power_var: REACTIVE_POWER_VAR,
        frequency_hz: FREQUENCY_HZ,
        rated_voltage_v: None,
        grounding,
        arrangement,
        cu_fixed: None,
    }
}

/// Every preset, in [`Topology`] declaration order.
pub fn all() -> Vec<(Topology, BankNameplate)> {
    Topology::iter()
        .map(|topology| (topology, preset(topology)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    #[test]
    fn every_preset_passes_validation() {
        let presets = all();
        assert_eq!(presets.len(), 5);
        for (topology, nameplate) in presets {
            let report = validate(topology, &nameplate.arrangement);
            assert!(report.is_valid(), "{topology}: {:?}", report.errors);
        }
    }

    #[test]
    fn h_bridge_internal_preset_is_grounded() {
        assert_eq!(
            preset(Topology::HBridgeInternalFuses).grounding,
            Grounding::Grounded
        );
    }
}
