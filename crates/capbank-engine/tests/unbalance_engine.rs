//! ---
//! cb_section: "05-testing"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "End-to-end tests for the unbalance engine."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::fs;

use capbank_engine::{
    analyze_bank, analyze_bank_with_export,
    basis::Basis,
    convert::{Column, PhysicalQuantity, UnitConverter},
    model::{Arrangement, Cell, FaultIndex, Grounding, Quantity, Topology},
    models::{build_model, UnbalanceModel},
    presets,
    sweep::{FaultDomain, SweepEngine},
    validation::validate,
    AnalysisOptions, UnbalanceError, UnbalanceRequest,
};
use strum::IntoEnumIterator;
use tempfile::tempdir;

const TOLERANCE: f64 = 1e-9;

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= TOLERANCE * expected.abs().max(1.0)
}

#[test]
fn single_wye_scenario() {
    let nameplate = presets::preset(Topology::SingleWyeInternalFuses);
    assert_eq!(nameplate.arrangement.pt, 6);
    let request = UnbalanceRequest::new(Topology::SingleWyeInternalFuses, nameplate);
    let summary = analyze_bank(&request, &AnalysisOptions::default()).unwrap();

    let rows = &summary.per_unit.rows;
    assert_eq!(rows.len(), 14);
    assert_eq!(rows[0].value(Quantity::Vng), Some(0.0));
    let last = rows.last().unwrap();
    assert_eq!(last.index, FaultIndex::FailedElements(13));
    let vcu = last.value(Quantity::Vcu).unwrap();
    assert!(vcu.is_finite() && vcu > 1.0);
}

#[test]
fn h_bridge_external_scenario_exports() {
    let dir = tempdir().unwrap();
    let request = UnbalanceRequest::new(
        Topology::HBridgeExternalFuses,
        presets::preset(Topology::HBridgeExternalFuses),
    )
    .with_study("minimal-h-bridge")
    .with_sentinel(true);
    let summary =
        analyze_bank_with_export(&request, &AnalysisOptions::default(), Some(dir.path())).unwrap();

    assert_eq!(summary.per_unit.len(), 9);
    let sentinel = summary.per_unit.rows.last().unwrap();
    assert_eq!(sentinel.index, FaultIndex::AllUnitsBlown);
    assert_eq!(sentinel.get(Quantity::Vcu), Some(Cell::ShortCircuit));
    assert_eq!(sentinel.get(Quantity::Iu), Some(Cell::ShortCircuit));

    let json_path = dir.path().join("h_bridge_external_fuses_unbalance.json");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(report["topology"], "h_bridge_external_fuses");
    assert_eq!(report["schema"]["title"], "UnbalanceSummary");
    assert_eq!(report["data"]["study"], "minimal-h-bridge");
    let rows = report["data"]["per_unit"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 9);
    assert_eq!(rows[8]["index"], "SU");
    assert_eq!(rows[8]["values"]["Vcu"], "SC");
    assert_eq!(rows[3]["index"], 3);

    let csv = fs::read_to_string(dir.path().join("h_bridge_external_fuses_unbalance.csv")).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("n,Cu,Cu_F,Chn,Chn_F,Cp,Cp_F"));
    assert_eq!(lines.count(), 9);
    assert!(csv.contains("SU,"));
    assert!(csv.contains(",SC,"));

    let tex = fs::read_to_string(dir.path().join("h_bridge_external_fuses_unbalance.tex")).unwrap();
    assert!(tex.starts_with("\\begin{tabular}"));
    assert!(tex.contains("\\toprule") && tex.contains("\\bottomrule"));
    assert_eq!(tex.matches(" \\\\\n").count(), 10);
    if summary.critical.is_some() {
        assert!(tex.contains("\\textcolor{red}"));
    }
}

#[test]
fn healthy_row_is_balanced_for_every_topology() {
    for (topology, nameplate) in presets::all() {
        for grounding in [Grounding::Grounded, Grounding::Ungrounded] {
            let model = build_model(topology, &nameplate).unwrap();
            let row = model
                .compute_row(topology.fault_kind().index(0), grounding)
                .unwrap();
            for (quantity, cell) in &row.values {
                let value = cell.value().unwrap();
                let expected = if quantity.is_unbalance_signal() {
                    0.0
                } else {
                    1.0
                };
                assert!(
                    close(value, expected),
                    "{topology} {grounding}: {quantity} = {value}"
                );
            }
        }
    }
}

#[test]
fn grounded_banks_have_no_neutral_shift() {
    for (topology, nameplate) in presets::all() {
        let model = build_model(topology, &nameplate).unwrap();
        let table = SweepEngine::new(model.as_ref())
            .run(Grounding::Grounded, &FaultDomain::Default)
            .unwrap();
        for row in &table.rows {
            assert_eq!(row.value(Quantity::Vng), Some(0.0), "{topology} {}", row.index);
            assert_eq!(row.value(Quantity::In), Some(0.0), "{topology} {}", row.index);
        }
    }
}

#[test]
fn double_wye_without_right_branch_has_no_neutral_current() {
    for topology in [
        Topology::DoubleWyeInternalFuses,
        Topology::DoubleWyeExternalFuses,
    ] {
        let mut nameplate = presets::preset(topology);
        nameplate.arrangement.pt = nameplate.arrangement.pa;
        let model = build_model(topology, &nameplate).unwrap();
        let table = SweepEngine::new(model.as_ref())
            .run(Grounding::Ungrounded, &FaultDomain::Default)
            .unwrap();
        assert!(table
            .rows
            .iter()
            .all(|row| row.value(Quantity::In) == Some(0.0)));
    }
}

#[test]
fn double_wye_internal_unit_voltage_is_monotonic() {
    let nameplate = presets::preset(Topology::DoubleWyeInternalFuses);
    let elements = nameplate.arrangement.n.unwrap();
    let model = build_model(Topology::DoubleWyeInternalFuses, &nameplate).unwrap();
    let indices: Vec<FaultIndex> = (0..=elements).map(FaultIndex::FailedElements).collect();
    let table = SweepEngine::new(model.as_ref())
        .run(Grounding::Ungrounded, &FaultDomain::Explicit(indices))
        .unwrap();
    let voltages: Vec<f64> = table
        .rows
        .iter()
        .map(|row| row.value(Quantity::Vcu).unwrap())
        .collect();
    assert_eq!(voltages.len(), elements as usize + 1);
    assert!(voltages.windows(2).all(|pair| pair[1] >= pair[0]));
}

#[test]
fn converter_returns_bases_for_unit_rows() {
    for (topology, nameplate) in presets::all() {
        let basis = Basis::from_nameplate(&nameplate).unwrap();
        let model = build_model(topology, &nameplate).unwrap();
        let table = SweepEngine::new(model.as_ref())
            .run(
                nameplate.grounding,
                &FaultDomain::Explicit(vec![topology.fault_kind().index(0)]),
            )
            .unwrap();
        let converter = UnitConverter::new(&basis);
        let physical = converter.convert(&table);
        let row = &physical.rows[0];
        let phys = |quantity| row.value(Column::Physical(quantity)).unwrap();
        assert!(close(phys(PhysicalQuantity::PhaseCapacitance), basis.phase_capacitance_f));
        assert!(close(phys(PhysicalQuantity::PhaseVoltage), basis.phase_voltage_v));
        assert!(close(phys(PhysicalQuantity::PhaseCurrent), basis.bank_current_a));
        assert!(close(phys(PhysicalQuantity::UnitVoltage), basis.unit_voltage_v));
        assert_eq!(converter.apply(&physical), physical);
    }
}

#[test]
fn group_size_must_divide_branch() {
    let arrangement = |pa, p| Arrangement {
        s: 4,
        st: None,
        pt: 11,
        pa,
        p: Some(p),
        n: Some(14),
        su: Some(3),
    };
    for topology in [
        Topology::DoubleWyeInternalFuses,
        Topology::SingleWyeInternalFuses,
    ] {
        let mut rejected = arrangement(7, 2);
        let mut accepted = arrangement(6, 2);
        if topology == Topology::SingleWyeInternalFuses {
            rejected.pt = 7;
            accepted.pt = 6;
        }
        assert!(!validate(topology, &rejected).is_valid(), "{topology}");
        assert!(validate(topology, &accepted).is_valid(), "{topology}");
    }
}

#[test]
fn rated_banks_flag_the_critical_row_by_rating() {
    let mut nameplate = presets::preset(Topology::DoubleWyeExternalFuses);
    nameplate.rated_voltage_v = Some(72_500.0);
    let request = UnbalanceRequest::new(Topology::DoubleWyeExternalFuses, nameplate);
    let summary = analyze_bank(&request, &AnalysisOptions::default()).unwrap();

    let critical = summary.critical.clone().unwrap();
    assert_eq!(
        critical.source,
        Column::Physical(PhysicalQuantity::RatedUnitVoltage)
    );
    assert!(critical.ratio <= 1.10);
    let ratios: Vec<f64> = summary
        .physical
        .rows
        .iter()
        .filter_map(|row| row.value(critical.source))
        .collect();
    assert!(ratios
        .iter()
        .all(|ratio| *ratio > 1.10 || *ratio <= critical.ratio));
    assert!(critical.predecessors(&summary.physical, 2).len() <= 2);
}

#[test]
fn mismatched_indices_are_rejected() {
    for topology in Topology::iter() {
        let model = build_model(topology, &presets::preset(topology)).unwrap();
        let wrong = match topology.fault_kind().index(1) {
            FaultIndex::FailedElements(_) => FaultIndex::FailedUnits(1),
            _ => FaultIndex::FailedElements(1),
        };
        assert!(matches!(
            model.compute_row(wrong, Grounding::Ungrounded),
            Err(UnbalanceError::MismatchedFaultIndex { .. })
        ));
        let beyond = topology.fault_kind().index(model.max_count() + 1);
        assert!(matches!(
            model.compute_row(beyond, Grounding::Ungrounded),
            Err(UnbalanceError::OutOfRangeFaultIndex { .. })
        ));
    }
}

#[test]
fn collapsed_tap_leg_is_degenerate() {
    // Pt == Pa leaves no healthy tap column once every unit of the group has blown.
    let mut nameplate = presets::preset(Topology::HBridgeExternalFuses);
    nameplate.arrangement.pt = nameplate.arrangement.pa;
    assert!(!validate(Topology::HBridgeExternalFuses, &nameplate.arrangement).is_valid());

    let model = build_model(Topology::HBridgeExternalFuses, &nameplate).unwrap();
    let all_blown = model.max_count();
    let indices = [
        FaultIndex::FailedUnits(0),
        FaultIndex::FailedUnits(all_blown),
        FaultIndex::FailedUnits(2),
    ];
    let engine = SweepEngine::new(model.as_ref());

    assert!(matches!(
        engine.run(Grounding::Ungrounded, &FaultDomain::Explicit(indices.to_vec())),
        Err(UnbalanceError::DegenerateTopology {
            topology: Topology::HBridgeExternalFuses,
            stage: "tap voltage",
        })
    ));

    let results = engine.evaluate_each(Grounding::Ungrounded, &indices);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(UnbalanceError::DegenerateTopology { .. })
    ));
    assert!(results[2].is_ok());
}

#[test]
fn baseline_signals_are_unsigned_zero() {
    for (topology, nameplate) in presets::all() {
        let model = build_model(topology, &nameplate).unwrap();
        let row = model
            .compute_row(topology.fault_kind().index(0), Grounding::Ungrounded)
            .unwrap();
        for (quantity, cell) in &row.values {
            if quantity.is_unbalance_signal() {
                let value = cell.value().unwrap();
                assert!(
                    value.abs() > 0.0 || value.is_sign_positive(),
                    "{topology}: {quantity} = {value}"
                );
            }
        }
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("-0.0"), "{topology}: {json}");
    }
}
