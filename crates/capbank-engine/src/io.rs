//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Nameplate loading and fault-index parsing."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::{fs, path::Path};

use crate::{
    errors::{Result, UnbalanceError},
    model::{BankNameplate, FaultIndex, FaultKind},
};

/// Reads a nameplate from JSON (leading `{`) or YAML.
pub fn load_nameplate_from_file(path: impl AsRef<Path>) -> Result<BankNameplate> {
    let data = fs::read_to_string(path)?;
    parse_nameplate(&data)
}

pub fn parse_nameplate(data: &str) -> Result<BankNameplate> {
    let nameplate = if data.trim_start().starts_with('{') {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data).map_err(UnbalanceError::YamlSerializationFailed)?
    };
    Ok(nameplate)
}

/// Parses `0,1,2,SU` into indices of `kind`. Blank entries are ignored.
pub fn parse_fault_indices(kind: FaultKind, list: &str) -> Result<Vec<FaultIndex>> {
    list.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| parse_fault_index(kind, label))
        .collect()
}

pub fn parse_fault_index(kind: FaultKind, label: &str) -> Result<FaultIndex> {
    if label.eq_ignore_ascii_case("su") {
        return Ok(FaultIndex::AllUnitsBlown);
    }
    label
        .parse::<u32>()
        .map(|count| kind.index(count))
        .map_err(|_| UnbalanceError::InvalidFaultIndexLabel(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Grounding;
    use std::io::Write;

    #[test]
    fn loads_json_and_yaml() {
        let json = r#"{"line_voltage_v": 69000, "reactive_power_var": 15000000,
            "frequency_hz": 60, "G": 1, "S": 4, "Pt": 14, "Pa": 8}"#;
        let from_json = parse_nameplate(json).unwrap();
        assert_eq!(from_json.arrangement.pt, 14);
        assert_eq!(from_json.grounding, Grounding::Ungrounded);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "line_voltage_v: 69000\nreactive_power_var: 15000000\nfrequency_hz: 60\nS: 4\nPt: 14\nPa: 8\ncu_fixed: 0.97"
        )
        .unwrap();
        let from_yaml = load_nameplate_from_file(file.path()).unwrap();
        assert_eq!(from_yaml.cu_fixed, Some(0.97));
        assert_eq!(from_yaml.arrangement, from_json.arrangement);
    }

    #[test]
    fn rejects_bad_grounding_flag() {
        let yaml = "line_voltage_v: 1\nreactive_power_var: 1\nfrequency_hz: 1\nG: 3\nS: 1\nPt: 1\nPa: 1";
        assert!(matches!(
            parse_nameplate(yaml),
            Err(UnbalanceError::YamlSerializationFailed(_))
        ));
    }

    #[test]
    fn parses_index_lists() {
        let indices = parse_fault_indices(FaultKind::FailedUnits, "0, 2,SU,").unwrap();
        assert_eq!(
            indices,
            vec![
                FaultIndex::FailedUnits(0),
                FaultIndex::FailedUnits(2),
                FaultIndex::AllUnitsBlown
            ]
        );
        assert!(matches!(
            parse_fault_indices(FaultKind::FailedElements, "1,x"),
            Err(UnbalanceError::InvalidFaultIndexLabel(label)) if label == "x"
        ));
    }
}
