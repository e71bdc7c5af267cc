//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Error taxonomy for the unbalance engine."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use thiserror::Error;

use crate::{
    model::{FaultIndex, Parameter, Topology},
    validation::ConstraintViolation,
};

pub type Result<T> = std::result::Result<T, UnbalanceError>;

#[derive(Debug, Error)]
pub enum UnbalanceError {
    #[error("invalid nameplate: {field} {reason}")]
    InvalidNameplate { field: &'static str, reason: String },
    #[error("{topology} constraint violated: {}", join_violations(.violations))]
    TopologyConstraintViolation {
        topology: Topology,
        violations: Vec<ConstraintViolation>,
    },
    #[error("{topology} requires parameter {parameter}")]
    MissingParameter {
        topology: Topology,
        parameter: Parameter,
    },
    #[error("fault index {index} outside {topology} domain [{min}, {max}]")]
    OutOfRangeFaultIndex {
        topology: Topology,
        index: FaultIndex,
        min: u32,
        max: u32,
    },
    #[error("fault index {index} does not belong to the {topology} fault domain")]
    MismatchedFaultIndex { topology: Topology, index: FaultIndex },
    #[error("degenerate {topology} arrangement: zero denominator in {stage}")]
    DegenerateTopology {
        topology: Topology,
        stage: &'static str,
    },
    #[error("cannot read fault index '{0}'")]
    InvalidFaultIndexLabel(String),
    #[error("unknown topology '{0}'")]
    UnknownTopology(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("csv export error: {0}")]
    CsvExportFailed(#[from] csv::Error),
}

fn join_violations(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
