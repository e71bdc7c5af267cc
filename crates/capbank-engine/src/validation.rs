//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Per-topology structural rules for bank arrangements."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
//! Every rule is a pure predicate over the [`Arrangement`]. Problems are
//! collected into a [`ValidationReport`]; nothing here returns an error, the
//! caller decides whether a report blocks the sweep.
use std::fmt;

use serde::Serialize;

use crate::{
    errors::{Result, UnbalanceError},
    model::{Arrangement, Parameter, Topology},
};

/// A hard rule the arrangement breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    pub rule: &'static str,
    pub detail: String,
}

/// An advisory the arrangement triggers; the sweep still runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintWarning {
    pub rule: &'static str,
    pub detail: String,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.rule, self.detail)
    }
}

impl fmt::Display for ConstraintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.rule, self.detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub topology: Topology,
    pub errors: Vec<ConstraintViolation>,
    pub warnings: Vec<ConstraintWarning>,
}

impl ValidationReport {
    fn new(topology: Topology) -> Self {
        Self {
            topology,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turns hard violations into an error and hands back the warnings otherwise.
    pub fn into_result(self) -> Result<Vec<ConstraintWarning>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(UnbalanceError::TopologyConstraintViolation {
                topology: self.topology,
                violations: self.errors,
            })
        }
    }

    fn require(&mut self, holds: bool, rule: &'static str, detail: impl FnOnce() -> String) {
        if !holds {
            self.errors.push(ConstraintViolation {
                rule,
                detail: detail(),
            });
        }
    }

    fn advise(&mut self, triggered: bool, rule: &'static str, detail: impl FnOnce() -> String) {
        if triggered {
            self.warnings.push(ConstraintWarning {
                rule,
                detail: detail(),
            });
        }
    }
}

/// Checks `arrangement` against the rules of `topology`.
pub fn validate(topology: Topology, arrangement: &Arrangement) -> ValidationReport {
    let mut report = ValidationReport::new(topology);

    let missing: Vec<Parameter> = topology
        .required_parameters()
        .iter()
        .copied()
        .filter(|parameter| arrangement.get(*parameter).is_none())
        .collect();
    for parameter in &missing {
        report.errors.push(ConstraintViolation {
            rule: "required parameter",
            detail: format!("{parameter} is not set"),
        });
    }

    common_rules(&mut report, arrangement);

    match topology {
        Topology::SingleWyeInternalFuses => {
            internal_fuse_rules(&mut report, arrangement);
            single_wye_rules(&mut report, arrangement);
        }
        Topology::DoubleWyeInternalFuses => {
            internal_fuse_rules(&mut report, arrangement);
            double_wye_rules(&mut report, arrangement);
            group_divides_branch(&mut report, arrangement);
        }
        Topology::DoubleWyeExternalFuses => double_wye_rules(&mut report, arrangement),
        Topology::HBridgeInternalFuses => {
            internal_fuse_rules(&mut report, arrangement);
            h_bridge_rules(&mut report, arrangement);
        }
        Topology::HBridgeExternalFuses => h_bridge_rules(&mut report, arrangement),
    }

    report
}

fn common_rules(report: &mut ValidationReport, a: &Arrangement) {
    report.require(a.s >= 1, "S >= 1", || format!("S={}", a.s));
    report.require(a.pt >= 1, "Pt >= 1", || format!("Pt={}", a.pt));
    report.require(a.pa <= a.pt, "0 <= Pa <= Pt", || {
        format!("Pa={}, Pt={}", a.pa, a.pt)
    });
}

fn internal_fuse_rules(report: &mut ValidationReport, a: &Arrangement) {
    if let Some(n) = a.n {
        report.require(n >= 1, "N >= 1", || format!("N={n}"));
    }
    if let Some(su) = a.su {
        report.require(su >= 1, "Su >= 1", || format!("Su={su}"));
    }
}

fn single_wye_rules(report: &mut ValidationReport, a: &Arrangement) {
    report.require(a.pa == a.pt, "Pa == Pt", || {
        format!("Pa={}, Pt={}", a.pa, a.pt)
    });
    group_divides_branch(report, a);
}

fn double_wye_rules(report: &mut ValidationReport, a: &Arrangement) {
    // Stricter than `0 <= Pa`: the faulted-branch formulas divide by Pa.
    report.require(a.pa >= 1, "Pa >= 1", || {
        format!(
            "Pa={}; the faulted branch needs at least one unit because its group capacitance divides by Pa",
            a.pa
        )
    });
    report.require(
        a.pt.saturating_sub(a.pa) >= 1,
        "Pt - Pa >= 1",
        || format!("Pt={}, Pa={}", a.pt, a.pa),
    );
}

/// The affected group of `P` units must tile the studied branch.
fn group_divides_branch(report: &mut ValidationReport, a: &Arrangement) {
    let Some(p) = a.p else {
        return;
    };
    report.require(p >= 1, "P >= 1", || format!("P={p}"));
    if p >= 1 {
        report.require(a.pa % p == 0, "Pa mod P == 0", || {
            format!("Pa={}, P={p}", a.pa)
        });
        report.require(p <= a.pa, "P <= Pa", || format!("P={p}, Pa={}", a.pa));
    }
}

fn h_bridge_rules(report: &mut ValidationReport, a: &Arrangement) {
    report.require(a.s >= 2, "S >= 2", || format!("S={}", a.s));
    if let Some(st) = a.st {
        report.require(
            st >= 1 && st < a.s,
            "1 <= St <= S-1",
            || format!("St={st}, S={}", a.s),
        );
    }
    report.require(
        a.pa >= 1 && a.pa < a.pt,
        "1 <= Pa <= Pt-1",
        || format!("Pa={}, Pt={}", a.pa, a.pt),
    );

    let Some(p) = a.p else {
        return;
    };
    report.require(p >= 1, "P >= 1", || format!("P={p}"));
    if p == 0 {
        return;
    }
    report.require(a.pa >= p, "Pa >= P", || format!("Pa={}, P={p}", a.pa));
    report.require(a.pt >= 2 * p, "Pt >= 2P", || format!("Pt={}, P={p}", a.pt));
    report.advise(
        (a.pt / p) % 2 == 1,
        "Pt / P is odd",
        || format!("Pt={}, P={p} splits the right leg asymmetrically", a.pt),
    );
    report.advise(a.pa == p, "Pa == P", || {
        format!("Pa={}, left leg is a single block", a.pa)
    });
}
