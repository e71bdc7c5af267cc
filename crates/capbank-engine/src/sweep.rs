//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Progressive-failure sweep over a model's fault domain."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use capbank_logging::{cb_debug, cb_error, LogContext};

use crate::{
    errors::{Result, UnbalanceError},
    model::{FaultIndex, Grounding, UnbalanceRow, UnbalanceTable},
    models::UnbalanceModel,
};

/// Which fault indices a sweep visits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FaultDomain {
    /// The model's own domain, `0..N` or `0..Pa`.
    #[default]
    Default,
    /// The model's own domain followed by the `SU` row.
    DefaultWithSentinel,
    /// Caller-chosen indices; swept in ascending order with `SU` last.
    Explicit(Vec<FaultIndex>),
}

impl FaultDomain {
    pub fn resolve(&self, model: &dyn UnbalanceModel) -> Result<Vec<FaultIndex>> {
        let indices = match self {
            FaultDomain::Default => model.default_domain(),
            FaultDomain::DefaultWithSentinel => {
                if !model.supports_sentinel() {
                    return Err(UnbalanceError::MismatchedFaultIndex {
                        topology: model.topology(),
                        index: FaultIndex::AllUnitsBlown,
                    });
                }
                let mut indices = model.default_domain();
                indices.push(FaultIndex::AllUnitsBlown);
                indices
            }
            FaultDomain::Explicit(indices) => {
                let mut indices = indices.clone();
                indices.sort_by_key(FaultIndex::sort_key);
                indices.dedup();
                indices
            }
        };
        Ok(indices)
    }
}

/// Drives one model across a fault domain for a fixed grounding.
pub struct SweepEngine<'a> {
    model: &'a dyn UnbalanceModel,
    study: Option<&'a str>,
}

impl<'a> SweepEngine<'a> {
    pub fn new(model: &'a dyn UnbalanceModel) -> Self {
        Self { model, study: None }
    }

    pub fn with_study(mut self, study: &'a str) -> Self {
        self.study = Some(study);
        self
    }

    /// Computes the full table; the first failing row aborts the sweep.
    pub fn run(&self, grounding: Grounding, domain: &FaultDomain) -> Result<UnbalanceTable> {
        let indices = domain.resolve(self.model)?;
        let rows = indices
            .into_iter()
            .map(|index| self.evaluate(index, grounding))
            .collect::<Result<Vec<_>>>()?;

        Ok(UnbalanceTable {
            topology: self.model.topology(),
            grounding,
            fault_kind: self.model.fault_kind(),
            rows,
        })
    }

    /// Evaluates each index on its own, so one bad index leaves the others intact.
    pub fn evaluate_each(
        &self,
        grounding: Grounding,
        indices: &[FaultIndex],
    ) -> Vec<Result<UnbalanceRow>> {
        indices
            .iter()
            .map(|index| self.evaluate(*index, grounding))
            .collect()
    }

    fn evaluate(&self, index: FaultIndex, grounding: Grounding) -> Result<UnbalanceRow> {
        let label = index.label();
        let ctx = LogContext::new(self.model.topology().key(), grounding.flag())
            .with_study(self.study)
            .with_fault_index(&label);
        match self.model.compute_row(index, grounding) {
            Ok(row) => {
                cb_debug!(
                    context = ctx,
                    "computed {} of {} columns",
                    row.values.len(),
                    self.model.columns().len()
                );
                Ok(row)
            }
            Err(err) => {
                cb_error!(context = ctx, "row rejected: {err}");
                Err(err)
            }
        }
    }
}
