//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Single-wye bank with internally fused units, failed-element sweep."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use crate::{
    errors::Result,
    model::{Arrangement, FaultIndex, Grounding, Quantity, Topology, UnbalanceRow},
    models::{
        double_wye_internal::{WyeInternalCascade, WYE_INTERNAL_COLUMNS},
        UnbalanceModel,
    },
};

/// One wye per phase, no neutral path: `In` is zero for every row.
#[derive(Debug, Clone)]
pub struct SingleWyeInternalFuses {
    arrangement: Arrangement,
    cascade: WyeInternalCascade,
    elements: u32,
}

impl SingleWyeInternalFuses {
    pub fn new(arrangement: &Arrangement) -> Result<Self> {
        let cascade = WyeInternalCascade::new(Topology::SingleWyeInternalFuses, arrangement)?;
        Ok(Self {
            arrangement: *arrangement,
            elements: arrangement.n.unwrap_or_default(),
            cascade,
        })
    }
}

impl UnbalanceModel for SingleWyeInternalFuses {
    fn topology(&self) -> Topology {
        Topology::SingleWyeInternalFuses
    }

    fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    fn columns(&self) -> &'static [Quantity] {
        WYE_INTERNAL_COLUMNS
    }

    fn max_count(&self) -> u32 {
        self.elements
    }

    fn compute_row(&self, index: FaultIndex, grounding: Grounding) -> Result<UnbalanceRow> {
        let failed = self.resolve_count(index)?;
        self.cascade.row(index, failed, grounding, false)
    }
}
