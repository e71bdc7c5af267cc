//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Double-wye bank with externally fused units, failed-unit sweep."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use crate::{
    errors::Result,
    model::{Arrangement, FaultIndex, Grounding, Parameter, Quantity, Topology, UnbalanceRow},
    models::{
        ground_current, neutral_current, neutral_shift, ratio, require, series_combine,
        wye_unit_voltage, UnbalanceModel,
    },
};

const COLUMNS: &[Quantity] = &[
    Quantity::Cu,
    Quantity::Cg,
    Quantity::Cs,
    Quantity::Cp,
    Quantity::Vng,
    Quantity::Vln,
    Quantity::Vcu,
    Quantity::Iu,
    Quantity::Iy,
    Quantity::Iph,
    Quantity::Ig,
    Quantity::In,
];

/// `n` blown fuses in one group of the left wye (`Pa` units wide).
#[derive(Debug, Clone)]
pub struct DoubleWyeExternalFuses {
    arrangement: Arrangement,
    s: f64,
    pt: f64,
    pa: f64,
    unit_capacitance: f64,
}

impl DoubleWyeExternalFuses {
    pub fn new(arrangement: &Arrangement) -> Result<Self> {
        let topology = Topology::DoubleWyeExternalFuses;
        Ok(Self {
            arrangement: *arrangement,
            s: require(topology, arrangement, Parameter::S)?,
            pt: require(topology, arrangement, Parameter::Pt)?,
            pa: require(topology, arrangement, Parameter::Pa)?,
            unit_capacitance: 1.0,
        })
    }

    /// Per-unit capacitance of a healthy unit, reported as `Cu` and used for `Iu`.
    pub fn with_unit_capacitance(mut self, unit_capacitance: f64) -> Self {
        self.unit_capacitance = unit_capacitance;
        self
    }
}

impl UnbalanceModel for DoubleWyeExternalFuses {
    fn topology(&self) -> Topology {
        Topology::DoubleWyeExternalFuses
    }

    fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    fn columns(&self) -> &'static [Quantity] {
        COLUMNS
    }

    fn max_count(&self) -> u32 {
        self.arrangement.pa
    }

    fn compute_row(&self, index: FaultIndex, grounding: Grounding) -> Result<UnbalanceRow> {
        let t = self.topology();
        let n = f64::from(self.resolve_count(index)?);

        let cg = ratio(t, "group capacitance", self.pa - n, self.pa)?;
        let cs = series_combine(t, "string capacitance", self.s, cg)?;
        let cp = ratio(t, "phase capacitance", cs * self.pa + (self.pt - self.pa), self.pt)?;

        let vng = neutral_shift(cp, grounding);
        let vln = 1.0 + vng;
        let vcu = wye_unit_voltage(vln, cs, cg, self.s);
        let iph = cp * vln;

        Ok(UnbalanceRow::new(index)
            .with(Quantity::Cu, self.unit_capacitance)
            .with(Quantity::Cg, cg)
            .with(Quantity::Cs, cs)
            .with(Quantity::Cp, cp)
            .with(Quantity::Vng, vng)
            .with(Quantity::Vln, vln)
            .with(Quantity::Vcu, vcu)
            .with(Quantity::Iu, vcu * self.unit_capacitance)
            .with(Quantity::Iy, cs * vln)
            .with(Quantity::Iph, iph)
            .with(Quantity::Ig, ground_current(grounding, iph))
            .with(Quantity::In, neutral_current(vng, grounding, self.pt, self.pa)))
    }
}
