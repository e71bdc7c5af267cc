//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Double-wye bank with internally fused units, failed-element sweep."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use crate::{
    errors::Result,
    model::{Arrangement, FaultIndex, Grounding, Parameter, Quantity, Topology, UnbalanceRow},
    models::{
        element_voltage_ratio, ground_current, neutral_current, neutral_shift, ratio, require,
        series_combine, wye_unit_voltage, UnbalanceModel,
    },
};

pub(crate) const WYE_INTERNAL_COLUMNS: &[Quantity] = &[
    Quantity::Ci,
    Quantity::Vg,
    Quantity::Cu,
    Quantity::Cg,
    Quantity::Cs,
    Quantity::Cp,
    Quantity::Vng,
    Quantity::Vln,
    Quantity::Vcu,
    Quantity::Ve,
    Quantity::Iu,
    Quantity::Ist,
    Quantity::Iph,
    Quantity::Ig,
    Quantity::In,
];

/// Structural counts of a wye string with internally fused units.
#[derive(Debug, Clone)]
pub(crate) struct WyeInternalCascade {
    pub topology: Topology,
    pub s: f64,
    pub pt: f64,
    pub pa: f64,
    pub p: f64,
    pub n: f64,
    pub su: f64,
}

impl WyeInternalCascade {
    pub fn new(topology: Topology, arrangement: &Arrangement) -> Result<Self> {
        Ok(Self {
            topology,
            s: require(topology, arrangement, Parameter::S)?,
            pt: require(topology, arrangement, Parameter::Pt)?,
            pa: require(topology, arrangement, Parameter::Pa)?,
            p: require(topology, arrangement, Parameter::P)?,
            n: require(topology, arrangement, Parameter::N)?,
            su: require(topology, arrangement, Parameter::Su)?,
        })
    }

    /// Cell -> unit -> group -> string -> phase, with `f` failed elements in one cell.
    pub fn row(
        &self,
        index: FaultIndex,
        failed: u32,
        grounding: Grounding,
        with_neutral: bool,
    ) -> Result<UnbalanceRow> {
        let t = self.topology;
        let f = f64::from(failed);

        let ci = ratio(t, "cell capacitance", self.n - f, self.n)?;
        let vg = element_voltage_ratio(self.su, self.n, f);
        let cu = series_combine(t, "unit capacitance", self.su, ci)?;
        let cg = ratio(t, "group capacitance", self.p - 1.0 + cu, self.p)?;
        let cs = series_combine(t, "string capacitance", self.s, cg)?;
        let cp = ratio(t, "phase capacitance", cs * self.p + (self.pt - self.p), self.pt)?;

        let vng = neutral_shift(cp, grounding);
        let vln = 1.0 + vng;
        let vcu = wye_unit_voltage(vln, cs, cg, self.s);
        let iph = cp * vln;
        let neutral = if with_neutral {
            neutral_current(vng, grounding, self.pt, self.pa)
        } else {
            0.0
        };

        Ok(UnbalanceRow::new(index)
            .with(Quantity::Ci, ci)
            .with(Quantity::Vg, vg)
            .with(Quantity::Cu, cu)
            .with(Quantity::Cg, cg)
            .with(Quantity::Cs, cs)
            .with(Quantity::Cp, cp)
            .with(Quantity::Vng, vng)
            .with(Quantity::Vln, vln)
            .with(Quantity::Vcu, vcu)
            .with(Quantity::Ve, vcu * vg)
            .with(Quantity::Iu, vcu * cu)
            .with(Quantity::Ist, cs * vln)
            .with(Quantity::Iph, iph)
            .with(Quantity::Ig, ground_current(grounding, iph))
            .with(Quantity::In, neutral))
    }
}

/// Two wyes sharing a neutral, unbalance read as neutral current `In`.
#[derive(Debug, Clone)]
pub struct DoubleWyeInternalFuses {
    arrangement: Arrangement,
    cascade: WyeInternalCascade,
    elements: u32,
}

impl DoubleWyeInternalFuses {
    pub fn new(arrangement: &Arrangement) -> Result<Self> {
        let topology = Topology::DoubleWyeInternalFuses;
        let cascade = WyeInternalCascade::new(topology, arrangement)?;
        Ok(Self {
            arrangement: *arrangement,
            elements: arrangement.n.unwrap_or_default(),
            cascade,
        })
    }
}

impl UnbalanceModel for DoubleWyeInternalFuses {
    fn topology(&self) -> Topology {
        Topology::DoubleWyeInternalFuses
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
        self.cascade.row(index, failed, grounding, true)
    }
}
