//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "H-bridge bank with internally fused units, failed-element sweep."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
//! H-bridge formulas run in unit-capacitance terms. A healthy phase has
//! `Cp0 = Pt/S`, tap leg `Chn0 = Pt/St` and tap voltage `Vh0 = St/S`; the
//! reported `Cp`, `Chn` and `Vhn` are divided by those so a healthy bank reads 1.0.
use crate::{
    errors::Result,
    model::{Arrangement, FaultIndex, Grounding, Parameter, Quantity, Topology, UnbalanceRow},
    models::{element_voltage_ratio, ground_current, ratio, require, UnbalanceModel},
};

const COLUMNS: &[Quantity] = &[
    Quantity::Cu,
    Quantity::Chn,
    Quantity::Cp,
    Quantity::Vng,
    Quantity::Vln,
    Quantity::Vhn,
    Quantity::Ih,
    Quantity::Vcu,
    Quantity::Ve,
    Quantity::Iu,
    Quantity::Iph,
    Quantity::Ig,
    Quantity::In,
];

/// Counts shared by both H-bridge variants.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BridgeShape {
    pub topology: Topology,
    pub s: f64,
    pub st: f64,
    pub pt: f64,
    pub pa: f64,
}

/// Phase-level response of the bridge to a given tap-leg capacitance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BridgeResponse {
    pub chn: f64,
    pub cp: f64,
    pub vng: f64,
    pub vln: f64,
    /// Tap-to-neutral voltage as a fraction of phase voltage, not normalised.
    pub vh: f64,
    pub vhn: f64,
    pub ih: f64,
    pub iph: f64,
    pub ig: f64,
}

impl BridgeShape {
    pub fn new(topology: Topology, arrangement: &Arrangement) -> Result<Self> {
        Ok(Self {
            topology,
            s: require(topology, arrangement, Parameter::S)?,
            st: require(topology, arrangement, Parameter::St)?,
            pt: require(topology, arrangement, Parameter::Pt)?,
            pa: require(topology, arrangement, Parameter::Pa)?,
        })
    }

    /// Healthy tap leg `(Pt - width)/St` plus a faulted `width`-unit column in series with `St-1` healthy groups.
    pub fn tap_leg(&self, column: f64, width: f64) -> Result<f64> {
        let t = self.topology;
        let faulted = ratio(
            t,
            "faulted tap column",
            column * width,
            column * (self.st - 1.0) + width,
        )?;
        Ok(faulted + ratio(t, "healthy tap column", self.pt - width, self.st)?)
    }

    pub fn respond(&self, chn: f64, grounding: Grounding) -> Result<BridgeResponse> {
        let t = self.topology;
        let upper = self.s - self.st;
        let cp = ratio(t, "phase capacitance", chn * self.pt, chn * upper + self.pt)?;
        let cp_norm = ratio(t, "phase normalisation", cp * self.s, self.pt)?;
        let chn_norm = ratio(t, "tap normalisation", chn * self.st, self.pt)?;
        let vh = ratio(t, "tap voltage", cp, chn)?;
        let vh0 = ratio(t, "healthy tap voltage", self.st, self.s)?;

        let vln = 1.0 + grounding.factor() * (3.0 / (2.0 + cp_norm) - 1.0);
        let vng = vln - 1.0;
        let bridge_admittance =
            ratio(t, "upper section", 1.0, upper)? + ratio(t, "tap section", 1.0, self.st)?;
        let ih = -vln * (vh0 - vh) * bridge_admittance * (self.s * (self.pt - self.pa) / self.pt);
        let iph = cp_norm * vln;

        Ok(BridgeResponse {
            chn: chn_norm,
            cp: cp_norm,
            vng,
            vln,
            vh,
            vhn: ratio(t, "tap voltage normalisation", vh, vh0)?,
            ih,
            iph,
            ig: ground_current(grounding, iph),
        })
    }

    /// Voltage on the faulted column's units, per unit of `Vphase/S`.
    pub fn unit_voltage(&self, response: &BridgeResponse, column: f64, width: f64) -> Result<f64> {
        let share = ratio(
            self.topology,
            "faulted column voltage",
            width,
            width + (self.st - 1.0) * column,
        )?;
        Ok(response.vln * response.vh * share * self.s)
    }
}

/// `f` failed elements in one cell of a unit in the left tap leg.
#[derive(Debug, Clone)]
pub struct HBridgeInternalFuses {
    arrangement: Arrangement,
    shape: BridgeShape,
    p: f64,
    n: f64,
    su: f64,
}

impl HBridgeInternalFuses {
    pub fn new(arrangement: &Arrangement) -> Result<Self> {
        let topology = Topology::HBridgeInternalFuses;
        Ok(Self {
            arrangement: *arrangement,
            shape: BridgeShape::new(topology, arrangement)?,
            p: require(topology, arrangement, Parameter::P)?,
            n: require(topology, arrangement, Parameter::N)?,
            su: require(topology, arrangement, Parameter::Su)?,
        })
    }
}

impl UnbalanceModel for HBridgeInternalFuses {
    fn topology(&self) -> Topology {
        Topology::HBridgeInternalFuses
    }

    fn arrangement(&self) -> &Arrangement {
        &self.arrangement
    }

    fn columns(&self) -> &'static [Quantity] {
        COLUMNS
    }

    fn max_count(&self) -> u32 {
        self.arrangement.n.unwrap_or_default()
    }

    fn compute_row(&self, index: FaultIndex, grounding: Grounding) -> Result<UnbalanceRow> {
        let t = self.topology();
        let f = f64::from(self.resolve_count(index)?);
        let healthy = self.n - f;

        let cu = ratio(
            t,
            "unit capacitance",
            self.su * healthy,
            healthy * (self.su - 1.0) + self.n,
        )?;
        // Faulted group: one derated unit beside P-1 healthy ones.
        let group = cu + self.p - 1.0;
        let chn = self.shape.tap_leg(group, self.p)?;
        let response = self.shape.respond(chn, grounding)?;
        let vcu = self.shape.unit_voltage(&response, group, self.p)?;
        let ve = vcu * element_voltage_ratio(self.su, self.n, f);

        Ok(UnbalanceRow::new(index)
            .with(Quantity::Cu, cu)
            .with(Quantity::Chn, response.chn)
            .with(Quantity::Cp, response.cp)
            .with(Quantity::Vng, response.vng)
            .with(Quantity::Vln, response.vln)
            .with(Quantity::Vhn, response.vhn)
            .with(Quantity::Ih, response.ih)
            .with(Quantity::Vcu, vcu)
            .with(Quantity::Ve, ve)
            .with(Quantity::Iu, vcu * cu)
            .with(Quantity::Iph, response.iph)
            .with(Quantity::Ig, response.ig)
            .with(Quantity::In, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{assert_balanced, assert_close, value, TOLERANCE};

    fn model() -> HBridgeInternalFuses {
        HBridgeInternalFuses::new(&Arrangement {
            s: 7,
            st: Some(3),
            pt: 9,
            pa: 5,
            p: Some(2),
            n: Some(16),
            su: Some(3),
        })
        .unwrap()
    }

    #[test]
    fn healthy_bridge_is_balanced() {
        for grounding in [Grounding::Grounded, Grounding::Ungrounded] {
            let row = model()
                .compute_row(FaultIndex::FailedElements(0), grounding)
                .unwrap();
            assert_balanced(&row);
        }
    }

    #[test]
    fn failed_elements_unbalance_the_bridge() {
        let model = model();
        let row = model
            .compute_row(FaultIndex::FailedElements(4), Grounding::Grounded)
            .unwrap();
        let cu = 3.0 * 12.0 / (12.0 * 2.0 + 16.0);
        assert_close(value(&row, Quantity::Cu), cu, 1e-12);
        assert!(value(&row, Quantity::Chn) < 1.0);
        assert!(value(&row, Quantity::Cp) < 1.0);
        assert!(value(&row, Quantity::Vhn) > 1.0);
        assert!(value(&row, Quantity::Ih).abs() > TOLERANCE);
        assert!(value(&row, Quantity::Vcu) > 1.0);
        assert!(value(&row, Quantity::Ve) > value(&row, Quantity::Vcu));
        assert_eq!(value(&row, Quantity::Vng), 0.0);
        assert_eq!(value(&row, Quantity::In), 0.0);
    }

    #[test]
    fn default_domain_counts_elements() {
        let domain = model().default_domain();
        assert_eq!(domain.len(), 16);
        assert!(domain
            .iter()
            .all(|index| matches!(index, FaultIndex::FailedElements(_))));
    }
}
