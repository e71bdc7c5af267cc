//! ---
//! cb_section: "02-unbalance-engine"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "H-bridge bank with externally fused units, failed-unit sweep and SU row."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use crate::{
    errors::Result,
    model::{Arrangement, Cell, FaultIndex, Grounding, Quantity, Topology, UnbalanceRow},
    models::{h_bridge_internal::BridgeShape, UnbalanceModel},
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
    Quantity::Iu,
    Quantity::Iph,
    Quantity::Ig,
    Quantity::In,
];

/// `n` blown fuses in one `Pa`-wide group of the left tap leg.
///
/// The `SU` row models a short-circuited unit: the bridge reads as healthy and
/// the unit voltage and current are reported as [`Cell::ShortCircuit`].
#[derive(Debug, Clone)]
pub struct HBridgeExternalFuses {
    arrangement: Arrangement,
    shape: BridgeShape,
    unit_capacitance: f64,
}

impl HBridgeExternalFuses {
    pub fn new(arrangement: &Arrangement) -> Result<Self> {
        Ok(Self {
            arrangement: *arrangement,
            shape: BridgeShape::new(Topology::HBridgeExternalFuses, arrangement)?,
            unit_capacitance: 1.0,
        })
    }

    pub fn with_unit_capacitance(mut self, unit_capacitance: f64) -> Self {
        self.unit_capacitance = unit_capacitance;
        self
    }

    fn numeric_row(
        &self,
        index: FaultIndex,
        blown: u32,
        grounding: Grounding,
    ) -> Result<UnbalanceRow> {
        let width = self.shape.pa;
        let column = width - f64::from(blown);
        let chn = self.shape.tap_leg(column, width)?;
        let response = self.shape.respond(chn, grounding)?;
        let vcu = self.shape.unit_voltage(&response, column, width)?;

        Ok(UnbalanceRow::new(index)
            .with(Quantity::Cu, self.unit_capacitance)
            .with(Quantity::Chn, response.chn)
            .with(Quantity::Cp, response.cp)
            .with(Quantity::Vng, response.vng)
            .with(Quantity::Vln, response.vln)
            .with(Quantity::Vhn, response.vhn)
            .with(Quantity::Ih, response.ih)
            .with(Quantity::Vcu, vcu)
            .with(Quantity::Iu, vcu * self.unit_capacitance)
            .with(Quantity::Iph, response.iph)
            .with(Quantity::Ig, response.ig)
            .with(Quantity::In, 0.0))
    }
}

impl UnbalanceModel for HBridgeExternalFuses {
    fn topology(&self) -> Topology {
        Topology::HBridgeExternalFuses
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

    fn supports_sentinel(&self) -> bool {
        true
    }

    fn compute_row(&self, index: FaultIndex, grounding: Grounding) -> Result<UnbalanceRow> {
        if index.is_sentinel() {
            let mut row = self.numeric_row(index, 0, grounding)?;
            row.values.insert(Quantity::Vcu, Cell::ShortCircuit);
            row.values.insert(Quantity::Iu, Cell::ShortCircuit);
            return Ok(row);
        }
        let blown = self.resolve_count(index)?;
        self.numeric_row(index, blown, grounding)
    }
}
