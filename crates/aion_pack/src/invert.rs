//! Inversion folding into programmable-polarity inputs.

use crate::celltype::CellType;
use crate::data::Netlist;
use crate::errors::LegalizeError;
use crate::ids::CellId;
use tracing::debug;

/// Returns the input port of a cell that acts as a single-input inverter:
/// an `INV`, or a `LUT1` with `INIT = 1`.
fn inverter_input(netlist: &Netlist, cell: CellId) -> Result<Option<&'static str>, LegalizeError> {
    let c = netlist.cell(cell)?;
    Ok(match c.cell_type {
        CellType::Inv => Some("I"),
        CellType::Lut1 if c.attr_int("INIT") == Some(1) => Some("I0"),
        _ => None,
    })
}

/// Folds an inverter driving `cell.port` into the port.
///
/// The port is reconnected to the inverter's input and
/// `IS_<port>_INVERTED = 1` is set on `cell`. The inverter is removed once
/// nothing reads its output. Returns `true` if an inverter was folded.
pub fn fold_inverter(netlist: &mut Netlist, cell: CellId, port: &str) -> Result<bool, LegalizeError> {
    let Some(net) = netlist.port_net(cell, port)? else {
        return Ok(false);
    };
    let Some(inv) = netlist.driver_cell(net)? else {
        return Ok(false);
    };
    let Some(inv_input) = inverter_input(netlist, inv)? else {
        return Ok(false);
    };

    let pre_inv = netlist.port_net(inv, inv_input)?;
    netlist.disconnect(cell, port)?;
    if let Some(pre_inv) = pre_inv {
        netlist.connect(cell, port, pre_inv)?;
    }
    netlist
        .cell_mut(cell)?
        .set_attr(format!("IS_{port}_INVERTED"), 1i64);

    if netlist.net(net)?.users.is_empty() {
        let removed = netlist.remove_cell(inv)?;
        debug!(inverter = %removed.name, "folded and removed inverter");
        netlist.remove_net(net)?;
    }
    Ok(true)
}
