//! Pad insertion: replaces top-level port markers with `PAD` cells.
//!
//! Each marker stands for one package pin. The user I/O macro on the marker
//! net (if any) is kept and the marker net becomes the pad net. Without a
//! user macro, a plain `IBUF`/`OBUF`/`OBUFT`/`IOBUF` is created between the
//! new pad and the design.

use crate::celltype::CellType;
use crate::data::{Netlist, PortDirection, PortRef};
use crate::errors::LegalizeError;
use crate::ids::{CellId, NetId};

/// Inserts a `PAD` cell for every port marker.
///
/// Returns the pads in marker creation order.
pub fn insert_pads(netlist: &mut Netlist) -> Result<Vec<CellId>, LegalizeError> {
    let markers: Vec<CellId> = netlist
        .cells()
        .filter(|(_, c)| c.cell_type.is_marker())
        .map(|(id, _)| id)
        .collect();
    markers
        .into_iter()
        .map(|marker| insert_pad(netlist, marker))
        .collect()
}

fn insert_pad(netlist: &mut Netlist, marker: CellId) -> Result<CellId, LegalizeError> {
    let cell = netlist.cell(marker)?;
    let name = cell.name.clone();
    let kind = cell.cell_type.clone();
    let in_net = cell.port_net("I");
    let out_net = cell.port_net("O");
    let t_net = cell.port_net("T");

    let mut io_net = None;
    for net in [out_net, in_net].into_iter().flatten() {
        if find_user_macro(netlist, marker, net)?.is_some() {
            io_net = Some(net);
            break;
        }
    }

    let attrs = netlist.remove_cell(marker)?.attrs;
    let pad = netlist.add_cell(name.clone(), CellType::Pad)?;
    netlist.cell_mut(pad)?.attrs = attrs;

    let pad_net = match io_net {
        Some(net) => net,
        None => {
            let pad_net = netlist.add_net(format!("{name}$pad"))?;
            insert_default_buffer(netlist, &name, &kind, pad_net, in_net, out_net, t_net)?;
            pad_net
        }
    };
    netlist.add_connected_port(pad, "PAD", PortDirection::InOut, Some(pad_net))?;
    Ok(pad)
}

/// Finds the I/O macro attached to a marker net through one of its pad-facing
/// ports.
fn find_user_macro(
    netlist: &Netlist,
    marker: CellId,
    net: NetId,
) -> Result<Option<CellId>, LegalizeError> {
    let n = netlist.net(net)?;
    let others: Vec<&PortRef> = n
        .driver
        .iter()
        .chain(n.users.iter())
        .filter(|r| r.cell != marker)
        .collect();

    let mut found = None;
    for r in &others {
        let cell = netlist.cell(r.cell)?;
        if !cell.cell_type.pad_ports().contains(&r.port.as_str()) {
            continue;
        }
        if others.len() > 1 {
            return Err(LegalizeError::structural(
                &cell.name,
                format!(
                    "IO buffer '{}' is connected to more than a single top level IO pin",
                    cell.name
                ),
            ));
        }
        found = Some(r.cell);
    }
    Ok(found)
}

fn insert_default_buffer(
    netlist: &mut Netlist,
    marker: &str,
    kind: &CellType,
    pad_net: NetId,
    in_net: Option<NetId>,
    out_net: Option<NetId>,
    t_net: Option<NetId>,
) -> Result<CellId, LegalizeError> {
    let buf = match kind {
        CellType::InputMarker => {
            let buf = netlist.add_cell(format!("{marker}$ibuf$"), CellType::Ibuf)?;
            netlist.add_connected_port(buf, "I", PortDirection::In, Some(pad_net))?;
            netlist.add_connected_port(buf, "O", PortDirection::Out, out_net)?;
            buf
        }
        CellType::OutputMarker => {
            let ty = if t_net.is_some() {
                CellType::Obuft
            } else {
                CellType::Obuf
            };
            let buf = netlist.add_cell(format!("{marker}$obuf$"), ty)?;
            netlist.add_connected_port(buf, "I", PortDirection::In, in_net)?;
            netlist.add_connected_port(buf, "O", PortDirection::Out, Some(pad_net))?;
            if t_net.is_some() {
                netlist.add_connected_port(buf, "T", PortDirection::In, t_net)?;
            }
            buf
        }
        _ => {
            let buf = netlist.add_cell(format!("{marker}$iobuf$"), CellType::Iobuf)?;
            netlist.add_connected_port(buf, "I", PortDirection::In, in_net)?;
            netlist.add_connected_port(buf, "O", PortDirection::Out, out_net)?;
            netlist.add_connected_port(buf, "T", PortDirection::In, t_net)?;
            netlist.add_connected_port(buf, "IO", PortDirection::InOut, Some(pad_net))?;
            buf
        }
    };
    Ok(buf)
}
