//! Delay-controller replication.
//!
//! A design instantiates at most one `IDELAYCTRL`, but the device needs one
//! per clock region that holds a delay element. The controller is cloned
//! onto the `IDELAYCTRL` site of every such region, its inputs fanned out to
//! every clone, and the clones' `RDY` outputs AND-ed back into the original
//! `RDY` net with a chain of `LUT2`s.

use crate::bind::bind_to_site;
use crate::celltype::CellType;
use crate::data::{int_name, Netlist, PortDirection};
use crate::errors::LegalizeError;
use crate::ids::{CellId, NetId};
use crate::navigate::locate_in_region;
use aion_arch::{Architecture, SiteId};
use std::collections::BTreeMap;

/// `INIT` of a two-input AND.
const AND2_INIT: i64 = 8;

/// Collects the controller sites of the regions holding bound delays, keyed
/// by site name.
fn delay_regions(
    netlist: &Netlist,
    arch: &dyn Architecture,
) -> Result<BTreeMap<String, SiteId>, LegalizeError> {
    let mut regions = BTreeMap::new();
    for (_, cell) in netlist.cells() {
        let is_delay = matches!(
            cell.cell_type,
            CellType::Idelaye2
                | CellType::Odelaye2
                | CellType::Idelaye2Idelaye2
                | CellType::Odelaye2Odelaye2
        );
        if !is_delay || cell.bel.is_none() {
            continue;
        }
        let Some(io_bel_name) = cell.attr_str("X_IO_BEL") else {
            continue;
        };
        let Some(io_bel) = arch.bel_by_name(io_bel_name) else {
            return Err(LegalizeError::structural(
                &cell.name,
                format!("'{}' refers to unknown I/O BEL '{io_bel_name}'", cell.name),
            ));
        };
        let ctrl = locate_in_region(arch, arch.bel(io_bel).site, "IDELAYCTRL")?;
        regions.insert(arch.site(ctrl).name.clone(), ctrl);
    }
    Ok(regions)
}

/// Replicates the design's `IDELAYCTRL` per clock region.
///
/// With `merge` off, a controller serving a single region is bound in place
/// and one serving several regions is an error. Returns the number of
/// clones created.
pub fn merge_delay_control(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    merge: bool,
) -> Result<usize, LegalizeError> {
    let ctrls = netlist.cells_of_type(&CellType::Idelayctrl);
    let ctrl = match ctrls.as_slice() {
        [] => return Ok(0),
        [ctrl] => *ctrl,
        [_, second, ..] => {
            let name = &netlist.cell(*second)?.name;
            return Err(LegalizeError::structural(
                name,
                "Found more than one IDELAYCTRL cell!",
            ));
        }
    };
    let name = netlist.cell(ctrl)?.name.clone();

    let regions = delay_regions(netlist, arch)?;
    if regions.is_empty() {
        return Err(LegalizeError::structural(
            &name,
            "Found IDELAYCTRL but no I/ODELAYs",
        ));
    }

    if !merge {
        let Some((_, &site)) = regions.iter().next().filter(|_| regions.len() == 1) else {
            return Err(LegalizeError::constraint(
                &name,
                format!(
                    "'{name}' serves delays in {} clock regions but delay control merging is disabled",
                    regions.len()
                ),
            ));
        };
        bind_to_site(netlist, arch, ctrl, site, "IDELAYCTRL")?;
        return Ok(0);
    }

    let rdy = netlist.disconnect(ctrl, "RDY")?;
    let refclk = netlist.port_net(ctrl, "REFCLK")?;
    let rst = netlist.port_net(ctrl, "RST")?;
    let single = regions.len() == 1;

    let mut dup_rdys = Vec::new();
    for (i, &site) in regions.values().enumerate() {
        let dup_name = format!("CTRL_DUP_{i}");
        let dup = netlist.add_cell(int_name(&name, &dup_name, false), CellType::Idelayctrl)?;
        netlist.add_connected_port(dup, "REFCLK", PortDirection::In, refclk)?;
        netlist.add_connected_port(dup, "RST", PortDirection::In, rst)?;
        if let Some(rdy) = rdy {
            let dup_rdy = if single {
                rdy
            } else {
                netlist.create_internal_net(&name, &format!("{dup_name}_RDY"), false)?
            };
            netlist.add_connected_port(dup, "RDY", PortDirection::Out, Some(dup_rdy))?;
            dup_rdys.push(dup_rdy);
        }
        bind_to_site(netlist, arch, dup, site, "IDELAYCTRL")?;
    }
    netlist.remove_cell(ctrl)?;

    if let Some(rdy) = rdy {
        and_chain(netlist, &name, &dup_rdys, rdy)?;
    }
    Ok(regions.len())
}

/// ANDs `inputs` left to right into `out`: `((a & b) & c) & ...`.
fn and_chain(
    netlist: &mut Netlist,
    base: &str,
    inputs: &[NetId],
    out: NetId,
) -> Result<Vec<CellId>, LegalizeError> {
    let mut luts = Vec::new();
    let Some((&first, rest)) = inputs.split_first() else {
        return Ok(luts);
    };
    let mut acc = first;
    for (k, &next) in rest.iter().enumerate() {
        let j = k + 1;
        let anded = if j == rest.len() {
            out
        } else {
            netlist.create_internal_net(base, &format!("ANDED_RDY_{j}"), false)?
        };
        let lut = netlist.add_cell(format!("{base}/RDY_AND_LUT_{j}"), CellType::Lut2)?;
        netlist.add_connected_port(lut, "I0", PortDirection::In, Some(acc))?;
        netlist.add_connected_port(lut, "I1", PortDirection::In, Some(next))?;
        netlist.add_connected_port(lut, "O", PortDirection::Out, Some(anded))?;
        netlist.cell_mut(lut)?.set_attr("INIT", AND2_INIT);
        luts.push(lut);
        acc = anded;
    }
    Ok(luts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind_cell;
    use aion_arch::xilinx::series7::{IoBank, IoColumn};
    use aion_arch::Device;

    fn device() -> Device {
        IoColumn::new("t")
            .bank(IoBank::high_range(14).numbered_sites(0, 2))
            .bank(IoBank::high_performance(33).numbered_sites(10, 2))
            .bank(IoBank::high_performance(34).numbered_sites(20, 2))
            .build()
            .unwrap()
    }

    /// Adds an already-bound `IDELAYE2` serving the buffer on `iob`.
    fn delay(nl: &mut Netlist, dev: &Device, iob: &str, inbuf: &str) {
        let d = nl.add_cell(format!("dly_{iob}"), CellType::Idelaye2).unwrap();
        let bel = dev.bel_by_name(&format!("IDELAY_{iob}/IDELAYE2")).unwrap();
        bind_cell(nl, dev, d, bel).unwrap();
        nl.cell_mut(d)
            .unwrap()
            .set_attr("X_IO_BEL", format!("{iob}/{inbuf}"));
    }

    fn ctrl(nl: &mut Netlist) -> (NetId, NetId) {
        let c = nl.add_cell("idc", CellType::Idelayctrl).unwrap();
        let refclk = nl.add_net("refclk").unwrap();
        let rdy = nl.add_net("rdy").unwrap();
        nl.add_connected_port(c, "REFCLK", PortDirection::In, Some(refclk))
            .unwrap();
        nl.add_connected_port(c, "RDY", PortDirection::Out, Some(rdy))
            .unwrap();
        let user = nl.add_cell("rdy_user", CellType::Lut1).unwrap();
        nl.add_connected_port(user, "I0", PortDirection::In, Some(rdy))
            .unwrap();
        (refclk, rdy)
    }

    #[test]
    fn single_region_reuses_rdy() {
        let dev = device();
        let mut nl = Netlist::new();
        let (refclk, rdy) = ctrl(&mut nl);
        delay(&mut nl, &dev, "IOB_0", "INBUF_EN");
        delay(&mut nl, &dev, "IOB_1", "INBUF_EN");
        assert_eq!(merge_delay_control(&mut nl, &dev, true).unwrap(), 1);

        assert!(nl.cell_by_name("idc").is_none());
        let dup = nl.cell_by_name("idc/CTRL_DUP_0").unwrap();
        assert_eq!(nl.driver_cell(rdy).unwrap(), Some(dup));
        assert_eq!(nl.port_net(dup, "REFCLK").unwrap(), Some(refclk));
        assert_eq!(
            nl.cell(dup).unwrap().attr_str("BEL"),
            Some("IDELAYCTRL_B14/IDELAYCTRL")
        );
        assert!(nl.cells_of_type(&CellType::Lut2).is_empty());
    }

    #[test]
    fn three_regions_and_left_to_right() {
        let dev = device();
        let mut nl = Netlist::new();
        let (refclk, rdy) = ctrl(&mut nl);
        delay(&mut nl, &dev, "IOB_20", "INBUF_DCIEN");
        delay(&mut nl, &dev, "IOB_0", "INBUF_EN");
        delay(&mut nl, &dev, "IOB_11", "INBUF_DCIEN");
        assert_eq!(merge_delay_control(&mut nl, &dev, true).unwrap(), 3);

        // Clones follow region site name order.
        let bel_of = |name: &str| {
            let id = nl.cell_by_name(name).unwrap();
            nl.cell(id).unwrap().attr_str("BEL").unwrap().to_string()
        };
        assert_eq!(bel_of("idc/CTRL_DUP_0"), "IDELAYCTRL_B14/IDELAYCTRL");
        assert_eq!(bel_of("idc/CTRL_DUP_1"), "IDELAYCTRL_B33/IDELAYCTRL");
        assert_eq!(bel_of("idc/CTRL_DUP_2"), "IDELAYCTRL_B34/IDELAYCTRL");
        assert_eq!(nl.net(refclk).unwrap().users.len(), 3);

        let lut1 = nl.cell_by_name("idc/RDY_AND_LUT_1").unwrap();
        let lut2 = nl.cell_by_name("idc/RDY_AND_LUT_2").unwrap();
        assert_eq!(nl.cell(lut1).unwrap().attr_int("INIT"), Some(8));
        let rdy0 = nl.net_by_name("idc/CTRL_DUP_0_RDY").unwrap();
        let rdy2 = nl.net_by_name("idc/CTRL_DUP_2_RDY").unwrap();
        let anded = nl.net_by_name("idc/ANDED_RDY_1").unwrap();
        assert_eq!(nl.port_net(lut1, "I0").unwrap(), Some(rdy0));
        assert_eq!(nl.port_net(lut1, "O").unwrap(), Some(anded));
        assert_eq!(nl.port_net(lut2, "I0").unwrap(), Some(anded));
        assert_eq!(nl.port_net(lut2, "I1").unwrap(), Some(rdy2));
        assert_eq!(nl.driver_cell(rdy).unwrap(), Some(lut2));
    }

    #[test]
    fn no_delays_is_an_error() {
        let dev = device();
        let mut nl = Netlist::new();
        ctrl(&mut nl);
        let err = merge_delay_control(&mut nl, &dev, true).unwrap_err();
        assert!(err.to_string().contains("no I/ODELAYs"));
    }

    #[test]
    fn two_controllers_rejected() {
        let dev = device();
        let mut nl = Netlist::new();
        ctrl(&mut nl);
        nl.add_cell("idc2", CellType::Idelayctrl).unwrap();
        let err = merge_delay_control(&mut nl, &dev, true).unwrap_err();
        assert_eq!(err.subject(), Some(&aion_diagnostics::Subject::Cell("idc2".into())));
    }

    #[test]
    fn merging_disabled() {
        let dev = device();
        let mut nl = Netlist::new();
        ctrl(&mut nl);
        delay(&mut nl, &dev, "IOB_0", "INBUF_EN");
        assert_eq!(merge_delay_control(&mut nl, &dev, false).unwrap(), 0);
        let idc = nl.cell_by_name("idc").unwrap();
        assert_eq!(
            nl.cell(idc).unwrap().attr_str("BEL"),
            Some("IDELAYCTRL_B14/IDELAYCTRL")
        );

        delay(&mut nl, &dev, "IOB_10", "INBUF_DCIEN");
        nl.cell_mut(idc).unwrap().bel = None;
        let err = merge_delay_control(&mut nl, &dev, false).unwrap_err();
        assert!(matches!(err, LegalizeError::Constraint { .. }));
    }
}
