//! The I/O transform pass.
//!
//! Runs the per-family buffer rules over cells bound in each family and the
//! generic rules over every bound cell. Differential sub-cells are then
//! specialised to the exact site type they landed on, and every pad is
//! checked electrically.

use crate::celltype::CellType;
use crate::checks::check_pad;
use crate::data::Netlist;
use crate::errors::LegalizeError;
use crate::ids::CellId;
use crate::rules::{generic_io_rules, io_buffer_rules};
use crate::xform::{apply_rules, first_candidate, Scope};
use aion_arch::{Architecture, TileFamily};
use aion_config::IoConfig;
use tracing::debug;

const FAMILY_PREFIXES: [&str; 2] = ["IOB33", "IOB18"];

/// Runs the transform pass. Returns the number of cells whose type changed.
pub fn transform_io(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    config: &IoConfig,
) -> Result<usize, LegalizeError> {
    let mut changed = 0;
    for family in [TileFamily::HighRangeIo, TileFamily::HighPerformanceIo] {
        let cells = bound_in_family(netlist, arch, family);
        changed += apply_rules(
            netlist,
            &io_buffer_rules(family),
            &Scope::Cells(cells),
            &first_candidate,
        )?;
    }
    // Unbound inverters are fabric logic and stay foldable.
    let bound: Vec<CellId> = netlist
        .cells()
        .filter(|(_, c)| c.bel.is_some())
        .map(|(id, _)| id)
        .collect();
    changed += apply_rules(netlist, &generic_io_rules(), &Scope::Cells(bound), &first_candidate)?;
    changed += specialise_site_types(netlist, arch)?;

    for pad in netlist.cells_of_type(&CellType::Pad) {
        if let Some(std) = &config.default_iostandard {
            let cell = netlist.cell_mut(pad)?;
            if cell.attr_str("IOSTANDARD").is_none() {
                cell.set_attr("IOSTANDARD", std.as_str());
            }
        }
        check_pad(netlist, arch, config, pad)?;
    }
    Ok(changed)
}

fn bound_in_family(netlist: &Netlist, arch: &dyn Architecture, family: TileFamily) -> Vec<CellId> {
    netlist
        .cells()
        .filter(|(_, c)| {
            c.bel
                .is_some_and(|bel| arch.site_family(arch.bel(bel).site) == family)
        })
        .map(|(id, _)| id)
        .collect()
}

/// Replaces the family prefix of cells tagged with `X_IOB_SITE_TYPE` by the
/// type of the site they are bound to.
fn specialise_site_types(netlist: &mut Netlist, arch: &dyn Architecture) -> Result<usize, LegalizeError> {
    let mut changed = 0;
    for id in netlist.cell_ids() {
        let cell = netlist.cell(id)?;
        let Some(tagged) = cell.attr_str("X_IOB_SITE_TYPE") else {
            continue;
        };
        let site_type = match cell.bel {
            Some(bel) => arch.site(arch.bel(bel).site).site_type.clone(),
            None => tagged.to_string(),
        };
        let name = cell.cell_type.name();
        if name.starts_with(&site_type) {
            continue;
        }
        let Some(rest) = FAMILY_PREFIXES
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))
        else {
            continue;
        };
        let specialised = CellType::from_name(&format!("{site_type}{rest}"));
        if specialised == cell.cell_type {
            continue;
        }
        debug!(cell = %cell.name, from = %cell.cell_type, to = %specialised, "specialised site type");
        netlist.cell_mut(id)?.cell_type = specialised;
        changed += 1;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::bind_cell;
    use crate::data::PortDirection;
    use aion_arch::xilinx::series7::{IoBank, IoColumn};
    use aion_arch::Device;

    fn device() -> Device {
        IoColumn::new("t")
            .bank(IoBank::high_range(14).numbered_sites(0, 2))
            .bank(IoBank::high_performance(33).numbered_sites(2, 1))
            .build()
            .unwrap()
    }

    fn bound(nl: &mut Netlist, dev: &Device, name: &str, ty: CellType, bel: &str) -> CellId {
        let c = nl.add_cell(name, ty).unwrap();
        bind_cell(nl, dev, c, dev.bel_by_name(bel).unwrap()).unwrap();
        c
    }

    #[test]
    fn buffers_follow_bound_family() {
        let dev = device();
        let mut nl = Netlist::new();
        let hr = bound(&mut nl, &dev, "hr", CellType::Obuf, "IOB_0/OUTBUF");
        let hp = bound(&mut nl, &dev, "hp", CellType::Ibuf, "IOB_2/INBUF_DCIEN");
        let i = nl.add_net("i").unwrap();
        nl.add_connected_port(hr, "I", PortDirection::In, Some(i))
            .unwrap();
        let inv = bound(&mut nl, &dev, "inv", CellType::Inv, "IOB_1/O_ININV");
        nl.add_connected_port(inv, "O", PortDirection::Out, Some(i))
            .unwrap();
        let fabric_inv = nl.add_cell("fabric_inv", CellType::Inv).unwrap();

        let n = transform_io(&mut nl, &dev, &IoConfig::default()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(nl.cell(hr).unwrap().cell_type, CellType::Iob33Outbuf);
        assert_eq!(nl.port_net(hr, "IN").unwrap(), Some(i));
        assert_eq!(nl.cell(hp).unwrap().cell_type, CellType::Iob18InbufDcien);
        assert_eq!(nl.cell(inv).unwrap().cell_type, CellType::Inverter);
        assert_eq!(nl.port_net(inv, "OUT").unwrap(), Some(i));
        assert_eq!(nl.cell(fabric_inv).unwrap().cell_type, CellType::Inv);
    }

    #[test]
    fn specialises_tagged_legs() {
        let dev = device();
        let mut nl = Netlist::new();
        let leg = bound(&mut nl, &dev, "leg", CellType::Obuf, "IOB_1/OUTBUF");
        nl.cell_mut(leg)
            .unwrap()
            .set_attr("X_IOB_SITE_TYPE", "IOB33S");
        transform_io(&mut nl, &dev, &IoConfig::default()).unwrap();
        assert_eq!(nl.cell(leg).unwrap().cell_type.name(), "IOB33S_OUTBUF");
        // A second run leaves the specialised type alone.
        assert_eq!(transform_io(&mut nl, &dev, &IoConfig::default()).unwrap(), 0);
    }

    #[test]
    fn default_iostandard_applies_before_check() {
        let dev = device();
        let mut nl = Netlist::new();
        let pad = bound(&mut nl, &dev, "p", CellType::Pad, "IOB_0/PAD");
        assert!(transform_io(&mut nl, &dev, &IoConfig::default()).is_err());

        let config = IoConfig {
            default_iostandard: Some("LVCMOS33".into()),
            ..IoConfig::default()
        };
        transform_io(&mut nl, &dev, &config).unwrap();
        assert_eq!(nl.cell(pad).unwrap().attr_str("IOSTANDARD"), Some("LVCMOS33"));
    }
}
