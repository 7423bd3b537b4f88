//! Electrical legality checks and final netlist validation.

use crate::celltype::CellType;
use crate::data::{Cell, Netlist, PortDirection};
use crate::errors::LegalizeError;
use crate::ids::CellId;
use aion_arch::{Architecture, TileFamily};
use aion_config::IoConfig;
use aion_diagnostics::Subject;
use tracing::debug;

/// Returns whether `drive` (mA) is legal for `iostandard` on `family`.
///
/// Standards other than `LVTTL*`/`LVCMOS*` have no drive setting to check
/// and always pass.
pub fn drive_supported(family: TileFamily, iostandard: &str, drive: i64) -> bool {
    if !iostandard.starts_with("LVTTL") && !iostandard.starts_with("LVCMOS") {
        return true;
    }
    let lvcmos12 = iostandard == "LVCMOS12";
    match family {
        TileFamily::HighRangeIo => match drive {
            4 | 8 | 12 => true,
            16 => !lvcmos12,
            24 => iostandard == "LVCMOS18" || iostandard == "LVTTL",
            _ => false,
        },
        TileFamily::HighPerformanceIo => match drive {
            2 | 4 | 6 | 8 => true,
            12 | 16 => !lvcmos12,
            _ => false,
        },
        _ => true,
    }
}

/// Checks the `IOSTANDARD` and `DRIVE` of one bound pad.
pub fn check_pad(
    netlist: &Netlist,
    arch: &dyn Architecture,
    config: &IoConfig,
    pad: CellId,
) -> Result<(), LegalizeError> {
    let cell = netlist.cell(pad)?;
    let Some(iostandard) = cell.attr_str("IOSTANDARD") else {
        if config.require_iostandard {
            return Err(LegalizeError::electrical(
                &cell.name,
                format!("port '{}' has no IOSTANDARD property", cell.name),
            ));
        }
        return Ok(());
    };
    if !config.check_drive {
        return Ok(());
    }
    let (Some(bel), Some(drive)) = (cell.bel, cell.attrs.get("DRIVE")) else {
        return Ok(());
    };
    let family = arch.site_family(arch.bel(bel).site);
    let legal = drive
        .as_int()
        .is_some_and(|d| drive_supported(family, iostandard, d));
    if !legal {
        return Err(LegalizeError::electrical(
            &cell.name,
            format!(
                "unsupported DRIVE strength property {drive} for port '{}'",
                cell.name
            ),
        ));
    }
    Ok(())
}

/// Removes nets with neither a driver nor users. Returns how many went.
pub fn prune_nets(netlist: &mut Netlist) -> Result<usize, LegalizeError> {
    let dead: Vec<_> = netlist
        .nets()
        .filter(|(_, net)| net.is_unconnected())
        .map(|(id, _)| id)
        .collect();
    for &id in &dead {
        let net = netlist.remove_net(id)?;
        debug!(net = %net.name, "pruned unconnected net");
    }
    Ok(dead.len())
}

/// Checks the bindings a netlist arrives with against the device.
///
/// A loaded netlist may carry BEL IDs from another device; every one must
/// exist and host its cell's type.
pub fn check_bindings(netlist: &Netlist, arch: &dyn Architecture) -> Result<(), LegalizeError> {
    for (_, cell) in netlist.cells() {
        let Some(bel) = cell.bel else {
            continue;
        };
        if bel.index() >= arch.bel_count() {
            return Err(LegalizeError::constraint(
                &cell.name,
                format!(
                    "'{}' is bound to BEL #{}, which device '{}' does not have",
                    cell.name,
                    bel.as_raw(),
                    arch.device_name()
                ),
            ));
        }
        check_bel_type(arch, cell)?;
    }
    Ok(())
}

fn check_bel_type(arch: &dyn Architecture, cell: &Cell) -> Result<(), LegalizeError> {
    match cell.bel {
        Some(bel) if !arch.bel_accepts(bel, cell.cell_type.name()) => {
            Err(LegalizeError::constraint(
                &cell.name,
                format!(
                    "{} '{}' is bound to '{}', which does not host that type",
                    cell.cell_type,
                    cell.name,
                    arch.bel_full_name(bel)
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Checks the invariants every legalized netlist satisfies.
///
/// A net without a driver may only have users if one of them is a
/// bidirectional pad terminal. Every physical cell, and every cell split out
/// of an I/O macro, must be bound, and every bound cell must have a type its
/// BEL hosts.
pub fn validate(netlist: &Netlist, arch: &dyn Architecture) -> Result<(), LegalizeError> {
    for (_, net) in netlist.nets() {
        if net.driver.is_some() || net.users.is_empty() {
            continue;
        }
        let mut has_terminal = false;
        for user in &net.users {
            let cell = netlist.cell(user.cell)?;
            let inout = cell
                .ports
                .get(&user.port)
                .is_some_and(|p| p.direction == PortDirection::InOut);
            has_terminal |= inout && cell.cell_type == CellType::Pad;
        }
        if !has_terminal {
            return Err(LegalizeError::Structural {
                subject: Subject::Net(net.name.clone()),
                message: format!(
                    "net '{}' has {} users but no driver",
                    net.name,
                    net.users.len()
                ),
            });
        }
    }

    for (_, cell) in netlist.cells() {
        let must_bind = cell.cell_type.is_physical() || cell.attrs.contains_key("X_ORIG_MACRO_PRIM");
        if must_bind && cell.bel.is_none() {
            return Err(LegalizeError::constraint(
                &cell.name,
                format!("{} '{}' was not bound to a BEL", cell.cell_type, cell.name),
            ));
        }
        check_bel_type(arch, cell)?;
    }
    Ok(())
}
