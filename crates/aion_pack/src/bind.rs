//! Resource binding for pads.
//!
//! Binding runs in two phases. Pads with a location constraint (`LOC`,
//! `PACKAGE_PIN` or an explicit `BEL`) are bound first. The remaining pads
//! then draw sites from a pool of free, bonded, non-reserved I/O sites in
//! device enumeration order. The pool is sized before any unconstrained pad
//! is bound, so exhaustion leaves only the constrained bindings behind.

use crate::data::Netlist;
use crate::errors::{progress, LegalizeError};
use crate::ids::CellId;
use aion_arch::{Architecture, BelId, SiteId};
use aion_diagnostics::DiagnosticSink;
use std::collections::HashSet;
use std::collections::VecDeque;

/// Counts of pads bound by each phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindSummary {
    /// Pads bound from a user constraint.
    pub constrained: usize,
    /// Pads bound from the free-site pool.
    pub allocated: usize,
}

/// Binds every pad in `pads` to the `PAD` BEL of an I/O site.
pub fn bind_io(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    pads: &[CellId],
    sink: &DiagnosticSink,
) -> Result<BindSummary, LegalizeError> {
    let mut summary = BindSummary::default();
    let mut used = HashSet::new();
    let mut unconstrained = Vec::new();

    for &pad in pads {
        match constrained_bel(netlist, arch, pad, sink)? {
            Some(bel) => {
                bind_cell(netlist, arch, pad, bel)?;
                used.insert(bel);
                summary.constrained += 1;
            }
            None => unconstrained.push(pad),
        }
    }

    let mut pool: VecDeque<BelId> = arch
        .sites()
        .into_iter()
        .filter(|&site| is_allocatable(arch, site))
        .filter_map(|site| arch.site_bel(site, "PAD"))
        .filter(|bel| !used.contains(bel))
        .take(unconstrained.len())
        .collect();

    if pool.len() < unconstrained.len() {
        let name = &netlist.cell(unconstrained[pool.len()])?.name;
        return Err(LegalizeError::constraint(
            name,
            format!(
                "IO placer ran out of available IOs ({} available IO, {} unconstrained pins)",
                pool.len(),
                unconstrained.len()
            ),
        ));
    }

    for pad in unconstrained {
        let Some(bel) = pool.pop_front() else { break };
        bind_cell(netlist, arch, pad, bel)?;
        summary.allocated += 1;
    }
    Ok(summary)
}

/// Only bonded, non-reserved I/O bank sites take unconstrained pads.
fn is_allocatable(arch: &dyn Architecture, site: SiteId) -> bool {
    let s = arch.site(site);
    s.package_pin.is_some() && !s.reserved && arch.site_family(site).is_io_bank()
}

/// Resolves a pad's location constraint to a `PAD` BEL.
fn constrained_bel(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    pad: CellId,
    sink: &DiagnosticSink,
) -> Result<Option<BelId>, LegalizeError> {
    let cell = netlist.cell_mut(pad)?;
    if let Some(pin) = cell.attrs.get("PACKAGE_PIN").cloned() {
        cell.attrs.insert("LOC".to_string(), pin);
    }

    if let Some(loc) = cell.attrs.get("LOC").map(|v| v.to_string()) {
        let Some(site) = arch.package_pin_site(&loc) else {
            return Err(LegalizeError::constraint(
                &cell.name,
                format!(
                    "Unable to constrain IO '{}', device does not have a pin named '{loc}'",
                    cell.name
                ),
            ));
        };
        let site_name = &arch.site(site).name;
        sink.emit(progress(format!(
            "Constraining '{}' to site '{site_name}'",
            cell.name
        )));
        let bel = arch.site_bel(site, "PAD").ok_or_else(|| {
            LegalizeError::fabric(site_name, format!("site '{site_name}' has no PAD"))
        })?;
        return Ok(Some(bel));
    }

    match cell.attr_str("BEL") {
        Some(bel_name) => arch.bel_by_name(bel_name).map(Some).ok_or_else(|| {
            LegalizeError::constraint(
                &cell.name,
                format!("'{}' is constrained to unknown BEL '{bel_name}'", cell.name),
            )
        }),
        None => Ok(None),
    }
}

/// Binds a cell to a BEL and records the binding in its `BEL` attribute.
///
/// Fails if another cell already occupies the BEL or the BEL cannot host the
/// cell's type.
pub(crate) fn bind_cell(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    cell: CellId,
    bel: BelId,
) -> Result<(), LegalizeError> {
    let bel_name = arch.bel_full_name(bel);
    if let Some((_, other)) = netlist
        .cells()
        .find(|(id, c)| *id != cell && c.bel == Some(bel))
    {
        let name = &netlist.cell(cell)?.name;
        return Err(LegalizeError::constraint(
            name,
            format!(
                "cannot bind '{name}' to '{bel_name}': already occupied by '{}'",
                other.name
            ),
        ));
    }
    let c = netlist.cell_mut(cell)?;
    if !arch.bel_accepts(bel, c.cell_type.name()) {
        return Err(LegalizeError::constraint(
            &c.name,
            format!(
                "cannot bind {} '{}' to '{bel_name}': the BEL does not host that type",
                c.cell_type, c.name
            ),
        ));
    }
    c.bel = Some(bel);
    c.set_attr("BEL", bel_name);
    Ok(())
}

/// Binds a cell to the named BEL of a site.
pub(crate) fn bind_to_site(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    cell: CellId,
    site: SiteId,
    bel_name: &str,
) -> Result<(), LegalizeError> {
    let site_name = &arch.site(site).name;
    let bel = arch.site_bel(site, bel_name).ok_or_else(|| {
        LegalizeError::fabric(site_name, format!("site '{site_name}' has no BEL '{bel_name}'"))
    })?;
    bind_cell(netlist, arch, cell, bel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celltype::CellType;
    use aion_arch::xilinx::series7::{IoBank, IoColumn};
    use aion_arch::Device;
    use aion_diagnostics::Severity;

    fn device() -> Device {
        IoColumn::new("t")
            .bank(
                IoBank::high_range(14)
                    .reserved_site("IOB_0", Some("CFG"))
                    .site("IOB_1", None)
                    .site("IOB_12", Some("PIN_A7"))
                    .site("IOB_13", Some("PIN_A8")),
            )
            .build()
            .unwrap()
    }

    fn pads(nl: &mut Netlist, n: usize) -> Vec<CellId> {
        (0..n)
            .map(|i| nl.add_cell(format!("p{i}"), CellType::Pad).unwrap())
            .collect()
    }

    #[test]
    fn package_pin_becomes_loc() {
        let dev = device();
        let sink = DiagnosticSink::new();
        let mut nl = Netlist::new();
        let p = pads(&mut nl, 1);
        nl.cell_mut(p[0]).unwrap().set_attr("PACKAGE_PIN", "PIN_A8");
        let summary = bind_io(&mut nl, &dev, &p, &sink).unwrap();
        assert_eq!(summary.constrained, 1);
        let cell = nl.cell(p[0]).unwrap();
        assert_eq!(cell.attr_str("LOC"), Some("PIN_A8"));
        assert_eq!(cell.attr_str("BEL"), Some("IOB_13/PAD"));
        assert_eq!(
            sink.messages(Severity::Info),
            ["Constraining 'p0' to site 'IOB_13'"]
        );
    }

    #[test]
    fn unknown_pin_is_constraint_error() {
        let dev = device();
        let mut nl = Netlist::new();
        let p = pads(&mut nl, 1);
        nl.cell_mut(p[0]).unwrap().set_attr("LOC", "PIN_Z9");
        let err = bind_io(&mut nl, &dev, &p, &DiagnosticSink::new()).unwrap_err();
        assert!(matches!(err, LegalizeError::Constraint { .. }));
        assert!(err.to_string().contains("'PIN_Z9'"));
    }

    #[test]
    fn pool_skips_reserved_and_unbonded_sites() {
        let dev = device();
        let mut nl = Netlist::new();
        let p = pads(&mut nl, 2);
        bind_io(&mut nl, &dev, &p, &DiagnosticSink::new()).unwrap();
        assert_eq!(nl.cell(p[0]).unwrap().attr_str("BEL"), Some("IOB_12/PAD"));
        assert_eq!(nl.cell(p[1]).unwrap().attr_str("BEL"), Some("IOB_13/PAD"));
    }

    #[test]
    fn two_pads_on_one_pin_conflict() {
        let dev = device();
        let mut nl = Netlist::new();
        let p = pads(&mut nl, 2);
        for &pad in &p {
            nl.cell_mut(pad).unwrap().set_attr("LOC", "PIN_A7");
        }
        let err = bind_io(&mut nl, &dev, &p, &DiagnosticSink::new()).unwrap_err();
        assert!(err.to_string().contains("already occupied by 'p0'"));
    }

    #[test]
    fn explicit_bel_binds_directly() {
        let dev = device();
        let mut nl = Netlist::new();
        let p = pads(&mut nl, 1);
        nl.cell_mut(p[0]).unwrap().set_attr("BEL", "IOB_1/PAD");
        bind_io(&mut nl, &dev, &p, &DiagnosticSink::new()).unwrap();
        assert_eq!(nl.cell(p[0]).unwrap().bel, dev.bel_by_name("IOB_1/PAD"));
    }

    #[test]
    fn explicit_bel_must_host_a_pad() {
        let dev = device();
        let mut nl = Netlist::new();
        let p = pads(&mut nl, 1);
        nl.cell_mut(p[0]).unwrap().set_attr("BEL", "IOB_1/OUTBUF");
        let err = bind_io(&mut nl, &dev, &p, &DiagnosticSink::new()).unwrap_err();
        assert!(matches!(err, LegalizeError::Constraint { .. }));
        assert_eq!(
            err.to_string(),
            "cannot bind PAD 'p0' to 'IOB_1/OUTBUF': the BEL does not host that type"
        );
        assert!(nl.cell(p[0]).unwrap().bel.is_none());
    }
}
