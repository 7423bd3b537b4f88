//! Binding of delay, serializer and DDR cells to I/O interface sites.
//!
//! Each cell is traced through the netlist to the I/O buffer it serves, and
//! the navigator then walks the fabric from that buffer's BEL to the
//! companion site. Delays are handled first so that DDR and serializer
//! inputs fed through an `IDELAYE2` can reuse the delay's buffer.

use crate::bind::bind_to_site;
use crate::celltype::CellType;
use crate::data::Netlist;
use crate::errors::LegalizeError;
use crate::ids::{CellId, NetId};
use crate::invert::fold_inverter;
use crate::navigate::{locate_companion, SearchDirection};
use crate::rules::oddr_rule;
use crate::xform::{first_candidate, xform_cell};
use aion_arch::{Architecture, BelId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferRole {
    Input,
    Output,
}

/// Identifies a cell bound onto an I/O buffer BEL.
fn buffer_role(
    netlist: &Netlist,
    arch: &dyn Architecture,
    cell: CellId,
) -> Result<Option<(BufferRole, BelId)>, LegalizeError> {
    let Some(bel) = netlist.cell(cell)?.bel else {
        return Ok(None);
    };
    let b = arch.bel(bel);
    let family = arch.site_family(b.site);
    let role = if family.inbuf_bel() == Some(b.name.as_str()) {
        Some(BufferRole::Input)
    } else if family.outbuf_bel() == Some(b.name.as_str()) {
        Some(BufferRole::Output)
    } else {
        None
    };
    Ok(role.map(|r| (r, bel)))
}

struct IologicPacker<'a> {
    netlist: &'a mut Netlist,
    arch: &'a dyn Architecture,
    delay_io: HashMap<CellId, BelId>,
    bound: usize,
}

/// Binds every I/O logic cell. Returns the number of cells bound.
pub fn legalize_iologic(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
) -> Result<usize, LegalizeError> {
    let mut packer = IologicPacker {
        netlist,
        arch,
        delay_io: HashMap::new(),
        bound: 0,
    };
    for id in packer.netlist.cell_ids() {
        match packer.netlist.cell(id)?.cell_type.clone() {
            CellType::Idelaye2 => packer.idelay(id)?,
            CellType::Odelaye2 => packer.odelay(id)?,
            _ => {}
        }
    }
    for id in packer.netlist.cell_ids() {
        // Folding may remove inverters later in the list.
        let Ok(cell) = packer.netlist.cell(id) else {
            continue;
        };
        match cell.cell_type.clone() {
            CellType::Oddr => packer.oddr(id)?,
            CellType::Oserdese2 => packer.oserdes(id)?,
            CellType::Iddr => packer.iddr(id)?,
            CellType::Iserdese2 => packer.iserdes(id)?,
            _ => {}
        }
    }
    Ok(packer.bound)
}

impl IologicPacker<'_> {
    fn error(&self, cell: CellId, what: &str) -> Result<LegalizeError, LegalizeError> {
        let c = self.netlist.cell(cell)?;
        Ok(LegalizeError::structural(
            &c.name,
            format!("{} '{}' {what}", c.cell_type, c.name),
        ))
    }

    fn type_name(&self, cell: CellId) -> Result<String, LegalizeError> {
        Ok(self.netlist.cell(cell)?.cell_type.to_string())
    }

    fn bind(
        &mut self,
        cell: CellId,
        io_bel: BelId,
        pin: &str,
        direction: SearchDirection,
        prefix: &str,
        bel_name: &str,
    ) -> Result<(), LegalizeError> {
        let site = locate_companion(self.arch, io_bel, pin, direction, prefix)?;
        bind_to_site(self.netlist, self.arch, cell, site, bel_name)?;
        self.bound += 1;
        Ok(())
    }

    /// The driver of a required input port.
    fn input_driver(&self, cell: CellId, port: &str) -> Result<(CellId, String), LegalizeError> {
        let net = self.netlist.port_net(cell, port)?;
        let driver = match net {
            Some(net) => self.netlist.net(net)?.driver.clone(),
            None => None,
        };
        match driver {
            Some(d) => Ok((d.cell, d.port)),
            None => Err(self.error(cell, &format!("has disconnected {port} input"))?),
        }
    }

    /// The output buffer fed by `net`, directly or through an `ODELAYE2`.
    /// `None` if there is none or more than one.
    fn find_outbuf(&self, net: NetId) -> Result<Option<BelId>, LegalizeError> {
        let mut found = None;
        for user in &self.netlist.net(net)?.users {
            let mut candidates = vec![user.cell];
            if self.netlist.cell(user.cell)?.cell_type == CellType::Odelaye2 {
                if let Some(dataout) = self.netlist.port_net(user.cell, "DATAOUT")? {
                    candidates = self
                        .netlist
                        .net(dataout)?
                        .users
                        .iter()
                        .map(|u| u.cell)
                        .collect();
                }
            }
            for c in candidates {
                if let Some((BufferRole::Output, bel)) = buffer_role(self.netlist, self.arch, c)? {
                    if found.is_some() {
                        return Ok(None);
                    }
                    found = Some(bel);
                }
            }
        }
        Ok(found)
    }

    fn has_users(&self, cell: CellId, port: &str) -> Result<Option<NetId>, LegalizeError> {
        match self.netlist.port_net(cell, port)? {
            Some(net) if !self.netlist.net(net)?.users.is_empty() => Ok(Some(net)),
            _ => Ok(None),
        }
    }

    fn record_io_bel(&mut self, cell: CellId, io_bel: BelId) -> Result<(), LegalizeError> {
        let name = self.arch.bel_full_name(io_bel);
        self.netlist.cell_mut(cell)?.set_attr("X_IO_BEL", name);
        self.delay_io.insert(cell, io_bel);
        Ok(())
    }

    fn idelay(&mut self, cell: CellId) -> Result<(), LegalizeError> {
        let (drv, _) = self.input_driver(cell, "IDATAIN")?;
        let Some((BufferRole::Input, io_bel)) = buffer_role(self.netlist, self.arch, drv)? else {
            let ty = self.type_name(drv)?;
            return Err(self.error(
                cell,
                &format!("has IDATAIN input connected to illegal cell type {ty}"),
            )?);
        };
        self.bind(cell, io_bel, "OUT", SearchDirection::Downstream, "IDELAY", "IDELAYE2")?;
        self.record_io_bel(cell, io_bel)
    }

    fn odelay(&mut self, cell: CellId) -> Result<(), LegalizeError> {
        let Some(dataout) = self.has_users(cell, "DATAOUT")? else {
            return Err(self.error(cell, "has disconnected DATAOUT output")?);
        };
        let users: Vec<CellId> = self
            .netlist
            .net(dataout)?
            .users
            .iter()
            .map(|u| u.cell)
            .collect();
        let mut io_bel = None;
        for &user in &users {
            let ty = &self.netlist.cell(user)?.cell_type;
            // Pseudo-differential outputs also feed the negative leg's inverter.
            if users.len() == 2 && matches!(ty, CellType::Inverter | CellType::Inv) {
                continue;
            }
            match buffer_role(self.netlist, self.arch, user)? {
                Some((BufferRole::Output, bel)) => io_bel = Some(bel),
                _ => {
                    let ty = ty.to_string();
                    return Err(self.error(
                        cell,
                        &format!("has DATAOUT connected to unsupported cell type {ty}"),
                    )?);
                }
            }
        }
        let Some(io_bel) = io_bel else {
            return Err(self.error(cell, "does not drive an output buffer")?);
        };

        let io_site = self.arch.bel(io_bel).site;
        if !self.arch.site_family(io_site).has_output_delay() {
            let site_name = &self.arch.site(io_site).name;
            return Err(LegalizeError::fabric(
                site_name,
                format!("High range banks do not have ODELAY (needed at '{site_name}')"),
            ));
        }
        self.bind(cell, io_bel, "IN", SearchDirection::Upstream, "ODELAY", "ODELAYE2")?;
        self.record_io_bel(cell, io_bel)
    }

    fn oddr(&mut self, cell: CellId) -> Result<(), LegalizeError> {
        let Some(q) = self.has_users(cell, "Q")? else {
            return Err(self.error(cell, "has disconnected Q output")?);
        };
        let Some(io_bel) = self.find_outbuf(q)? else {
            return Err(self.error(cell, "has illegal fanout on Q output")?);
        };
        let family = self.arch.site_family(self.arch.bel(io_bel).site);
        xform_cell(self.netlist, cell, &oddr_rule(family), &first_candidate)?;
        self.bind(cell, io_bel, "IN", SearchDirection::Upstream, "OLOGIC", "OUTFF")
    }

    fn oserdes(&mut self, cell: CellId) -> Result<(), LegalizeError> {
        let out = match self.has_users(cell, "OQ")? {
            Some(oq) => oq,
            None => match self.has_users(cell, "OFB")? {
                Some(ofb) => ofb,
                None => return Err(self.error(cell, "has disconnected OQ/OFB output ports")?),
            },
        };
        let Some(io_bel) = self.find_outbuf(out)? else {
            return Err(self.error(cell, "has illegal fanout on OQ or OFB output")?);
        };
        self.bind(cell, io_bel, "IN", SearchDirection::Upstream, "OLOGIC", "OSERDESE2")
    }

    /// Resolves the I/O buffer behind an input-side data port.
    fn input_io_bel(
        &self,
        cell: CellId,
        port: &str,
        from_inbuf: bool,
        from_delay: bool,
    ) -> Result<BelId, LegalizeError> {
        let (drv, drv_port) = self.input_driver(cell, port)?;
        if from_inbuf {
            if let Some((BufferRole::Input, bel)) = buffer_role(self.netlist, self.arch, drv)? {
                return Ok(bel);
            }
        }
        if from_delay && drv_port == "DATAOUT" {
            if let Some(&bel) = self.delay_io.get(&drv) {
                return Ok(bel);
            }
        }
        let ty = self.type_name(drv)?;
        Err(self.error(
            cell,
            &format!("has {port} input connected to illegal cell type {ty}"),
        )?)
    }

    fn iddr(&mut self, cell: CellId) -> Result<(), LegalizeError> {
        fold_inverter(self.netlist, cell, "C")?;
        let io_bel = self.input_io_bel(cell, "D", true, true)?;
        self.bind(cell, io_bel, "OUT", SearchDirection::Downstream, "ILOGIC", "IFF")
    }

    fn iserdes(&mut self, cell: CellId) -> Result<(), LegalizeError> {
        fold_inverter(self.netlist, cell, "CLKB")?;
        fold_inverter(self.netlist, cell, "OCLKB")?;
        let iobdelay = self
            .netlist
            .cell(cell)?
            .attr_str("IOBDELAY")
            .unwrap_or("NONE")
            .to_string();
        let io_bel = match iobdelay.as_str() {
            "IFD" => self.input_io_bel(cell, "DDLY", false, true)?,
            "NONE" => self.input_io_bel(cell, "D", true, false)?,
            other => {
                return Err(self.error(cell, &format!("has unsupported IOBDELAY value '{other}'"))?)
            }
        };
        self.bind(cell, io_bel, "OUT", SearchDirection::Downstream, "ILOGIC", "ISERDESE2")
    }
}
