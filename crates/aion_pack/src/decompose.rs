//! I/O macro decomposition.
//!
//! Library I/O primitives (`IOBUF`, `OBUFDS`, ...) span more than one BEL.
//! Each one is split into elementary input buffers, output buffers and
//! inverters bound onto the sites of the pads it drives. Sub-cells record the
//! macro they came from in `X_ORIG_MACRO_PRIM` and, per port, the macro
//! ports they stand for in `X_MACRO_PORTS_<port>` as a `;`-separated list of
//! `name,direction` entries, with a trailing `,shared` when several sub-cell
//! ports take over the same macro port. This is enough to rebuild the macro
//! view later.

use crate::bind::bind_to_site;
use crate::celltype::CellType;
use crate::data::{int_name, Netlist, PortDirection};
use crate::errors::{progress, warn_dropped_qualifier, LegalizeError};
use crate::ids::{CellId, NetId};
use aion_arch::{Architecture, SiteId, TileFamily};
use aion_common::Property;
use aion_diagnostics::DiagnosticSink;
use std::collections::HashMap;

/// Which halves of a buffer a macro contains, and how it signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroShape {
    /// Two pads, positive and negative leg.
    pub differential: bool,
    /// Has an input buffer.
    pub input: bool,
    /// Has an output buffer.
    pub output: bool,
}

impl MacroShape {
    /// Classifies an I/O macro type. Returns `None` for anything else.
    pub fn of(ty: &CellType) -> Option<Self> {
        let (differential, input, output) = match ty {
            CellType::Ibuf | CellType::IbufIbufdisable | CellType::IbufIntermdisable => {
                (false, true, false)
            }
            CellType::Obuf | CellType::Obuft => (false, false, true),
            CellType::Iobuf | CellType::IobufDcien | CellType::IobufIntermdisable => {
                (false, true, true)
            }
            CellType::Ibufds | CellType::IbufdsIntermdisable => (true, true, false),
            CellType::Obufds | CellType::Obuftds => (true, false, true),
            CellType::Iobufds | CellType::IobufdsDcien | CellType::IobufdsDiffOut => {
                (true, true, true)
            }
            _ => return None,
        };
        Some(Self {
            differential,
            input,
            output,
        })
    }

    /// Both directions share the pad.
    pub fn bidirectional(self) -> bool {
        self.input && self.output
    }

    /// The macro port on the (positive) pad.
    fn pad_port(self) -> &'static str {
        match (self.input, self.output) {
            (true, true) => "IO",
            (true, false) => "I",
            _ => "O",
        }
    }

    /// The macro port on the negative pad.
    fn pad_port_n(self) -> &'static str {
        match (self.input, self.output) {
            (true, true) => "IOB",
            (true, false) => "IB",
            _ => "OB",
        }
    }
}

/// Decomposes every I/O macro in the netlist. Returns the number of macros
/// replaced.
pub fn decompose_io(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    sink: &DiagnosticSink,
) -> Result<usize, LegalizeError> {
    let macros: Vec<CellId> = netlist
        .cells()
        .filter(|(_, c)| c.cell_type.is_io_macro())
        .map(|(id, _)| id)
        .collect();
    for &m in &macros {
        decompose_macro(netlist, arch, m, sink)?;
    }
    Ok(macros.len())
}

struct Decomposer<'a> {
    netlist: &'a mut Netlist,
    arch: &'a dyn Architecture,
    sink: &'a DiagnosticSink,
    cell: CellId,
    name: String,
    ty: CellType,
    shape: MacroShape,
    subcells: Vec<CellId>,
}

/// Splits one macro into elementary cells and removes it.
pub fn decompose_macro(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    cell: CellId,
    sink: &DiagnosticSink,
) -> Result<(), LegalizeError> {
    let c = netlist.cell(cell)?;
    let name = c.name.clone();
    let ty = c.cell_type.clone();
    let Some(shape) = MacroShape::of(&ty) else {
        return Err(LegalizeError::structural(
            &name,
            format!("'{name}' of type {ty} is not an I/O macro"),
        ));
    };
    if ty == CellType::IobufdsDiffOut {
        return Err(LegalizeError::structural(
            &name,
            format!("'{name}': {ty} is not supported"),
        ));
    }
    let orig_ports: Vec<(String, PortDirection, Option<NetId>)> = c
        .ports
        .iter()
        .map(|(p, port)| (p.clone(), port.direction, port.net))
        .collect();

    let mut d = Decomposer {
        netlist,
        arch,
        sink,
        cell,
        name,
        ty,
        shape,
        subcells: Vec::new(),
    };
    match (shape.differential, shape.input, shape.output) {
        (false, input, output) => {
            if input {
                d.single_ended_input()?;
            }
            if output {
                d.single_ended_output()?;
            }
        }
        (true, input, output) => {
            if input {
                d.differential_input()?;
            }
            if output {
                d.differential_output()?;
            }
        }
    }
    d.record_provenance(&orig_ports)?;
    d.netlist.remove_cell(cell)?;
    Ok(())
}

impl Decomposer<'_> {
    fn pad_net(&self, port: &str) -> Result<NetId, LegalizeError> {
        self.netlist.port_net(self.cell, port)?.ok_or_else(|| {
            LegalizeError::structural(
                &self.name,
                format!("'{}' has no net on pad-facing port '{port}'", self.name),
            )
        })
    }

    /// Finds the site of the `PAD` cell on a pad net.
    fn pad_site(&self, net: NetId) -> Result<SiteId, LegalizeError> {
        let n = self.netlist.net(net)?;
        for r in n.driver.iter().chain(n.users.iter()) {
            let cell = self.netlist.cell(r.cell)?;
            if cell.cell_type != CellType::Pad {
                continue;
            }
            if let Some(bel) = cell.bel {
                return Ok(self.arch.bel(bel).site);
            }
        }
        Err(LegalizeError::structural(
            &self.name,
            format!("can't find PAD for net '{}' of '{}'", n.name, self.name),
        ))
    }

    fn family(&self, site: SiteId) -> Result<TileFamily, LegalizeError> {
        let family = self.arch.site_family(site);
        if family.is_io_bank() {
            Ok(family)
        } else {
            let site_name = &self.arch.site(site).name;
            Err(LegalizeError::fabric(
                site_name,
                format!("'{}' is bound to '{site_name}', which is not an I/O site", self.name),
            ))
        }
    }

    fn new_cell(&mut self, suffix: &str, hierarchical: bool, ty: CellType) -> Result<CellId, LegalizeError> {
        let id = self
            .netlist
            .add_cell(int_name(&self.name, suffix, hierarchical), ty)?;
        self.subcells.push(id);
        Ok(id)
    }

    fn macro_net(&self, port: &str) -> Result<Option<NetId>, LegalizeError> {
        Ok(self.netlist.port_net(self.cell, port)?)
    }

    fn set_site_type(&mut self, cell: CellId, site: SiteId) -> Result<(), LegalizeError> {
        let site_type = self.arch.site(site).site_type.clone();
        self.netlist
            .cell_mut(cell)?
            .set_attr("X_IOB_SITE_TYPE", site_type);
        Ok(())
    }

    fn move_qualifiers(&mut self, to: CellId) -> Result<(), LegalizeError> {
        for port in ["IBUFDISABLE", "INTERMDISABLE"] {
            self.netlist.move_port(self.cell, port, to, port)?;
        }
        Ok(())
    }

    /// Moves `DCITERMDISABLE` onto `targets` if the family supports DCI,
    /// otherwise drops it with a warning.
    fn dci_qualifier(&mut self, family: TileFamily, site: SiteId, targets: &[CellId]) -> Result<(), LegalizeError> {
        const PORT: &str = "DCITERMDISABLE";
        let Some(net) = self.macro_net(PORT)? else {
            return Ok(());
        };
        if family.supports_dci() {
            for &t in targets {
                self.netlist
                    .add_connected_port(t, PORT, PortDirection::In, Some(net))?;
            }
        } else {
            self.sink.emit(warn_dropped_qualifier(
                PORT,
                &self.name,
                &self.arch.site(site).name,
            ));
        }
        self.netlist.disconnect(self.cell, PORT)?;
        Ok(())
    }

    fn single_ended_input(&mut self) -> Result<(), LegalizeError> {
        self.sink.emit(progress(format!(
            "Generating input buffer for '{}'",
            self.name
        )));
        let pad_port = self.shape.pad_port();
        let pad_net = self.pad_net(pad_port)?;
        let site = self.pad_site(pad_net)?;
        let family = self.family(site)?;
        if !self.shape.bidirectional() {
            self.netlist.disconnect(self.cell, pad_port)?;
        }
        let top_out = self.netlist.disconnect(self.cell, "O")?;

        let ibuf_type = match self.ty {
            CellType::IbufIbufdisable | CellType::IobufDcien => CellType::IbufIbufdisable,
            CellType::IbufIntermdisable | CellType::IobufIntermdisable => {
                CellType::IbufIntermdisable
            }
            _ => CellType::Ibuf,
        };
        let ibuf = self.new_cell("IBUF", self.shape.bidirectional(), ibuf_type)?;
        self.netlist
            .add_connected_port(ibuf, "I", PortDirection::In, Some(pad_net))?;
        self.netlist
            .add_connected_port(ibuf, "O", PortDirection::Out, top_out)?;
        self.move_qualifiers(ibuf)?;
        bind_to_site(self.netlist, self.arch, ibuf, site, inbuf_bel(family))
    }

    fn single_ended_output(&mut self) -> Result<(), LegalizeError> {
        self.sink.emit(progress(format!(
            "Generating output buffer for '{}'",
            self.name
        )));
        let bidir = self.shape.bidirectional();
        let pad_port = self.shape.pad_port();
        let pad_net = self.pad_net(pad_port)?;
        let site = self.pad_site(pad_net)?;
        let family = self.family(site)?;
        self.netlist.disconnect(self.cell, pad_port)?;

        let (suffix, obuf_type) = match (&self.ty, bidir) {
            (CellType::IobufDcien, _) => ("OBUFT", CellType::ObuftDcien),
            (_, true) => ("OBUFT", CellType::Obuft),
            (CellType::Obuft, _) => ("OBUFT", CellType::Obuft),
            _ => ("OBUF", CellType::Obuf),
        };
        let tristate = obuf_type != CellType::Obuf;
        let obuf = self.new_cell(suffix, bidir, obuf_type)?;
        let data = self.macro_net("I")?;
        self.netlist
            .add_connected_port(obuf, "I", PortDirection::In, data)?;
        self.netlist
            .add_connected_port(obuf, "O", PortDirection::Out, Some(pad_net))?;
        if tristate {
            let t = self.macro_net("T")?;
            self.netlist
                .add_connected_port(obuf, "T", PortDirection::In, t)?;
        }
        self.dci_qualifier(family, site, &[obuf])?;
        bind_to_site(self.netlist, self.arch, obuf, site, outbuf_bel(family))
    }

    fn differential_input(&mut self) -> Result<(), LegalizeError> {
        self.sink.emit(progress(format!(
            "Generating input buffer for '{}'",
            self.name
        )));
        let (port_p, port_n) = (self.shape.pad_port(), self.shape.pad_port_n());
        let pad_p = self.pad_net(port_p)?;
        let pad_n = self.pad_net(port_n)?;
        let site_p = self.pad_site(pad_p)?;
        self.pad_site(pad_n)?;
        let family = self.family(site_p)?;
        if !self.shape.bidirectional() {
            self.netlist.disconnect(self.cell, port_p)?;
            self.netlist.disconnect(self.cell, port_n)?;
        }
        let top_out = self.netlist.disconnect(self.cell, "O")?;

        let ibuf = self.new_cell("IBUF", false, CellType::Ibufds)?;
        self.netlist
            .add_connected_port(ibuf, "I", PortDirection::In, Some(pad_p))?;
        self.netlist
            .add_connected_port(ibuf, "IB", PortDirection::In, Some(pad_n))?;
        self.netlist
            .add_connected_port(ibuf, "O", PortDirection::Out, top_out)?;
        self.move_qualifiers(ibuf)?;
        self.set_site_type(ibuf, site_p)?;
        bind_to_site(self.netlist, self.arch, ibuf, site_p, inbuf_bel(family))
    }

    /// Differential outputs are two single-ended buffers, the negative one
    /// fed through the site's output inverter.
    fn differential_output(&mut self) -> Result<(), LegalizeError> {
        self.sink.emit(progress(format!(
            "Generating output buffer for '{}'",
            self.name
        )));
        let (port_p, port_n) = (self.shape.pad_port(), self.shape.pad_port_n());
        let pad_p = self.pad_net(port_p)?;
        let pad_n = self.pad_net(port_n)?;
        let site_p = self.pad_site(pad_p)?;
        let site_n = self.pad_site(pad_n)?;
        let family = self.family(site_p)?;
        self.netlist.disconnect(self.cell, port_p)?;
        self.netlist.disconnect(self.cell, port_n)?;

        let plain = self.ty == CellType::Obufds;
        let (inv_net, inv_name, p_name, n_name) = if plain {
            ("I_B", "INV", "P", "N")
        } else {
            (
                "OBUFTDS$subnet$I_B",
                "OBUFTDS$subcell$INV",
                "OBUFTDS$subcell$P",
                "OBUFTDS$subcell$N",
            )
        };
        let buf_type = match self.ty {
            CellType::Obufds => CellType::Obuf,
            CellType::IobufdsDcien => CellType::ObuftDcien,
            _ => CellType::Obuft,
        };
        let tristate = buf_type != CellType::Obuf;
        let data = self.macro_net("I")?;
        let t = self.macro_net("T")?;

        let inv_i = self
            .netlist
            .create_internal_net(&self.name, inv_net, false)?;
        let inv = self.new_cell(inv_name, false, CellType::Inv)?;
        self.netlist
            .add_connected_port(inv, "I", PortDirection::In, data)?;
        self.netlist
            .add_connected_port(inv, "O", PortDirection::Out, Some(inv_i))?;
        self.set_site_type(inv, site_n)?;
        bind_to_site(self.netlist, self.arch, inv, site_n, "O_ININV")?;

        let mut legs = Vec::with_capacity(2);
        for (leg_name, input, pad, site) in [
            (p_name, data, pad_p, site_p),
            (n_name, Some(inv_i), pad_n, site_n),
        ] {
            let obuf = self.new_cell(leg_name, false, buf_type.clone())?;
            self.netlist
                .add_connected_port(obuf, "I", PortDirection::In, input)?;
            self.netlist
                .add_connected_port(obuf, "O", PortDirection::Out, Some(pad))?;
            if tristate {
                self.netlist
                    .add_connected_port(obuf, "T", PortDirection::In, t)?;
            }
            self.set_site_type(obuf, site)?;
            bind_to_site(self.netlist, self.arch, obuf, site, outbuf_bel(family))?;
            legs.push(obuf);
        }
        self.dci_qualifier(family, site_p, &legs)
    }

    fn record_provenance(
        &mut self,
        orig_ports: &[(String, PortDirection, Option<NetId>)],
    ) -> Result<(), LegalizeError> {
        let mut fanout: HashMap<NetId, usize> = HashMap::new();
        for &sc in &self.subcells {
            for port in self.netlist.cell(sc)?.ports.values() {
                if let Some(net) = port.net {
                    *fanout.entry(net).or_default() += 1;
                }
            }
        }

        let macro_type = self.ty.name().to_string();
        for &sc in &self.subcells {
            let cell = self.netlist.cell(sc)?;
            let mut attrs = vec![(
                "X_ORIG_MACRO_PRIM".to_string(),
                Property::from(macro_type.as_str()),
            )];
            for (port_name, port) in &cell.ports {
                let Some(net) = port.net else { continue };
                let shared = fanout.get(&net).copied().unwrap_or(0) > 1;
                let entries: Vec<String> = orig_ports
                    .iter()
                    .filter(|(_, _, n)| *n == Some(net))
                    .map(|(name, dir, _)| {
                        if shared {
                            format!("{name},{},shared", dir.as_str())
                        } else {
                            format!("{name},{}", dir.as_str())
                        }
                    })
                    .collect();
                if !entries.is_empty() {
                    attrs.push((
                        format!("X_MACRO_PORTS_{port_name}"),
                        Property::from(entries.join(";")),
                    ));
                }
            }
            let cell = self.netlist.cell_mut(sc)?;
            cell.attrs.extend(attrs);
        }
        Ok(())
    }
}

fn inbuf_bel(family: TileFamily) -> &'static str {
    family.inbuf_bel().unwrap_or("INBUF_EN")
}

fn outbuf_bel(family: TileFamily) -> &'static str {
    family.outbuf_bel().unwrap_or("OUTBUF")
}

/// Parses an `X_MACRO_PORTS_*` value into `(port, direction, shared)`
/// entries.
pub fn parse_macro_ports(value: &str) -> Vec<(String, String, bool)> {
    value
        .split(';')
        .filter(|e| !e.is_empty())
        .filter_map(|entry| {
            let mut fields = entry.split(',');
            let name = fields.next()?.to_string();
            let dir = fields.next()?.to_string();
            let shared = fields.next() == Some("shared");
            Some((name, dir, shared))
        })
        .collect()
}
