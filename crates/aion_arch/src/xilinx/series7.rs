//! Synthetic Series-7 I/O column generator.
//!
//! Builds a [`Device`] containing one or more I/O banks laid out like a
//! Series-7 I/O column. Every bank gets a clock-region (`HCLK`) tile holding
//! an `IDELAYCTRL_B<bank>` site. IOB sites are grouped in master/slave pairs,
//! each pair sharing an IOB tile and an I/O interface tile, and every IOB
//! site `<S>` gets companion sites `ILOGIC_<S>`, `OLOGIC_<S>`, `IDELAY_<S>`
//! and, on high-performance banks only, `ODELAY_<S>`.
//!
//! Routing follows the real column closely enough for companion-site search:
//!
//! ```text
//! INBUF.OUT  -> ILOGIC.D, IDELAY.IDATAIN
//! IDELAY.DATAOUT -> ILOGIC.DDLY
//! OLOGIC.OQ  -> OUTBUF.IN, ODELAY.ODATAIN
//! ODELAY.DATAOUT -> OUTBUF.IN
//! ```

use crate::device::{Device, DeviceBuilder, DeviceError};
use crate::ids::{TileId, WireId};

/// The electrical class of an I/O bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankKind {
    /// High-range bank (`IOB33` sites).
    HighRange,
    /// High-performance bank (`IOB18` sites).
    HighPerformance,
}

impl BankKind {
    fn iob_tile_type(self) -> &'static str {
        match self {
            Self::HighRange => "LIOB33",
            Self::HighPerformance => "RIOB18",
        }
    }

    fn ioi_tile_type(self) -> &'static str {
        match self {
            Self::HighRange => "LIOI3",
            Self::HighPerformance => "RIOI",
        }
    }

    fn hclk_tile_type(self) -> &'static str {
        match self {
            Self::HighRange => "HCLK_IOI3",
            Self::HighPerformance => "HCLK_IOI",
        }
    }

    fn site_prefix(self) -> &'static str {
        match self {
            Self::HighRange => "IOB33",
            Self::HighPerformance => "IOB18",
        }
    }

    fn inbuf(self) -> &'static str {
        match self {
            Self::HighRange => "INBUF_EN",
            Self::HighPerformance => "INBUF_DCIEN",
        }
    }

    fn outbuf(self) -> &'static str {
        match self {
            Self::HighRange => "OUTBUF",
            Self::HighPerformance => "OUTBUF_DCIEN",
        }
    }

    fn ologic_type(self) -> &'static str {
        match self {
            Self::HighRange => "OLOGICE3",
            Self::HighPerformance => "OLOGICE2",
        }
    }
}

#[derive(Debug, Clone)]
struct IoSiteSpec {
    name: String,
    package_pin: Option<String>,
    reserved: bool,
}

/// One I/O bank of the column.
#[derive(Debug, Clone)]
pub struct IoBank {
    number: u32,
    kind: BankKind,
    sites: Vec<IoSiteSpec>,
}

impl IoBank {
    /// Starts a high-range bank.
    pub fn high_range(number: u32) -> Self {
        Self::new(number, BankKind::HighRange)
    }

    /// Starts a high-performance bank.
    pub fn high_performance(number: u32) -> Self {
        Self::new(number, BankKind::HighPerformance)
    }

    /// Starts a bank of the given kind.
    pub fn new(number: u32, kind: BankKind) -> Self {
        Self {
            number,
            kind,
            sites: Vec::new(),
        }
    }

    /// Appends an IOB site, optionally bonded to a package pin.
    pub fn site(mut self, name: impl Into<String>, package_pin: Option<&str>) -> Self {
        self.sites.push(IoSiteSpec {
            name: name.into(),
            package_pin: package_pin.map(str::to_string),
            reserved: false,
        });
        self
    }

    /// Appends a reserved IOB site (e.g. a configuration pin).
    pub fn reserved_site(mut self, name: impl Into<String>, package_pin: Option<&str>) -> Self {
        self.sites.push(IoSiteSpec {
            name: name.into(),
            package_pin: package_pin.map(str::to_string),
            reserved: true,
        });
        self
    }

    /// Appends `count` bonded sites named `IOB_<first + i>` with package
    /// pins `P<first + i>`.
    pub fn numbered_sites(mut self, first: u32, count: u32) -> Self {
        for n in first..first + count {
            self = self.site(format!("IOB_{n}"), Some(&format!("P{n}")));
        }
        self
    }
}

/// A column of I/O banks.
#[derive(Debug, Clone)]
pub struct IoColumn {
    name: String,
    banks: Vec<IoBank>,
}

impl IoColumn {
    /// Starts a column for a device with the given part name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            banks: Vec::new(),
        }
    }

    /// Appends a bank.
    pub fn bank(mut self, bank: IoBank) -> Self {
        self.banks.push(bank);
        self
    }

    /// Builds the device.
    pub fn build(self) -> Result<Device, DeviceError> {
        let mut b = DeviceBuilder::new(self.name);
        for bank in &self.banks {
            add_bank(&mut b, bank);
        }
        b.build()
    }
}

fn add_bank(b: &mut DeviceBuilder, bank: &IoBank) {
    let kind = bank.kind;
    let hclk = b.add_tile(
        format!("{}_B{}", kind.hclk_tile_type(), bank.number),
        kind.hclk_tile_type(),
    );
    let ctrl_name = format!("IDELAYCTRL_B{}", bank.number);
    let ctrl = b.add_site(hclk, ctrl_name.clone(), "IDELAYCTRL");
    let refclk = b.add_wire(format!("{ctrl_name}.REFCLK"));
    let rst = b.add_wire(format!("{ctrl_name}.RST"));
    let rdy = b.add_wire(format!("{ctrl_name}.RDY"));
    let ctrl_bel = b.add_bel(
        ctrl,
        "IDELAYCTRL",
        &[("REFCLK", refclk), ("RST", rst), ("RDY", rdy)],
    );
    b.set_bel_types(ctrl_bel, menu(&["IDELAYCTRL", "IDELAYCTRL_IDELAYCTRL"], &[]));

    for (pair, sites) in bank.sites.chunks(2).enumerate() {
        let iob_tile = b.add_tile(
            format!("{}_B{}_{pair}", kind.iob_tile_type(), bank.number),
            kind.iob_tile_type(),
        );
        let ioi_tile = b.add_tile(
            format!("{}_B{}_{pair}", kind.ioi_tile_type(), bank.number),
            kind.ioi_tile_type(),
        );
        b.set_clock_region(iob_tile, hclk);
        b.set_clock_region(ioi_tile, hclk);

        for (slot, spec) in sites.iter().enumerate() {
            let site_type = match (sites.len(), slot) {
                (1, _) => kind.site_prefix().to_string(),
                (_, 0) => format!("{}M", kind.site_prefix()),
                _ => format!("{}S", kind.site_prefix()),
            };
            add_iob(b, kind, iob_tile, ioi_tile, spec, &site_type);
        }
    }
}

fn add_iob(
    b: &mut DeviceBuilder,
    kind: BankKind,
    iob_tile: TileId,
    ioi_tile: TileId,
    spec: &IoSiteSpec,
    site_type: &str,
) {
    let name = &spec.name;
    let site = b.add_site(iob_tile, name.clone(), site_type);
    if let Some(pin) = &spec.package_pin {
        b.set_package_pin(site, pin.clone());
    }
    if spec.reserved {
        b.set_reserved(site);
    }

    let wire =
        |b: &mut DeviceBuilder, suffix: &str| -> WireId { b.add_wire(format!("{name}.{suffix}")) };

    let pad = wire(b, "PAD");
    let inbuf_out = wire(b, "I");
    let diffi = wire(b, "DIFFI_IN");
    let outbuf_in = wire(b, "O");
    let tri = wire(b, "T");
    let inv_in = wire(b, "ININV_IN");
    let inv_out = wire(b, "ININV_OUT");

    let pad_bel = b.add_bel(site, "PAD", &[("PAD", pad)]);
    b.set_bel_types(pad_bel, menu(&["PAD"], &[]));
    let inbuf = b.add_bel(
        site,
        kind.inbuf(),
        &[("PAD", pad), ("DIFFI_IN", diffi), ("OUT", inbuf_out)],
    );
    b.set_bel_types(inbuf, buffer_menu(kind, site_type, &INBUF_LIBRARY, kind.inbuf()));
    let outbuf = b.add_bel(
        site,
        kind.outbuf(),
        &[("IN", outbuf_in), ("TRI", tri), ("OUT", pad)],
    );
    b.set_bel_types(outbuf, buffer_menu(kind, site_type, &OUTBUF_LIBRARY, kind.outbuf()));
    let inv = b.add_bel(site, "O_ININV", &[("IN", inv_in), ("OUT", inv_out)]);
    b.set_bel_types(inv, menu(&["INV", "INVERTER"], &[]));
    b.add_pip(inv_out, outbuf_in);

    let ilogic = b.add_site(ioi_tile, format!("ILOGIC_{name}"), "ILOGICE3");
    let il_d = b.add_wire(format!("ILOGIC_{name}.D"));
    let il_ddly = b.add_wire(format!("ILOGIC_{name}.DDLY"));
    let iff = b.add_bel(ilogic, "IFF", &[("D", il_d), ("DDLY", il_ddly)]);
    b.set_bel_types(iff, menu(&["IDDR", "ILOGICE3_IFF"], &[]));
    let iserdes = b.add_bel(ilogic, "ISERDESE2", &[("D", il_d), ("DDLY", il_ddly)]);
    b.set_bel_types(iserdes, menu(&["ISERDESE2", "ISERDESE2_ISERDESE2"], &[]));
    b.add_pip(inbuf_out, il_d);

    let idelay = b.add_site(ioi_tile, format!("IDELAY_{name}"), "IDELAYE2");
    let id_in = b.add_wire(format!("IDELAY_{name}.IDATAIN"));
    let id_out = b.add_wire(format!("IDELAY_{name}.DATAOUT"));
    let idelaye2 = b.add_bel(idelay, "IDELAYE2", &[("IDATAIN", id_in), ("DATAOUT", id_out)]);
    b.set_bel_types(idelaye2, menu(&["IDELAYE2", "IDELAYE2_IDELAYE2"], &[]));
    b.add_pip(inbuf_out, id_in);
    b.add_pip(id_out, il_ddly);

    let ologic = b.add_site(ioi_tile, format!("OLOGIC_{name}"), kind.ologic_type());
    let ol_oq = b.add_wire(format!("OLOGIC_{name}.OQ"));
    let outff = b.add_bel(ologic, "OUTFF", &[("OQ", ol_oq)]);
    b.set_bel_types(outff, menu(&["ODDR"], &[format!("{}_OUTFF", kind.ologic_type())]));
    let oserdes = b.add_bel(ologic, "OSERDESE2", &[("OQ", ol_oq)]);
    b.set_bel_types(oserdes, menu(&["OSERDESE2", "OSERDESE2_OSERDESE2"], &[]));
    b.add_pip(ol_oq, outbuf_in);

    if kind == BankKind::HighPerformance {
        let odelay = b.add_site(ioi_tile, format!("ODELAY_{name}"), "ODELAYE2");
        let od_in = b.add_wire(format!("ODELAY_{name}.ODATAIN"));
        let od_out = b.add_wire(format!("ODELAY_{name}.DATAOUT"));
        let odelaye2 = b.add_bel(odelay, "ODELAYE2", &[("ODATAIN", od_in), ("DATAOUT", od_out)]);
        b.set_bel_types(odelaye2, menu(&["ODELAYE2", "ODELAYE2_ODELAYE2"], &[]));
        b.add_pip(ol_oq, od_in);
        b.add_pip(od_out, outbuf_in);
    }
}

const INBUF_LIBRARY: [&str; 4] = ["IBUF", "IBUF_IBUFDISABLE", "IBUF_INTERMDISABLE", "IBUFDS"];
const OUTBUF_LIBRARY: [&str; 3] = ["OBUF", "OBUFT", "OBUFT_DCIEN"];

fn menu(fixed: &[&str], extra: &[String]) -> Vec<String> {
    fixed
        .iter()
        .map(|t| t.to_string())
        .chain(extra.iter().cloned())
        .collect()
}

/// Library buffers, the family BEL type (`IOB33_OUTBUF`) and, on paired
/// sites, the type specialised to the site (`IOB33S_OUTBUF`).
fn buffer_menu(kind: BankKind, site_type: &str, library: &[&str], bel: &str) -> Vec<String> {
    let mut extra = vec![format!("{}_{bel}", kind.site_prefix())];
    if site_type != kind.site_prefix() {
        extra.push(format!("{site_type}_{bel}"));
    }
    menu(library, &extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TileFamily;
    use crate::Architecture;

    fn column() -> Device {
        IoColumn::new("xc7-test")
            .bank(
                IoBank::high_range(14)
                    .site("IOB_12", Some("PIN_A7"))
                    .site("IOB_13", Some("PIN_A8"))
                    .site("IOB_14", None),
            )
            .bank(IoBank::high_performance(33).numbered_sites(40, 2))
            .build()
            .unwrap()
    }

    #[test]
    fn package_pins_resolve() {
        let dev = column();
        let site = dev.package_pin_site("PIN_A7").unwrap();
        assert_eq!(dev.site(site).name, "IOB_12");
        assert_eq!(dev.site(site).site_type, "IOB33M");
        let p41 = dev.package_pin_site("P41").unwrap();
        assert_eq!(dev.site(p41).site_type, "IOB18S");
    }

    #[test]
    fn lone_site_has_plain_type() {
        let dev = column();
        let site = dev.site_by_name("IOB_14").unwrap();
        assert_eq!(dev.site(site).site_type, "IOB33");
        assert!(dev.site(site).package_pin.is_none());
    }

    #[test]
    fn family_dependent_bels() {
        let dev = column();
        assert!(dev.bel_by_name("IOB_12/INBUF_EN").is_some());
        assert!(dev.bel_by_name("IOB_12/OUTBUF").is_some());
        assert!(dev.bel_by_name("IOB_40/INBUF_DCIEN").is_some());
        assert!(dev.bel_by_name("IOB_40/OUTBUF_DCIEN").is_some());
        assert!(dev.site_by_name("ODELAY_IOB_12").is_none());
        assert!(dev.site_by_name("ODELAY_IOB_40").is_some());
    }

    #[test]
    fn clock_regions_per_bank() {
        let dev = column();
        let hr = dev.site_by_name("ILOGIC_IOB_12").unwrap();
        let hp = dev.site_by_name("IOB_41").unwrap();
        let hr_region = dev.clock_region(dev.site(hr).tile).unwrap();
        let hp_region = dev.clock_region(dev.site(hp).tile).unwrap();
        assert_ne!(hr_region, hp_region);
        assert_eq!(dev.tile(hr_region).family, TileFamily::ClockRegion);
        let ctrl = dev.tile(hp_region).sites[0];
        assert_eq!(dev.site(ctrl).name, "IDELAYCTRL_B33");
    }

    #[test]
    fn inbuf_feeds_ilogic() {
        let dev = column();
        let inbuf = dev.bel_by_name("IOB_12/INBUF_EN").unwrap();
        let out = dev.bel_pin_wire(inbuf, "OUT").unwrap();
        let targets: Vec<String> = dev
            .pips_downhill(out)
            .iter()
            .flat_map(|&p| dev.wire_bel_pins(dev.pip_dst(p)))
            .map(|bp| dev.site(dev.bel(bp.bel).site).name.clone())
            .collect();
        assert!(targets.contains(&"ILOGIC_IOB_12".to_string()));
        assert!(targets.contains(&"IDELAY_IOB_12".to_string()));
    }

    #[test]
    fn reserved_sites() {
        let dev = IoColumn::new("r")
            .bank(IoBank::high_range(0).reserved_site("IOB_0", Some("CFG")))
            .build()
            .unwrap();
        let site = dev.site_by_name("IOB_0").unwrap();
        assert!(dev.site(site).reserved);
        assert_eq!(dev.site_family(site), TileFamily::HighRangeIo);
    }

    #[test]
    fn bels_list_accepted_types() {
        let dev = column();
        let bel = |name: &str| dev.bel_by_name(name).unwrap();
        assert!(dev.bel_accepts(bel("IOB_12/PAD"), "PAD"));
        assert!(!dev.bel_accepts(bel("IOB_12/OUTBUF"), "PAD"));
        assert!(dev.bel_accepts(bel("IOB_13/OUTBUF"), "OBUFT"));
        assert!(dev.bel_accepts(bel("IOB_13/OUTBUF"), "IOB33_OUTBUF"));
        assert!(dev.bel_accepts(bel("IOB_13/OUTBUF"), "IOB33S_OUTBUF"));
        assert!(!dev.bel_accepts(bel("IOB_13/OUTBUF"), "IOB33M_OUTBUF"));
        assert!(dev.bel_accepts(bel("IOB_14/INBUF_EN"), "IOB33_INBUF_EN"));
        assert!(dev.bel_accepts(bel("IOB_40/INBUF_DCIEN"), "IBUFDS"));
        assert!(dev.bel_accepts(bel("OLOGIC_IOB_40/OUTFF"), "OLOGICE2_OUTFF"));
        assert!(!dev.bel_accepts(bel("OLOGIC_IOB_12/OUTFF"), "OLOGICE2_OUTFF"));
        assert!(dev.bel_accepts(bel("IDELAYCTRL_B14/IDELAYCTRL"), "IDELAYCTRL"));
    }
}
