//! Chip database models for the Aion toolchain.
//!
//! This crate provides the [`Architecture`] trait through which netlist
//! legalization reads the target device: tile, site and BEL enumeration,
//! package-pin resolution, and the wire/PIP routing graph with uphill and
//! downhill adjacency. [`Device`] is a table-backed implementation that can
//! be deserialized from JSON or assembled with [`DeviceBuilder`].
//!
//! # Usage
//!
//! ```
//! use aion_arch::xilinx::series7::{IoBank, IoColumn};
//! use aion_arch::{Architecture, TileFamily};
//!
//! let device = IoColumn::new("xc7-test")
//!     .bank(IoBank::high_range(14).site("IOB_12", Some("PIN_A7")))
//!     .build()
//!     .unwrap();
//! let site = device.package_pin_site("PIN_A7").unwrap();
//! assert_eq!(device.site(site).name, "IOB_12");
//! assert_eq!(device.site_family(site), TileFamily::HighRangeIo);
//! ```
//!
//! The database is read-only once built; every query takes `&self`.

#![warn(missing_docs)]

pub mod device;
pub mod ids;
pub mod types;
pub mod xilinx;

pub use device::{Device, DeviceBuilder, DeviceError};
pub use ids::{BelId, PipId, SiteId, TileId, WireId};
pub use types::{Bel, BelPin, BelPinRef, Pip, Site, Tile, TileFamily, Wire};

/// Read access to a chip database.
///
/// IDs passed to the entity accessors must have been issued by the same
/// database; accessors index their tables directly and panic otherwise.
/// Name-based lookups return `None` for unknown names.
pub trait Architecture: std::fmt::Debug {
    /// Returns the device (part) name.
    fn device_name(&self) -> &str;

    /// Returns the number of sites.
    fn site_count(&self) -> usize;

    /// Returns the number of BELs. Valid BEL IDs are below this count.
    fn bel_count(&self) -> usize;

    /// Returns the tile with the given ID.
    fn tile(&self, id: TileId) -> &Tile;

    /// Returns the site with the given ID.
    fn site(&self, id: SiteId) -> &Site;

    /// Returns the BEL with the given ID.
    fn bel(&self, id: BelId) -> &Bel;

    /// Returns the wire with the given ID.
    fn wire(&self, id: WireId) -> &Wire;

    /// Returns the PIP with the given ID.
    fn pip(&self, id: PipId) -> &Pip;

    /// Looks up a site by name.
    fn site_by_name(&self, name: &str) -> Option<SiteId>;

    /// Looks up a BEL by its full `SITE/BEL` name.
    fn bel_by_name(&self, name: &str) -> Option<BelId>;

    /// Resolves a package pin to the site bonded to it.
    fn package_pin_site(&self, pin: &str) -> Option<SiteId>;

    /// Returns all site IDs in enumeration order.
    fn sites(&self) -> Vec<SiteId> {
        (0..self.site_count())
            .map(|i| SiteId::from_raw(i as u32))
            .collect()
    }

    /// Finds the BEL with the given name within a site.
    fn site_bel(&self, site: SiteId, bel_name: &str) -> Option<BelId> {
        self.site(site)
            .bels
            .iter()
            .copied()
            .find(|&b| self.bel(b).name == bel_name)
    }

    /// Returns whether a cell of the named primitive type may sit on a BEL.
    fn bel_accepts(&self, bel: BelId, cell_type: &str) -> bool {
        self.bel(bel).accepts(cell_type)
    }

    /// Returns the full `SITE/BEL` name of a BEL.
    fn bel_full_name(&self, bel: BelId) -> String {
        let bel = self.bel(bel);
        format!("{}/{}", self.site(bel.site).name, bel.name)
    }

    /// Returns the wire attached to a BEL pin, if the pin exists.
    fn bel_pin_wire(&self, bel: BelId, pin: &str) -> Option<WireId> {
        self.bel(bel)
            .pins
            .iter()
            .find(|p| p.name == pin)
            .map(|p| p.wire)
    }

    /// Returns the BEL pins attached to a wire.
    fn wire_bel_pins(&self, wire: WireId) -> &[BelPinRef] {
        &self.wire(wire).bel_pins
    }

    /// Returns the PIPs driving a wire.
    fn pips_uphill(&self, wire: WireId) -> &[PipId] {
        &self.wire(wire).uphill
    }

    /// Returns the PIPs driven by a wire.
    fn pips_downhill(&self, wire: WireId) -> &[PipId] {
        &self.wire(wire).downhill
    }

    /// Returns the source wire of a PIP.
    fn pip_src(&self, pip: PipId) -> WireId {
        self.pip(pip).src
    }

    /// Returns the destination wire of a PIP.
    fn pip_dst(&self, pip: PipId) -> WireId {
        self.pip(pip).dst
    }

    /// Returns the family of the tile a site sits on.
    fn site_family(&self, site: SiteId) -> TileFamily {
        self.tile(self.site(site).tile).family
    }

    /// Returns the clock-region tile serving a tile.
    fn clock_region(&self, tile: TileId) -> Option<TileId> {
        self.tile(tile).clock_region
    }
}
