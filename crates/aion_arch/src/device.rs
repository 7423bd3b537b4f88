//! A table-backed chip database and its builder.

use crate::ids::{BelId, PipId, SiteId, TileId, WireId};
use crate::types::{Bel, BelPin, BelPinRef, Pip, Site, Tile, TileFamily, Wire};
use crate::Architecture;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Errors raised while assembling or loading a device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Two entities of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// The kind of entity ("tile", "site", "bel", "wire").
        kind: &'static str,
        /// The repeated name.
        name: String,
    },
    /// Two sites are bonded to the same package pin.
    #[error("package pin '{pin}' is bonded to both '{first}' and '{second}'")]
    DuplicatePackagePin {
        /// The package pin.
        pin: String,
        /// The site seen first.
        first: String,
        /// The conflicting site.
        second: String,
    },
    /// A table entry refers to an ID outside its table.
    #[error("{kind} reference #{index} is out of range")]
    DanglingReference {
        /// The kind of the referenced entity.
        kind: &'static str,
        /// The raw ID.
        index: u32,
    },
}

/// A complete chip database held in flat tables.
///
/// Serialized as the tables only; name lookups, wire adjacency and tile
/// families are derived by [`Device::rebuild_indices`], which must be called
/// after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Device {
    /// The device (part) name.
    pub name: String,
    /// All tiles.
    pub tiles: Vec<Tile>,
    /// All sites, in enumeration order.
    pub sites: Vec<Site>,
    /// All BELs.
    pub bels: Vec<Bel>,
    /// All routing wires.
    pub wires: Vec<Wire>,
    /// All PIPs.
    pub pips: Vec<Pip>,
    #[serde(skip)]
    site_by_name: HashMap<String, SiteId>,
    #[serde(skip)]
    bel_by_name: HashMap<String, BelId>,
    #[serde(skip)]
    site_by_pin: HashMap<String, SiteId>,
}

impl Device {
    /// Rebuilds derived lookups after deserialization.
    ///
    /// Checks name uniqueness and cross-reference bounds, classifies every
    /// tile, and recomputes wire-to-BEL-pin and wire-to-PIP adjacency.
    pub fn rebuild_indices(&mut self) -> Result<(), DeviceError> {
        self.site_by_name.clear();
        self.bel_by_name.clear();
        self.site_by_pin.clear();

        let mut tile_names = HashSet::new();
        for tile in &mut self.tiles {
            if !tile_names.insert(tile.name.clone()) {
                return Err(dup("tile", &tile.name));
            }
            tile.family = TileFamily::classify(&tile.tile_type);
        }
        for tile in &self.tiles {
            if let Some(region) = tile.clock_region {
                check(region.index(), self.tiles.len(), "tile")?;
            }
            for site in &tile.sites {
                check(site.index(), self.sites.len(), "site")?;
            }
        }

        for (i, site) in self.sites.iter().enumerate() {
            let id = SiteId::from_raw(i as u32);
            check(site.tile.index(), self.tiles.len(), "tile")?;
            if self.site_by_name.insert(site.name.clone(), id).is_some() {
                return Err(dup("site", &site.name));
            }
            if let Some(pin) = &site.package_pin {
                if let Some(first) = self.site_by_pin.insert(pin.clone(), id) {
                    return Err(DeviceError::DuplicatePackagePin {
                        pin: pin.clone(),
                        first: self.sites[first.index()].name.clone(),
                        second: site.name.clone(),
                    });
                }
            }
        }

        let mut wire_names = HashSet::new();
        for wire in &mut self.wires {
            if !wire_names.insert(wire.name.clone()) {
                return Err(dup("wire", &wire.name));
            }
            wire.bel_pins.clear();
            wire.uphill.clear();
            wire.downhill.clear();
        }

        for (i, bel) in self.bels.iter().enumerate() {
            let id = BelId::from_raw(i as u32);
            check(bel.site.index(), self.sites.len(), "site")?;
            let full = format!("{}/{}", self.sites[bel.site.index()].name, bel.name);
            if self.bel_by_name.insert(full.clone(), id).is_some() {
                return Err(dup("bel", &full));
            }
            for pin in &bel.pins {
                check(pin.wire.index(), self.wires.len(), "wire")?;
                self.wires[pin.wire.index()].bel_pins.push(BelPinRef {
                    bel: id,
                    pin: pin.name.clone(),
                });
            }
        }

        for (i, pip) in self.pips.iter().enumerate() {
            let id = PipId::from_raw(i as u32);
            check(pip.src.index(), self.wires.len(), "wire")?;
            check(pip.dst.index(), self.wires.len(), "wire")?;
            self.wires[pip.src.index()].downhill.push(id);
            self.wires[pip.dst.index()].uphill.push(id);
        }

        Ok(())
    }
}

fn dup(kind: &'static str, name: &str) -> DeviceError {
    DeviceError::DuplicateName {
        kind,
        name: name.to_string(),
    }
}

fn check(index: usize, len: usize, kind: &'static str) -> Result<(), DeviceError> {
    if index < len {
        Ok(())
    } else {
        Err(DeviceError::DanglingReference {
            kind,
            index: index as u32,
        })
    }
}

impl Architecture for Device {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn site_count(&self) -> usize {
        self.sites.len()
    }

    fn bel_count(&self) -> usize {
        self.bels.len()
    }

    fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.index()]
    }

    fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.index()]
    }

    fn bel(&self, id: BelId) -> &Bel {
        &self.bels[id.index()]
    }

    fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.index()]
    }

    fn pip(&self, id: PipId) -> &Pip {
        &self.pips[id.index()]
    }

    fn site_by_name(&self, name: &str) -> Option<SiteId> {
        self.site_by_name.get(name).copied()
    }

    fn bel_by_name(&self, name: &str) -> Option<BelId> {
        self.bel_by_name.get(name).copied()
    }

    fn package_pin_site(&self, pin: &str) -> Option<SiteId> {
        self.site_by_pin.get(pin).copied()
    }
}

/// Incrementally assembles a [`Device`].
///
/// ```
/// use aion_arch::{Architecture, DeviceBuilder};
///
/// let mut b = DeviceBuilder::new("tiny");
/// let tile = b.add_tile("LIOB33_X0Y0", "LIOB33");
/// let site = b.add_site(tile, "IOB_0", "IOB33");
/// b.set_package_pin(site, "PIN_A1");
/// let pad = b.add_wire("IOB_0.PAD");
/// b.add_bel(site, "PAD", &[("PAD", pad)]);
/// let device = b.build().unwrap();
/// assert_eq!(device.package_pin_site("PIN_A1"), Some(site));
/// ```
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    device: Device,
}

impl DeviceBuilder {
    /// Starts a new device with the given part name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device: Device {
                name: name.into(),
                ..Device::default()
            },
        }
    }

    /// Adds a tile and returns its ID.
    pub fn add_tile(&mut self, name: impl Into<String>, tile_type: impl Into<String>) -> TileId {
        let id = TileId::from_raw(self.device.tiles.len() as u32);
        self.device.tiles.push(Tile {
            name: name.into(),
            tile_type: tile_type.into(),
            sites: Vec::new(),
            clock_region: None,
            family: TileFamily::Other,
        });
        id
    }

    /// Adds a site to a tile and returns its ID.
    pub fn add_site(
        &mut self,
        tile: TileId,
        name: impl Into<String>,
        site_type: impl Into<String>,
    ) -> SiteId {
        let id = SiteId::from_raw(self.device.sites.len() as u32);
        self.device.sites.push(Site {
            name: name.into(),
            site_type: site_type.into(),
            tile,
            bels: Vec::new(),
            package_pin: None,
            reserved: false,
        });
        if let Some(t) = self.device.tiles.get_mut(tile.index()) {
            t.sites.push(id);
        }
        id
    }

    /// Bonds a site to a package pin.
    pub fn set_package_pin(&mut self, site: SiteId, pin: impl Into<String>) {
        if let Some(s) = self.device.sites.get_mut(site.index()) {
            s.package_pin = Some(pin.into());
        }
    }

    /// Marks a site as reserved.
    pub fn set_reserved(&mut self, site: SiteId) {
        if let Some(s) = self.device.sites.get_mut(site.index()) {
            s.reserved = true;
        }
    }

    /// Sets the clock-region tile serving `tile`.
    pub fn set_clock_region(&mut self, tile: TileId, region: TileId) {
        if let Some(t) = self.device.tiles.get_mut(tile.index()) {
            t.clock_region = Some(region);
        }
    }

    /// Adds a routing wire and returns its ID.
    pub fn add_wire(&mut self, name: impl Into<String>) -> WireId {
        let id = WireId::from_raw(self.device.wires.len() as u32);
        self.device.wires.push(Wire {
            name: name.into(),
            bel_pins: Vec::new(),
            uphill: Vec::new(),
            downhill: Vec::new(),
        });
        id
    }

    /// Adds a BEL with the given pins to a site and returns its ID.
    pub fn add_bel(
        &mut self,
        site: SiteId,
        name: impl Into<String>,
        pins: &[(&str, WireId)],
    ) -> BelId {
        let id = BelId::from_raw(self.device.bels.len() as u32);
        self.device.bels.push(Bel {
            name: name.into(),
            site,
            pins: pins
                .iter()
                .map(|(pin, wire)| BelPin {
                    name: (*pin).to_string(),
                    wire: *wire,
                })
                .collect(),
            cell_types: Vec::new(),
        });
        if let Some(s) = self.device.sites.get_mut(site.index()) {
            s.bels.push(id);
        }
        id
    }

    /// Restricts a BEL to the given primitive types.
    pub fn set_bel_types(&mut self, bel: BelId, types: Vec<String>) {
        if let Some(b) = self.device.bels.get_mut(bel.index()) {
            b.cell_types = types;
        }
    }

    /// Adds a PIP from `src` to `dst` and returns its ID.
    pub fn add_pip(&mut self, src: WireId, dst: WireId) -> PipId {
        let id = PipId::from_raw(self.device.pips.len() as u32);
        self.device.pips.push(Pip { src, dst });
        id
    }

    /// Finishes the device, building all derived lookups.
    pub fn build(self) -> Result<Device, DeviceError> {
        let mut device = self.device;
        device.rebuild_indices()?;
        Ok(device)
    }
}
