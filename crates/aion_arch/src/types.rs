//! Structural elements of a chip database.
//!
//! A device is a set of named tiles. Each tile holds sites, each site holds
//! BELs (the sub-site slots cells are bound to), and BEL pins attach to
//! routing wires. Wires are connected by directed PIPs. All cross-references
//! are ID-based so the tables can be serialized as flat vectors.

use crate::ids::{BelId, PipId, SiteId, TileId, WireId};
use serde::{Deserialize, Serialize};

/// The functional family of a tile, derived from its tile type name.
///
/// Classified once when the device is built or loaded, so that passes can
/// branch on a typed field instead of re-inspecting type-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileFamily {
    /// A high-range (3.3 V capable) I/O bank tile, e.g. `LIOB33`.
    HighRangeIo,
    /// A high-performance (1.8 V) I/O bank tile, e.g. `RIOB18`.
    HighPerformanceIo,
    /// An I/O interface tile holding ILOGIC/OLOGIC/delay sites.
    IoInterface,
    /// A clock-region tile holding regional control sites.
    ClockRegion,
    /// Any other tile.
    #[default]
    Other,
}

impl TileFamily {
    /// Classifies a tile by its type name.
    pub fn classify(tile_type: &str) -> Self {
        if tile_type.starts_with("HCLK") {
            Self::ClockRegion
        } else if tile_type.contains("IOB33") {
            Self::HighRangeIo
        } else if tile_type.contains("IOB18") {
            Self::HighPerformanceIo
        } else if tile_type.contains("IOI") {
            Self::IoInterface
        } else {
            Self::Other
        }
    }

    /// Returns `true` for the two I/O bank families.
    pub fn is_io_bank(self) -> bool {
        matches!(self, Self::HighRangeIo | Self::HighPerformanceIo)
    }

    /// Returns the name of the input-buffer BEL on an I/O site of this family.
    pub fn inbuf_bel(self) -> Option<&'static str> {
        match self {
            Self::HighRangeIo => Some("INBUF_EN"),
            Self::HighPerformanceIo => Some("INBUF_DCIEN"),
            _ => None,
        }
    }

    /// Returns the name of the output-buffer BEL on an I/O site of this family.
    pub fn outbuf_bel(self) -> Option<&'static str> {
        match self {
            Self::HighRangeIo => Some("OUTBUF"),
            Self::HighPerformanceIo => Some("OUTBUF_DCIEN"),
            _ => None,
        }
    }

    /// Returns the site-type prefix of I/O sites in this family.
    pub fn iob_prefix(self) -> Option<&'static str> {
        match self {
            Self::HighRangeIo => Some("IOB33"),
            Self::HighPerformanceIo => Some("IOB18"),
            _ => None,
        }
    }

    /// Whether the family's buffers support DCI termination.
    pub fn supports_dci(self) -> bool {
        self == Self::HighPerformanceIo
    }

    /// Whether the family's I/O interface has output delay sites.
    pub fn has_output_delay(self) -> bool {
        self == Self::HighPerformanceIo
    }
}

/// A named tile of the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    /// The unique tile name (e.g., "LIOB33_X0Y12").
    pub name: String,
    /// The tile type name (e.g., "LIOB33").
    pub tile_type: String,
    /// The sites on this tile, in enumeration order.
    pub sites: Vec<SiteId>,
    /// The clock-region tile that serves this tile, if any.
    pub clock_region: Option<TileId>,
    /// Family classification, derived from `tile_type` at load.
    #[serde(skip)]
    pub family: TileFamily,
}

/// A placement location on a tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// The unique site name (e.g., "IOB_12").
    pub name: String,
    /// The site type name (e.g., "IOB33M").
    pub site_type: String,
    /// The tile this site belongs to.
    pub tile: TileId,
    /// The BELs (sub-sites) of this site, in enumeration order.
    pub bels: Vec<BelId>,
    /// The package pin bonded to this site, if any.
    pub package_pin: Option<String>,
    /// Reserved sites are never handed out to unconstrained pads.
    #[serde(default)]
    pub reserved: bool,
}

/// A connection point of a BEL to a routing wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BelPin {
    /// The pin name (e.g., "OUT").
    pub name: String,
    /// The wire the pin is attached to.
    pub wire: WireId,
}

/// A basic element of logic: one primitive slot within a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bel {
    /// The BEL name within its site (e.g., "PAD", "INBUF_EN").
    pub name: String,
    /// The site this BEL belongs to.
    pub site: SiteId,
    /// The pins of this BEL.
    pub pins: Vec<BelPin>,
    /// Primitive type names this BEL can host, both the library primitives
    /// that legalize onto it and the BEL-level types they become. An empty
    /// list accepts any type.
    #[serde(default)]
    pub cell_types: Vec<String>,
}

impl Bel {
    /// Returns whether a cell of the named type may be bound here.
    pub fn accepts(&self, cell_type: &str) -> bool {
        self.cell_types.is_empty() || self.cell_types.iter().any(|t| t == cell_type)
    }
}

/// A reference from a wire back to a BEL pin attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BelPinRef {
    /// The BEL owning the pin.
    pub bel: BelId,
    /// The pin name.
    pub pin: String,
}

/// A routing wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    /// The unique wire name.
    pub name: String,
    /// BEL pins attached to this wire (rebuilt at load).
    #[serde(skip)]
    pub bel_pins: Vec<BelPinRef>,
    /// PIPs driving this wire (rebuilt at load).
    #[serde(skip)]
    pub uphill: Vec<PipId>,
    /// PIPs driven by this wire (rebuilt at load).
    #[serde(skip)]
    pub downhill: Vec<PipId>,
}

/// A directed programmable interconnect point between two wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pip {
    /// The driving wire.
    pub src: WireId,
    /// The driven wire.
    pub dst: WireId,
}
