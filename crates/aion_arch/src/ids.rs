//! Table indices for chip database entities.
//!
//! These IDs index the tile, site, BEL, wire and PIP tables of a [`Device`](crate::Device)
//! and are only meaningful for the device that issued them.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize` for table lookups.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a named tile of the device.
    TileId
);

define_id!(
    /// Opaque, copyable ID for a site (placement location) on a tile.
    SiteId
);

define_id!(
    /// Opaque, copyable ID for a BEL (basic element of logic) within a site.
    BelId
);

define_id!(
    /// Opaque, copyable ID for a routing wire in the device fabric.
    WireId
);

define_id!(
    /// Opaque, copyable ID for a programmable interconnect point (PIP) connecting wires.
    PipId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn serializes_as_bare_index() {
        // Device tables cross-reference each other by these numbers.
        assert_eq!(serde_json::to_string(&BelId::from_raw(7)).unwrap(), "7");
        let site: SiteId = serde_json::from_str("42").unwrap();
        assert_eq!(site.index(), 42);
    }

    #[test]
    fn index_matches_raw() {
        let tile = TileId::from_raw(17);
        assert_eq!(tile.index(), 17);
        assert_eq!(tile.as_raw(), 17);
    }

    #[test]
    fn wire_ids_deduplicate_in_visited_set() {
        let mut visited = HashSet::new();
        assert!(visited.insert(WireId::from_raw(1)));
        assert!(visited.insert(WireId::from_raw(2)));
        assert!(!visited.insert(WireId::from_raw(1)));
    }
}
