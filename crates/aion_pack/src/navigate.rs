//! Companion-site search over the routing fabric.
//!
//! Delay, serializer and DDR cells must sit on the sites wired to the I/O
//! buffer they serve. Rather than hard-code site naming, the navigator walks
//! the wire/PIP graph from a pin of the bound buffer BEL and returns the
//! nearest site with the wanted name prefix.

use crate::errors::LegalizeError;
use aion_arch::{Architecture, BelId, SiteId, WireId};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{debug, trace};

/// Which way to walk PIPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// Towards drivers (uphill).
    Upstream,
    /// Towards loads (downhill).
    Downstream,
}

impl fmt::Display for SearchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
        })
    }
}

/// Finds the site nearest to `anchor.pin` whose name starts with `prefix`.
///
/// Breadth-first over wires, so the match with the fewest PIP hops wins and
/// ties go to the first one in fabric enumeration order. Every BEL pin on a
/// visited wire is inspected, the start wire included.
pub fn locate_companion(
    arch: &dyn Architecture,
    anchor: BelId,
    pin: &str,
    direction: SearchDirection,
    prefix: &str,
) -> Result<SiteId, LegalizeError> {
    let Some(start) = arch.bel_pin_wire(anchor, pin) else {
        let anchor_name = arch.bel_full_name(anchor);
        return Err(LegalizeError::fabric(
            &anchor_name,
            format!("BEL '{anchor_name}' has no pin '{pin}'"),
        ));
    };

    let mut visited: HashSet<WireId> = HashSet::from([start]);
    let mut frontier = VecDeque::from([(start, 0usize)]);
    while let Some((wire, hops)) = frontier.pop_front() {
        trace!(wire = %arch.wire(wire).name, hops, "visit");
        for bp in arch.wire_bel_pins(wire) {
            let site = arch.bel(bp.bel).site;
            if arch.site(site).name.starts_with(prefix) {
                debug!(
                    anchor = %arch.bel_full_name(anchor),
                    site = %arch.site(site).name,
                    hops,
                    "companion found"
                );
                return Ok(site);
            }
        }
        let pips = match direction {
            SearchDirection::Upstream => arch.pips_uphill(wire),
            SearchDirection::Downstream => arch.pips_downhill(wire),
        };
        for &pip in pips {
            let next = match direction {
                SearchDirection::Upstream => arch.pip_src(pip),
                SearchDirection::Downstream => arch.pip_dst(pip),
            };
            if visited.insert(next) {
                frontier.push_back((next, hops + 1));
            }
        }
    }

    let anchor_name = arch.bel_full_name(anchor);
    Err(LegalizeError::fabric(
        &arch.site(arch.bel(anchor).site).name,
        format!("failed to find a site named '{prefix}*' {direction} of '{anchor_name}.{pin}'"),
    ))
}

/// Finds the site named `prefix*` on the clock-region tile serving `site`.
pub fn locate_in_region(
    arch: &dyn Architecture,
    site: SiteId,
    prefix: &str,
) -> Result<SiteId, LegalizeError> {
    let s = arch.site(site);
    let Some(region) = arch.clock_region(s.tile) else {
        return Err(LegalizeError::fabric(
            &s.name,
            format!("site '{}' has no clock region", s.name),
        ));
    };
    let tile = arch.tile(region);
    tile.sites
        .iter()
        .copied()
        .find(|&r| arch.site(r).name.starts_with(prefix))
        .ok_or_else(|| {
            LegalizeError::fabric(
                &s.name,
                format!("failed to find '{prefix}*' in clock region '{}'", tile.name),
            )
        })
}
