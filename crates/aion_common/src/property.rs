//! Typed attribute values attached to netlist cells.
//!
//! Cells carry user constraints (`LOC`, `IOSTANDARD`, `DRIVE`), configuration
//! (`INIT`, `IOBDELAY`) and provenance (`X_ORIG_MACRO_PRIM`) in a single
//! attribute bag. Values arrive either as integers or as strings depending on
//! the front-end that produced the netlist, so integer reads accept both.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute value: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    /// An integer value (e.g. `DRIVE = 8`, `INIT = 1`).
    Int(i64),
    /// A string value (e.g. `IOSTANDARD = "LVCMOS33"`).
    String(String),
}

impl Property {
    /// Returns the string payload, or `None` for integer values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(s) => Some(s),
            Property::Int(_) => None,
        }
    }

    /// Returns the value as an integer.
    ///
    /// String values are parsed as decimal, or as binary when written in the
    /// Verilog sized form (`2'b01`), which is how LUT `INIT` masks usually
    /// arrive from synthesis.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Property::Int(v) => Some(*v),
            Property::String(s) => parse_int(s),
        }
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some((_, bits)) = s.split_once("'b") {
        return i64::from_str_radix(bits, 2).ok();
    }
    if let Some((_, hex)) = s.split_once("'h") {
        return i64::from_str_radix(hex, 16).ok();
    }
    s.parse().ok()
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Int(v) => write!(f, "{v}"),
            Property::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Property {
    fn from(v: i64) -> Self {
        Property::Int(v)
    }
}

impl From<&str> for Property {
    fn from(s: &str) -> Self {
        Property::String(s.to_string())
    }
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        Property::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_reads() {
        assert_eq!(Property::Int(8).as_int(), Some(8));
        assert_eq!(Property::from("12").as_int(), Some(12));
        assert_eq!(Property::from("2'b01").as_int(), Some(1));
        assert_eq!(Property::from("4'h8").as_int(), Some(8));
        assert_eq!(Property::from("LVCMOS33").as_int(), None);
    }

    #[test]
    fn string_reads() {
        assert_eq!(Property::from("IFD").as_str(), Some("IFD"));
        assert_eq!(Property::Int(3).as_str(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Property::Int(24).to_string(), "24");
        assert_eq!(Property::from("LVTTL").to_string(), "LVTTL");
    }

    #[test]
    fn serde_untagged() {
        let json = serde_json::to_string(&Property::Int(4)).unwrap();
        assert_eq!(json, "4");
        let back: Property = serde_json::from_str("\"PIN_A7\"").unwrap();
        assert_eq!(back, Property::from("PIN_A7"));
    }
}
