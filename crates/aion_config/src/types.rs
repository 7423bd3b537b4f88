//! Configuration types deserialized from `pack.toml`.

use serde::Deserialize;

/// The top-level legalization options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Pad and I/O buffer options.
    pub io: IoConfig,
    /// Delay, serializer and DDR legalization options.
    pub iologic: IologicConfig,
}

/// Options for pad checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IoConfig {
    /// A pad without an `IOSTANDARD` attribute is an electrical error.
    pub require_iostandard: bool,
    /// Check `DRIVE` against the I/O standard and bank family.
    pub check_drive: bool,
    /// I/O standard applied to pads that do not carry one.
    pub default_iostandard: Option<String>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            require_iostandard: true,
            check_drive: true,
            default_iostandard: None,
        }
    }
}

/// Options for the I/O logic sub-passes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IologicConfig {
    /// Bind delay, serializer and DDR cells to their companion sites.
    pub enabled: bool,
    /// Replicate the shared delay controller once per clock region. Has no
    /// effect when `enabled` is false.
    pub merge_delay_control: bool,
}

impl Default for IologicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            merge_delay_control: true,
        }
    }
}
