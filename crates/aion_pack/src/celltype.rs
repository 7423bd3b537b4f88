//! The closed catalogue of primitive type names the legalizer understands.
//!
//! Family-generic library primitives, the top-level port markers, and the
//! target BEL-level types all intern into [`CellType`]. Any other name (for
//! example a site-type specialised buffer such as `IOB33S_OUTBUF`, or logic
//! the legalizer passes through untouched) is kept as [`CellType::Other`].

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! cell_types {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        /// A primitive type tag.
        #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum CellType {
            $($(#[$meta])* $variant,)*
            /// Any type name outside the catalogue.
            Other(String),
        }

        impl CellType {
            /// Interns a type name.
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($name => Self::$variant,)*
                    other => Self::Other(other.to_string()),
                }
            }

            /// Returns the type name.
            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Other(name) => name,
                }
            }
        }
    };
}

cell_types! {
    /// Top-level input port marker.
    InputMarker => "$nextpnr_ibuf",
    /// Top-level output port marker.
    OutputMarker => "$nextpnr_obuf",
    /// Top-level bidirectional port marker.
    InoutMarker => "$nextpnr_iobuf",
    /// Package pad.
    Pad => "PAD",

    /// Single-ended input buffer.
    Ibuf => "IBUF",
    /// Input buffer with a buffer-disable input.
    IbufIbufdisable => "IBUF_IBUFDISABLE",
    /// Input buffer with an intermediate-disable input.
    IbufIntermdisable => "IBUF_INTERMDISABLE",
    /// Single-ended bidirectional buffer.
    Iobuf => "IOBUF",
    /// Bidirectional buffer with DCI enable.
    IobufDcien => "IOBUF_DCIEN",
    /// Bidirectional buffer with an intermediate-disable input.
    IobufIntermdisable => "IOBUF_INTERMDISABLE",
    /// Single-ended output buffer.
    Obuf => "OBUF",
    /// Single-ended tristate output buffer.
    Obuft => "OBUFT",
    /// Tristate output buffer with DCI enable.
    ObuftDcien => "OBUFT_DCIEN",
    /// Differential input buffer.
    Ibufds => "IBUFDS",
    /// Differential input buffer with an intermediate-disable input.
    IbufdsIntermdisable => "IBUFDS_INTERMDISABLE",
    /// Differential bidirectional buffer.
    Iobufds => "IOBUFDS",
    /// Differential bidirectional buffer with DCI enable.
    IobufdsDcien => "IOBUFDS_DCIEN",
    /// Differential bidirectional buffer with a differential input output.
    IobufdsDiffOut => "IOBUFDS_DIFF_OUT",
    /// Differential output buffer.
    Obufds => "OBUFDS",
    /// Differential tristate output buffer.
    Obuftds => "OBUFTDS",

    /// Generic inverter.
    Inv => "INV",
    /// One-input lookup table.
    Lut1 => "LUT1",
    /// Two-input lookup table.
    Lut2 => "LUT2",

    /// Input DDR register.
    Iddr => "IDDR",
    /// Output DDR register.
    Oddr => "ODDR",
    /// Input deserializer.
    Iserdese2 => "ISERDESE2",
    /// Output serializer.
    Oserdese2 => "OSERDESE2",
    /// Input delay element.
    Idelaye2 => "IDELAYE2",
    /// Output delay element.
    Odelaye2 => "ODELAYE2",
    /// Delay calibration controller.
    Idelayctrl => "IDELAYCTRL",

    /// High-range input buffer BEL.
    Iob33InbufEn => "IOB33_INBUF_EN",
    /// High-range output buffer BEL.
    Iob33Outbuf => "IOB33_OUTBUF",
    /// High-performance input buffer BEL.
    Iob18InbufDcien => "IOB18_INBUF_DCIEN",
    /// High-performance output buffer BEL.
    Iob18OutbufDcien => "IOB18_OUTBUF_DCIEN",
    /// Dedicated I/O inverter BEL.
    Inverter => "INVERTER",
    /// Input DDR flip-flop BEL.
    Ilogice3Iff => "ILOGICE3_IFF",
    /// High-performance output DDR flip-flop BEL.
    Ologice2Outff => "OLOGICE2_OUTFF",
    /// High-range output DDR flip-flop BEL.
    Ologice3Outff => "OLOGICE3_OUTFF",
    /// Deserializer BEL.
    Iserdese2Iserdese2 => "ISERDESE2_ISERDESE2",
    /// Serializer BEL.
    Oserdese2Oserdese2 => "OSERDESE2_OSERDESE2",
    /// Input delay BEL.
    Idelaye2Idelaye2 => "IDELAYE2_IDELAYE2",
    /// Output delay BEL.
    Odelaye2Odelaye2 => "ODELAYE2_ODELAYE2",
    /// Delay controller BEL.
    IdelayctrlIdelayctrl => "IDELAYCTRL_IDELAYCTRL",
}

impl CellType {
    /// Returns `true` for top-level port markers.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            Self::InputMarker | Self::OutputMarker | Self::InoutMarker
        )
    }

    /// Returns `true` for I/O macros that are decomposed into elementary
    /// buffers.
    pub fn is_io_macro(&self) -> bool {
        matches!(
            self,
            Self::Ibuf
                | Self::IbufIbufdisable
                | Self::IbufIntermdisable
                | Self::Iobuf
                | Self::IobufDcien
                | Self::IobufIntermdisable
                | Self::Obuf
                | Self::Obuft
                | Self::Ibufds
                | Self::IbufdsIntermdisable
                | Self::Iobufds
                | Self::IobufdsDcien
                | Self::IobufdsDiffOut
                | Self::Obufds
                | Self::Obuftds
        )
    }

    /// Returns the ports of an I/O macro that face the package pad.
    pub fn pad_ports(&self) -> &'static [&'static str] {
        match self {
            Self::Ibuf | Self::IbufIbufdisable | Self::IbufIntermdisable => &["I"],
            Self::Ibufds | Self::IbufdsIntermdisable => &["I", "IB"],
            Self::Obuf | Self::Obuft => &["O"],
            Self::Obufds | Self::Obuftds => &["O", "OB"],
            Self::Iobuf | Self::IobufDcien | Self::IobufIntermdisable => &["IO"],
            Self::Iobufds | Self::IobufdsDcien | Self::IobufdsDiffOut => &["IO", "IOB"],
            _ => &[],
        }
    }

    /// Returns `true` for types that must occupy a BEL once legalized.
    ///
    /// Decomposed I/O buffers that were specialised to a site type fall into
    /// [`CellType::Other`]; they are recognised through their provenance
    /// attribute instead.
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            Self::Pad
                | Self::Iob33InbufEn
                | Self::Iob33Outbuf
                | Self::Iob18InbufDcien
                | Self::Iob18OutbufDcien
                | Self::Inverter
                | Self::Ilogice3Iff
                | Self::Ologice2Outff
                | Self::Ologice3Outff
                | Self::Iserdese2Iserdese2
                | Self::Oserdese2Oserdese2
                | Self::Idelaye2Idelaye2
                | Self::Odelaye2Odelaye2
                | Self::IdelayctrlIdelayctrl
        )
    }
}

impl From<String> for CellType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<CellType> for String {
    fn from(ty: CellType) -> Self {
        ty.name().to_string()
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
