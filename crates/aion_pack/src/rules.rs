//! Rule tables for the Series-7 I/O legalization passes.

use crate::celltype::CellType;
use crate::xform::{RuleTable, XformRule};
use aion_arch::TileFamily;

/// Buffer rules for one I/O bank family.
///
/// Output buffers become the family's OUTBUF type (`I`→`IN`, `O`→`OUT`,
/// `T`→`TRI`); input buffers become its INBUF type (`I`→`PAD`, `O`→`OUT`,
/// and `IB`→`DIFFI_IN` for differential inputs). Returns an empty table for
/// non-I/O families.
pub fn io_buffer_rules(family: TileFamily) -> RuleTable {
    let (inbuf, outbuf) = match family {
        TileFamily::HighRangeIo => (CellType::Iob33InbufEn, CellType::Iob33Outbuf),
        TileFamily::HighPerformanceIo => (CellType::Iob18InbufDcien, CellType::Iob18OutbufDcien),
        _ => return RuleTable::new(),
    };

    let obuf = XformRule::new(outbuf)
        .rename("I", "IN")
        .rename("O", "OUT")
        .rename("T", "TRI");
    let ibuf = XformRule::new(inbuf).rename("I", "PAD").rename("O", "OUT");
    let ibufds = ibuf.clone().rename("IB", "DIFFI_IN");

    let mut rules = RuleTable::new();
    for ty in [CellType::Obuf, CellType::Obuft, CellType::ObuftDcien] {
        rules.insert(ty, obuf.clone());
    }
    for ty in [
        CellType::Ibuf,
        CellType::IbufIbufdisable,
        CellType::IbufIntermdisable,
    ] {
        rules.insert(ty, ibuf.clone());
    }
    rules.insert(CellType::Ibufds, ibufds);
    rules
}

/// Family-independent rules run after the buffer rules.
pub fn generic_io_rules() -> RuleTable {
    let mut rules = RuleTable::new();
    rules.insert(CellType::Pad, XformRule::new(CellType::Pad));
    rules.insert(
        CellType::Inv,
        XformRule::new(CellType::Inverter)
            .rename("I", "IN")
            .rename("O", "OUT"),
    );
    rules
}

/// The per-cell rule for an output DDR register on the given family.
pub fn oddr_rule(family: TileFamily) -> XformRule {
    let outff = if family == TileFamily::HighPerformanceIo {
        CellType::Ologice2Outff
    } else {
        CellType::Ologice3Outff
    };
    XformRule::new(outff)
        .rename("C", "CK")
        .rename("S", "SR")
        .rename("R", "SR")
}

/// Final rules for delay, serializer and input DDR cells.
///
/// The `IDDR` clock lands on `CK` or `CKB`; use
/// [`clock_polarity`](crate::xform::clock_polarity) as the selector.
pub fn iologic_rules() -> RuleTable {
    let mut rules = RuleTable::new();
    rules.insert(
        CellType::Iddr,
        XformRule::new(CellType::Ilogice3Iff)
            .one_of("C", &["CK", "CKB"])
            .rename("S", "SR")
            .rename("R", "SR"),
    );
    rules.insert(
        CellType::Iserdese2,
        XformRule::new(CellType::Iserdese2Iserdese2),
    );
    rules.insert(
        CellType::Oserdese2,
        XformRule::new(CellType::Oserdese2Oserdese2),
    );
    rules.insert(
        CellType::Idelaye2,
        XformRule::new(CellType::Idelaye2Idelaye2),
    );
    rules.insert(
        CellType::Odelaye2,
        XformRule::new(CellType::Odelaye2Odelaye2),
    );
    rules
}

/// Final rule for the delay controller.
pub fn idelayctrl_rules() -> RuleTable {
    let mut rules = RuleTable::new();
    rules.insert(
        CellType::Idelayctrl,
        XformRule::new(CellType::IdelayctrlIdelayctrl),
    );
    rules
}
