//! Series-7 I/O netlist legalization for the Aion FPGA toolchain.
//!
//! This crate takes a technology-mapped [`Netlist`] using family-generic
//! primitive names and rewrites it into the primitive graph the target
//! fabric supports, binding every I/O-related cell to a concrete BEL of the
//! [`Architecture`]. The netlist is mutated in place.
//!
//! # Pipeline
//!
//! 1. **Insert pads**: top-level port markers become `PAD` cells
//! 2. **Bind I/O**: pads are constrained or allocated to package sites
//! 3. **Decompose**: I/O macros are split into elementary buffers
//! 4. **Transform**: buffers get BEL types; pads are checked electrically
//! 5. **I/O logic**: delays, serializers and DDR registers are bound to
//!    companion sites found by walking the routing fabric
//! 6. **Merge control**: the `IDELAYCTRL` is replicated per clock region
//! 7. **Final transform**: bulk renaming, net pruning, validation
//!
//! Between passes a [`PassObserver`] may pause or cancel the run.
//!
//! # Usage
//!
//! ```ignore
//! use aion_pack::{legalize, RunToCompletion};
//!
//! let summary = legalize(&mut netlist, &device, &config, &sink, &RunToCompletion)?;
//! assert!(summary.pads > 0);
//! ```

#![warn(missing_docs)]

pub mod bind;
pub mod celltype;
pub mod checks;
pub mod data;
pub mod decompose;
pub mod errors;
pub mod ids;
pub mod invert;
pub mod ioctrl;
pub mod iologic;
pub mod navigate;
pub mod pads;
pub mod progress;
pub mod rules;
pub mod transform;
pub mod xform;

pub use bind::{bind_io, BindSummary};
pub use celltype::CellType;
pub use data::{Cell, Net, Netlist, Port, PortDirection, PortRef};
pub use errors::{LegalizeError, NetlistError};
pub use ids::{CellId, NetId};
pub use navigate::{locate_companion, SearchDirection};
pub use progress::{JobControl, Pass, PassControl, PassObserver, RunToCompletion};
pub use xform::{apply_rules, RuleTable, Scope, XformRule};

use aion_arch::Architecture;
use aion_config::PackConfig;
use aion_diagnostics::DiagnosticSink;
use errors::progress as progress_line;
use tracing::info;

/// Counts reported by a completed legalization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackSummary {
    /// Pads inserted for top-level ports.
    pub pads: usize,
    /// Pads bound from a user constraint.
    pub constrained: usize,
    /// Pads bound from the free-site pool.
    pub allocated: usize,
    /// I/O macros decomposed.
    pub decomposed: usize,
    /// Cells retyped by the transform passes.
    pub transformed: usize,
    /// Delay, serializer and DDR cells bound to companion sites.
    pub iologic: usize,
    /// Delay controller clones created.
    pub control_clones: usize,
    /// Unconnected nets removed.
    pub pruned_nets: usize,
}

/// Legalizes `netlist` for `arch`.
///
/// Runs every [`Pass`] in order, consulting `observer` at each boundary.
/// The first error aborts the run; it is reported to `sink` and returned.
pub fn legalize(
    netlist: &mut Netlist,
    arch: &dyn Architecture,
    config: &PackConfig,
    sink: &DiagnosticSink,
    observer: &dyn PassObserver,
) -> Result<PackSummary, LegalizeError> {
    let mut legalizer = Legalizer {
        netlist,
        arch,
        config,
        sink,
        pads: Vec::new(),
        summary: PackSummary::default(),
    };
    match legalizer.run(observer) {
        Ok(()) => Ok(legalizer.summary),
        Err(e) => {
            sink.emit(e.to_diagnostic());
            Err(e)
        }
    }
}

struct Legalizer<'a> {
    netlist: &'a mut Netlist,
    arch: &'a dyn Architecture,
    config: &'a PackConfig,
    sink: &'a DiagnosticSink,
    pads: Vec<CellId>,
    summary: PackSummary,
}

impl Legalizer<'_> {
    fn run(&mut self, observer: &dyn PassObserver) -> Result<(), LegalizeError> {
        checks::check_bindings(self.netlist, self.arch)?;
        for pass in Pass::ALL {
            if observer.pass_started(pass) == PassControl::Cancel {
                return Err(LegalizeError::Cancelled { before: pass });
            }
            info!(%pass, "pass started");
            self.run_pass(pass)?;
            if observer.pass_finished(pass) == PassControl::Cancel {
                if let Some(next) = pass.next() {
                    return Err(LegalizeError::Cancelled { before: next });
                }
            }
        }
        Ok(())
    }

    fn run_pass(&mut self, pass: Pass) -> Result<(), LegalizeError> {
        let config = self.config;
        match pass {
            Pass::InsertPads => {
                self.sink.emit(progress_line("Inserting IO buffers.."));
                self.pads = pads::insert_pads(self.netlist)?;
                self.summary.pads = self.pads.len();
            }
            Pass::BindIo => {
                let bound = bind_io(self.netlist, self.arch, &self.pads, self.sink)?;
                self.summary.constrained = bound.constrained;
                self.summary.allocated = bound.allocated;
            }
            Pass::DecomposeIo => {
                self.summary.decomposed =
                    decompose::decompose_io(self.netlist, self.arch, self.sink)?;
            }
            Pass::TransformIo => {
                self.summary.transformed +=
                    transform::transform_io(self.netlist, self.arch, &config.io)?;
            }
            Pass::Iologic if config.iologic.enabled => {
                self.summary.iologic = iologic::legalize_iologic(self.netlist, self.arch)?;
            }
            Pass::MergeControl if config.iologic.enabled => {
                self.summary.control_clones = ioctrl::merge_delay_control(
                    self.netlist,
                    self.arch,
                    config.iologic.merge_delay_control,
                )?;
            }
            Pass::Iologic | Pass::MergeControl => {}
            Pass::FinalTransform => {
                if config.iologic.enabled {
                    self.summary.transformed += apply_rules(
                        self.netlist,
                        &rules::iologic_rules(),
                        &Scope::All,
                        &xform::clock_polarity,
                    )?;
                    self.summary.transformed += apply_rules(
                        self.netlist,
                        &rules::idelayctrl_rules(),
                        &Scope::All,
                        &xform::first_candidate,
                    )?;
                }
                self.summary.pruned_nets = checks::prune_nets(self.netlist)?;
                checks::validate(self.netlist, self.arch)?;
            }
        }
        Ok(())
    }
}
