//! Legalization errors and the diagnostic codes they are reported under.
//!
//! Error codes `E300`--`E304` cover fatal legalization failures, one per error
//! class. `W310` covers qualifiers that are dropped because the hosting site
//! cannot honour them. All progress lines use `I300`.

use crate::ids::{CellId, NetId};
use crate::progress::Pass;
use aion_common::InternalError;
use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, Label, Subject};

/// Broken engine invariant.
pub const E300: DiagnosticCode = DiagnosticCode::new(Category::Error, 300);

/// Structural error: disconnected required port, illegal fan-out,
/// unsupported primitive configuration.
pub const E301: DiagnosticCode = DiagnosticCode::new(Category::Error, 301);

/// Constraint error: unknown package pin, exhausted site pool, conflicting
/// site binding.
pub const E302: DiagnosticCode = DiagnosticCode::new(Category::Error, 302);

/// Fabric error: companion-site search found nothing.
pub const E303: DiagnosticCode = DiagnosticCode::new(Category::Error, 303);

/// Electrical error: I/O standard or drive strength not supported by the site.
pub const E304: DiagnosticCode = DiagnosticCode::new(Category::Error, 304);

/// A qualifier signal was dropped because the site family does not support it.
pub const W310: DiagnosticCode = DiagnosticCode::new(Category::Warning, 310);

/// Progress line.
pub const I300: DiagnosticCode = DiagnosticCode::new(Category::Info, 300);

/// Creates a progress diagnostic.
pub fn progress(message: impl Into<String>) -> Diagnostic {
    Diagnostic::from_code(I300, message)
}

/// Creates the warning for a qualifier port that cannot be kept.
pub fn warn_dropped_qualifier(port: &str, cell: &str, site: &str) -> Diagnostic {
    Diagnostic::warning(
        W310,
        format!("{port} on '{cell}' dropped: site '{site}' does not support DCI"),
    )
    .with_subject(Subject::Cell(cell.to_string()))
    .with_label(Label::secondary(
        Subject::Site(site.to_string()),
        "high-range bank",
    ))
}

/// Errors raised by the netlist mutation API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetlistError {
    /// The cell was removed or never existed.
    #[error("cell #{0} does not exist")]
    NoSuchCell(CellId),
    /// The net was removed or never existed.
    #[error("net #{0} does not exist")]
    NoSuchNet(NetId),
    /// The cell has no port with this name.
    #[error("cell '{cell}' has no port '{port}'")]
    NoSuchPort {
        /// Cell name.
        cell: String,
        /// Port name.
        port: String,
    },
    /// The port is already connected to a net.
    #[error("port '{port}' of cell '{cell}' is already connected")]
    PortInUse {
        /// Cell name.
        cell: String,
        /// Port name.
        port: String,
    },
    /// Connecting the port would give the net a second driver.
    #[error("net '{net}' is already driven by '{driver}', cannot also be driven by '{cell}.{port}'")]
    MultipleDrivers {
        /// Net name.
        net: String,
        /// Existing driver, as `cell.port`.
        driver: String,
        /// Cell of the rejected driver.
        cell: String,
        /// Port of the rejected driver.
        port: String,
    },
    /// A cell or net with this name already exists.
    #[error("a {kind} named '{name}' already exists")]
    DuplicateName {
        /// "cell" or "net".
        kind: &'static str,
        /// The clashing name.
        name: String,
    },
}

/// A fatal legalization error.
///
/// The first four variants are the user-facing error classes. Each carries
/// the object the error is about, which becomes the primary subject of the
/// reported diagnostic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LegalizeError {
    /// Disconnected required port, illegal fan-out, or unsupported
    /// primitive configuration.
    #[error("{message}")]
    Structural {
        /// The offending object.
        subject: Subject,
        /// What went wrong.
        message: String,
    },
    /// Unknown package pin, site-pool exhaustion, or conflicting binding.
    #[error("{message}")]
    Constraint {
        /// The offending object.
        subject: Subject,
        /// What went wrong.
        message: String,
    },
    /// Companion-site search exhausted the fabric without a match.
    #[error("{message}")]
    Fabric {
        /// The offending object.
        subject: Subject,
        /// What went wrong.
        message: String,
    },
    /// I/O standard or drive strength not supported by the target site.
    #[error("{message}")]
    Electrical {
        /// The offending object.
        subject: Subject,
        /// What went wrong.
        message: String,
    },
    /// The job controller asked to stop; the netlist is consistent as of
    /// the end of the previous pass.
    #[error("legalization cancelled before pass '{before}'")]
    Cancelled {
        /// The pass that did not start.
        before: Pass,
    },
    /// A broken engine invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl LegalizeError {
    /// Creates a structural error about a cell.
    pub fn structural(cell: &str, message: impl Into<String>) -> Self {
        Self::Structural {
            subject: Subject::Cell(cell.to_string()),
            message: message.into(),
        }
    }

    /// Creates a constraint error about a cell.
    pub fn constraint(cell: &str, message: impl Into<String>) -> Self {
        Self::Constraint {
            subject: Subject::Cell(cell.to_string()),
            message: message.into(),
        }
    }

    /// Creates a fabric error about a site or BEL.
    pub fn fabric(site: &str, message: impl Into<String>) -> Self {
        Self::Fabric {
            subject: Subject::Site(site.to_string()),
            message: message.into(),
        }
    }

    /// Creates an electrical error about a cell.
    pub fn electrical(cell: &str, message: impl Into<String>) -> Self {
        Self::Electrical {
            subject: Subject::Cell(cell.to_string()),
            message: message.into(),
        }
    }

    /// Returns the object this error is about, if any.
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            Self::Structural { subject, .. }
            | Self::Constraint { subject, .. }
            | Self::Fabric { subject, .. }
            | Self::Electrical { subject, .. } => Some(subject),
            Self::Cancelled { .. } | Self::Internal(_) => None,
        }
    }

    /// Converts the error into the diagnostic reported to the sink.
    ///
    /// Cancellation is reported as a progress line, everything else as an
    /// error.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            Self::Structural { .. } => E301,
            Self::Constraint { .. } => E302,
            Self::Fabric { .. } => E303,
            Self::Electrical { .. } => E304,
            Self::Internal(_) => E300,
            Self::Cancelled { .. } => return progress(self.to_string()),
        };
        let diag = Diagnostic::from_code(code, self.to_string());
        match self.subject() {
            Some(subject) => diag.with_subject(subject.clone()),
            None => diag.with_note("this is a bug in the legalizer"),
        }
    }
}

impl From<NetlistError> for LegalizeError {
    fn from(err: NetlistError) -> Self {
        let message = err.to_string();
        match err {
            NetlistError::MultipleDrivers { net, .. } => Self::Structural {
                subject: Subject::Net(net),
                message,
            },
            NetlistError::DuplicateName { kind: "net", name } => Self::Structural {
                subject: Subject::Net(name),
                message,
            },
            NetlistError::DuplicateName { name, .. } => Self::Structural {
                subject: Subject::Cell(name),
                message,
            },
            NetlistError::NoSuchPort { cell, .. } => Self::Structural {
                subject: Subject::Cell(cell),
                message,
            },
            NetlistError::NoSuchCell(_)
            | NetlistError::NoSuchNet(_)
            | NetlistError::PortInUse { .. } => Self::Internal(InternalError::new(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_diagnostics::Severity;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E301}"), "E301");
        assert_eq!(format!("{E304}"), "E304");
        assert_eq!(format!("{W310}"), "W310");
        assert_eq!(format!("{I300}"), "I300");
    }

    #[test]
    fn class_maps_to_code() {
        let err = LegalizeError::constraint("led", "no pin named 'PIN_Z9'");
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, E302);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.subject, Some(Subject::Cell("led".into())));
        assert_eq!(diag.message, "no pin named 'PIN_Z9'");
    }

    #[test]
    fn cancellation_is_not_an_error() {
        let err = LegalizeError::Cancelled {
            before: Pass::DecomposeIo,
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, Severity::Info);
        assert!(diag.message.contains("DecomposeIo"));
    }

    #[test]
    fn multiple_drivers_is_structural() {
        let err: LegalizeError = NetlistError::MultipleDrivers {
            net: "n".into(),
            driver: "a.O".into(),
            cell: "b".into(),
            port: "O".into(),
        }
        .into();
        assert_eq!(err.subject(), Some(&Subject::Net("n".into())));
        assert_eq!(err.to_diagnostic().code, E301);
    }

    #[test]
    fn missing_cell_is_internal() {
        let err: LegalizeError = NetlistError::NoSuchCell(CellId::from_raw(3)).into();
        assert!(matches!(err, LegalizeError::Internal(_)));
        assert_eq!(err.to_diagnostic().code, E300);
    }
}
