//! How much a legalization diagnostic matters to the run that emitted it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a legalization diagnostic.
///
/// `Info` carries the pass progress lines (`I300`), `Warning` a qualifier the
/// site had to drop (`W310`), and `Error` one of the `E30x` failures. Only
/// errors stop the pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A progress line, e.g. "Constraining 'led' to site 'IOB_12'".
    Info,
    /// The netlist was legalized, but something the user asked for was dropped.
    Warning,
    /// The pass that emitted this aborted, and no later pass runs.
    Error,
}

impl Severity {
    /// Whether a diagnostic of this severity ends the legalization run.
    pub fn aborts(self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Whether `--quiet` output keeps diagnostics of this severity.
    pub fn shown_when_quiet(self) -> bool {
        self.aborts()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}
