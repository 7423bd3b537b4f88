//! Codes that identify a legalization diagnostic independently of its text.
//!
//! Legalization owns the `3xx` block: `E300` for a broken engine invariant,
//! `E301`..`E304` for structural, constraint, fabric and electrical failures,
//! `W310` for a dropped DCI qualifier and `I300` for progress lines.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::severity::Severity;

/// Which kind of legalization outcome a code reports. Fixes the letter the
/// code is printed with and the severity it is emitted at.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// A failure that aborts the pass (`E`).
    Error,
    /// A qualifier or option the target site could not keep (`W`).
    Warning,
    /// A pass progress line (`I`).
    Info,
}

impl Category {
    /// Letter printed in front of the number.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Info => 'I',
        }
    }

    /// Severity a diagnostic carrying a code of this category is emitted at.
    pub fn severity(self) -> Severity {
        match self {
            Category::Error => Severity::Error,
            Category::Warning => Severity::Warning,
            Category::Info => Severity::Info,
        }
    }
}

/// A legalization diagnostic code such as `E302` or `W310`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Kind of outcome reported.
    pub category: Category,
    /// Number within the legalization block, printed as three digits.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code. Usable in `const` items.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// Whether the number falls in the block reserved for legalization.
    pub fn is_legalization(self) -> bool {
        (300..400).contains(&self.number)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
