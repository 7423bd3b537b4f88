//! Labels that point a diagnostic at netlist or device objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The object a diagnostic or label refers to.
///
/// Legalization has no source text to point into; the useful location of a
/// problem is the instance, net, site or package pin that caused it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// A netlist cell instance, by name.
    Cell(String),
    /// A netlist net, by name.
    Net(String),
    /// A device site (or `SITE/BEL` sub-site), by name.
    Site(String),
    /// A package pin, by name.
    PackagePin(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Cell(name) => write!(f, "cell '{name}'"),
            Subject::Net(name) => write!(f, "net '{name}'"),
            Subject::Site(name) => write!(f, "site '{name}'"),
            Subject::PackagePin(name) => write!(f, "package pin '{name}'"),
        }
    }
}

/// The visual style of a diagnostic label.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The object the diagnostic is primarily about.
    Primary,
    /// A related object providing context.
    Secondary,
}

/// An annotated reference to a netlist or device object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// The object this label annotates.
    pub subject: Subject,
    /// The message displayed next to the object.
    pub message: String,
    /// Whether this is a primary or secondary label.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(subject: Subject, message: impl Into<String>) -> Self {
        Self {
            subject,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label (additional context).
    pub fn secondary(subject: Subject, message: impl Into<String>) -> Self {
        Self {
            subject,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_label() {
        let label = Label::primary(Subject::Cell("led".into()), "unconstrained");
        assert_eq!(label.style, LabelStyle::Primary);
        assert_eq!(label.message, "unconstrained");
    }

    #[test]
    fn secondary_label() {
        let label = Label::secondary(Subject::Site("IOB_12".into()), "already bound here");
        assert_eq!(label.style, LabelStyle::Secondary);
    }

    #[test]
    fn subject_display() {
        assert_eq!(Subject::Net("clk".into()).to_string(), "net 'clk'");
        assert_eq!(
            Subject::PackagePin("PIN_A7".into()).to_string(),
            "package pin 'PIN_A7'"
        );
    }
}
