//! The rule-based transform engine.
//!
//! A [`RuleTable`] maps a source [`CellType`] to an [`XformRule`] describing
//! the target type, port renames, one-of-N port redirections and attributes
//! to stamp onto the cell. Rules never create cells; they only rewrite the
//! cell they match.

use crate::celltype::CellType;
use crate::data::{Cell, Netlist};
use crate::errors::LegalizeError;
use crate::ids::CellId;
use aion_common::Property;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A rewrite applied to every cell of one source type.
#[derive(Debug, Clone, PartialEq)]
pub struct XformRule {
    /// The type the cell is renamed to.
    pub new_type: CellType,
    /// Direct port renames, `(from, to)`.
    pub renames: Vec<(String, String)>,
    /// Ports redirected to one of several candidates, picked by a selector.
    pub one_of: Vec<(String, Vec<String>)>,
    /// Attributes set unconditionally.
    pub set_attrs: Vec<(String, Property)>,
}

impl XformRule {
    /// Creates a rule that only changes the type.
    pub fn new(new_type: CellType) -> Self {
        Self {
            new_type,
            renames: Vec::new(),
            one_of: Vec::new(),
            set_attrs: Vec::new(),
        }
    }

    /// Adds a direct port rename.
    pub fn rename(mut self, from: &str, to: &str) -> Self {
        self.renames.push((from.to_string(), to.to_string()));
        self
    }

    /// Adds a one-of-N port redirection.
    pub fn one_of(mut self, from: &str, candidates: &[&str]) -> Self {
        self.one_of.push((
            from.to_string(),
            candidates.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Adds an attribute insertion.
    pub fn attr(mut self, key: &str, value: impl Into<Property>) -> Self {
        self.set_attrs.push((key.to_string(), value.into()));
        self
    }
}

/// Rules keyed by source type.
pub type RuleTable = HashMap<CellType, XformRule>;

/// The cells a rule table is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every live cell.
    All,
    /// Only these cells, in this order.
    Cells(Vec<CellId>),
}

/// Picks a candidate index for a one-of-N redirection.
///
/// Receives the cell before its type changes, the source port name and the
/// candidate list.
pub type PortSelector<'a> = &'a dyn Fn(&Cell, &str, &[String]) -> usize;

/// Always picks the first candidate.
pub fn first_candidate(_cell: &Cell, _port: &str, _candidates: &[String]) -> usize {
    0
}

/// Picks `CKB` for a clock input whose `IS_<port>_INVERTED` attribute is set,
/// otherwise the first candidate.
pub fn clock_polarity(cell: &Cell, port: &str, candidates: &[String]) -> usize {
    let inverted = cell.attr_int(&format!("IS_{port}_INVERTED")) == Some(1);
    if inverted {
        candidates.iter().position(|c| c == "CKB").unwrap_or(0)
    } else {
        0
    }
}

/// Applies `rules` to the cells in `scope`.
///
/// Returns the number of cells that actually changed. Running a table over
/// its own output therefore returns zero.
pub fn apply_rules(
    netlist: &mut Netlist,
    rules: &RuleTable,
    scope: &Scope,
    select: PortSelector<'_>,
) -> Result<usize, LegalizeError> {
    let cells = match scope {
        Scope::All => netlist.cell_ids(),
        Scope::Cells(cells) => cells.clone(),
    };
    let mut seen = HashSet::new();
    let mut changed = 0;
    for id in cells {
        let cell = netlist.cell(id)?;
        let Some(rule) = rules.get(&cell.cell_type) else {
            continue;
        };
        if !seen.insert(id) {
            return Err(LegalizeError::structural(
                &cell.name,
                format!("cell '{}' matched a transform rule twice", cell.name),
            ));
        }
        if xform_cell(netlist, id, rule, select)? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Applies a single rule to one cell. Returns `true` if anything changed.
pub fn xform_cell(
    netlist: &mut Netlist,
    id: CellId,
    rule: &XformRule,
    select: PortSelector<'_>,
) -> Result<bool, LegalizeError> {
    let mut changed = false;
    for (from, to) in &rule.renames {
        changed |= redirect_port(netlist, id, from, to)?;
    }
    for (from, candidates) in &rule.one_of {
        let cell = netlist.cell(id)?;
        if !cell.ports.contains_key(from) {
            continue;
        }
        let index = select(cell, from, candidates);
        let Some(to) = candidates.get(index) else {
            return Err(LegalizeError::structural(
                &cell.name,
                format!(
                    "no candidate #{index} for port '{from}' of '{}' (have {})",
                    cell.name,
                    candidates.join(", ")
                ),
            ));
        };
        changed |= redirect_port(netlist, id, from, to)?;
    }

    let cell = netlist.cell_mut(id)?;
    if cell.cell_type != rule.new_type {
        debug!(cell = %cell.name, from = %cell.cell_type, to = %rule.new_type, "transform");
        cell.cell_type = rule.new_type.clone();
        changed = true;
    }
    for (key, value) in &rule.set_attrs {
        if cell.attrs.get(key) != Some(value) {
            cell.attrs.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    Ok(changed)
}

/// Moves the connection on `from` to a port named `to`.
///
/// When both ports exist, the unconnected one gives way. Two connected ports
/// landing on the same pin cannot be merged.
fn redirect_port(
    netlist: &mut Netlist,
    id: CellId,
    from: &str,
    to: &str,
) -> Result<bool, LegalizeError> {
    if from == to {
        return Ok(false);
    }
    let cell = netlist.cell(id)?;
    let Some(src) = cell.ports.get(from) else {
        return Ok(false);
    };
    if let Some(dst) = cell.ports.get(to) {
        match (src.net.is_some(), dst.net.is_some()) {
            (true, true) => {
                return Err(LegalizeError::structural(
                    &cell.name,
                    format!(
                        "ports '{from}' and '{to}' of '{}' are both connected but map to the same pin '{to}'",
                        cell.name
                    ),
                ));
            }
            (false, _) => {
                netlist.remove_port(id, from)?;
                return Ok(true);
            }
            (true, false) => {
                netlist.remove_port(id, to)?;
            }
        }
    }
    netlist.rename_port(id, from, to)?;
    Ok(true)
}
