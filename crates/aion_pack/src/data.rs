//! The netlist arena and its mutation API.
//!
//! Cells and nets live in ID-indexed arenas. Removing an entity leaves a
//! tombstone, so IDs held elsewhere can never alias a different entity: they
//! simply stop resolving. Connectivity is stored on both sides (the port
//! knows its net, the net knows its driver and users) and every mutation
//! goes through [`Netlist`] methods that keep the two sides in step.
//!
//! Nets are driven by at most one output port. `connect` refuses a second
//! driver, so the single-driver invariant holds by construction.

use crate::celltype::CellType;
use crate::errors::NetlistError;
use crate::ids::{CellId, NetId};
use aion_arch::BelId;
use aion_common::Property;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The direction of a cell port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port (a net user).
    In,
    /// Output port (the net driver).
    Out,
    /// Bidirectional port, recorded as a net user.
    InOut,
}

impl PortDirection {
    /// Returns the lowercase name used in provenance attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::InOut => "inout",
        }
    }
}

/// A port of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// The port direction.
    pub direction: PortDirection,
    /// The connected net, if any.
    #[serde(default)]
    pub net: Option<NetId>,
}

/// A reference to one port of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// The cell.
    pub cell: CellId,
    /// The port name on that cell.
    pub port: String,
}

/// A primitive instance.
///
/// Fields are public for reading and for editing attributes, type and
/// binding. Port connectivity must only be changed through [`Netlist`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// The unique instance name.
    pub name: String,
    /// The primitive type.
    pub cell_type: CellType,
    /// Ports in declaration order.
    #[serde(default)]
    pub ports: IndexMap<String, Port>,
    /// Constraint, configuration and provenance attributes.
    #[serde(default)]
    pub attrs: BTreeMap<String, Property>,
    /// The BEL this cell is bound to.
    #[serde(default)]
    pub bel: Option<BelId>,
}

impl Cell {
    /// Returns the net on a port, or `None` if the port is absent or
    /// unconnected.
    pub fn port_net(&self, port: &str) -> Option<NetId> {
        self.ports.get(port).and_then(|p| p.net)
    }

    /// Returns a string attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Property::as_str)
    }

    /// Returns an integer attribute (string values are parsed).
    pub fn attr_int(&self, key: &str) -> Option<i64> {
        self.attrs.get(key).and_then(Property::as_int)
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.attrs.insert(key.into(), value.into());
    }
}

/// A signal connecting one driver to any number of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// The unique net name.
    pub name: String,
    /// The driving output port (rebuilt on deserialization).
    #[serde(skip)]
    pub driver: Option<PortRef>,
    /// Input and bidirectional ports on this net (rebuilt on
    /// deserialization).
    #[serde(skip)]
    pub users: Vec<PortRef>,
}

impl Net {
    /// Returns `true` when nothing is connected.
    pub fn is_unconnected(&self) -> bool {
        self.driver.is_none() && self.users.is_empty()
    }
}

/// Returns the name of a cell split out of `base`.
///
/// Sub-cells that stand for part of a hierarchical macro use a `$subcell$`
/// separator; others are named `base/suffix`.
pub fn int_name(base: &str, suffix: &str, hierarchical: bool) -> String {
    if hierarchical {
        format!("{base}$subcell${suffix}")
    } else {
        format!("{base}/{suffix}")
    }
}

/// Returns the name of a net created inside `base`.
pub fn internal_net_name(base: &str, suffix: &str, hierarchical: bool) -> String {
    if hierarchical {
        format!("{base}$subnet${suffix}")
    } else {
        format!("{base}/{suffix}")
    }
}

/// The design netlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    cells: Vec<Option<Cell>>,
    nets: Vec<Option<Net>>,
    #[serde(skip)]
    cell_by_name: HashMap<String, CellId>,
    #[serde(skip)]
    net_by_name: HashMap<String, NetId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell with the given ID.
    pub fn cell(&self, id: CellId) -> Result<&Cell, NetlistError> {
        self.cells
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(NetlistError::NoSuchCell(id))
    }

    /// Returns a mutable reference to the cell with the given ID.
    pub fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell, NetlistError> {
        self.cells
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(NetlistError::NoSuchCell(id))
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> Result<&Net, NetlistError> {
        self.nets
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(NetlistError::NoSuchNet(id))
    }

    fn net_mut(&mut self, id: NetId) -> Result<&mut Net, NetlistError> {
        self.nets
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(NetlistError::NoSuchNet(id))
    }

    /// Looks up a live cell by name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.cell_by_name.get(name).copied()
    }

    /// Looks up a live net by name.
    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Iterates over live cells in creation order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (CellId::from_raw(i as u32), c)))
    }

    /// Iterates over live nets in creation order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NetId::from_raw(i as u32), n)))
    }

    /// Returns the IDs of all live cells in creation order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells().map(|(id, _)| id).collect()
    }

    /// Returns the IDs of all live nets in creation order.
    pub fn net_ids(&self) -> Vec<NetId> {
        self.nets().map(|(id, _)| id).collect()
    }

    /// Returns the IDs of live cells of the given type in creation order.
    pub fn cells_of_type(&self, ty: &CellType) -> Vec<CellId> {
        self.cells()
            .filter(|(_, c)| &c.cell_type == ty)
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns the number of live cells.
    pub fn cell_count(&self) -> usize {
        self.cells().count()
    }

    /// Returns the number of live nets.
    pub fn net_count(&self) -> usize {
        self.nets().count()
    }

    /// Returns the net on a cell port.
    pub fn port_net(&self, cell: CellId, port: &str) -> Result<Option<NetId>, NetlistError> {
        Ok(self.cell(cell)?.port_net(port))
    }

    /// Returns the cell driving a net.
    pub fn driver_cell(&self, net: NetId) -> Result<Option<CellId>, NetlistError> {
        Ok(self.net(net)?.driver.as_ref().map(|d| d.cell))
    }

    /// Creates a cell with no ports.
    pub fn add_cell(
        &mut self,
        name: impl Into<String>,
        cell_type: CellType,
    ) -> Result<CellId, NetlistError> {
        let name = name.into();
        if self.cell_by_name.contains_key(&name) {
            return Err(NetlistError::DuplicateName { kind: "cell", name });
        }
        let id = CellId::from_raw(self.cells.len() as u32);
        self.cell_by_name.insert(name.clone(), id);
        self.cells.push(Some(Cell {
            name,
            cell_type,
            ports: IndexMap::new(),
            attrs: BTreeMap::new(),
            bel: None,
        }));
        Ok(id)
    }

    /// Creates an unconnected net.
    pub fn add_net(&mut self, name: impl Into<String>) -> Result<NetId, NetlistError> {
        let name = name.into();
        if self.net_by_name.contains_key(&name) {
            return Err(NetlistError::DuplicateName { kind: "net", name });
        }
        let id = NetId::from_raw(self.nets.len() as u32);
        self.net_by_name.insert(name.clone(), id);
        self.nets.push(Some(Net {
            name,
            driver: None,
            users: Vec::new(),
        }));
        Ok(id)
    }

    /// Creates a net named after the cell or macro it belongs to.
    pub fn create_internal_net(
        &mut self,
        base: &str,
        suffix: &str,
        hierarchical: bool,
    ) -> Result<NetId, NetlistError> {
        self.add_net(internal_net_name(base, suffix, hierarchical))
    }

    /// Declares a port on a cell. Declaring an existing port is a no-op.
    pub fn add_port(
        &mut self,
        cell: CellId,
        port: &str,
        direction: PortDirection,
    ) -> Result<(), NetlistError> {
        self.cell_mut(cell)?
            .ports
            .entry(port.to_string())
            .or_insert(Port {
                direction,
                net: None,
            });
        Ok(())
    }

    /// Connects an existing, unconnected port to a net.
    pub fn connect(&mut self, cell: CellId, port: &str, net: NetId) -> Result<(), NetlistError> {
        let c = self.cell(cell)?;
        let p = c.ports.get(port).ok_or_else(|| NetlistError::NoSuchPort {
            cell: c.name.clone(),
            port: port.to_string(),
        })?;
        if p.net.is_some() {
            return Err(NetlistError::PortInUse {
                cell: c.name.clone(),
                port: port.to_string(),
            });
        }
        let direction = p.direction;
        let n = self.net(net)?;
        if direction == PortDirection::Out {
            if let Some(driver) = &n.driver {
                return Err(NetlistError::MultipleDrivers {
                    net: n.name.clone(),
                    driver: format!("{}.{}", self.cell(driver.cell)?.name, driver.port),
                    cell: c.name.clone(),
                    port: port.to_string(),
                });
            }
        }

        let port_ref = PortRef {
            cell,
            port: port.to_string(),
        };
        let n = self.net_mut(net)?;
        if direction == PortDirection::Out {
            n.driver = Some(port_ref);
        } else {
            n.users.push(port_ref);
        }
        if let Some(p) = self.cell_mut(cell)?.ports.get_mut(port) {
            p.net = Some(net);
        }
        Ok(())
    }

    /// Declares a port and, if `net` is given, connects it.
    pub fn add_connected_port(
        &mut self,
        cell: CellId,
        port: &str,
        direction: PortDirection,
        net: Option<NetId>,
    ) -> Result<(), NetlistError> {
        self.add_port(cell, port, direction)?;
        match net {
            Some(net) => self.connect(cell, port, net),
            None => Ok(()),
        }
    }

    /// Disconnects a port, keeping the port declared. Returns the net it was
    /// on; absent or unconnected ports yield `None`.
    pub fn disconnect(&mut self, cell: CellId, port: &str) -> Result<Option<NetId>, NetlistError> {
        let Some(net) = self
            .cell_mut(cell)?
            .ports
            .get_mut(port)
            .and_then(|p| p.net.take())
        else {
            return Ok(None);
        };
        let n = self.net_mut(net)?;
        if n
            .driver
            .as_ref()
            .is_some_and(|d| d.cell == cell && d.port == port)
        {
            n.driver = None;
        }
        n.users.retain(|u| !(u.cell == cell && u.port == port));
        Ok(Some(net))
    }

    /// Disconnects and removes a port. Returns the net it was on.
    pub fn remove_port(&mut self, cell: CellId, port: &str) -> Result<Option<NetId>, NetlistError> {
        let net = self.disconnect(cell, port)?;
        self.cell_mut(cell)?.ports.shift_remove(port);
        Ok(net)
    }

    /// Moves a port connection from one cell to another.
    ///
    /// The source port is removed; the destination port is declared with the
    /// source's direction and connected to the same net. Moving a port the
    /// source does not have is a no-op.
    pub fn move_port(
        &mut self,
        from: CellId,
        from_port: &str,
        to: CellId,
        to_port: &str,
    ) -> Result<(), NetlistError> {
        let Some(direction) = self.cell(from)?.ports.get(from_port).map(|p| p.direction) else {
            return Ok(());
        };
        let net = self.remove_port(from, from_port)?;
        self.add_connected_port(to, to_port, direction, net)
    }

    /// Renames a port in place, keeping its position and connection.
    pub fn rename_port(&mut self, cell: CellId, old: &str, new: &str) -> Result<(), NetlistError> {
        if old == new {
            return Ok(());
        }
        let c = self.cell_mut(cell)?;
        if c.ports.contains_key(new) {
            return Err(NetlistError::PortInUse {
                cell: c.name.clone(),
                port: new.to_string(),
            });
        }
        let Some((index, _, port)) = c.ports.shift_remove_full(old) else {
            return Err(NetlistError::NoSuchPort {
                cell: c.name.clone(),
                port: old.to_string(),
            });
        };
        let net = port.net;
        c.ports.shift_insert(index, new.to_string(), port);

        if let Some(net) = net {
            let n = self.net_mut(net)?;
            let refs = n.driver.iter_mut().chain(n.users.iter_mut());
            for r in refs.filter(|r| r.cell == cell && r.port == old) {
                r.port = new.to_string();
            }
        }
        Ok(())
    }

    /// Renames a net.
    pub fn rename_net(&mut self, net: NetId, new_name: &str) -> Result<(), NetlistError> {
        if self.net_by_name.contains_key(new_name) {
            return Err(NetlistError::DuplicateName {
                kind: "net",
                name: new_name.to_string(),
            });
        }
        let n = self.net_mut(net)?;
        let old = std::mem::replace(&mut n.name, new_name.to_string());
        self.net_by_name.remove(&old);
        self.net_by_name.insert(new_name.to_string(), net);
        Ok(())
    }

    /// Disconnects every port of a cell and removes it.
    pub fn remove_cell(&mut self, cell: CellId) -> Result<Cell, NetlistError> {
        let ports: Vec<String> = self.cell(cell)?.ports.keys().cloned().collect();
        for port in &ports {
            self.disconnect(cell, port)?;
        }
        let removed = self
            .cells
            .get_mut(cell.index())
            .and_then(Option::take)
            .ok_or(NetlistError::NoSuchCell(cell))?;
        self.cell_by_name.remove(&removed.name);
        Ok(removed)
    }

    /// Disconnects every port on a net and removes it.
    pub fn remove_net(&mut self, net: NetId) -> Result<Net, NetlistError> {
        let n = self.net(net)?;
        let refs: Vec<PortRef> = n.driver.iter().chain(n.users.iter()).cloned().collect();
        for r in refs {
            self.disconnect(r.cell, &r.port)?;
        }
        let removed = self
            .nets
            .get_mut(net.index())
            .and_then(Option::take)
            .ok_or(NetlistError::NoSuchNet(net))?;
        self.net_by_name.remove(&removed.name);
        Ok(removed)
    }

    /// Rebuilds name indices and net connectivity from cell ports after
    /// deserialization.
    pub fn rebuild_indices(&mut self) -> Result<(), NetlistError> {
        self.cell_by_name.clear();
        self.net_by_name.clear();

        for (i, net) in self.nets.iter_mut().enumerate() {
            let Some(net) = net else { continue };
            if self
                .net_by_name
                .insert(net.name.clone(), NetId::from_raw(i as u32))
                .is_some()
            {
                return Err(NetlistError::DuplicateName {
                    kind: "net",
                    name: net.name.clone(),
                });
            }
            net.driver = None;
            net.users.clear();
        }

        for (i, cell) in self.cells.iter().enumerate() {
            let Some(cell) = cell else { continue };
            let id = CellId::from_raw(i as u32);
            if self.cell_by_name.insert(cell.name.clone(), id).is_some() {
                return Err(NetlistError::DuplicateName {
                    kind: "cell",
                    name: cell.name.clone(),
                });
            }
            for (port_name, port) in &cell.ports {
                let Some(net_id) = port.net else { continue };
                let net = self
                    .nets
                    .get_mut(net_id.index())
                    .and_then(Option::as_mut)
                    .ok_or(NetlistError::NoSuchNet(net_id))?;
                let port_ref = PortRef {
                    cell: id,
                    port: port_name.clone(),
                };
                if port.direction == PortDirection::Out {
                    if let Some(driver) = &net.driver {
                        return Err(NetlistError::MultipleDrivers {
                            net: net.name.clone(),
                            driver: format!("#{}.{}", driver.cell, driver.port),
                            cell: cell.name.clone(),
                            port: port_name.clone(),
                        });
                    }
                    net.driver = Some(port_ref);
                } else {
                    net.users.push(port_ref);
                }
            }
        }
        Ok(())
    }
}
