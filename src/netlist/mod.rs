//! The mutable circuit graph.
//!
//! Nets, instances and pins live in arenas addressed by typed indices. Deleted
//! nets leave a tombstone so that stale ids fail loudly instead of aliasing a
//! newer net. This graph is not synchronized: a transform holds it exclusively
//! for the duration of a run.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::library::{CellId, Library, PinDirection};

pub mod error;

pub use error::{NetlistError, NetlistResult};

/// A location in database units.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Rectilinear distance to `other`.
    #[inline]
    pub fn manhattan(&self, other: &Point) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    pub fn translate(&self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NetId(usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct InstanceId(usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PinId(usize);

impl InstanceId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl PinId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOwner {
    /// The pin with index `port` of the instance's library cell.
    Instance { inst: InstanceId, port: usize },
    /// A top-level boundary port.
    Port { name: ArcStr, location: Point },
}

#[derive(Debug, Clone)]
pub struct Pin {
    pub owner: PinOwner,
    pub direction: PinDirection,
    net: Option<NetId>,
}

impl Pin {
    #[inline]
    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    pub fn instance(&self) -> Option<InstanceId> {
        match self.owner {
            PinOwner::Instance { inst, .. } => Some(inst),
            PinOwner::Port { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Net {
    pub name: ArcStr,
    pins: Vec<PinId>,
}

impl Net {
    #[inline]
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub name: ArcStr,
    pub cell: CellId,
    pub location: Point,
    /// One pin per library cell port, in port order.
    pins: Vec<PinId>,
}

impl Instance {
    #[inline]
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }
}

#[derive(Debug, Clone, Default)]
pub struct Netlist {
    nets: Vec<Option<Net>>,
    instances: Vec<Instance>,
    pins: Vec<Pin>,
    ports: Vec<PinId>,
    net_names: HashMap<ArcStr, NetId>,
    instance_names: HashMap<ArcStr, InstanceId>,
    port_names: HashMap<ArcStr, PinId>,
}

impl Netlist {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn create_net(&mut self, name: impl Into<ArcStr>) -> NetlistResult<NetId> {
        let name = name.into();
        if self.net_names.contains_key(&name) {
            return Err(NetlistError::DuplicateNet(name));
        }
        let id = NetId(self.nets.len());
        self.net_names.insert(name.clone(), id);
        self.nets.push(Some(Net { name, pins: vec![] }));
        Ok(id)
    }

    /// Creates an unconnected instance of `cell`, placed at the origin.
    pub fn create_instance(
        &mut self,
        name: impl Into<ArcStr>,
        cell: CellId,
        library: &Library,
    ) -> NetlistResult<InstanceId> {
        let name = name.into();
        if self.instance_names.contains_key(&name) {
            return Err(NetlistError::DuplicateInstance(name));
        }
        let inst = InstanceId(self.instances.len());
        let pins = library
            .cell(cell)
            .pins
            .iter()
            .enumerate()
            .map(|(port, lib_pin)| {
                self.push_pin(Pin {
                    owner: PinOwner::Instance { inst, port },
                    direction: lib_pin.direction,
                    net: None,
                })
            })
            .collect();
        self.instance_names.insert(name.clone(), inst);
        self.instances.push(Instance {
            name,
            cell,
            location: Point::default(),
            pins,
        });
        Ok(inst)
    }

    /// Creates a top-level port. Input ports drive their net; output ports load it.
    pub fn create_port(
        &mut self,
        name: impl Into<ArcStr>,
        direction: PinDirection,
        location: Point,
    ) -> NetlistResult<PinId> {
        let name = name.into();
        if self.port_names.contains_key(&name) {
            return Err(NetlistError::DuplicatePort(name));
        }
        let pin = self.push_pin(Pin {
            owner: PinOwner::Port {
                name: name.clone(),
                location,
            },
            direction,
            net: None,
        });
        self.port_names.insert(name, pin);
        self.ports.push(pin);
        Ok(pin)
    }

    fn push_pin(&mut self, pin: Pin) -> PinId {
        let id = PinId(self.pins.len());
        self.pins.push(pin);
        id
    }

    /// Connects `pin` to `net`, detaching it from any net it was on.
    pub fn connect(&mut self, net: NetId, pin: PinId) -> NetlistResult<()> {
        self.try_net(net)?;
        self.try_pin(pin)?;
        self.disconnect(pin)?;
        self.pins[pin.0].net = Some(net);
        if let Some(Some(n)) = self.nets.get_mut(net.0) {
            n.pins.push(pin);
        }
        Ok(())
    }

    /// Connects the pin with index `port` of `inst` to `net` and returns it.
    pub fn connect_port(
        &mut self,
        net: NetId,
        inst: InstanceId,
        port: usize,
    ) -> NetlistResult<PinId> {
        let pin = self.instance_pin(inst, port)?;
        self.connect(net, pin)?;
        Ok(pin)
    }

    pub fn disconnect(&mut self, pin: PinId) -> NetlistResult<()> {
        let prev = self.try_pin(pin)?.net;
        if let Some(prev) = prev {
            if let Some(Some(n)) = self.nets.get_mut(prev.0) {
                n.pins.retain(|&p| p != pin);
            }
            self.pins[pin.0].net = None;
        }
        Ok(())
    }

    /// Disconnects every pin of `net` and returns how many there were.
    pub fn disconnect_all(&mut self, net: NetId) -> NetlistResult<usize> {
        let pins = self.try_net(net)?.pins.clone();
        for &pin in pins.iter() {
            self.pins[pin.0].net = None;
        }
        if let Some(Some(n)) = self.nets.get_mut(net.0) {
            n.pins.clear();
        }
        Ok(pins.len())
    }

    /// Deletes `net`, disconnecting anything still attached to it.
    pub fn delete_net(&mut self, net: NetId) -> NetlistResult<()> {
        self.disconnect_all(net)?;
        if let Some(n) = self.nets[net.0].take() {
            self.net_names.remove(&n.name);
        }
        Ok(())
    }

    pub fn set_location(&mut self, inst: InstanceId, location: Point) -> NetlistResult<()> {
        self.instances
            .get_mut(inst.0)
            .ok_or(NetlistError::UnknownInstance(inst))?
            .location = location;
        Ok(())
    }

    pub fn try_net(&self, net: NetId) -> NetlistResult<&Net> {
        self.nets
            .get(net.0)
            .and_then(Option::as_ref)
            .ok_or(NetlistError::UnknownNet(net))
    }

    pub fn try_pin(&self, pin: PinId) -> NetlistResult<&Pin> {
        self.pins.get(pin.0).ok_or(NetlistError::UnknownPin(pin))
    }

    pub fn try_instance(&self, inst: InstanceId) -> NetlistResult<&Instance> {
        self.instances
            .get(inst.0)
            .ok_or(NetlistError::UnknownInstance(inst))
    }

    pub fn instance_pin(&self, inst: InstanceId, port: usize) -> NetlistResult<PinId> {
        let instance = self.try_instance(inst)?;
        instance
            .pins
            .get(port)
            .copied()
            .ok_or_else(|| NetlistError::UnknownCellPort {
                cell: instance.name.clone(),
                index: port,
            })
    }

    /// # Panics
    ///
    /// Panics if `net` was deleted or never existed.
    #[inline]
    pub fn net(&self, net: NetId) -> &Net {
        self.nets[net.0].as_ref().expect("net was deleted")
    }

    #[inline]
    pub fn pin(&self, pin: PinId) -> &Pin {
        &self.pins[pin.0]
    }

    #[inline]
    pub fn instance(&self, inst: InstanceId) -> &Instance {
        &self.instances[inst.0]
    }

    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.net_names.get(name).copied()
    }

    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.instance_names.get(name).copied()
    }

    pub fn find_port(&self, name: &str) -> Option<PinId> {
        self.port_names.get(name).copied()
    }

    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NetId(i), n)))
    }

    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstanceId(i), inst))
    }

    pub fn ports(&self) -> &[PinId] {
        &self.ports
    }

    pub fn num_nets(&self) -> usize {
        self.net_names.len()
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn net_of(&self, pin: PinId) -> Option<NetId> {
        self.pins.get(pin.0).and_then(|p| p.net)
    }

    #[inline]
    pub fn instance_of(&self, pin: PinId) -> Option<InstanceId> {
        self.pins.get(pin.0).and_then(Pin::instance)
    }

    #[inline]
    pub fn cell_of(&self, inst: InstanceId) -> CellId {
        self.instances[inst.0].cell
    }

    /// The index of `pin` among its instance's cell ports.
    pub fn port_of(&self, pin: PinId) -> Option<usize> {
        match self.pins.get(pin.0)?.owner {
            PinOwner::Instance { port, .. } => Some(port),
            PinOwner::Port { .. } => None,
        }
    }

    fn instance_pins_with(&self, inst: InstanceId, direction: PinDirection) -> Vec<PinId> {
        self.instances[inst.0]
            .pins
            .iter()
            .copied()
            .filter(|&p| self.pins[p.0].direction == direction)
            .collect()
    }

    pub fn input_pins(&self, inst: InstanceId) -> Vec<PinId> {
        self.instance_pins_with(inst, PinDirection::Input)
    }

    pub fn output_pins(&self, inst: InstanceId) -> Vec<PinId> {
        self.instance_pins_with(inst, PinDirection::Output)
    }

    fn net_instance_pins_with(&self, net: NetId, direction: PinDirection) -> Vec<PinId> {
        self.net(net)
            .pins
            .iter()
            .copied()
            .filter(|&p| {
                let pin = &self.pins[p.0];
                pin.instance().is_some() && pin.direction == direction
            })
            .collect()
    }

    /// Instance input pins on `net`. Top-level ports are not counted.
    pub fn fanout_pins(&self, net: NetId) -> Vec<PinId> {
        self.net_instance_pins_with(net, PinDirection::Input)
    }

    /// The instance output pin driving `net`, if any.
    pub fn driver_pin(&self, net: NetId) -> Option<PinId> {
        self.net_instance_pins_with(net, PinDirection::Output)
            .first()
            .copied()
    }

    /// Instance output pins on `net`; more than one is a multiply driven net.
    pub fn driver_pins(&self, net: NetId) -> Vec<PinId> {
        self.net_instance_pins_with(net, PinDirection::Output)
    }

    /// The hierarchical name of a pin: `inst/port` or the port name.
    pub fn path_name(&self, pin: PinId, library: &Library) -> String {
        match &self.pins[pin.0].owner {
            PinOwner::Instance { inst, port } => {
                let inst = &self.instances[inst.0];
                format!("{}/{}", inst.name, library.cell(inst.cell).pins[*port].name)
            }
            PinOwner::Port { name, .. } => name.to_string(),
        }
    }

    /// The placed location of a pin: instance origin plus cell pin offset.
    pub fn location(&self, pin: PinId, library: &Library) -> Point {
        match &self.pins[pin.0].owner {
            PinOwner::Instance { inst, port } => {
                let inst = &self.instances[inst.0];
                inst.location
                    .translate(library.cell(inst.cell).pins[*port].offset)
            }
            PinOwner::Port { location, .. } => *location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::buf;

    fn lib() -> Library {
        Library::from_cells([buf("BUF_X1", "buf", 60.0)])
    }

    #[test]
    fn test_connect_moves_pin_between_nets() {
        let lib = lib();
        let cell = lib.find_cell("BUF_X1").unwrap();
        let mut netlist = Netlist::new();
        let a = netlist.create_net("a").unwrap();
        let b = netlist.create_net("b").unwrap();
        let u1 = netlist.create_instance("u1", cell, &lib).unwrap();

        let pin = netlist.connect_port(a, u1, 0).unwrap();
        assert_eq!(netlist.net_of(pin), Some(a));
        assert_eq!(netlist.fanout_pins(a), vec![pin]);

        netlist.connect(b, pin).unwrap();
        assert_eq!(netlist.net_of(pin), Some(b));
        assert!(netlist.net(a).pins().is_empty());
        assert_eq!(netlist.net(b).pins(), &[pin]);
    }

    #[test]
    fn test_delete_net() {
        let lib = lib();
        let cell = lib.find_cell("BUF_X1").unwrap();
        let mut netlist = Netlist::new();
        let a = netlist.create_net("a").unwrap();
        let u1 = netlist.create_instance("u1", cell, &lib).unwrap();
        let out = netlist.connect_port(a, u1, 1).unwrap();
        assert_eq!(netlist.driver_pin(a), Some(out));

        netlist.delete_net(a).unwrap();
        assert_eq!(netlist.net_of(out), None);
        assert_eq!(netlist.find_net("a"), None);
        assert!(matches!(netlist.try_net(a), Err(NetlistError::UnknownNet(_))));
        assert_eq!(netlist.num_nets(), 0);

        // The name can be reused, the id cannot.
        let a2 = netlist.create_net("a").unwrap();
        assert_ne!(a, a2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let lib = lib();
        let cell = lib.find_cell("BUF_X1").unwrap();
        let mut netlist = Netlist::new();
        netlist.create_net("n").unwrap();
        assert!(matches!(
            netlist.create_net("n"),
            Err(NetlistError::DuplicateNet(_))
        ));
        netlist.create_instance("u", cell, &lib).unwrap();
        assert!(matches!(
            netlist.create_instance("u", cell, &lib),
            Err(NetlistError::DuplicateInstance(_))
        ));
    }

    #[test]
    fn test_pin_queries() {
        let mut lib = lib();
        let mut cell = buf("BUF_OFF", "buf", 60.0);
        cell.pins[1].offset = Point::new(5, 7);
        let cell = lib.add_cell(cell);
        let mut netlist = Netlist::new();
        let u1 = netlist.create_instance("u1", cell, &lib).unwrap();
        netlist.set_location(u1, Point::new(100, 200)).unwrap();
        let port = netlist
            .create_port("in", PinDirection::Input, Point::new(-3, 4))
            .unwrap();

        let out = netlist.output_pins(u1)[0];
        assert_eq!(netlist.location(out, &lib), Point::new(105, 207));
        assert_eq!(netlist.location(port, &lib), Point::new(-3, 4));
        assert_eq!(netlist.path_name(out, &lib), "u1/Z");
        assert_eq!(netlist.path_name(port, &lib), "in");
        assert_eq!(netlist.port_of(out), Some(1));
        assert_eq!(netlist.input_pins(u1).len(), 1);
        assert_eq!(netlist.instance_of(port), None);
    }

    #[test]
    fn test_ports_are_not_fanout() {
        let lib = lib();
        let cell = lib.find_cell("BUF_X1").unwrap();
        let mut netlist = Netlist::new();
        let n = netlist.create_net("n").unwrap();
        let u1 = netlist.create_instance("u1", cell, &lib).unwrap();
        netlist.connect_port(n, u1, 1).unwrap();
        let out = netlist
            .create_port("out", PinDirection::Output, Point::default())
            .unwrap();
        netlist.connect(n, out).unwrap();
        assert!(netlist.fanout_pins(n).is_empty());
        assert_eq!(netlist.net(n).pins().len(), 2);
    }
}
