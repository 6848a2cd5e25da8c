//! Named data slots on components.
//!
//! A port is a named, directional slot holding packets in transit. Two
//! flavors exist:
//! 1. **Single-slot:** holds at most one packet; `write` overwrites and
//!    silently drops the prior packet (legal by contract).
//! 2. **Bounded FIFO:** holds up to a fixed number of packets; `write`
//!    rejects when full, giving back-pressure without ad-hoc buffering in
//!    connections.
//!
//! Ports are owned by their component (via a [`PortMap`]); connections hold
//! shared handles only. There is no back-pointer from a port to its owner.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::fabric::packet::Packet;

/// Direction of data flow through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// Data flows into the owning component.
    Input,
    /// Data flows out of the owning component.
    Output,
    /// Data flows both ways.
    Bidirectional,
}

#[derive(Debug)]
enum Slot {
    Single(Option<Packet>),
    Fifo { queue: VecDeque<Packet>, capacity: usize },
}

/// A named, directional packet slot.
pub struct Port {
    name: String,
    direction: PortDirection,
    slot: RefCell<Slot>,
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("has_data", &self.has_data())
            .finish()
    }
}

impl Port {
    /// Creates a shared single-slot port.
    pub fn single(name: impl Into<String>, direction: PortDirection) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            direction,
            slot: RefCell::new(Slot::Single(None)),
        })
    }

    /// Creates a shared bounded-FIFO port with the given capacity.
    pub fn fifo(name: impl Into<String>, direction: PortDirection, capacity: usize) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            direction,
            slot: RefCell::new(Slot::Fifo {
                queue: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
            }),
        })
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port direction.
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Writes a packet. On a single-slot port this overwrites (and drops)
    /// any occupant and returns true. On a FIFO port it returns false when
    /// the queue is full.
    pub fn write(&self, packet: Packet) -> bool {
        match &mut *self.slot.borrow_mut() {
            Slot::Single(slot) => {
                *slot = Some(packet);
                true
            }
            Slot::Fifo { queue, capacity } => {
                if queue.len() >= *capacity {
                    return false;
                }
                queue.push_back(packet);
                true
            }
        }
    }

    /// Takes the (oldest) packet, clearing the slot.
    pub fn read(&self) -> Option<Packet> {
        match &mut *self.slot.borrow_mut() {
            Slot::Single(slot) => slot.take(),
            Slot::Fifo { queue, .. } => queue.pop_front(),
        }
    }

    /// True if a valid packet is waiting. Non-destructive.
    pub fn has_data(&self) -> bool {
        match &*self.slot.borrow() {
            Slot::Single(slot) => slot.as_ref().is_some_and(|p| p.valid),
            Slot::Fifo { queue, .. } => queue.front().is_some_and(|p| p.valid),
        }
    }

    /// Drops any waiting packets.
    pub fn clear(&self) {
        match &mut *self.slot.borrow_mut() {
            Slot::Single(slot) => *slot = None,
            Slot::Fifo { queue, .. } => queue.clear(),
        }
    }
}

/// Ordered collection of ports owned by one component. Lookup is by name;
/// iteration preserves creation order, which defines "first input port"
/// semantics for pipeline intake.
#[derive(Debug, Default)]
pub struct PortMap {
    ports: Vec<Rc<Port>>,
}

impl PortMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single-slot port and returns its handle.
    pub fn add(&mut self, name: impl Into<String>, direction: PortDirection) -> Rc<Port> {
        let port = Port::single(name, direction);
        self.ports.push(Rc::clone(&port));
        port
    }

    /// Adds a bounded-FIFO port and returns its handle.
    pub fn add_fifo(
        &mut self,
        name: impl Into<String>,
        direction: PortDirection,
        capacity: usize,
    ) -> Rc<Port> {
        let port = Port::fifo(name, direction, capacity);
        self.ports.push(Rc::clone(&port));
        port
    }

    /// Looks a port up by name.
    pub fn get(&self, name: &str) -> Option<Rc<Port>> {
        self.ports.iter().find(|p| p.name() == name).cloned()
    }

    /// Iterates ports in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Port>> {
        self.ports.iter()
    }
}
