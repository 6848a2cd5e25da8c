//! Connection between source and destination ports.
//!
//! A connection binds a set of source ports to a set of destination ports
//! and, on each propagate, moves every waiting valid packet across. With a
//! non-zero latency the delivery is deferred by a one-shot event; the
//! connection itself never buffers more than the packet in flight per
//! destination. Connections hold port handles only, never components.

use std::rc::Rc;

use crate::event::clocked::{Propagating, TickClock};
use crate::event::scheduler::{Event, EventScheduler, PRIORITY_CONNECTION};
use crate::fabric::port::Port;

/// A named binder moving packets from source ports to destination ports
/// every period, with an optional propagation latency in cycles.
#[derive(Debug)]
pub struct Connection {
    clock: TickClock,
    latency: u64,
    sources: Vec<Rc<Port>>,
    destinations: Vec<Rc<Port>>,
    transfers: u64,
}

impl Connection {
    /// Creates a connection propagating every `period` cycles with zero
    /// latency.
    pub fn new(name: impl Into<String>, period: u64) -> Self {
        Self {
            clock: TickClock::new(name, period),
            latency: 0,
            sources: Vec::new(),
            destinations: Vec::new(),
            transfers: 0,
        }
    }

    /// Sets the propagation latency in cycles (builder style).
    pub fn with_latency(mut self, latency: u64) -> Self {
        self.latency = latency;
        self
    }

    /// Adds a source port.
    pub fn add_source(&mut self, port: Rc<Port>) {
        self.sources.push(port);
    }

    /// Adds a destination port.
    pub fn add_destination(&mut self, port: Rc<Port>) {
        self.destinations.push(port);
    }

    /// Total packets moved (per destination delivery counts once).
    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    /// Propagation latency in cycles.
    pub fn latency(&self) -> u64 {
        self.latency
    }
}

impl Propagating for Connection {
    fn clock(&self) -> &TickClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    fn propagate(&mut self, sched: &mut EventScheduler) {
        let now = sched.current_time();
        for source in &self.sources {
            if !source.has_data() {
                continue;
            }
            let Some(packet) = source.read() else { continue };
            sched.tracer().prop(
                now,
                self.clock.name(),
                format!("src={} dsts={}", source.name(), self.destinations.len()),
            );
            for dest in &self.destinations {
                self.transfers += 1;
                if self.latency > 0 {
                    // Deferred delivery: the packet is timestamped with the
                    // cycle it actually lands on the destination port.
                    let delivery = now + self.latency;
                    let pkt = packet.clone().at(delivery);
                    let dest = Rc::clone(dest);
                    let label = format!("{}_Deliver", self.clock.name());
                    sched.schedule(Event::new(delivery, PRIORITY_CONNECTION, label, move |_| {
                        let _ = dest.write(pkt);
                    }));
                } else {
                    let _ = dest.write(packet.clone().at(now));
                }
            }
        }
    }
}
