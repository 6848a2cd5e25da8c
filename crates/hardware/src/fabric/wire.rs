//! Buffered register-file writeback wire.
//!
//! [`RegFileWire`] carries a `(register-destination, value)` pair from a
//! functional unit's two output ports into a register file's three input
//! ports (address, data, mask). A two-slot internal buffer (current, next)
//! ensures a write is never lost when the source produces faster than the
//! sink consumes.

use std::rc::Rc;

use crate::event::clocked::{Propagating, TickClock};
use crate::event::scheduler::{Event, EventScheduler, PRIORITY_CONNECTION};
use crate::fabric::packet::Packet;
use crate::fabric::port::Port;

/// Specialized connection for register-file writeback.
///
/// Source side: an `rd` port and a `value` port on the producing unit.
/// Destination side: `addr`, `data`, and optional `mask` ports on the
/// register file. When no destination is bound, pairs accumulate in the
/// two-slot buffer and are inspected through [`RegFileWire::buffered`].
#[derive(Debug)]
pub struct RegFileWire {
    clock: TickClock,
    latency: u64,
    transfers: u64,

    current: Option<(u64, u64)>,
    next: Option<(u64, u64)>,

    src_rd: Option<Rc<Port>>,
    src_value: Option<Rc<Port>>,
    dst_addr: Option<Rc<Port>>,
    dst_data: Option<Rc<Port>>,
    dst_mask: Option<Rc<Port>>,
}

impl RegFileWire {
    /// Creates a wire propagating every `period` cycles with zero latency.
    pub fn new(name: impl Into<String>, period: u64) -> Self {
        Self {
            clock: TickClock::new(name, period),
            latency: 0,
            transfers: 0,
            current: None,
            next: None,
            src_rd: None,
            src_value: None,
            dst_addr: None,
            dst_data: None,
            dst_mask: None,
        }
    }

    /// Sets the delivery latency in cycles (builder style).
    pub fn with_latency(mut self, latency: u64) -> Self {
        self.latency = latency;
        self
    }

    /// Binds the functional unit's register-destination output port.
    pub fn bind_src_rd(&mut self, port: Rc<Port>) {
        self.src_rd = Some(port);
    }

    /// Binds the functional unit's value output port.
    pub fn bind_src_value(&mut self, port: Rc<Port>) {
        self.src_value = Some(port);
    }

    /// Binds the register file's write-address input port.
    pub fn bind_dst_addr(&mut self, port: Rc<Port>) {
        self.dst_addr = Some(port);
    }

    /// Binds the register file's write-data input port.
    pub fn bind_dst_data(&mut self, port: Rc<Port>) {
        self.dst_data = Some(port);
    }

    /// Binds the register file's write-mask input port (optional).
    pub fn bind_dst_mask(&mut self, port: Rc<Port>) {
        self.dst_mask = Some(port);
    }

    /// True if both source ports are bound (required before starting).
    pub fn sources_bound(&self) -> bool {
        self.src_rd.is_some() && self.src_value.is_some()
    }

    /// Total pairs moved or buffered.
    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    /// The buffered `(rd, value)` pair awaiting a consumer, if any.
    pub fn buffered(&self) -> Option<(u64, u64)> {
        self.current
    }

    /// Clears the current pair after the destination has processed it,
    /// letting the next pair move up on the following propagate.
    pub fn clear_buffered(&mut self) {
        self.current = None;
    }

    fn deliver(&self, sched: &mut EventScheduler, rd: u64, value: u64) {
        let (Some(addr), Some(data)) = (&self.dst_addr, &self.dst_data) else {
            return;
        };
        let now = sched.current_time();
        if self.latency > 0 {
            let delivery = now + self.latency;
            let addr = Rc::clone(addr);
            let data = Rc::clone(data);
            let mask = self.dst_mask.clone();
            let label = format!("{}_Deliver", self.clock.name());
            sched.schedule(Event::new(delivery, PRIORITY_CONNECTION, label, move |_| {
                let _ = addr.write(Packet::word(rd).at(delivery));
                let _ = data.write(Packet::word(value).at(delivery));
                if let Some(mask) = mask {
                    let _ = mask.write(Packet::flag(false).at(delivery));
                }
            }));
        } else {
            let _ = addr.write(Packet::word(rd).at(now));
            let _ = data.write(Packet::word(value).at(now));
            if let Some(mask) = &self.dst_mask {
                let _ = mask.write(Packet::flag(false).at(now));
            }
        }
    }
}

impl Propagating for RegFileWire {
    fn clock(&self) -> &TickClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    fn propagate(&mut self, sched: &mut EventScheduler) {
        // Phase 1: next moves up once the destination consumed current.
        if self.current.is_none() && self.next.is_some() {
            self.current = self.next.take();
        }

        // Phase 2: read a new (rd, value) pair; both ports must have data.
        let (Some(rd_port), Some(value_port)) = (&self.src_rd, &self.src_value) else {
            return;
        };
        if !(rd_port.has_data() && value_port.has_data()) {
            return;
        }
        let (Some(rd_pkt), Some(value_pkt)) = (rd_port.read(), value_port.read()) else {
            return;
        };
        let (Some(rd), Some(value)) = (rd_pkt.as_word(), value_pkt.as_word()) else {
            return;
        };

        let now = sched.current_time();
        sched
            .tracer()
            .prop(now, self.clock.name(), format!("rd={rd} value={value}"));
        self.transfers += 1;

        if self.dst_addr.is_some() && self.dst_data.is_some() {
            self.deliver(sched, rd, value);
        } else if self.current.is_none() {
            self.current = Some((rd, value));
        } else {
            // Current is still held by the consumer; next absorbs the new
            // pair, overwriting a stale one if the source outran the sink.
            self.next = Some((rd, value));
        }
    }
}
