//! Fabric integration tests.
//!
//! Packet traffic through scheduled connections: deep-clone semantics
//! across fan-out, deferred delivery, and the buffered register-file wire
//! between a producing component and register-file ports.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use vexsim_core::event::clocked::{Clocked, TickClock, start_component, start_connection};
use vexsim_core::event::scheduler::EventScheduler;
use vexsim_core::fabric::connection::Connection;
use vexsim_core::fabric::packet::{MemResponse, Packet, Payload};
use vexsim_core::fabric::port::{Port, PortDirection};
use vexsim_core::fabric::wire::RegFileWire;
use vexsim_core::trace::Tracer;

#[test]
fn test_fanout_delivers_independent_clones() {
    let mut sched = EventScheduler::new(Tracer::disabled());
    let src = Port::single("out", PortDirection::Output);
    let d0 = Port::single("in0", PortDirection::Input);
    let d1 = Port::single("in1", PortDirection::Input);
    let mut conn = Connection::new("fan", 1);
    conn.add_source(Rc::clone(&src));
    conn.add_destination(Rc::clone(&d0));
    conn.add_destination(Rc::clone(&d1));
    let conn = Rc::new(RefCell::new(conn));
    start_connection(&mut sched, &conn, 0);

    let _ = src.write(Packet::new(Payload::MemResponse(MemResponse {
        addr: 8,
        data: vec![1, 2, 3],
    })));
    let _ = sched.run_for(1);

    let mut first = d0.read().expect("clone on d0");
    let second = d1.read().expect("clone on d1");
    // Mutating one delivered clone leaves the other untouched.
    if let Payload::MemResponse(r) = &mut first.payload {
        r.data[0] = 99;
    }
    match second.payload {
        Payload::MemResponse(r) => assert_eq!(r.data, vec![1, 2, 3]),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn test_latency_delivery_is_timestamped_at_arrival() {
    let mut sched = EventScheduler::new(Tracer::disabled());
    let src = Port::single("out", PortDirection::Output);
    let dst = Port::single("in", PortDirection::Input);
    let mut conn = Connection::new("slow", 1).with_latency(2);
    conn.add_source(Rc::clone(&src));
    conn.add_destination(Rc::clone(&dst));
    let conn = Rc::new(RefCell::new(conn));
    start_connection(&mut sched, &conn, 0);

    let _ = src.write(Packet::word(7).at(0));
    let _ = sched.run_for(2);
    assert!(!dst.has_data());
    let _ = sched.run_for(1);
    let got = dst.read().expect("delivered after latency");
    assert_eq!(got.timestamp, 2);
}

/// A unit that produces a `(rd, value)` pair per tick until it runs dry.
struct WritebackSource {
    clock: TickClock,
    rd_out: Rc<Port>,
    value_out: Rc<Port>,
    pairs: Vec<(u64, u64)>,
}

impl Clocked for WritebackSource {
    fn clock(&self) -> &TickClock {
        &self.clock
    }
    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }
    fn tick(&mut self, sched: &mut EventScheduler) {
        let now = sched.current_time();
        if let Some((rd, value)) = self.pairs.pop() {
            let _ = self.rd_out.write(Packet::word(rd).at(now));
            let _ = self.value_out.write(Packet::word(value).at(now));
        }
    }
}

#[test]
fn test_regfile_wire_end_to_end() {
    let mut sched = EventScheduler::new(Tracer::disabled());
    let rd_out = Port::single("rd_out", PortDirection::Output);
    let value_out = Port::single("value_out", PortDirection::Output);
    let wr_addr = Port::single("wr_addr", PortDirection::Input);
    let wr_data = Port::single("wr_data", PortDirection::Input);

    let source = Rc::new(RefCell::new(WritebackSource {
        clock: TickClock::new("fu", 1),
        rd_out: Rc::clone(&rd_out),
        value_out: Rc::clone(&value_out),
        pairs: vec![(4, 400), (3, 300)],
    }));

    let mut wire = RegFileWire::new("regf_wire", 1);
    wire.bind_src_rd(Rc::clone(&rd_out));
    wire.bind_src_value(Rc::clone(&value_out));
    wire.bind_dst_addr(Rc::clone(&wr_addr));
    wire.bind_dst_data(Rc::clone(&wr_data));
    assert!(wire.sources_bound());
    let wire = Rc::new(RefCell::new(wire));

    start_component(&mut sched, &source, 0);
    start_connection(&mut sched, &wire, 0);

    // Cycle 0: the source's write propagates the same cycle.
    let _ = sched.run_for(1);
    assert_eq!(wr_addr.read().and_then(|p| p.as_word()), Some(3));
    assert_eq!(wr_data.read().and_then(|p| p.as_word()), Some(300));

    let _ = sched.run_for(1);
    assert_eq!(wr_addr.read().and_then(|p| p.as_word()), Some(4));
    assert_eq!(wr_data.read().and_then(|p| p.as_word()), Some(400));
    assert_eq!(wire.borrow().transfers(), 2);
}
