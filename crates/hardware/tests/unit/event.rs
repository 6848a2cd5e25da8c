//! Event kernel integration tests.
//!
//! Verifies the ordering contract of the scheduler with real components
//! and connections: component ticks fire before connection propagations at
//! the same cycle, time is monotonic, and stop elides future ticks.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use vexsim_core::event::clocked::{
    Clocked, TickClock, start_component, start_connection,
};
use vexsim_core::event::scheduler::EventScheduler;
use vexsim_core::fabric::connection::Connection;
use vexsim_core::fabric::packet::Packet;
use vexsim_core::fabric::port::{Port, PortDirection};
use vexsim_core::trace::Tracer;

/// A component that writes its cycle number to an output port every tick.
struct CycleWriter {
    clock: TickClock,
    out: Rc<Port>,
}

impl Clocked for CycleWriter {
    fn clock(&self) -> &TickClock {
        &self.clock
    }
    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }
    fn tick(&mut self, sched: &mut EventScheduler) {
        let now = sched.current_time();
        let _ = self.out.write(Packet::word(now).at(now));
    }
}

#[test]
fn test_component_tick_visible_to_connection_same_cycle() {
    let mut sched = EventScheduler::new(Tracer::disabled());
    let out = Port::single("out", PortDirection::Output);
    let dest = Port::single("in", PortDirection::Input);

    let writer = Rc::new(RefCell::new(CycleWriter {
        clock: TickClock::new("writer", 1),
        out: Rc::clone(&out),
    }));
    let mut conn = Connection::new("link", 1);
    conn.add_source(Rc::clone(&out));
    conn.add_destination(Rc::clone(&dest));
    let conn = Rc::new(RefCell::new(conn));

    // The connection is scheduled before the component, yet within each
    // cycle the component's write is what the connection propagates.
    start_connection(&mut sched, &conn, 0);
    start_component(&mut sched, &writer, 0);

    for cycle in 0..5u64 {
        let _ = sched.run_for(1);
        let delivered = dest.read().expect("delivered every cycle");
        assert_eq!(delivered.as_word(), Some(cycle));
        assert_eq!(delivered.timestamp, cycle);
    }
}

#[test]
fn test_monotonic_time_across_callbacks() {
    let mut sched = EventScheduler::new(Tracer::disabled());
    let seen = Rc::new(RefCell::new(Vec::new()));
    for time in [9u64, 3, 3, 7, 0] {
        let seen = Rc::clone(&seen);
        sched.schedule_at(time, "probe", move |s| {
            seen.borrow_mut().push(s.current_time());
        });
    }
    let _ = sched.run(20);
    let seen = seen.borrow();
    assert_eq!(*seen, vec![0, 3, 3, 7, 9]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_stop_mid_run_halts_ticking() {
    struct Counter {
        clock: TickClock,
        count: u64,
    }
    impl Clocked for Counter {
        fn clock(&self) -> &TickClock {
            &self.clock
        }
        fn clock_mut(&mut self) -> &mut TickClock {
            &mut self.clock
        }
        fn tick(&mut self, _sched: &mut EventScheduler) {
            self.count += 1;
            if self.count == 3 {
                self.clock.stop();
            }
        }
    }

    let mut sched = EventScheduler::new(Tracer::disabled());
    let counter = Rc::new(RefCell::new(Counter {
        clock: TickClock::new("ctr", 1),
        count: 0,
    }));
    start_component(&mut sched, &counter, 0);
    let _ = sched.run_for(10);
    assert_eq!(counter.borrow().count, 3);
    // The elided tick is gone; the queue drains.
    assert_eq!(sched.pending_events(), 0);
}

#[test]
fn test_tick_and_event_counts() {
    let mut sched = EventScheduler::new(Tracer::disabled());
    let out = Port::single("out", PortDirection::Output);
    let writer = Rc::new(RefCell::new(CycleWriter {
        clock: TickClock::new("writer", 2),
        out,
    }));
    start_component(&mut sched, &writer, 0);
    let _ = sched.run_for(8);
    // Ticks at 0, 2, 4, 6.
    assert_eq!(writer.borrow().clock().tick_count(), 4);
    assert!(sched.total_events() >= 4);
}
