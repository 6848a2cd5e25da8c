//! Self-rescheduling tick and propagate drivers.
//!
//! A clocked component (or connection) owns a [`TickClock`] describing its
//! period and enabled state. `start_component` / `start_connection` enqueue
//! the first event; each firing invokes the component, bumps the tick
//! counter, and enqueues the next firing at `now + period`. `stop` clears
//! the enabled flag, so the already-scheduled next firing returns without
//! rescheduling (events are never cancelled, they become no-ops).

use std::cell::RefCell;
use std::rc::Rc;

use crate::event::scheduler::{Event, EventScheduler, PRIORITY_COMPONENT, PRIORITY_CONNECTION};

/// Periodic clock state embedded in every clocked component or connection.
#[derive(Debug, Clone)]
pub struct TickClock {
    name: String,
    period: u64,
    enabled: bool,
    ticks: u64,
}

impl TickClock {
    /// Creates a clock with the given `name` and `period` (cycles, >= 1).
    pub fn new(name: impl Into<String>, period: u64) -> Self {
        Self {
            name: name.into(),
            period: period.max(1),
            enabled: true,
            ticks: 0,
        }
    }

    /// Component name, used for trace entries and event labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tick period in simulated cycles.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Whether the clock is running.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stops the clock. The next scheduled firing becomes a no-op.
    pub fn stop(&mut self) {
        self.enabled = false;
    }

    /// Re-enables a stopped clock. Takes effect at the next `start_*` call.
    pub fn resume(&mut self) {
        self.enabled = true;
    }
}

/// A component driven by a periodic tick.
pub trait Clocked {
    /// Shared clock state.
    fn clock(&self) -> &TickClock;
    /// Mutable clock state.
    fn clock_mut(&mut self) -> &mut TickClock;
    /// One cycle of work.
    fn tick(&mut self, sched: &mut EventScheduler);
}

/// A connection driven by a periodic propagate.
pub trait Propagating {
    /// Shared clock state.
    fn clock(&self) -> &TickClock;
    /// Mutable clock state.
    fn clock_mut(&mut self) -> &mut TickClock;
    /// Move packets from source ports to destination ports.
    fn propagate(&mut self, sched: &mut EventScheduler);
}

/// Starts ticking `component` at `start_time` with component priority.
pub fn start_component<T: Clocked + 'static>(
    sched: &mut EventScheduler,
    component: &Rc<RefCell<T>>,
    start_time: u64,
) {
    schedule_tick(sched, Rc::clone(component), start_time);
}

fn schedule_tick<T: Clocked + 'static>(
    sched: &mut EventScheduler,
    component: Rc<RefCell<T>>,
    time: u64,
) {
    if !component.borrow().clock().is_enabled() {
        return;
    }
    let label = format!("{}_Tick", component.borrow().clock().name());
    sched.schedule(Event::new(time, PRIORITY_COMPONENT, label, move |sched| {
        if !component.borrow().clock().is_enabled() {
            return;
        }
        let (name, ticks) = {
            let c = component.borrow();
            (c.clock().name().to_owned(), c.clock().tick_count())
        };
        sched
            .tracer()
            .tick(sched.current_time(), &name, format!("tick_count={ticks}"));
        {
            let mut c = component.borrow_mut();
            c.tick(sched);
            c.clock_mut().ticks += 1;
        }
        let next = sched.current_time() + component.borrow().clock().period();
        schedule_tick(sched, component, next);
    }));
}

/// Starts propagating `connection` at `start_time` with connection priority.
pub fn start_connection<T: Propagating + 'static>(
    sched: &mut EventScheduler,
    connection: &Rc<RefCell<T>>,
    start_time: u64,
) {
    schedule_propagate(sched, Rc::clone(connection), start_time);
}

fn schedule_propagate<T: Propagating + 'static>(
    sched: &mut EventScheduler,
    connection: Rc<RefCell<T>>,
    time: u64,
) {
    if !connection.borrow().clock().is_enabled() {
        return;
    }
    let label = format!("{}_Propagate", connection.borrow().clock().name());
    sched.schedule(Event::new(time, PRIORITY_CONNECTION, label, move |sched| {
        if !connection.borrow().clock().is_enabled() {
            return;
        }
        {
            let mut c = connection.borrow_mut();
            c.propagate(sched);
            c.clock_mut().ticks += 1;
        }
        let next = sched.current_time() + connection.borrow().clock().period();
        schedule_propagate(sched, connection, next);
    }));
}
