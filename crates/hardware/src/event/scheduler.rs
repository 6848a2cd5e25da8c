//! Event scheduler for cooperative discrete-event simulation.
//!
//! The scheduler owns a min-priority queue of events keyed primarily on the
//! scheduled simulated time and secondarily on a priority integer. Smaller
//! time first; at equal time, smaller priority first; ties within a priority
//! break in insertion (FIFO) order via a sequence number. It provides:
//! 1. **Scheduling:** `schedule` / `schedule_at` enqueue callbacks.
//! 2. **Execution:** `run`, `run_for`, `run_until` pull events in order and
//!    run each to completion before the next.
//! 3. **Time:** A monotonic global clock; an event stamped for the current
//!    or a past time executes at the next scheduler step.
//!
//! Execution is single-threaded and cooperative. Events are not cancellable
//! after scheduling; components check an enabled flag and become no-ops
//! instead. Draining the queue is a clean exit, never an error.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use crate::trace::{TraceKind, Tracer};

/// Priority for component ticks. Runs first within a cycle.
pub const PRIORITY_COMPONENT: i32 = 0;

/// Priority for connection propagations. Runs after component ticks within
/// the same cycle, so port writes made during a tick are visible to the
/// connection that cycle.
pub const PRIORITY_CONNECTION: i32 = 1;

type Action = Box<dyn FnOnce(&mut EventScheduler)>;

/// A time-stamped callback.
pub struct Event {
    time: u64,
    priority: i32,
    label: String,
    action: Action,
}

impl Event {
    /// Creates an event firing at `time` with the given `priority`.
    pub fn new(
        time: u64,
        priority: i32,
        label: impl Into<String>,
        action: impl FnOnce(&mut EventScheduler) + 'static,
    ) -> Self {
        Self {
            time,
            priority,
            label: label.into(),
            action: Box::new(action),
        }
    }

    /// Scheduled simulated time.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Scheduling priority. Smaller runs first at equal time.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Human-readable label (used by the trace log).
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

struct Scheduled {
    event: Event,
    seq: u64,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // BinaryHeap is a max-heap; invert so the smallest key pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.event.time, other.event.priority, other.seq).cmp(&(
            self.event.time,
            self.event.priority,
            self.seq,
        ))
    }
}

/// Single-threaded cooperative discrete-event scheduler.
pub struct EventScheduler {
    queue: BinaryHeap<Scheduled>,
    now: u64,
    next_seq: u64,
    total_events: u64,
    tracer: Tracer,
}

impl fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventScheduler")
            .field("now", &self.now)
            .field("pending", &self.queue.len())
            .field("total_events", &self.total_events)
            .finish_non_exhaustive()
    }
}

impl EventScheduler {
    /// Creates a scheduler at time zero.
    pub fn new(tracer: Tracer) -> Self {
        Self {
            queue: BinaryHeap::new(),
            now: 0,
            next_seq: 0,
            total_events: 0,
            tracer,
        }
    }

    /// The trace log handle this scheduler (and its components) record to.
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Current simulated time. Non-decreasing across callbacks.
    pub fn current_time(&self) -> u64 {
        self.now
    }

    /// Number of events still queued.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Total events ever scheduled.
    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Enqueues an event.
    pub fn schedule(&mut self, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.total_events += 1;
        self.queue.push(Scheduled { event, seq });
    }

    /// Enqueues a callback at `time` with component priority.
    pub fn schedule_at(
        &mut self,
        time: u64,
        label: impl Into<String>,
        action: impl FnOnce(&mut Self) + 'static,
    ) {
        self.schedule(Event::new(time, PRIORITY_COMPONENT, label, action));
    }

    /// Runs every event stamped at or before `max_time`, in order. Pending
    /// events beyond `max_time` stay queued. Returns the number of events
    /// executed. An empty queue simply stops the loop.
    pub fn run(&mut self, max_time: u64) -> u64 {
        let mut executed = 0;
        while let Some(next) = self.queue.peek() {
            if next.event.time > max_time {
                break;
            }
            // Unwrap is fine: peek above proved the queue is non-empty.
            #[allow(clippy::unwrap_used)]
            let scheduled = self.queue.pop().unwrap();
            let event = scheduled.event;
            // Past-dated events execute now; time never moves backwards.
            self.now = self.now.max(event.time);
            self.tracer.record(
                self.now,
                TraceKind::Event,
                "scheduler",
                event.label(),
                String::new(),
                Some(event.priority),
            );
            (event.action)(self);
            executed += 1;
        }
        self.now = self.now.max(max_time);
        executed
    }

    /// Runs every event stamped strictly before `time`, then advances the
    /// clock to `time`.
    pub fn run_until(&mut self, time: u64) -> u64 {
        let executed = self.run(time.saturating_sub(1));
        self.now = self.now.max(time);
        executed
    }

    /// Runs for `n_cycles` simulated cycles from the current time. Exits
    /// after the window even with a non-empty queue.
    pub fn run_for(&mut self, n_cycles: u64) -> u64 {
        self.run_until(self.now + n_cycles)
    }
}
