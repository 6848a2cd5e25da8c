//! Discrete-event kernel.
//!
//! This module contains the machinery that ties every component to a global
//! clock. It provides:
//! 1. **Scheduler:** A priority-ordered min-heap of time-stamped callbacks
//!    with single-threaded cooperative dispatch ([`EventScheduler`]).
//! 2. **Ticking wrappers:** Self-rescheduling drivers that invoke a
//!    component's `tick()` or a connection's `propagate()` every period
//!    ([`clocked`]).

/// Self-rescheduling tick and propagate drivers.
pub mod clocked;
/// The event scheduler and event type.
pub mod scheduler;

pub use clocked::{Clocked, Propagating, TickClock, start_component, start_connection};
pub use scheduler::{Event, EventScheduler, PRIORITY_COMPONENT, PRIORITY_CONNECTION};
