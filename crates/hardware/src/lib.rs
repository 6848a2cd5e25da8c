//! Event-driven cycle-approximate RVV backend simulator library.
//!
//! This crate implements an event-driven simulator of a RISC-V vector
//! (RVV) out-of-order backend with the following:
//! 1. **Kernel:** Discrete-event scheduler with component-before-connection
//!    priority ordering and self-rescheduling tick drivers.
//! 2. **Fabric:** Typed packets, single-slot and FIFO ports, connections
//!    with optional latency, and a buffered register-file wire.
//! 3. **Pipeline:** A reusable staged-processor skeleton with per-stage
//!    transforms, stall predicates, and latency holds.
//! 4. **Backend:** Stripmining decode, hazard-checked dispatch with a
//!    forwarding buffer, a circular reorder buffer, WAW-resolving
//!    multi-port retirement, a byte-enable vector register file, and
//!    functional ALU/divide units with category latencies.
//! 5. **Simulation:** JSON program loader, simulator driver, trace log,
//!    configuration, and statistics.

/// Common types and constants.
pub mod common;
/// Simulator configuration.
pub mod config;
/// Discrete-event kernel (scheduler, tick drivers).
pub mod event;
/// Port and connection fabric.
pub mod fabric;
/// Vector opcode tables and instruction fields.
pub mod isa;
/// Staged-processor skeleton.
pub mod pipeline;
/// RVV out-of-order backend.
pub mod rvv;
/// Program loading and the run loop.
pub mod sim;
/// Statistics collection and reporting.
pub mod stats;
/// Simulation trace log.
pub mod trace;

/// Root configuration type; deserialize from JSON or use `Config::default()`.
pub use crate::config::Config;
/// The discrete-event scheduler driving every component.
pub use crate::event::EventScheduler;
/// The vector backend; implements the scalar-vector interface.
pub use crate::rvv::VectorBackend;
/// Top-level simulator; owns the scheduler, backend, and issue loop.
pub use crate::sim::Simulator;
/// Shared trace-log handle threaded through component constructors.
pub use crate::trace::Tracer;
