//! Simulation: program loading and the run loop.
//!
//! This module assembles components into runnable systems. It provides:
//! 1. **Loader:** JSON program files ([`loader`]).
//! 2. **Memory:** The architectural data image ([`memory`]).
//! 3. **Simulator:** Scheduler + backend + issue loop ([`simulator`]).

/// JSON program loader.
pub mod loader;
/// Word-addressed data memory image.
pub mod memory;
/// Top-level simulator and issue feeder.
pub mod simulator;

pub use loader::{Program, load_program, parse_program};
pub use memory::MemoryImage;
pub use simulator::{InstructionFeeder, Simulator, requests_from_program};
