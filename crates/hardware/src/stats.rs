//! Simulation statistics collection and reporting.
//!
//! Tracks the performance counters of a run:
//! 1. **Throughput:** Cycles, instructions issued, micro-ops decoded,
//!    dispatched, executed, and retired.
//! 2. **Stalls:** RAW hazard, structural, and ROB-full dispatch stalls.
//! 3. **Writeback:** Register-file writes, WAW collisions, traps, and
//!    division-by-zero count.

use std::fmt::Write as _;

/// Counters aggregated over one simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Simulated cycles elapsed.
    pub cycles: u64,
    /// Instructions accepted by the backend.
    pub instructions_issued: u64,
    /// Micro-ops produced by the stripmining decoder.
    pub uops_decoded: u64,
    /// Micro-ops dispatched into the ROB.
    pub uops_dispatched: u64,
    /// Micro-ops whose execution completed.
    pub uops_executed: u64,
    /// Micro-ops retired.
    pub uops_retired: u64,

    /// Dispatch cycles lost to unforwardable RAW hazards.
    pub raw_hazard_stalls: u64,
    /// Dispatch cycles lost to read-port pressure.
    pub structural_stalls: u64,
    /// Dispatch cycles lost to a full ROB.
    pub rob_full_stalls: u64,

    /// Vector register file writes at retirement.
    pub vrf_writes: u64,
    /// Scalar register file writes at retirement.
    pub xrf_writes: u64,
    /// Register groups that needed WAW resolution.
    pub waw_collisions: u64,
    /// Traps surfaced to the frontend.
    pub traps: u64,
    /// Elements that divided by zero.
    pub division_by_zero: u64,
}

impl SimStats {
    /// Retired micro-ops per cycle.
    pub fn uops_per_cycle(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.uops_retired as f64 / self.cycles as f64
        }
    }

    /// Formats a human-readable report.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Simulation Statistics ===");
        let _ = writeln!(out, "cycles:              {}", self.cycles);
        let _ = writeln!(out, "instructions issued: {}", self.instructions_issued);
        let _ = writeln!(out, "uops decoded:        {}", self.uops_decoded);
        let _ = writeln!(out, "uops dispatched:     {}", self.uops_dispatched);
        let _ = writeln!(out, "uops executed:       {}", self.uops_executed);
        let _ = writeln!(out, "uops retired:        {}", self.uops_retired);
        let _ = writeln!(out, "uops / cycle:        {:.3}", self.uops_per_cycle());
        let _ = writeln!(out, "RAW hazard stalls:   {}", self.raw_hazard_stalls);
        let _ = writeln!(out, "structural stalls:   {}", self.structural_stalls);
        let _ = writeln!(out, "ROB-full stalls:     {}", self.rob_full_stalls);
        let _ = writeln!(out, "VRF writes:          {}", self.vrf_writes);
        let _ = writeln!(out, "XRF writes:          {}", self.xrf_writes);
        let _ = writeln!(out, "WAW collisions:      {}", self.waw_collisions);
        let _ = writeln!(out, "traps:               {}", self.traps);
        let _ = writeln!(out, "division by zero:    {}", self.division_by_zero);
        out
    }
}
