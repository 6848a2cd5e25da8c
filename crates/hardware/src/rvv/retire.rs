//! Retire stage: multi-port writeback with WAW resolution.
//!
//! Drains completed ROB entries in program order and turns them into
//! register-file write requests:
//! 1. **Trap truncation:** Scanning in program order, the first trapping
//!    entry still emits its write, then the window is cut; no younger entry
//!    is processed.
//! 2. **WAW resolution:** For N simultaneous writes to one register, the
//!    later write wins per byte; an earlier write's byte enable is masked
//!    off wherever any later write's enable is set. All N writes are still
//!    emitted (zero-enabled writes are no-ops at the register file).
//! 3. **Routing:** `dest_type` selects the vector or the scalar register
//!    file; entries without a valid destination retire without a write.

use std::collections::BTreeMap;

use crate::rvv::rob::{DestFile, RobEntry};
use crate::trace::Tracer;

/// A resolved register-file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// ROB slot the write came from.
    pub rob_index: usize,
    /// Destination register.
    pub dest_reg: u32,
    /// Result bytes.
    pub data: Vec<u8>,
    /// Per-byte enable after WAW resolution.
    pub byte_enable: Vec<bool>,
    /// Per-byte saturation flags.
    pub vxsat: Vec<bool>,
    /// Destination register file.
    pub dest_type: DestFile,
    /// The entry carried a trap.
    pub trap_flag: bool,
}

/// Masks `earlier` off wherever `later` writes: the later write wins per
/// byte.
pub fn resolve_two(earlier: &[bool], later: &[bool]) -> Vec<bool> {
    earlier
        .iter()
        .zip(later.iter().chain(std::iter::repeat(&false)))
        .map(|(&e, &l)| e && !l)
        .collect()
}

/// Resolves the byte enables of `enables` (program order) so that for each
/// byte the youngest writer keeps it. Composes from the rear forward: each
/// write is masked by the union of all younger writes.
pub fn resolve_group(enables: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let Some(last) = enables.last() else {
        return Vec::new();
    };
    let width = last.len();
    let mut younger_union = vec![false; width];
    let mut resolved = vec![Vec::new(); enables.len()];
    for (i, enable) in enables.iter().enumerate().rev() {
        resolved[i] = resolve_two(enable, &younger_union);
        for (u, &e) in younger_union.iter_mut().zip(enable.iter()) {
            *u = *u || e;
        }
    }
    resolved
}

/// Retire statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetireStats {
    /// Writes produced by the most recent cycle.
    pub writes_this_cycle: u64,
    /// Total vector register file writes.
    pub vrf_writes: u64,
    /// Total scalar register file writes.
    pub xrf_writes: u64,
    /// Register groups that needed WAW resolution.
    pub waw_collisions: u64,
    /// Traps truncating a retirement window.
    pub traps_handled: u64,
}

/// The retire unit: WAW resolution and write-request generation.
#[derive(Debug)]
pub struct RetireUnit {
    name: String,
    num_retire_ports: usize,
    stats: RetireStats,
    tracer: Tracer,
}

impl RetireUnit {
    /// Creates a retire unit with the given port count.
    pub fn new(name: impl Into<String>, num_retire_ports: usize, tracer: Tracer) -> Self {
        Self {
            name: name.into(),
            num_retire_ports: num_retire_ports.max(1),
            stats: RetireStats::default(),
            tracer,
        }
    }

    /// Number of entries accepted per cycle.
    pub fn num_retire_ports(&self) -> usize {
        self.num_retire_ports
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> RetireStats {
        self.stats
    }

    /// Processes a retirement window (entries in program order, all
    /// completed). Returns the resolved writes and the number of entries
    /// consumed; the caller advances the ROB head by that count.
    pub fn process(&mut self, entries: &[RobEntry], now: u64) -> (Vec<WriteRequest>, usize) {
        let window = &entries[..entries.len().min(self.num_retire_ports)];

        // Program-order trap scan: the trapping entry is the last one
        // processed; younger entries stay in the ROB.
        let processed = match window.iter().position(|e| e.trap_flag) {
            Some(at) => {
                self.stats.traps_handled += 1;
                self.tracer.event(
                    now,
                    &self.name,
                    "TRAP",
                    format!("inst_id={} code={}", window[at].inst_id, window[at].trap_code),
                );
                at + 1
            }
            None => window.len(),
        };
        let window = &window[..processed];

        // Group by destination register, preserving program order inside
        // each group.
        let mut by_reg: BTreeMap<u32, Vec<&RobEntry>> = BTreeMap::new();
        for entry in window.iter().filter(|e| e.dest_valid) {
            by_reg.entry(entry.dest_reg).or_default().push(entry);
        }

        let mut writes = Vec::new();
        for (dest_reg, group) in &by_reg {
            if group.len() > 1 {
                self.stats.waw_collisions += 1;
                self.tracer.event(
                    now,
                    &self.name,
                    "WAW_RESOLVE",
                    format!("vd={dest_reg} writers={}", group.len()),
                );
            }
            let enables: Vec<Vec<bool>> = group.iter().map(|e| e.byte_enable.clone()).collect();
            let resolved = resolve_group(&enables);
            for (entry, byte_enable) in group.iter().zip(resolved) {
                writes.push(WriteRequest {
                    rob_index: entry.rob_index,
                    dest_reg: *dest_reg,
                    data: entry.result_data.clone(),
                    byte_enable,
                    vxsat: entry.vxsat.clone(),
                    dest_type: entry.dest_type,
                    trap_flag: entry.trap_flag,
                });
            }
        }

        self.stats.writes_this_cycle = writes.len() as u64;
        for write in &writes {
            match write.dest_type {
                DestFile::Vrf => self.stats.vrf_writes += 1,
                DestFile::Xrf => self.stats.xrf_writes += 1,
            }
            self.tracer.reg(
                now,
                &self.name,
                "RETIRE_WRITE",
                format!("rob_idx={} vd={}", write.rob_index, write.dest_reg),
            );
        }

        (writes, processed)
    }
}
