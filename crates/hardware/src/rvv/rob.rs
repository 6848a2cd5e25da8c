//! Reorder buffer for in-order retirement.
//!
//! The ROB is a circular buffer that tracks micro-ops from dispatch through
//! retirement. It provides:
//! 1. **Allocation:** `enqueue` hands out the next circular slot, failing
//!    when full.
//! 2. **Completion:** `mark_complete` stores the result bytes and byte
//!    enable; `set_trap` marks an entry trapping (and complete).
//! 3. **In-order retirement:** `retire_entries` returns the completed
//!    prefix at the head; `retire` advances the head past completed slots
//!    only, so no younger entry ever retires before an older incomplete
//!    one.
//!
//! `size` is the only truth about occupancy; `head == tail` is ambiguous
//! without it.

/// Destination register file of a ROB entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestFile {
    /// Vector register file.
    #[default]
    Vrf,
    /// Scalar (integer) register file.
    Xrf,
}

/// A single in-flight micro-op record.
#[derive(Debug, Clone, Default)]
pub struct RobEntry {
    /// Slot index inside the circular buffer.
    pub rob_index: usize,
    /// Parent instruction id.
    pub inst_id: u64,
    /// Micro-op id.
    pub uop_id: u64,
    /// Destination register index.
    pub dest_reg: u32,
    /// False when the micro-op produces no architectural write.
    pub dest_valid: bool,
    /// Which register file the destination lives in.
    pub dest_type: DestFile,
    /// Result bytes (`vlen / 8` long once complete).
    pub result_data: Vec<u8>,
    /// Per-byte write enable.
    pub byte_enable: Vec<bool>,
    /// Per-byte saturation flags.
    pub vxsat: Vec<bool>,
    /// Execution has produced a result (or a trap).
    pub execution_complete: bool,
    /// Entry has been retired.
    pub retired: bool,
    /// Cycle the entry was allocated.
    pub dispatch_cycle: u64,
    /// Cycle execution completed.
    pub complete_cycle: u64,
    /// Cycle the entry retired.
    pub retire_cycle: u64,
    /// An exception is attached to this entry.
    pub trap_flag: bool,
    /// Exception code, meaningful when `trap_flag` is set.
    pub trap_code: u32,
    /// Slot holds a live entry.
    pub valid: bool,
}

/// Circular reorder buffer.
#[derive(Debug)]
pub struct ReorderBuffer {
    entries: Vec<RobEntry>,
    vlen: u32,
    head: usize,
    tail: usize,
    size: usize,
    dispatched: u64,
    completed: u64,
    retired: u64,
}

impl ReorderBuffer {
    /// Creates a ROB with `capacity` slots for results of `vlen` bits.
    pub fn new(capacity: usize, vlen: u32) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, RobEntry::default);
        Self {
            entries,
            vlen,
            head: 0,
            tail: 0,
            size: 0,
            dispatched: 0,
            completed: 0,
            retired: 0,
        }
    }

    /// Slot count.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when no entries are live.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True when every slot is live.
    pub fn is_full(&self) -> bool {
        self.size >= self.entries.len()
    }

    /// Total entries ever allocated.
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched
    }

    /// Total entries ever completed.
    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Total entries ever retired.
    pub fn retired_count(&self) -> u64 {
        self.retired
    }

    /// Allocates the next slot. Returns its index, or `None` when full.
    pub fn enqueue(
        &mut self,
        inst_id: u64,
        uop_id: u64,
        dest_reg: u32,
        dest_valid: bool,
        dest_type: DestFile,
        now: u64,
    ) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let index = self.tail;
        let bytes = (self.vlen / 8) as usize;
        self.entries[index] = RobEntry {
            rob_index: index,
            inst_id,
            uop_id,
            dest_reg,
            dest_valid,
            dest_type,
            result_data: vec![0; bytes],
            byte_enable: vec![false; bytes],
            vxsat: vec![false; bytes],
            dispatch_cycle: now,
            valid: true,
            ..RobEntry::default()
        };
        self.tail = (self.tail + 1) % self.entries.len();
        self.size += 1;
        self.dispatched += 1;
        Some(index)
    }

    /// Stores the execution result for `rob_index` and flips it complete.
    /// An empty `byte_enable` means all bytes. Returns false for an invalid
    /// index or an already-retired entry. Completion is never undone.
    pub fn mark_complete(
        &mut self,
        rob_index: usize,
        result_data: Vec<u8>,
        byte_enable: Vec<bool>,
        vxsat: Vec<bool>,
        now: u64,
    ) -> bool {
        if rob_index >= self.entries.len() || self.entries[rob_index].retired {
            return false;
        }
        let bytes = (self.vlen / 8) as usize;
        let entry = &mut self.entries[rob_index];
        entry.result_data = result_data;
        entry.byte_enable = if byte_enable.is_empty() {
            vec![true; bytes]
        } else {
            byte_enable
        };
        if !vxsat.is_empty() {
            entry.vxsat = vxsat;
        }
        entry.execution_complete = true;
        entry.complete_cycle = now;
        self.completed += 1;
        true
    }

    /// Attaches a trap to `rob_index`, which also completes it.
    pub fn set_trap(&mut self, rob_index: usize, trap_code: u32) -> bool {
        if rob_index >= self.entries.len() {
            return false;
        }
        let entry = &mut self.entries[rob_index];
        entry.trap_flag = true;
        entry.trap_code = trap_code;
        entry.execution_complete = true;
        true
    }

    /// The head entry if it is ready to retire.
    pub fn retire_entry(&self) -> Option<&RobEntry> {
        if self.is_empty() {
            return None;
        }
        let entry = &self.entries[self.head];
        (entry.execution_complete && !entry.retired).then_some(entry)
    }

    /// Walks forward from the head, returning (clones of) the prefix of
    /// entries that are all completed and not retired, up to `max_count`.
    /// The walk stops at the first incomplete or retired slot.
    pub fn retire_entries(&self, max_count: usize) -> Vec<RobEntry> {
        let mut result = Vec::new();
        let mut index = self.head;
        for _ in 0..max_count.min(self.size) {
            let entry = &self.entries[index];
            if !entry.execution_complete || entry.retired {
                break;
            }
            result.push(entry.clone());
            index = (index + 1) % self.entries.len();
        }
        result
    }

    /// Number of head entries currently ready to retire.
    pub fn ready_to_retire(&self) -> usize {
        self.retire_entries(self.size).len()
    }

    /// Retires up to `count` head entries, stopping at the first incomplete
    /// one. Returns the number actually retired.
    pub fn retire(&mut self, count: usize, now: u64) -> usize {
        let mut done = 0;
        for _ in 0..count {
            if self.is_empty() {
                break;
            }
            let entry = &mut self.entries[self.head];
            if !entry.execution_complete {
                break;
            }
            entry.retired = true;
            entry.retire_cycle = now;
            entry.valid = false;
            self.head = (self.head + 1) % self.entries.len();
            self.size -= 1;
            self.retired += 1;
            done += 1;
        }
        done
    }

    /// A live (or just-retired, not yet reused) entry by slot index.
    pub fn entry(&self, rob_index: usize) -> Option<&RobEntry> {
        self.entries.get(rob_index)
    }

    /// State summary for debugging.
    pub fn dump_state(&self) -> String {
        use std::fmt::Write as _;
        let mut out = format!(
            "ROB: head={} tail={} size={}\n",
            self.head, self.tail, self.size
        );
        let mut index = self.head;
        for _ in 0..self.size {
            let e = &self.entries[index];
            let _ = writeln!(
                out,
                "  [{index}] inst_id={} uop_id={} vd={} complete={} retired={}",
                e.inst_id,
                e.uop_id,
                e.dest_reg,
                u8::from(e.execution_complete),
                u8::from(e.retired),
            );
            index = (index + 1) % self.entries.len();
        }
        out
    }
}
