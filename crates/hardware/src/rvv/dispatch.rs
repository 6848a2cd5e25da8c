//! Dispatch stage of the vector backend.
//!
//! Stage 0 of the backend pipeline. Per cycle it:
//! 1. **Decodes:** Pops queued instructions and stripmines them into the
//!    decode queue, up to six micro-ops per cycle. An instruction is only
//!    popped when its whole expansion fits the remaining budget, so no
//!    micro-op is ever dropped.
//! 2. **Dispatches:** Up to the issue width, subject to RAW hazards
//!    (producer not yet forwardable), structural hazards (register-file
//!    read ports), and ROB capacity.
//! 3. **Emits:** One dispatched micro-op per `process` call, wrapped in a
//!    backend packet; the pipeline drains the rest on subsequent ticks.
//!
//! The unit mirrors in-flight ROB entries in a local shadow list and keeps
//! a bounded forwarding buffer so RAW dependences can be satisfied before
//! the producer retires to the register file.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use crate::common::constants::{
    FORWARDING_BUFFER_DEPTH, INSTRUCTION_QUEUE_DEPTH, MAX_DECODE_PER_CYCLE, NUM_VECTOR_REGISTERS,
};
use crate::fabric::packet::{Packet, Payload};
use crate::rvv::decoder::{Decoder, MicroOp};
use crate::rvv::interface::InstructionRequest;
use crate::rvv::rob::{DestFile, ReorderBuffer};
use crate::trace::Tracer;

/// A micro-op flowing through the backend pipeline, with its execution
/// result once available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendPacket {
    /// The dispatched micro-op.
    pub uop: MicroOp,
    /// Result bytes, filled by the execute stage.
    pub result_data: Option<Vec<u8>>,
    /// Per-byte write enable accompanying the result.
    pub byte_enable: Vec<bool>,
    /// The micro-op's ROB slot.
    pub rob_index: usize,
}

impl BackendPacket {
    /// Wraps a dispatched micro-op (which must carry a ROB index).
    pub fn new(uop: MicroOp) -> Self {
        let rob_index = uop.rob_index.unwrap_or(0);
        Self {
            uop,
            result_data: None,
            byte_enable: Vec::new(),
            rob_index,
        }
    }
}

/// Shadow of one in-flight ROB entry, kept local to dispatch so hazard
/// checks never touch the ROB itself.
#[derive(Debug, Clone)]
struct ShadowEntry {
    rob_index: usize,
    dest_reg: u32,
    data: Vec<u8>,
    data_ready: bool,
    inst_id: u64,
}

/// Bounded queue of completed-but-not-retired results, keyed by ROB index.
#[derive(Debug)]
pub struct ForwardingBuffer {
    entries: VecDeque<ShadowEntry>,
    capacity: usize,
}

impl ForwardingBuffer {
    /// Creates a buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Registers a freshly dispatched producer. Fails when full; forwarding
    /// is then simply unavailable for that entry.
    pub fn enqueue(&mut self, rob_index: usize, dest_reg: u32, inst_id: u64) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push_back(ShadowEntry {
            rob_index,
            dest_reg,
            data: Vec::new(),
            data_ready: false,
            inst_id,
        });
        true
    }

    /// Stores the completed result for `rob_index`.
    pub fn mark_ready(&mut self, rob_index: usize, data: &[u8]) -> bool {
        for entry in &mut self.entries {
            if entry.rob_index == rob_index {
                entry.data = data.to_vec();
                entry.data_ready = true;
                return true;
            }
        }
        false
    }

    /// Forwarded data for `rob_index`, if the producer has completed.
    pub fn data_for(&self, rob_index: usize) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.rob_index == rob_index && e.data_ready)
            .map(|e| e.data.as_slice())
    }

    /// Drops the entry for `rob_index` (producer retired).
    pub fn remove(&mut self, rob_index: usize) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.rob_index != rob_index);
        self.entries.len() != before
    }

    /// Occupancy.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no further producers can register.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Dispatch statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Micro-ops successfully dispatched.
    pub dispatched: u64,
    /// Micro-ops decoded into the decode queue.
    pub decoded: u64,
    /// Cycles the dispatch loop stopped on an unforwardable RAW hazard.
    pub raw_hazard_stalls: u64,
    /// Cycles the dispatch loop stopped on read-port pressure.
    pub structural_stalls: u64,
    /// Cycles the dispatch loop stopped on a full ROB.
    pub rob_full_stalls: u64,
}

/// The dispatch unit: instruction queue, stripmining decode, hazard checks,
/// ROB allocation, and the forwarding buffer.
#[derive(Debug)]
pub struct DispatchUnit {
    name: String,
    num_read_ports: usize,
    max_issue_width: usize,
    rob: Rc<RefCell<ReorderBuffer>>,
    decoder: Decoder,
    instruction_queue: VecDeque<InstructionRequest>,
    decode_queue: VecDeque<MicroOp>,
    shadow: Vec<ShadowEntry>,
    forwarding: ForwardingBuffer,
    pending_emit: VecDeque<MicroOp>,
    newly_allocated: Vec<MicroOp>,
    last_cycle: Option<u64>,
    stats: DispatchStats,
    tracer: Tracer,
}

impl DispatchUnit {
    /// Creates a dispatch unit bound to `rob`.
    pub fn new(
        name: impl Into<String>,
        num_read_ports: usize,
        max_issue_width: usize,
        rob: Rc<RefCell<ReorderBuffer>>,
        tracer: Tracer,
    ) -> Self {
        Self {
            name: name.into(),
            num_read_ports,
            max_issue_width: max_issue_width.max(1),
            rob,
            decoder: Decoder::new(),
            instruction_queue: VecDeque::with_capacity(INSTRUCTION_QUEUE_DEPTH),
            decode_queue: VecDeque::new(),
            shadow: Vec::new(),
            forwarding: ForwardingBuffer::new(FORWARDING_BUFFER_DEPTH),
            pending_emit: VecDeque::new(),
            newly_allocated: Vec::new(),
            last_cycle: None,
            stats: DispatchStats::default(),
            tracer,
        }
    }

    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues an instruction for decode. Returns false when the queue is
    /// full; the caller back-pressures and retries.
    pub fn queue_instruction(&mut self, request: InstructionRequest, now: u64) -> bool {
        if self.instruction_queue.len() >= INSTRUCTION_QUEUE_DEPTH {
            self.tracer.queue(
                now,
                &self.name,
                "QUEUE_FULL",
                format!("inst_id={}", request.inst_id),
            );
            return false;
        }
        self.tracer.queue(
            now,
            &self.name,
            "QUEUE_PUSH",
            format!("inst_id={} depth={}", request.inst_id, self.instruction_queue.len() + 1),
        );
        self.instruction_queue.push_back(request);
        true
    }

    /// Remaining instruction-queue slots.
    pub fn queue_capacity(&self) -> u32 {
        (INSTRUCTION_QUEUE_DEPTH - self.instruction_queue.len()) as u32
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Micro-ops dispatched in total.
    pub fn dispatch_count(&self) -> u64 {
        self.stats.dispatched
    }

    /// Micro-ops decoded but not yet dispatched or retired.
    pub fn in_flight(&self) -> usize {
        self.decode_queue.len() + self.pending_emit.len() + self.shadow.len()
    }

    /// True when nothing is queued, decoded, or in flight.
    pub fn is_idle(&self) -> bool {
        self.instruction_queue.is_empty()
            && self.decode_queue.is_empty()
            && self.pending_emit.is_empty()
            && self.shadow.is_empty()
    }

    /// Forwarding-buffer occupancy accessors for observers.
    pub fn forwarding_buffer(&self) -> &ForwardingBuffer {
        &self.forwarding
    }

    /// Newest in-flight result for `reg`, from the shadow list, if its
    /// producer has completed. Used by the execute stage for operand
    /// forwarding.
    pub fn forwarded_operand(&self, reg: u32) -> Option<Vec<u8>> {
        self.shadow
            .iter()
            .rev()
            .find(|e| e.dest_reg == reg)
            .filter(|e| e.data_ready)
            .map(|e| e.data.clone())
    }

    /// Records a producer's completion: marks the shadow entry and the
    /// forwarding buffer ready with `data`.
    pub fn update_rob_entry(&mut self, rob_index: usize, data: &[u8]) {
        let _ = self.forwarding.mark_ready(rob_index, data);
        if let Some(entry) = self.shadow.iter_mut().find(|e| e.rob_index == rob_index) {
            entry.data = data.to_vec();
            entry.data_ready = true;
        }
    }

    /// Removes the retired entry from the shadow list and the forwarding
    /// buffer.
    pub fn retire_instruction(&mut self, rob_index: usize) {
        self.shadow.retain(|e| e.rob_index != rob_index);
        let _ = self.forwarding.remove(rob_index);
    }

    /// Drains the micro-ops allocated since the last call (the backend
    /// starts their execution).
    pub fn take_newly_allocated(&mut self) -> Vec<MicroOp> {
        std::mem::take(&mut self.newly_allocated)
    }

    /// True if `uop`'s sources have an in-flight producer whose result is
    /// not yet forwardable.
    fn raw_hazard_blocks(&self, uop: &MicroOp) -> bool {
        for src in [uop.vs1, uop.vs2] {
            if src >= NUM_VECTOR_REGISTERS {
                continue;
            }
            // Newest producer wins; older writers are superseded.
            if let Some(entry) = self.shadow.iter().rev().find(|e| e.dest_reg == src) {
                let forwardable =
                    entry.data_ready || self.forwarding.data_for(entry.rob_index).is_some();
                if !forwardable {
                    return true;
                }
            }
        }
        false
    }

    /// Register read-port demand of the cycle's dispatch set plus the
    /// candidate, with duplicate indices eliminated.
    fn read_port_demand(&self, cycle_uops: &[MicroOp], candidate: &MicroOp) -> usize {
        let mut regs = BTreeSet::new();
        for uop in cycle_uops.iter().chain(std::iter::once(candidate)) {
            for reg in [uop.vs1, uop.vs2, uop.vd] {
                if reg < NUM_VECTOR_REGISTERS {
                    let _ = regs.insert(reg);
                }
            }
            if uop.is_masked() {
                let _ = regs.insert(0);
            }
        }
        regs.len()
    }

    /// One pipeline-stage call: queues any arriving instruction packet,
    /// runs this cycle's allocation if it has not run yet, and emits one
    /// dispatched micro-op wrapped as a backend packet.
    pub fn process(&mut self, input: Option<Packet>, now: u64) -> Option<Packet> {
        if let Some(packet) = input {
            if let Payload::Instruction(request) = packet.payload {
                let _ = self.queue_instruction(request, now);
            }
        }

        // Drain one previously dispatched micro-op per call.
        if let Some(uop) = self.pending_emit.pop_front() {
            return Some(self.emit(uop, now));
        }

        self.run_cycle(now);
        self.pending_emit.pop_front().map(|uop| self.emit(uop, now))
    }

    /// This cycle's decode and dispatch work. Runs at most once per cycle;
    /// the backend also invokes it directly so allocation never waits on
    /// the pipeline conduit draining earlier packets.
    pub fn run_cycle(&mut self, now: u64) {
        if self.last_cycle == Some(now) {
            return;
        }
        self.last_cycle = Some(now);

        // Decode phase: whole instructions only, up to the cycle budget.
        let mut decoded = 0usize;
        while decoded < MAX_DECODE_PER_CYCLE {
            let Some(request) = self.instruction_queue.front() else {
                break;
            };
            let expansion = crate::rvv::decoder::lmul_value(request.lmul) as usize;
            if decoded + expansion > MAX_DECODE_PER_CYCLE && decoded > 0 {
                break;
            }
            // Unwrap is fine: front() above proved the queue is non-empty.
            #[allow(clippy::unwrap_used)]
            let request = self.instruction_queue.pop_front().unwrap();
            let uops = self.decoder.decode(&request);
            decoded += uops.len();
            self.stats.decoded += uops.len() as u64;
            self.decode_queue.extend(uops);
        }

        // Dispatch phase.
        let mut cycle_uops: Vec<MicroOp> = Vec::new();
        while cycle_uops.len() < self.max_issue_width {
            let Some(head) = self.decode_queue.front() else {
                break;
            };

            if self.raw_hazard_blocks(head) {
                self.stats.raw_hazard_stalls += 1;
                self.tracer.event(
                    now,
                    &self.name,
                    "RAW_STALL",
                    format!("uop_id={} vs1={} vs2={}", head.uop_id, head.vs1, head.vs2),
                );
                break;
            }

            if self.read_port_demand(&cycle_uops, head) > self.num_read_ports {
                self.stats.structural_stalls += 1;
                self.tracer.event(
                    now,
                    &self.name,
                    "STRUCT_STALL",
                    format!("uop_id={}", head.uop_id),
                );
                break;
            }

            let allocated = self.rob.borrow_mut().enqueue(
                head.inst_id,
                head.uop_id,
                head.vd,
                true,
                DestFile::Vrf,
                now,
            );
            let Some(rob_index) = allocated else {
                self.stats.rob_full_stalls += 1;
                self.tracer
                    .event(now, &self.name, "ROB_FULL", format!("uop_id={}", head.uop_id));
                break;
            };

            // Unwrap is fine: front() above proved the queue is non-empty.
            #[allow(clippy::unwrap_used)]
            let mut uop = self.decode_queue.pop_front().unwrap();
            uop.rob_index = Some(rob_index);
            self.shadow.push(ShadowEntry {
                rob_index,
                dest_reg: uop.vd,
                data: Vec::new(),
                data_ready: false,
                inst_id: uop.inst_id,
            });
            let _ = self.forwarding.enqueue(rob_index, uop.vd, uop.inst_id);
            self.stats.dispatched += 1;
            self.newly_allocated.push(uop.clone());
            cycle_uops.push(uop);
        }
        self.pending_emit.extend(cycle_uops);
    }

    fn emit(&mut self, uop: MicroOp, now: u64) -> Packet {
        self.tracer.event(
            now,
            &self.name,
            "DISPATCH",
            format!(
                "inst_id={} uop_id={} rob_idx={} vd={} opcode={:#x}",
                uop.inst_id,
                uop.uop_id,
                uop.rob_index.unwrap_or(0),
                uop.vd,
                uop.opcode
            ),
        );
        Packet::new(Payload::Backend(BackendPacket::new(uop))).at(now)
    }
}
