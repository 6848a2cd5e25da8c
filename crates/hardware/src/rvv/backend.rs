//! Vector backend: the out-of-order RVV execution engine.
//!
//! A three-stage pipeline (dispatch, execute, retire) over shared backend
//! state:
//! 1. **Dispatch** (stage 0) decodes, checks hazards, and allocates ROB
//!    entries; every allocated micro-op starts its functional execution the
//!    same cycle.
//! 2. **Execute** completions become due after the operation's category (or
//!    divider) latency; due completions mark the ROB and the forwarding
//!    buffer at the top of each tick. The pipeline's execute slot holds the
//!    flowing packet for the same latency, modeling occupancy.
//! 3. **Retire** runs every cycle: it drains the completed head window of
//!    the ROB, resolves WAW collisions, writes the register files, and
//!    surfaces traps.
//!
//! The backend implements [`ScalarVectorInterface`], the only coupling the
//! scalar frontend is allowed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::common::constants::{
    DEFAULT_ISSUE_WIDTH, DEFAULT_READ_PORTS, DEFAULT_RETIRE_PORTS, DEFAULT_ROB_DEPTH, DEFAULT_VLEN,
};
use crate::event::clocked::{Clocked, TickClock};
use crate::event::scheduler::EventScheduler;
use crate::fabric::packet::{Packet, Payload};
use crate::fabric::port::PortDirection;
use crate::pipeline::{Pipeline, Stage};
use crate::rvv::dispatch::{DispatchStats, DispatchUnit};
use crate::rvv::exec::{ExecuteStation, uop_latency};
use crate::rvv::interface::{
    InstructionRequest, RetireWrite, ScalarVectorInterface, VectorConfigState,
};
use crate::rvv::regfile::VectorRegFile;
use crate::rvv::retire::{RetireStats, RetireUnit};
use crate::rvv::rob::{DestFile, ReorderBuffer};
use crate::trace::Tracer;

/// Construction parameters for the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    /// Vector register width in bits.
    pub vlen: u32,
    /// Reorder buffer depth.
    pub rob_depth: usize,
    /// Maximum micro-ops dispatched per cycle.
    pub issue_width: usize,
    /// Vector register file read ports.
    pub num_read_ports: usize,
    /// Retirement ports.
    pub num_retire_ports: usize,
    /// Tick period in cycles.
    pub period: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            vlen: DEFAULT_VLEN,
            rob_depth: DEFAULT_ROB_DEPTH,
            issue_width: DEFAULT_ISSUE_WIDTH,
            num_read_ports: DEFAULT_READ_PORTS,
            num_retire_ports: DEFAULT_RETIRE_PORTS,
            period: 1,
        }
    }
}

/// Pipeline stage 0: delegates to the shared dispatch unit.
struct DispatchStage {
    name: String,
    unit: Rc<RefCell<DispatchUnit>>,
}

impl Stage for DispatchStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Option<Packet>, now: u64) -> Option<Packet> {
        self.unit.borrow_mut().process(input, now)
    }
}

/// Pipeline stage 1: the execute slot. The packet is held here for its
/// micro-op's execute latency; the functional work happens in the execute
/// station.
struct ExecuteSlot {
    name: String,
}

impl Stage for ExecuteSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Option<Packet>, now: u64) -> Option<Packet> {
        input.map(|p| p.at(now))
    }

    fn hold_cycles(&self, packet: &Packet) -> Option<u64> {
        match &packet.payload {
            Payload::Backend(bp) => Some(uop_latency(&bp.uop)),
            _ => None,
        }
    }
}

/// Pipeline stage 2: the retire slot. Retirement itself runs every backend
/// tick from the ROB; retired packets flow out for observers.
struct RetireSlot {
    name: String,
}

impl Stage for RetireSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Option<Packet>, now: u64) -> Option<Packet> {
        input.map(|p| p.at(now))
    }
}

/// The RVV out-of-order backend.
pub struct VectorBackend {
    clock: TickClock,
    name: String,
    pipe: Pipeline,
    config: BackendConfig,

    rob: Rc<RefCell<ReorderBuffer>>,
    vrf: Rc<RefCell<VectorRegFile>>,
    dispatch: Rc<RefCell<DispatchUnit>>,
    exec: ExecuteStation,
    retire: RetireUnit,

    scalar_regs: [u64; 32],
    vconfig: VectorConfigState,
    issued: BTreeMap<u64, InstructionRequest>,
    pending_retire_writes: Vec<RetireWrite>,
    pending_trap: Option<InstructionRequest>,

    current_cycle: u64,
    execute_count: u64,
    retire_count: u64,
    tracer: Tracer,
}

impl std::fmt::Debug for VectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorBackend")
            .field("name", &self.name)
            .field("cycle", &self.current_cycle)
            .field("rob", &self.rob.borrow().len())
            .field("executed", &self.execute_count)
            .field("retired", &self.retire_count)
            .finish_non_exhaustive()
    }
}

impl VectorBackend {
    /// Creates a backend and wires its internal pipeline.
    pub fn new(name: impl Into<String>, config: BackendConfig, tracer: Tracer) -> Self {
        let name = name.into();
        let rob = Rc::new(RefCell::new(ReorderBuffer::new(config.rob_depth, config.vlen)));
        let vrf = Rc::new(RefCell::new(VectorRegFile::new(config.vlen)));
        let dispatch = Rc::new(RefCell::new(DispatchUnit::new(
            format!("{name}_dispatch"),
            config.num_read_ports,
            config.issue_width,
            Rc::clone(&rob),
            tracer.clone(),
        )));
        let exec = ExecuteStation::new(
            format!("{name}_exec"),
            Rc::clone(&vrf),
            Rc::clone(&dispatch),
            tracer.clone(),
        );
        let retire = RetireUnit::new(
            format!("{name}_retire"),
            config.num_retire_ports,
            tracer.clone(),
        );

        let mut pipe = Pipeline::new(name.clone(), 3, 1, tracer.clone());
        pipe.set_stage(
            0,
            Box::new(DispatchStage {
                name: format!("{name}_dispatch"),
                unit: Rc::clone(&dispatch),
            }),
        );
        pipe.set_stage(
            1,
            Box::new(ExecuteSlot {
                name: format!("{name}_execute"),
            }),
        );
        pipe.set_stage(
            2,
            Box::new(RetireSlot {
                name: format!("{name}_retire"),
            }),
        );
        let _ = pipe.add_port("retired_out", PortDirection::Output);

        Self {
            clock: TickClock::new(name.clone(), config.period),
            name,
            pipe,
            config,
            rob,
            vrf,
            dispatch,
            exec,
            retire,
            scalar_regs: [0; 32],
            vconfig: VectorConfigState::default(),
            issued: BTreeMap::new(),
            pending_retire_writes: Vec::new(),
            pending_trap: None,
            current_cycle: 0,
            execute_count: 0,
            retire_count: 0,
            tracer,
        }
    }

    /// Construction parameters.
    pub fn config(&self) -> BackendConfig {
        self.config
    }

    /// The reorder buffer (shared with the pipeline stages).
    pub fn rob(&self) -> Rc<RefCell<ReorderBuffer>> {
        Rc::clone(&self.rob)
    }

    /// The vector register file.
    pub fn vrf(&self) -> Rc<RefCell<VectorRegFile>> {
        Rc::clone(&self.vrf)
    }

    /// The dispatch unit.
    pub fn dispatch_unit(&self) -> Rc<RefCell<DispatchUnit>> {
        Rc::clone(&self.dispatch)
    }

    /// The backend pipeline (ports and occupancy).
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipe
    }

    /// Micro-ops dispatched.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch.borrow().dispatch_count()
    }

    /// Micro-ops whose execution completed.
    pub fn execute_count(&self) -> u64 {
        self.execute_count
    }

    /// Micro-ops retired.
    pub fn retire_count(&self) -> u64 {
        self.retire_count
    }

    /// Dispatch-side statistics.
    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatch.borrow().stats()
    }

    /// Retire-side statistics.
    pub fn retire_stats(&self) -> RetireStats {
        self.retire.stats()
    }

    /// Elements that divided by zero.
    pub fn division_by_zero_count(&self) -> u64 {
        self.exec.division_by_zero_count()
    }

    /// Attaches a trap to an in-flight ROB entry (illegal operation
    /// detected mid-execution).
    pub fn inject_trap(&mut self, rob_index: usize, trap_code: u32) -> bool {
        self.rob.borrow_mut().set_trap(rob_index, trap_code)
    }

    fn apply_write(&mut self, write: &crate::rvv::retire::WriteRequest) {
        let low_word = write
            .data
            .iter()
            .take(8)
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        let vxsaturate = write
            .vxsat
            .iter()
            .take(64)
            .enumerate()
            .fold(0u64, |acc, (i, &s)| acc | (u64::from(s) << i));
        match write.dest_type {
            DestFile::Vrf => {
                let _ = self
                    .vrf
                    .borrow_mut()
                    .write(write.dest_reg, &write.data, &write.byte_enable);
            }
            DestFile::Xrf => {
                self.write_scalar_register(write.dest_reg, low_word, 0xFF);
            }
        }
        self.pending_retire_writes.push(RetireWrite {
            w_valid: write.byte_enable.iter().any(|&e| e),
            w_index: write.dest_reg,
            w_data: low_word,
            w_type: matches!(write.dest_type, DestFile::Xrf),
            trap_flag: write.trap_flag,
            vector_csr: self.vconfig,
            vxsaturate,
        });
    }

    fn retire_cycle(&mut self, now: u64) {
        let entries = self.rob.borrow().retire_entries(self.config.num_retire_ports);
        if entries.is_empty() {
            return;
        }
        let (writes, processed) = self.retire.process(&entries, now);
        for write in &writes {
            self.apply_write(write);
        }
        let retired = self.rob.borrow_mut().retire(processed, now);
        for entry in &entries[..retired] {
            self.dispatch.borrow_mut().retire_instruction(entry.rob_index);
            self.retire_count += 1;
            self.tracer.event(
                now,
                &self.name,
                "RETIRE",
                format!(
                    "inst_id={} uop_id={} rob_idx={} vd={}",
                    entry.inst_id, entry.uop_id, entry.rob_index, entry.dest_reg
                ),
            );
            if entry.trap_flag {
                let request = self.issued.get(&entry.inst_id).cloned().unwrap_or(
                    InstructionRequest {
                        inst_id: entry.inst_id,
                        ..InstructionRequest::default()
                    },
                );
                tracing::warn!(inst_id = entry.inst_id, code = entry.trap_code, "vector trap");
                self.pending_trap = Some(request);
            }
        }
    }
}

impl Clocked for VectorBackend {
    fn clock(&self) -> &TickClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    fn tick(&mut self, sched: &mut EventScheduler) {
        let now = sched.current_time();
        self.current_cycle = now;

        // Completions whose latency elapsed become architecturally visible
        // before anything else reads the ROB this cycle.
        for completion in self.exec.drain_due(now) {
            let marked = self.rob.borrow_mut().mark_complete(
                completion.rob_index,
                completion.data.clone(),
                completion.byte_enable.clone(),
                completion.vxsat.clone(),
                now,
            );
            if marked {
                self.dispatch
                    .borrow_mut()
                    .update_rob_entry(completion.rob_index, &completion.data);
                self.execute_count += 1;
                self.tracer.compute(
                    now,
                    &self.name,
                    "EXECUTE_COMPLETE",
                    format!(
                        "inst_id={} uop_id={} rob_idx={} vd={} opcode={:#x}",
                        completion.inst_id,
                        completion.uop_id,
                        completion.rob_index,
                        completion.vd,
                        completion.opcode
                    ),
                );
            }
        }

        // Pipeline mechanics: dispatch allocates during stage-0 processing.
        self.pipe.advance(now);

        // Allocation must happen every cycle even when the stage-0 slot was
        // busy draining an earlier packet (run_cycle is once-per-cycle).
        self.dispatch.borrow_mut().run_cycle(now);

        // Freshly allocated micro-ops start executing this cycle.
        let newly = self.dispatch.borrow_mut().take_newly_allocated();
        for uop in &newly {
            self.exec.begin(uop, now);
        }

        // Retirement runs every cycle, independent of packet flow.
        self.retire_cycle(now);
    }
}

impl ScalarVectorInterface for VectorBackend {
    fn issue_instruction(&mut self, request: &InstructionRequest) -> bool {
        if self.vconfig.vill {
            // No vector instruction may execute under an illegal vtype.
            tracing::warn!(inst_id = request.inst_id, "issue rejected: vill is set");
            self.pending_trap = Some(request.clone());
            return false;
        }
        let accepted = self
            .dispatch
            .borrow_mut()
            .queue_instruction(request.clone(), self.current_cycle);
        if accepted {
            let _ = self.issued.insert(request.inst_id, request.clone());
            self.tracer.record(
                self.current_cycle,
                crate::trace::TraceKind::Instr,
                &self.name,
                "ISSUE",
                format!("inst_id={} opcode={:#x}", request.inst_id, request.opcode),
                None,
            );
        }
        accepted
    }

    fn read_scalar_register(&self, addr: u32) -> u64 {
        self.scalar_regs.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_scalar_register(&mut self, addr: u32, data: u64, mask: u8) {
        // Register 0 is hardwired zero; out-of-range writes are dropped.
        if addr == 0 || addr as usize >= self.scalar_regs.len() {
            return;
        }
        let mut value = self.scalar_regs[addr as usize];
        for byte in 0..8 {
            if mask & (1 << byte) != 0 {
                let shift = byte * 8;
                value = (value & !(0xFFu64 << shift)) | (data & (0xFFu64 << shift));
            }
        }
        self.scalar_regs[addr as usize] = value;
    }

    fn config_state(&self) -> VectorConfigState {
        self.vconfig
    }

    fn set_config_state(&mut self, config: &VectorConfigState) {
        self.vconfig = *config;
    }

    fn retire_writes(&mut self) -> Vec<RetireWrite> {
        std::mem::take(&mut self.pending_retire_writes)
    }

    fn is_idle(&self) -> bool {
        self.dispatch.borrow().is_idle() && self.rob.borrow().is_empty() && self.exec.is_idle()
    }

    fn queue_capacity(&self) -> u32 {
        self.dispatch.borrow().queue_capacity()
    }

    fn trap(&self) -> Option<InstructionRequest> {
        self.pending_trap.clone()
    }
}
