//! Simulator: owns the scheduler, the backend, and the issue loop.
//!
//! Assembles a loaded [`Program`] into a running system:
//! 1. **Backend:** A [`VectorBackend`] configured from the program.
//! 2. **Feeder:** A ticking component standing in for the scalar
//!    frontend's issue loop; it offers instructions through the
//!    scalar-vector interface and retries rejected ones.
//! 3. **Monitor:** A connection draining the backend's output port, so
//!    retired packets propagate through the fabric like any other traffic.
//!
//! `run` advances the global clock until the program drains or the cycle
//! budget is hit, then reports statistics.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::event::clocked::{Clocked, TickClock, start_component, start_connection};
use crate::event::scheduler::EventScheduler;
use crate::fabric::connection::Connection;
use crate::fabric::port::{Port, PortDirection};
use crate::isa;
use crate::rvv::backend::{BackendConfig, VectorBackend};
use crate::rvv::interface::{InstructionRequest, ScalarVectorInterface, VectorConfigState};
use crate::sim::loader::Program;
use crate::sim::memory::MemoryImage;
use crate::stats::SimStats;
use crate::trace::Tracer;

/// Scalar-frontend stand-in: issues queued instructions into the backend,
/// back-pressuring on rejection.
pub struct InstructionFeeder {
    clock: TickClock,
    backend: Rc<RefCell<VectorBackend>>,
    pending: VecDeque<InstructionRequest>,
    issue_width: usize,
    issued: u64,
}

impl std::fmt::Debug for InstructionFeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionFeeder")
            .field("pending", &self.pending.len())
            .field("issued", &self.issued)
            .finish_non_exhaustive()
    }
}

impl InstructionFeeder {
    /// Creates a feeder issuing up to `issue_width` instructions per cycle.
    pub fn new(
        name: impl Into<String>,
        backend: Rc<RefCell<VectorBackend>>,
        requests: Vec<InstructionRequest>,
        issue_width: usize,
    ) -> Self {
        Self {
            clock: TickClock::new(name, 1),
            backend,
            pending: requests.into(),
            issue_width: issue_width.max(1),
            issued: 0,
        }
    }

    /// Instructions not yet accepted by the backend.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Instructions accepted so far.
    pub fn issued_count(&self) -> u64 {
        self.issued
    }
}

impl Clocked for InstructionFeeder {
    fn clock(&self) -> &TickClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    fn tick(&mut self, _sched: &mut EventScheduler) {
        for _ in 0..self.issue_width {
            let Some(request) = self.pending.front() else {
                break;
            };
            if self.backend.borrow_mut().issue_instruction(request) {
                let _ = self.pending.pop_front();
                self.issued += 1;
            } else {
                // Queue full (or illegal configuration): retry next cycle.
                break;
            }
        }
    }
}

/// Builds issue requests from a program's instruction words. Register and
/// mask fields come from the standard vector encoding; the element
/// configuration comes from the program's initial RVV state.
pub fn requests_from_program(program: &Program) -> Vec<InstructionRequest> {
    let rvv = program.config.rvv_config;
    program
        .instructions
        .iter()
        .enumerate()
        .map(|(i, &(address, word))| InstructionRequest {
            inst_id: i as u64,
            pc: address,
            opcode: word,
            bits: word,
            vs1_idx: isa::vs1(word),
            vs2_idx: isa::vs2(word),
            vd_idx: isa::vd(word),
            vm: isa::vm(word),
            sew: rvv.sew,
            lmul: rvv.lmul,
            vl: rvv.vl,
        })
        .collect()
}

/// Top-level simulator: scheduler + backend + feeder + monitor.
pub struct Simulator {
    sched: EventScheduler,
    backend: Rc<RefCell<VectorBackend>>,
    feeder: Rc<RefCell<InstructionFeeder>>,
    monitor: Rc<Port>,
    data: MemoryImage,
    max_cycles: u64,
    tracer: Tracer,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("cycle", &self.sched.current_time())
            .field("max_cycles", &self.max_cycles)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Builds a simulator from a loaded program.
    pub fn new(program: Program, tracer: Tracer) -> Self {
        let core = program.config.core_config;
        let vector = program.config.vector_config;
        let rvv = program.config.rvv_config;

        let backend_config = BackendConfig {
            vlen: vector.vlen,
            issue_width: vector.vector_issue_width,
            num_read_ports: core.num_read_ports,
            num_retire_ports: core.num_write_ports,
            ..BackendConfig::default()
        };
        let backend = Rc::new(RefCell::new(VectorBackend::new(
            "rvv_backend",
            backend_config,
            tracer.clone(),
        )));
        backend.borrow_mut().set_config_state(&VectorConfigState {
            vl: rvv.vl,
            sew: rvv.sew,
            lmul: rvv.lmul,
            lmul_orig: rvv.lmul,
            ..VectorConfigState::default()
        });

        let requests = requests_from_program(&program);
        let feeder = Rc::new(RefCell::new(InstructionFeeder::new(
            "frontend",
            Rc::clone(&backend),
            requests,
            core.num_instruction_lanes,
        )));

        let mut sched = EventScheduler::new(tracer.clone());

        // Drain the backend's output port through a real connection so the
        // fabric sees the retired-packet traffic.
        let monitor = Port::single("monitor_in", PortDirection::Input);
        if let Some(out) = backend.borrow().pipeline().port("out") {
            let mut wire = Connection::new("backend_out_wire", 1);
            wire.add_source(out);
            wire.add_destination(Rc::clone(&monitor));
            let wire = Rc::new(RefCell::new(wire));
            start_connection(&mut sched, &wire, 0);
        }

        // The feeder is scheduled first so instructions queued at cycle t
        // are visible to the backend tick at cycle t.
        start_component(&mut sched, &feeder, 0);
        start_component(&mut sched, &backend, 0);

        Self {
            sched,
            backend,
            feeder,
            monitor,
            data: program.data,
            max_cycles: program.config.simulation_config.max_cycles,
            tracer,
        }
    }

    /// The backend under simulation.
    pub fn backend(&self) -> Rc<RefCell<VectorBackend>> {
        Rc::clone(&self.backend)
    }

    /// The trace log of this run.
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Initial data memory image.
    pub fn data_memory(&self) -> &MemoryImage {
        &self.data
    }

    /// True once every instruction has issued, executed, and retired.
    pub fn is_done(&self) -> bool {
        self.feeder.borrow().pending_count() == 0 && self.backend.borrow().is_idle()
    }

    /// Runs a single cycle.
    pub fn step(&mut self) {
        let _ = self.sched.run_for(1);
        // Keep the monitor port drained; its content is trace-observable.
        let _ = self.monitor.read();
    }

    /// Runs until the program drains or the cycle budget is reached.
    /// Returns the final statistics.
    pub fn run(&mut self) -> SimStats {
        while !self.is_done() && self.sched.current_time() < self.max_cycles {
            self.step();
        }
        self.stats()
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> SimStats {
        let backend = self.backend.borrow();
        let dispatch = backend.dispatch_stats();
        let retire = backend.retire_stats();
        SimStats {
            cycles: self.sched.current_time(),
            instructions_issued: self.feeder.borrow().issued_count(),
            uops_decoded: dispatch.decoded,
            uops_dispatched: dispatch.dispatched,
            uops_executed: backend.execute_count(),
            uops_retired: backend.retire_count(),
            raw_hazard_stalls: dispatch.raw_hazard_stalls,
            structural_stalls: dispatch.structural_stalls,
            rob_full_stalls: dispatch.rob_full_stalls,
            vrf_writes: retire.vrf_writes,
            xrf_writes: retire.xrf_writes,
            waw_collisions: retire.waw_collisions,
            traps: retire.traps_handled,
            division_by_zero: backend.division_by_zero_count(),
        }
    }

    /// Register file dump for reporting.
    pub fn vrf_dump(&self) -> String {
        self.backend.borrow().vrf().borrow().dump()
    }
}
