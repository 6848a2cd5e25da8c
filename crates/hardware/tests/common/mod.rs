//! Shared test infrastructure.
//!
//! Provides a backend fixture driven by a real scheduler, plus builders
//! for issue requests, so the integration tests read as scenarios instead
//! of wiring.

use std::cell::RefCell;
use std::rc::Rc;

use vexsim_core::event::clocked::start_component;
use vexsim_core::event::scheduler::EventScheduler;
use vexsim_core::rvv::backend::{BackendConfig, VectorBackend};
use vexsim_core::rvv::interface::{InstructionRequest, ScalarVectorInterface};
use vexsim_core::trace::Tracer;

/// A backend ticking on a real scheduler.
pub struct BackendFixture {
    /// The event scheduler driving the backend.
    pub sched: EventScheduler,
    /// The backend under test.
    pub backend: Rc<RefCell<VectorBackend>>,
    /// The shared trace log.
    pub tracer: Tracer,
}

impl BackendFixture {
    /// Creates a fixture with the given backend parameters and starts the
    /// backend at cycle zero.
    pub fn new(config: BackendConfig) -> Self {
        let tracer = Tracer::enabled();
        let mut sched = EventScheduler::new(tracer.clone());
        let backend = Rc::new(RefCell::new(VectorBackend::new(
            "rvv_backend",
            config,
            tracer.clone(),
        )));
        start_component(&mut sched, &backend, 0);
        Self {
            sched,
            backend,
            tracer,
        }
    }

    /// Default parameters.
    pub fn with_defaults() -> Self {
        Self::new(BackendConfig::default())
    }

    /// Issues a request, panicking on rejection.
    pub fn issue(&self, request: InstructionRequest) {
        assert!(
            self.backend.borrow_mut().issue_instruction(&request),
            "issue rejected for inst_id={}",
            request.inst_id
        );
    }

    /// Writes a full-width register value.
    pub fn set_vreg(&self, index: u32, bytes: &[u8]) {
        let vrf = self.backend.borrow().vrf();
        let width = vrf.borrow().bytes_per_register();
        let mut data = bytes.to_vec();
        data.resize(width, 0);
        assert!(vrf.borrow_mut().write(index, &data, &[]));
    }

    /// Reads a register.
    pub fn vreg(&self, index: u32) -> Vec<u8> {
        let vrf = self.backend.borrow().vrf();
        let value = vrf.borrow().read(index);
        value
    }

    /// Runs `n` cycles.
    pub fn run_cycles(&mut self, n: u64) {
        let _ = self.sched.run_for(n);
    }

    /// Runs until the backend is idle, up to `max_cycles`.
    pub fn run_to_idle(&mut self, max_cycles: u64) {
        for _ in 0..max_cycles {
            if self.backend.borrow().is_idle() {
                return;
            }
            let _ = self.sched.run_for(1);
        }
        assert!(
            self.backend.borrow().is_idle(),
            "backend not idle after {max_cycles} cycles:\n{}",
            self.backend.borrow().rob().borrow().dump_state()
        );
    }
}

/// Builds an issue request using the compact internal opcodes, with
/// SEW=8-bit and LMUL=1 defaults.
pub fn request(inst_id: u64, opcode: u32, vd: u32, vs1: u32, vs2: u32, vl: u32) -> InstructionRequest {
    InstructionRequest {
        inst_id,
        pc: inst_id * 4,
        opcode,
        vd_idx: vd,
        vs1_idx: vs1,
        vs2_idx: vs2,
        vm: 0,
        sew: 0,
        lmul: 0,
        vl,
        ..InstructionRequest::default()
    }
}

/// Same as [`request`] with an LMUL encoding.
pub fn grouped_request(
    inst_id: u64,
    opcode: u32,
    vd: u32,
    vs1: u32,
    vs2: u32,
    vl: u32,
    lmul: u8,
) -> InstructionRequest {
    InstructionRequest {
        lmul,
        ..request(inst_id, opcode, vd, vs1, vs2, vl)
    }
}
