//! Execute station: functional execution with category latency.
//!
//! Every micro-op starts executing the cycle it is dispatched. The station
//! fetches operands (forwarded in-flight results first, the register file
//! otherwise), computes the real ALU or divide result immediately, and
//! holds the completion until the operation's latency has elapsed. The
//! backend drains due completions each tick and marks the ROB.

use std::cell::RefCell;
use std::rc::Rc;

use crate::isa::{divider_latency, is_divide, latency_of};
use crate::rvv::decoder::MicroOp;
use crate::rvv::dispatch::DispatchUnit;
use crate::rvv::dvu::{self, DvuOp};
use crate::rvv::regfile::VectorRegFile;
use crate::rvv::valu::{self, element_bytes};
use crate::trace::Tracer;

/// A finished execution waiting for its latency to elapse.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Cycle the result becomes architecturally visible.
    pub due: u64,
    /// ROB slot to mark complete.
    pub rob_index: usize,
    /// Parent instruction id.
    pub inst_id: u64,
    /// Micro-op id.
    pub uop_id: u64,
    /// Destination register.
    pub vd: u32,
    /// Opcode that produced the result.
    pub opcode: u32,
    /// Result bytes.
    pub data: Vec<u8>,
    /// Per-byte write enable.
    pub byte_enable: Vec<bool>,
    /// Per-byte saturation flags.
    pub vxsat: Vec<bool>,
}

/// Execute latency of a micro-op: the divider table for divide opcodes,
/// the category table otherwise.
pub fn uop_latency(uop: &MicroOp) -> u64 {
    if is_divide(uop.opcode) {
        divider_latency(8 << u32::from(uop.sew.min(3)))
    } else {
        latency_of(uop.opcode)
    }
}

/// The backend's functional execution station.
#[derive(Debug)]
pub struct ExecuteStation {
    name: String,
    vrf: Rc<RefCell<VectorRegFile>>,
    dispatch: Rc<RefCell<DispatchUnit>>,
    pending: Vec<Completion>,
    started: u64,
    div_by_zero: u64,
    tracer: Tracer,
}

impl ExecuteStation {
    /// Creates a station reading operands through `dispatch` (forwarding)
    /// and `vrf` (architectural state).
    pub fn new(
        name: impl Into<String>,
        vrf: Rc<RefCell<VectorRegFile>>,
        dispatch: Rc<RefCell<DispatchUnit>>,
        tracer: Tracer,
    ) -> Self {
        Self {
            name: name.into(),
            vrf,
            dispatch,
            pending: Vec::new(),
            started: 0,
            div_by_zero: 0,
            tracer,
        }
    }

    /// Operations started.
    pub fn started_count(&self) -> u64 {
        self.started
    }

    /// Elements that divided by zero.
    pub fn division_by_zero_count(&self) -> u64 {
        self.div_by_zero
    }

    /// Completions not yet drained.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True when no execution is in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    fn operand(&self, reg: u32) -> Vec<u8> {
        // The newest completed in-flight producer wins over the register
        // file; dispatch guarantees the producer is forwardable by now.
        self.dispatch
            .borrow()
            .forwarded_operand(reg)
            .unwrap_or_else(|| self.vrf.borrow().read(reg))
    }

    /// Begins executing a dispatched micro-op at cycle `now`. The result is
    /// computed immediately and becomes due after the operation's latency.
    pub fn begin(&mut self, uop: &MicroOp, now: u64) {
        let Some(rob_index) = uop.rob_index else {
            return;
        };
        let a = self.operand(uop.vs1);
        let b = self.operand(uop.vs2);

        let (data, byte_enable) = if let Some(op) = DvuOp::from_opcode(uop.opcode) {
            let eew = 8u32 << u32::from(uop.sew.min(3));
            let (quotient, remainder, zeros) = dvu::execute(op, &a, &b, eew, uop.vl);
            self.div_by_zero += zeros;
            if zeros > 0 {
                tracing::warn!(
                    inst_id = uop.inst_id,
                    elements = zeros,
                    "vector division by zero"
                );
            }
            let data = if op.is_remainder() { remainder } else { quotient };
            let width = (eew / 8) as usize;
            let active = (uop.vl as usize).min(a.len() / width) * width;
            let mut enable = vec![false; a.len()];
            for e in enable.iter_mut().take(active) {
                *e = true;
            }
            (data, enable)
        } else {
            valu::execute(uop.opcode, &a, &b, uop.sew, uop.vl)
        };

        let latency = uop_latency(uop);
        let width = element_bytes(uop.sew);
        self.tracer.compute(
            now,
            &self.name,
            "EXECUTE_BEGIN",
            format!(
                "inst_id={} uop_id={} rob_idx={rob_index} vd={} eew={} latency={latency}",
                uop.inst_id,
                uop.uop_id,
                uop.vd,
                width * 8
            ),
        );
        self.started += 1;
        self.pending.push(Completion {
            due: now + latency,
            rob_index,
            inst_id: uop.inst_id,
            uop_id: uop.uop_id,
            vd: uop.vd,
            opcode: uop.opcode,
            data,
            byte_enable,
            vxsat: Vec::new(),
        });
    }

    /// Removes and returns every completion due at or before `now`, in
    /// dispatch order.
    pub fn drain_due(&mut self, now: u64) -> Vec<Completion> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due
    }
}
