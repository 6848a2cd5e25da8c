//! Vector divide/remainder unit: functional model with width latency.
//!
//! Element-wise signed/unsigned divide and remainder. Division by zero
//! follows the RISC-V convention: the quotient is all ones and the
//! remainder preserves the dividend. Signed overflow (`MIN / -1`) returns
//! `MIN` with remainder zero. Latency grows with the element width (17, 33,
//! 65, 129 cycles for 8/16/32/64-bit elements).

use std::cell::Cell;
use std::rc::Rc;

use crate::event::clocked::{Clocked, TickClock};
use crate::event::scheduler::EventScheduler;
use crate::fabric::packet::{Packet, Payload};
use crate::isa::divider_latency;
use crate::pipeline::{Passthrough, Pipeline, Stage};
use crate::trace::Tracer;

/// Divide operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DvuOp {
    /// Unsigned divide.
    Divu,
    /// Signed divide.
    Div,
    /// Unsigned remainder.
    Remu,
    /// Signed remainder.
    Rem,
}

impl DvuOp {
    /// True for signed variants.
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }

    /// True for remainder variants.
    pub fn is_remainder(self) -> bool {
        matches!(self, Self::Rem | Self::Remu)
    }

    /// Maps a divide-class opcode to its operation. `None` for anything
    /// that is not a divide opcode.
    pub fn from_opcode(opcode: u32) -> Option<Self> {
        use crate::isa::opcodes as op;
        match opcode {
            op::VDIVU => Some(Self::Divu),
            op::VDIV => Some(Self::Div),
            op::VREMU => Some(Self::Remu),
            op::VREM => Some(Self::Rem),
            _ => None,
        }
    }
}

/// Operands bound for the divide unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvuRequest {
    /// Destination register.
    pub rd: u32,
    /// Operation selector.
    pub op: DvuOp,
    /// Element width in bits (8/16/32/64).
    pub eew: u32,
    /// Active element count.
    pub vl: u32,
    /// Dividend bytes.
    pub dividend: Vec<u8>,
    /// Divisor bytes.
    pub divisor: Vec<u8>,
}

/// Result produced by the divide unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvuResult {
    /// Destination register.
    pub rd: u32,
    /// Element width in bits.
    pub eew: u32,
    /// True for the remainder half of the result pair.
    pub is_remainder: bool,
    /// Result bytes.
    pub data: Vec<u8>,
}

fn read_element(bytes: &[u8], index: usize, width: usize) -> u64 {
    let mut value = 0u64;
    for i in (0..width).rev() {
        value = (value << 8) | u64::from(bytes[index * width + i]);
    }
    value
}

fn write_element(bytes: &mut [u8], index: usize, width: usize, value: u64) {
    for i in 0..width {
        bytes[index * width + i] = (value >> (8 * i)) as u8;
    }
}

fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Divides element-wise. Returns `(quotient_bytes, remainder_bytes,
/// div_by_zero_elements)`.
pub fn execute(
    op: DvuOp,
    dividend: &[u8],
    divisor: &[u8],
    eew: u32,
    vl: u32,
) -> (Vec<u8>, Vec<u8>, u64) {
    let width = (eew / 8).max(1) as usize;
    let bits = (width * 8) as u32;
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let total = dividend.len() / width;
    let active = (vl as usize).min(total).min(divisor.len() / width);

    let mut quotient = vec![0u8; dividend.len()];
    let mut remainder = vec![0u8; dividend.len()];
    let mut zeros = 0u64;

    for i in 0..active {
        let x = read_element(dividend, i, width);
        let y = read_element(divisor, i, width);
        let (q, r) = if y == 0 {
            zeros += 1;
            // All-ones quotient, dividend-preserving remainder.
            (mask, x)
        } else if op.is_signed() {
            let sx = sign_extend(x, bits);
            let sy = sign_extend(y, bits);
            let min = -(1i64 << (bits - 1));
            if sx == min && sy == -1 {
                // Signed overflow: quotient saturates to MIN, remainder 0.
                (min as u64, 0)
            } else {
                ((sx / sy) as u64, (sx % sy) as u64)
            }
        } else {
            (x / y, x % y)
        };
        write_element(&mut quotient, i, width, q & mask);
        write_element(&mut remainder, i, width, r & mask);
    }
    (quotient, remainder, zeros)
}

struct DvuExecuteStage {
    name: String,
    executed: Rc<Cell<u64>>,
    div_by_zero: Rc<Cell<u64>>,
}

impl Stage for DvuExecuteStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Option<Packet>, now: u64) -> Option<Packet> {
        let packet = input?;
        let Payload::DvuRequest(request) = packet.payload else {
            return Some(packet);
        };
        let (quotient, remainder, zeros) = execute(
            request.op,
            &request.dividend,
            &request.divisor,
            request.eew,
            request.vl,
        );
        self.executed.set(self.executed.get() + 1);
        self.div_by_zero.set(self.div_by_zero.get() + zeros);
        let is_remainder = request.op.is_remainder();
        Some(
            Packet::new(Payload::DvuResult(DvuResult {
                rd: request.rd,
                eew: request.eew,
                is_remainder,
                data: if is_remainder { remainder } else { quotient },
            }))
            .at(now),
        )
    }

    fn hold_cycles(&self, packet: &Packet) -> Option<u64> {
        match &packet.payload {
            Payload::DvuResult(result) => Some(divider_latency(result.eew)),
            _ => None,
        }
    }
}

/// Three-stage divide unit pipeline component.
pub struct VectorDvu {
    clock: TickClock,
    pipe: Pipeline,
    executed: Rc<Cell<u64>>,
    div_by_zero: Rc<Cell<u64>>,
}

impl std::fmt::Debug for VectorDvu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDvu")
            .field("name", &self.clock.name())
            .field("executed", &self.executed.get())
            .field("div_by_zero", &self.div_by_zero.get())
            .finish_non_exhaustive()
    }
}

impl VectorDvu {
    /// Creates the divide unit with the given clock period.
    pub fn new(name: impl Into<String>, period: u64, tracer: Tracer) -> Self {
        let name = name.into();
        let executed = Rc::new(Cell::new(0));
        let div_by_zero = Rc::new(Cell::new(0));
        let mut pipe = Pipeline::new(name.clone(), 3, 1, tracer);
        pipe.set_stage(0, Box::new(Passthrough::new(format!("{name}_decode"))));
        pipe.set_stage(
            1,
            Box::new(DvuExecuteStage {
                name: format!("{name}_execute"),
                executed: Rc::clone(&executed),
                div_by_zero: Rc::clone(&div_by_zero),
            }),
        );
        pipe.set_stage(2, Box::new(Passthrough::new(format!("{name}_writeback"))));
        Self {
            clock: TickClock::new(name, period),
            pipe,
            executed,
            div_by_zero,
        }
    }

    /// The underlying pipeline (ports, occupancy, counters).
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipe
    }

    /// Mutable pipeline access for port wiring.
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipe
    }

    /// Total operations executed.
    pub fn operations_executed(&self) -> u64 {
        self.executed.get()
    }

    /// Total elements that divided by zero.
    pub fn division_by_zero_count(&self) -> u64 {
        self.div_by_zero.get()
    }
}

impl Clocked for VectorDvu {
    fn clock(&self) -> &TickClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    fn tick(&mut self, sched: &mut EventScheduler) {
        self.pipe.advance(sched.current_time());
    }
}

/// Number of cycles a divide of `eew`-bit elements occupies the unit.
pub fn latency_for_width(eew: u32) -> u64 {
    divider_latency(eew)
}
