//! Stripmining decoder.
//!
//! Expands a vector instruction into micro-ops, one per register group:
//! 1. **LMUL=1:** A single micro-op with identity register mapping.
//! 2. **LMUL>1:** One micro-op per group; each group's registers are the
//!    instruction's registers advanced by the group index. A group whose
//!    mapping walks past v31 is discarded without error; the other groups
//!    still emit.
//!
//! All micro-ops of one instruction share its `inst_id`, `sew`, `lmul`,
//! `vl`, and `vm`; every micro-op carries a globally unique, monotonically
//! increasing `uop_id`.

use crate::common::constants::NUM_VECTOR_REGISTERS;
use crate::rvv::interface::InstructionRequest;

/// A micro-operation: the unit of ROB allocation and retirement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MicroOp {
    /// Program counter of the parent instruction.
    pub pc: u64,
    /// Opcode, inherited from the parent instruction.
    pub opcode: u32,
    /// Parent instruction id.
    pub inst_id: u64,
    /// Globally unique micro-op id.
    pub uop_id: u64,
    /// Position of this micro-op in the instruction's expansion.
    pub uop_index: u32,
    /// Total micro-ops the expansion would produce (the LMUL multiplier).
    pub uop_count: u32,
    /// Physical destination register.
    pub vd: u32,
    /// Physical source register 1.
    pub vs1: u32,
    /// Physical source register 2.
    pub vs2: u32,
    /// Mask enable (non-zero reads v0).
    pub vm: u32,
    /// Selected element width encoding.
    pub sew: u8,
    /// LMUL encoding.
    pub lmul: u8,
    /// Vector length in elements.
    pub vl: u32,
    /// Start element index.
    pub vstart: u32,
    /// ROB index, stamped at dispatch.
    pub rob_index: Option<usize>,
}

impl MicroOp {
    /// True if the micro-op executes under the v0 mask.
    pub fn is_masked(&self) -> bool {
        self.vm != 0
    }
}

/// The LMUL multiplier for an LMUL encoding (0..3 map to 1/2/4/8; anything
/// else falls back to 1).
pub fn lmul_value(lmul: u8) -> u32 {
    if lmul > 3 { 1 } else { 1 << lmul }
}

/// True if the encoding expands to more than one micro-op.
pub fn requires_stripmining(lmul: u8) -> bool {
    lmul > 0 && lmul <= 3
}

/// Stateless expansion logic with a running micro-op id counter.
#[derive(Debug, Default)]
pub struct Decoder {
    next_uop_id: u64,
}

impl Decoder {
    /// Creates a decoder with the id counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Micro-op ids handed out so far.
    pub fn uop_ids_issued(&self) -> u64 {
        self.next_uop_id
    }

    /// Expands `request` into its ordered micro-op sequence.
    pub fn decode(&mut self, request: &InstructionRequest) -> Vec<MicroOp> {
        let lmul = lmul_value(request.lmul);
        if lmul == 1 {
            return vec![self.emit(request, 0, 1, request.vd_idx, request.vs1_idx, request.vs2_idx)];
        }

        let mut uops = Vec::with_capacity(lmul as usize);
        for group in 0..lmul {
            let vd = request.vd_idx + group;
            let vs1 = request.vs1_idx + group;
            let vs2 = request.vs2_idx + group;
            if vd >= NUM_VECTOR_REGISTERS
                || vs1 >= NUM_VECTOR_REGISTERS
                || vs2 >= NUM_VECTOR_REGISTERS
            {
                // Mapping walked past v31: drop this group, keep the rest.
                continue;
            }
            uops.push(self.emit(request, group, lmul, vd, vs1, vs2));
        }
        uops
    }

    fn emit(
        &mut self,
        request: &InstructionRequest,
        group: u32,
        count: u32,
        vd: u32,
        vs1: u32,
        vs2: u32,
    ) -> MicroOp {
        let uop_id = self.next_uop_id;
        self.next_uop_id += 1;
        MicroOp {
            pc: request.pc,
            opcode: request.opcode,
            inst_id: request.inst_id,
            uop_id,
            uop_index: group,
            uop_count: count,
            vd,
            vs1,
            vs2,
            vm: request.vm,
            sew: request.sew,
            lmul: request.lmul,
            vl: request.vl,
            vstart: 0,
            rob_index: None,
        }
    }
}
