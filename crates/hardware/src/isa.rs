//! Vector opcode tables and instruction fields.
//!
//! This module defines what the backend inspects of the instruction stream:
//! 1. **Internal opcodes:** Compact codes used on the issue interface.
//! 2. **Categories:** Operation classes driving functional-unit selection
//!    and execute latency.
//! 3. **Field extraction:** The register/funct fields of full 32-bit vector
//!    encodings.

/// Compact internal opcodes used on the scalar-to-vector issue interface.
pub mod opcodes {
    /// Vector add.
    pub const VADD: u32 = 0x1;
    /// Vector subtract.
    pub const VSUB: u32 = 0x5;
    /// Vector multiply.
    pub const VMUL: u32 = 0x9;
    /// Vector bitwise and.
    pub const VAND: u32 = 0x13;
    /// Vector bitwise or.
    pub const VOR: u32 = 0x15;
    /// Vector bitwise xor.
    pub const VXOR: u32 = 0x17;
    /// Vector shift left logical.
    pub const VSLL: u32 = 0x21;
    /// Vector shift right logical.
    pub const VSRL: u32 = 0x25;
    /// Vector shift right arithmetic.
    pub const VSRA: u32 = 0x27;
    /// Vector unsigned divide.
    pub const VDIVU: u32 = 0x41;
    /// Vector signed divide.
    pub const VDIV: u32 = 0x45;
    /// Vector unsigned remainder.
    pub const VREMU: u32 = 0x49;
    /// Vector signed remainder.
    pub const VREM: u32 = 0x4D;
}

/// Operation category, used for functional-unit routing and latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// VADD, VSUB, VMUL, VMADD.
    Arithmetic,
    /// VSLL, VSRL, VSRA.
    Shift,
    /// VAND, VOR, VXOR.
    Logical,
    /// VMAND, VMOR, VMSBF and friends.
    Mask,
    /// VCPOP, VIOTA.
    Bitmanip,
    /// VMSEQ, VMSNE, VMSLT.
    Compare,
    /// Vector loads/stores (delegated to an LSU).
    Memory,
    /// VFADD, VFMUL, VFDIV.
    Float,
    /// Unrecognized encoding.
    Unknown,
}

impl Category {
    /// Execute latency in cycles for this category.
    pub fn latency(self) -> u64 {
        match self {
            Self::Logical | Self::Compare => 1,
            Self::Arithmetic | Self::Shift | Self::Mask | Self::Bitmanip => 2,
            Self::Memory => 4,
            Self::Float => 5,
            Self::Unknown => 1,
        }
    }
}

/// Maps an opcode to its category. Internal opcodes are matched first; full
/// 32-bit encodings with a vector base opcode are classified by `funct6`.
pub fn category_of(opcode: u32) -> Category {
    use opcodes as op;
    match opcode {
        op::VADD | op::VSUB | op::VMUL => return Category::Arithmetic,
        op::VAND | op::VOR | op::VXOR => return Category::Logical,
        op::VSLL | op::VSRL | op::VSRA => return Category::Shift,
        op::VDIVU | op::VDIV | op::VREMU | op::VREM => return Category::Arithmetic,
        _ => {}
    }

    let base = opcode & 0x7F;
    if matches!(base, 0x57 | 0x77 | 0x37 | 0x27) {
        return match funct6(opcode) {
            0x00 | 0x02 | 0x09 => Category::Arithmetic,
            0x0A | 0x0B => Category::Logical,
            0x04..=0x06 => Category::Shift,
            0x18..=0x1F => Category::Compare,
            _ => Category::Unknown,
        };
    }
    Category::Unknown
}

/// Execute latency in cycles for an opcode.
pub fn latency_of(opcode: u32) -> u64 {
    category_of(opcode).latency()
}

/// True if the opcode routes to the divide/remainder unit.
pub fn is_divide(opcode: u32) -> bool {
    matches!(
        opcode,
        opcodes::VDIVU | opcodes::VDIV | opcodes::VREMU | opcodes::VREM
    )
}

/// Divider latency in cycles for the given element width in bits.
pub fn divider_latency(eew: u32) -> u64 {
    match eew {
        8 => 17,
        16 => 33,
        64 => 129,
        // 32-bit and anything unrecognized
        32 => 65,
        _ => 17,
    }
}

/// `funct6` field of a full 32-bit vector encoding.
pub fn funct6(inst: u32) -> u32 {
    (inst >> 26) & 0x3F
}

/// Destination register field (`vd`).
pub fn vd(inst: u32) -> u32 {
    (inst >> 7) & 0x1F
}

/// First source register field (`vs1`).
pub fn vs1(inst: u32) -> u32 {
    (inst >> 15) & 0x1F
}

/// Second source register field (`vs2`).
pub fn vs2(inst: u32) -> u32 {
    (inst >> 20) & 0x1F
}

/// Mask bit (`vm`) of a full encoding.
pub fn vm(inst: u32) -> u32 {
    (inst >> 25) & 0x1
}
