//! Execute-latency table checks.
//!
//! The category table and the width-dependent divider table, exercised
//! through the same path the execute station uses.

use rstest::rstest;
use vexsim_core::isa::opcodes as op;
use vexsim_core::rvv::decoder::MicroOp;
use vexsim_core::rvv::exec::uop_latency;

fn uop(opcode: u32, sew: u8) -> MicroOp {
    MicroOp {
        opcode,
        sew,
        vl: 8,
        rob_index: Some(0),
        ..MicroOp::default()
    }
}

#[rstest]
#[case::vadd(op::VADD, 2)]
#[case::vsub(op::VSUB, 2)]
#[case::vmul(op::VMUL, 2)]
#[case::vand(op::VAND, 1)]
#[case::vor(op::VOR, 1)]
#[case::vxor(op::VXOR, 1)]
#[case::vsll(op::VSLL, 2)]
#[case::vsrl(op::VSRL, 2)]
#[case::vsra(op::VSRA, 2)]
fn test_category_latency(#[case] opcode: u32, #[case] expected: u64) {
    assert_eq!(uop_latency(&uop(opcode, 0)), expected);
}

#[rstest]
#[case::eew8(0, 17)]
#[case::eew16(1, 33)]
#[case::eew32(2, 65)]
#[case::eew64(3, 129)]
fn test_divider_latency_by_sew(#[case] sew: u8, #[case] expected: u64) {
    assert_eq!(uop_latency(&uop(op::VDIV, sew)), expected);
    assert_eq!(uop_latency(&uop(op::VREMU, sew)), expected);
}

#[rstest]
#[case::compare((0x1B << 26) | 0x57, 1)]
#[case::logical((0x0A << 26) | 0x57, 1)]
#[case::arith(0x57, 2)]
#[case::shift((0x05 << 26) | 0x77, 2)]
fn test_full_encoding_latency(#[case] opcode: u32, #[case] expected: u64) {
    assert_eq!(uop_latency(&uop(opcode, 0)), expected);
}
