//! End-to-end instruction scenarios on the assembled backend.
//!
//! Each test issues a short instruction stream, runs the scheduler, and
//! checks architectural results, counters, and timing windows.

use pretty_assertions::assert_eq;
use vexsim_core::isa::opcodes as op;
use vexsim_core::rvv::backend::BackendConfig;
use vexsim_core::rvv::interface::ScalarVectorInterface;

use crate::common::{BackendFixture, grouped_request, request};

const V1: [u8; 8] = [10, 20, 30, 40, 50, 60, 70, 80];
const V2: [u8; 8] = [5, 6, 7, 8, 9, 10, 11, 12];

fn prefix(full: &[u8], n: usize) -> Vec<u8> {
    full[..n].to_vec()
}

#[test]
fn test_independent_alu_mix() {
    let mut fx = BackendFixture::with_defaults();
    fx.set_vreg(1, &V1);
    fx.set_vreg(2, &V2);

    fx.issue(request(0, op::VADD, 3, 1, 2, 8));
    fx.issue(request(1, op::VAND, 4, 1, 2, 8));
    fx.issue(request(2, op::VOR, 5, 1, 2, 8));
    fx.issue(request(3, op::VSUB, 6, 2, 1, 8));

    // Four read ports bound the dispatch to two micro-ops per cycle.
    fx.run_cycles(2);
    assert_eq!(fx.backend.borrow().dispatch_count(), 4);

    fx.run_to_idle(64);
    assert_eq!(
        prefix(&fx.vreg(3), 8),
        vec![15, 26, 37, 48, 59, 70, 81, 92]
    );
    let and: Vec<u8> = V1.iter().zip(&V2).map(|(&a, &b)| a & b).collect();
    let or: Vec<u8> = V1.iter().zip(&V2).map(|(&a, &b)| a | b).collect();
    assert_eq!(prefix(&fx.vreg(4), 8), and);
    assert_eq!(prefix(&fx.vreg(5), 8), or);
    assert_eq!(
        prefix(&fx.vreg(6), 8),
        vec![251, 242, 233, 224, 215, 206, 197, 188]
    );

    let mut backend = fx.backend.borrow_mut();
    assert_eq!(backend.execute_count(), 4);
    assert_eq!(backend.retire_count(), 4);
    assert!(backend.is_idle());

    // The scalar core observes one writeback record per retired micro-op.
    let writes = backend.retire_writes();
    assert_eq!(writes.len(), 4);
    assert!(writes.iter().all(|w| w.w_valid && !w.w_type));
    // Drained on read.
    assert!(backend.retire_writes().is_empty());
}

#[test]
fn test_raw_chain_serializes_and_forwards() {
    let mut fx = BackendFixture::with_defaults();
    fx.set_vreg(1, &V1);
    fx.set_vreg(2, &V2);

    fx.issue(request(0, op::VADD, 7, 1, 2, 8));
    fx.issue(request(1, op::VSUB, 8, 7, 1, 8));
    fx.issue(request(2, op::VAND, 9, 8, 2, 8));
    fx.issue(request(3, op::VOR, 10, 8, 1, 8));

    fx.run_to_idle(128);

    let sum: Vec<u8> = V1
        .iter()
        .zip(&V2)
        .map(|(&a, &b)| a.wrapping_add(b))
        .collect();
    assert_eq!(prefix(&fx.vreg(7), 8), sum);
    // v8 = v7 - v1 = v2; v9 = v2 AND v2 = v2; v10 = v2 OR v1.
    assert_eq!(prefix(&fx.vreg(8), 8), V2.to_vec());
    assert_eq!(prefix(&fx.vreg(9), 8), V2.to_vec());
    let or: Vec<u8> = V2.iter().zip(&V1).map(|(&a, &b)| a | b).collect();
    assert_eq!(prefix(&fx.vreg(10), 8), or);

    // The consumer had to wait for the producer at least once.
    let backend = fx.backend.borrow();
    assert!(backend.dispatch_stats().raw_hazard_stalls >= 1);
    assert_eq!(backend.retire_count(), 4);
}

#[test]
fn test_waw_window_last_writer_wins() {
    let mut fx = BackendFixture::new(BackendConfig {
        num_read_ports: 8,
        ..BackendConfig::default()
    });
    fx.set_vreg(1, &V1);
    fx.set_vreg(2, &V2);
    fx.set_vreg(3, &[1, 2, 3, 4, 5, 6, 7, 8]);
    fx.set_vreg(4, &[2, 3, 4, 5, 6, 7, 8, 9]);
    fx.set_vreg(5, &[15; 8]);
    fx.set_vreg(6, &[0x0F; 8]);

    fx.issue(request(0, op::VADD, 14, 1, 2, 8));
    fx.issue(request(1, op::VSUB, 14, 3, 4, 8));
    fx.issue(request(2, op::VOR, 14, 5, 6, 8));
    fx.issue(request(3, op::VAND, 15, 14, 1, 8));

    fx.run_to_idle(128);

    // The three v14 writers retire in one window; the youngest (VOR) wins
    // every byte.
    assert_eq!(prefix(&fx.vreg(14), 8), vec![0x0F; 8]);
    let expected_v15: Vec<u8> = V1.iter().map(|&a| a & 0x0F).collect();
    assert_eq!(prefix(&fx.vreg(15), 8), expected_v15);

    let backend = fx.backend.borrow();
    assert_eq!(backend.retire_stats().waw_collisions, 1);
    assert_eq!(backend.retire_count(), 4);
}

#[test]
fn test_multi_issue_throughput() {
    let mut fx = BackendFixture::new(BackendConfig {
        num_read_ports: 8,
        issue_width: 4,
        ..BackendConfig::default()
    });
    fx.set_vreg(1, &V1);
    fx.set_vreg(2, &V2);

    // Eight independent micro-ops sharing source registers.
    for i in 0..8u64 {
        fx.issue(request(i, op::VADD, 10 + i as u32, 1, 2, 8));
    }

    // Dispatch completes in exactly two cycles (4 + 4).
    fx.run_cycles(1);
    assert_eq!(fx.backend.borrow().dispatch_count(), 4);
    fx.run_cycles(1);
    assert_eq!(fx.backend.borrow().dispatch_count(), 8);

    // Execution finishes within dispatch + the arithmetic latency.
    fx.run_cycles(2);
    assert_eq!(fx.backend.borrow().execute_count(), 8);

    fx.run_to_idle(32);
    let sum: Vec<u8> = V1
        .iter()
        .zip(&V2)
        .map(|(&a, &b)| a.wrapping_add(b))
        .collect();
    for reg in 10..18 {
        assert_eq!(prefix(&fx.vreg(reg), 8), sum);
    }
}

#[test]
fn test_trap_truncates_retirement() {
    let mut fx = BackendFixture::with_defaults();
    fx.set_vreg(1, &V1);
    fx.set_vreg(2, &V2);

    fx.issue(request(0, op::VADD, 20, 1, 2, 8));
    fx.issue(request(1, op::VADD, 20, 1, 2, 8));
    fx.issue(request(2, op::VADD, 20, 1, 2, 8));

    // All three dispatch on the first cycle; attach a trap to the middle
    // entry before anything completes.
    fx.run_cycles(1);
    assert_eq!(fx.backend.borrow().dispatch_count(), 3);
    assert!(fx.backend.borrow_mut().inject_trap(1, 7));

    fx.run_to_idle(64);

    let backend = fx.backend.borrow();
    assert_eq!(backend.retire_stats().traps_handled, 1);
    let trap = backend.trap().expect("trap surfaced to the frontend");
    assert_eq!(trap.inst_id, 1);
    // The entries after the trap still drain on later cycles.
    assert_eq!(backend.retire_count(), 3);
}

#[test]
fn test_register_group_expansion_bounds() {
    let mut fx = BackendFixture::new(BackendConfig {
        num_read_ports: 16,
        issue_width: 8,
        ..BackendConfig::default()
    });
    fx.set_vreg(4, &V2);

    // Base 28 with a group of four: every mapping stays within v31.
    fx.issue(grouped_request(0, op::VADD, 28, 4, 4, 8, 2));
    fx.run_to_idle(64);
    assert_eq!(fx.backend.borrow().dispatch_count(), 4);

    // Base 30: the two groups walking past v31 are discarded.
    fx.issue(grouped_request(1, op::VADD, 30, 4, 4, 8, 2));
    fx.run_to_idle(64);

    let backend = fx.backend.borrow();
    assert_eq!(backend.dispatch_count(), 6);
    assert_eq!(backend.dispatch_stats().decoded, 6);
    assert_eq!(backend.retire_count(), 6);
}
