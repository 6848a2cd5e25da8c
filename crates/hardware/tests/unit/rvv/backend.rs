//! Backend behaviors and boundaries.
//!
//! Capacity back-pressure, idle detection, in-order retirement, and the
//! no-lost-micro-op guarantee on trap-free runs.

use pretty_assertions::assert_eq;
use vexsim_core::isa::opcodes as op;
use vexsim_core::rvv::backend::BackendConfig;
use vexsim_core::rvv::interface::ScalarVectorInterface;

use crate::common::{BackendFixture, request};

#[test]
fn test_rob_capacity_backpressures_dispatch() {
    let mut fx = BackendFixture::new(BackendConfig {
        rob_depth: 2,
        num_read_ports: 16,
        issue_width: 8,
        ..BackendConfig::default()
    });
    for i in 0..6u64 {
        fx.issue(request(i, op::VADD, 10 + i as u32, 1, 2, 8));
    }

    fx.run_cycles(1);
    {
        let backend = fx.backend.borrow();
        // Two slots, so two allocations; the third stalled on a full ROB.
        assert_eq!(backend.dispatch_count(), 2);
        assert!(backend.rob().borrow().is_full());
        assert!(backend.dispatch_stats().rob_full_stalls >= 1);
    }

    // Back-pressure is recoverable: everything still drains.
    fx.run_to_idle(256);
    let backend = fx.backend.borrow();
    assert_eq!(backend.dispatch_count(), 6);
    assert_eq!(backend.retire_count(), 6);
}

#[test]
fn test_no_dispatched_uop_is_lost() {
    let mut fx = BackendFixture::with_defaults();
    let streams = [
        request(0, op::VADD, 3, 1, 2, 8),
        request(1, op::VMUL, 4, 3, 2, 8),
        request(2, op::VXOR, 5, 4, 1, 8),
        request(3, op::VSRL, 6, 5, 2, 8),
        request(4, op::VDIVU, 7, 1, 2, 8),
        request(5, op::VOR, 8, 7, 3, 8),
    ];
    for r in streams {
        fx.issue(r);
    }
    fx.run_to_idle(512);

    let backend = fx.backend.borrow();
    let stats = backend.dispatch_stats();
    // Every decoded micro-op was dispatched, executed, and retired.
    assert_eq!(stats.decoded, 6);
    assert_eq!(stats.dispatched, 6);
    assert_eq!(backend.execute_count(), 6);
    assert_eq!(backend.retire_count(), 6);
    assert!(backend.rob().borrow().is_empty());
}

#[test]
fn test_retirement_is_in_program_order() {
    let mut fx = BackendFixture::with_defaults();
    // A logical op (1-cycle) issued after an arithmetic op (2-cycle)
    // completes first but must not retire first.
    fx.issue(request(0, op::VADD, 3, 1, 2, 8));
    fx.issue(request(1, op::VAND, 4, 1, 2, 8));
    fx.run_to_idle(64);

    let retires: Vec<_> = fx
        .tracer
        .entries()
        .into_iter()
        .filter(|e| e.component == "rvv_backend" && e.event == "RETIRE")
        .collect();
    assert_eq!(retires.len(), 2);
    assert!(retires[0].details.contains("inst_id=0"));
    assert!(retires[1].details.contains("inst_id=1"));
    assert!(retires[0].timestamp <= retires[1].timestamp);
}

#[test]
fn test_idle_tracks_queue_flight_and_rob() {
    let mut fx = BackendFixture::with_defaults();
    assert!(fx.backend.borrow().is_idle());

    fx.issue(request(0, op::VADD, 3, 1, 2, 8));
    assert!(!fx.backend.borrow().is_idle());

    fx.run_cycles(1);
    // Dispatched but not retired.
    assert!(!fx.backend.borrow().is_idle());

    fx.run_to_idle(64);
    assert!(fx.backend.borrow().is_idle());
    assert_eq!(fx.backend.borrow().queue_capacity(), 16);
}

#[test]
fn test_division_latency_dominates_drain_time() {
    let mut fx = BackendFixture::with_defaults();
    fx.set_vreg(1, &[100, 30, 60, 90, 8, 9, 10, 11]);
    fx.set_vreg(2, &[10, 3, 0, 9, 2, 3, 5, 11]);
    fx.issue(request(0, op::VDIVU, 5, 1, 2, 8));

    // An 8-bit divide takes 17 cycles; nothing completes before that.
    fx.run_cycles(17);
    assert_eq!(fx.backend.borrow().execute_count(), 0);
    fx.run_cycles(1);
    {
        let backend = fx.backend.borrow();
        assert_eq!(backend.execute_count(), 1);
        // One element divided by zero.
        assert_eq!(backend.division_by_zero_count(), 1);
    }

    fx.run_to_idle(32);
    let v5 = fx.vreg(5);
    assert_eq!(&v5[..8], &[10, 10, 0xFF, 10, 4, 3, 2, 1]);
}

#[test]
fn test_queue_rejection_reported_to_caller() {
    let fx = BackendFixture::with_defaults();
    for i in 0..16u64 {
        fx.issue(request(i, op::VADD, 3, 1, 2, 8));
    }
    assert_eq!(fx.backend.borrow().queue_capacity(), 0);
    let rejected = request(99, op::VADD, 3, 1, 2, 8);
    assert!(!fx.backend.borrow_mut().issue_instruction(&rejected));
}
