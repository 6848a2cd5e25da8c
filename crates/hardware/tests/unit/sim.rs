//! Loader and simulator driver integration tests.
//!
//! Program files from disk, the feeder's issue loop, and end-to-end runs
//! with statistics.

use std::io::Write as _;

use pretty_assertions::assert_eq;
use vexsim_core::sim::{Simulator, load_program, parse_program};
use vexsim_core::trace::Tracer;

/// vadd.vv-style encoding: funct6 | vm=0 | vs2 | vs1 | funct3=0 | vd | 0x57.
fn encode(funct6: u32, vd: u32, vs1: u32, vs2: u32) -> u32 {
    (funct6 << 26) | (vs2 << 20) | (vs1 << 15) | (vd << 7) | 0x57
}

fn program_json() -> String {
    let vadd = encode(0x00, 3, 1, 2);
    let vor = encode(0x0A, 5, 1, 2);
    format!(
        r#"{{
            "name": "add-or",
            "description": "two independent vector ops",
            "vector_config": {{ "vlen": 128, "vector_issue_width": 4 }},
            "simulation_config": {{ "max_cycles": 200 }},
            "rvv_config": {{ "vl": 8, "sew": 0, "lmul": 0 }},
            "data_memory": [ {{ "address": 0, "values": [17, 34] }} ],
            "instructions": [
                {{ "type": "comment" }},
                {{ "address": 0, "binary": "{vadd:#x}" }},
                {{ "address": 4, "binary": {vor} }}
            ]
        }}"#
    )
}

#[test]
fn test_load_program_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(program_json().as_bytes()).expect("write");
    let program = load_program(file.path()).expect("program loads");
    assert_eq!(program.name, "add-or");
    assert_eq!(program.instructions.len(), 2);
    assert_eq!(program.config.simulation_config.max_cycles, 200);
    assert_eq!(program.data.read_word(4), 34);
}

#[test]
fn test_missing_file_is_fatal() {
    let err = load_program("/nonexistent/program.json");
    assert!(err.is_err());
    let message = format!("{}", err.expect_err("error"));
    assert!(message.contains("could not read program file"));
}

#[test]
fn test_end_to_end_run() {
    let program = parse_program(&program_json()).expect("valid program");
    let mut sim = Simulator::new(program, Tracer::disabled());

    // Architectural inputs: set v1 and v2 before the run.
    let v1: Vec<u8> = (1..=16).collect();
    let mut v2 = vec![0u8; 16];
    v2[..8].copy_from_slice(&[2; 8]);
    {
        let backend = sim.backend();
        let vrf = backend.borrow().vrf();
        assert!(vrf.borrow_mut().write(1, &v1, &[]));
        assert!(vrf.borrow_mut().write(2, &v2, &[]));
    }

    let stats = sim.run();
    assert!(sim.is_done());
    assert_eq!(stats.instructions_issued, 2);
    assert_eq!(stats.uops_dispatched, 2);
    assert_eq!(stats.uops_retired, 2);
    assert!(stats.cycles < 200);

    let backend = sim.backend();
    let vrf = backend.borrow().vrf();
    let v3 = vrf.borrow().read(3);
    let v5 = vrf.borrow().read(5);
    for i in 0..8 {
        assert_eq!(v3[i], v1[i] + 2);
        assert_eq!(v5[i], v1[i] | 2);
    }
}

#[test]
fn test_run_respects_cycle_budget() {
    let program = parse_program(
        r#"{
            "simulation_config": { "max_cycles": 3 },
            "instructions": [ { "address": 0, "binary": "0x020A01D7" } ]
        }"#,
    )
    .expect("valid program");
    let mut sim = Simulator::new(program, Tracer::disabled());
    let stats = sim.run();
    assert!(stats.cycles <= 3 + 1);
}

#[test]
fn test_trace_log_records_run() {
    let program = parse_program(&program_json()).expect("valid program");
    let tracer = Tracer::enabled();
    let mut sim = Simulator::new(program, tracer.clone());
    let _ = sim.run();

    let entries = tracer.entries();
    assert!(entries.iter().any(|e| e.event == "DISPATCH"));
    assert!(entries.iter().any(|e| e.event == "RETIRE"));
    assert!(entries.iter().any(|e| e.event == "propagate"));

    let mut out = Vec::new();
    tracer.write_to(&mut out).expect("render");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.lines().next().is_some_and(|l| l.starts_with('[')));
}
