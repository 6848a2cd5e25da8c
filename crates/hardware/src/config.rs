//! Configuration system for the simulator.
//!
//! This module defines the configuration structures used to parameterize a
//! run. It provides:
//! 1. **Defaults:** Baseline hardware constants.
//! 2. **Structures:** Hierarchical config for the scalar core shell, the
//!    vector backend, memory, the simulation driver, and the initial RVV
//!    state.
//!
//! Configuration is supplied as JSON inside a program file, or use
//! `Config::default()`.

use serde::Deserialize;

/// Default configuration constants.
mod defaults {
    /// Scalar issue lanes (frontend shell).
    pub const NUM_INSTRUCTION_LANES: usize = 4;

    /// Architectural register count.
    pub const NUM_REGISTERS: usize = 32;

    /// Vector register file read ports.
    pub const NUM_READ_PORTS: usize = 4;

    /// Vector register file write (retire) ports.
    pub const NUM_WRITE_PORTS: usize = 4;

    /// ALU clock period in cycles.
    pub const ALU_PERIOD: u64 = 1;

    /// Branch unit clock period in cycles.
    pub const BRU_PERIOD: u64 = 1;

    /// Branch unit count.
    pub const NUM_BRU_UNITS: usize = 4;

    /// Multiplier clock period in cycles.
    pub const MLU_PERIOD: u64 = 3;

    /// Divide unit clock period in cycles.
    pub const DVU_PERIOD: u64 = 8;

    /// Load/store unit clock period in cycles.
    pub const LSU_PERIOD: u64 = 2;

    /// Vector backend enabled.
    pub const ENABLE_RVV: bool = true;

    /// Micro-ops dispatched per cycle.
    pub const VECTOR_ISSUE_WIDTH: usize = 4;

    /// Vector register width in bits.
    pub const VLEN: u32 = 128;

    /// Data memory size in bytes.
    pub const MEMORY_SIZE: usize = 64 * 1024;

    /// Data memory access latency in cycles.
    pub const MEMORY_LATENCY: u64 = 4;

    /// Simulation cycle budget.
    pub const MAX_CYCLES: u64 = 10_000;

    /// Initial vector length in elements.
    pub const RVV_VL: u32 = 8;
}

/// Scalar frontend shell configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Scalar issue lanes.
    pub num_instruction_lanes: usize,
    /// Architectural register count.
    pub num_registers: usize,
    /// Vector register file read ports.
    pub num_read_ports: usize,
    /// Vector register file write ports.
    pub num_write_ports: usize,
    /// ALU clock period in cycles.
    pub alu_period: u64,
    /// Branch unit clock period in cycles.
    pub bru_period: u64,
    /// Branch unit count.
    pub num_bru_units: usize,
    /// Multiplier clock period in cycles.
    pub mlu_period: u64,
    /// Divide unit clock period in cycles.
    pub dvu_period: u64,
    /// Load/store unit clock period in cycles.
    pub lsu_period: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            num_instruction_lanes: defaults::NUM_INSTRUCTION_LANES,
            num_registers: defaults::NUM_REGISTERS,
            num_read_ports: defaults::NUM_READ_PORTS,
            num_write_ports: defaults::NUM_WRITE_PORTS,
            alu_period: defaults::ALU_PERIOD,
            bru_period: defaults::BRU_PERIOD,
            num_bru_units: defaults::NUM_BRU_UNITS,
            mlu_period: defaults::MLU_PERIOD,
            dvu_period: defaults::DVU_PERIOD,
            lsu_period: defaults::LSU_PERIOD,
        }
    }
}

/// Vector backend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Vector backend enabled.
    pub enable_rvv: bool,
    /// Micro-ops dispatched per cycle.
    pub vector_issue_width: usize,
    /// Vector register width in bits.
    pub vlen: u32,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enable_rvv: defaults::ENABLE_RVV,
            vector_issue_width: defaults::VECTOR_ISSUE_WIDTH,
            vlen: defaults::VLEN,
        }
    }
}

/// Data memory configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Memory size in bytes.
    pub size: usize,
    /// Access latency in cycles.
    pub latency: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size: defaults::MEMORY_SIZE,
            latency: defaults::MEMORY_LATENCY,
        }
    }
}

/// Simulation driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Cycle budget for the run.
    pub max_cycles: u64,
    /// Record the simulation trace log.
    pub enable_tracing: bool,
    /// Verbose diagnostic logging.
    pub verbose: bool,
    /// Trace output path, when tracing is enabled.
    pub trace_output: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_cycles: defaults::MAX_CYCLES,
            enable_tracing: false,
            verbose: false,
            trace_output: None,
        }
    }
}

/// Initial RVV configuration state, applied before the first `vset*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RvvConfig {
    /// Vector length in elements.
    pub vl: u32,
    /// Selected element width encoding.
    pub sew: u8,
    /// LMUL encoding.
    pub lmul: u8,
}

impl Default for RvvConfig {
    fn default() -> Self {
        Self {
            vl: defaults::RVV_VL,
            sew: 0,
            lmul: 0,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scalar frontend shell.
    pub core_config: CoreConfig,
    /// Vector backend.
    pub vector_config: VectorConfig,
    /// Data memory.
    pub memory_config: MemoryConfig,
    /// Simulation driver.
    pub simulation_config: SimulationConfig,
    /// Initial RVV state.
    pub rvv_config: RvvConfig,
}
