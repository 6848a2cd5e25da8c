//! Packet envelope and payload variants.
//!
//! A [`Packet`] is the unit of data carried through ports and connections:
//! a timestamp, a validity flag, and a tagged payload. Consumption sites
//! pattern-match on [`Payload`]; there is no downcasting. `Clone` is a deep
//! clone: owned byte vectors are duplicated, so mutating a clone never
//! affects the original.

use crate::rvv::decoder::MicroOp;
use crate::rvv::dispatch::BackendPacket;
use crate::rvv::dvu::{DvuRequest, DvuResult};
use crate::rvv::interface::InstructionRequest;
use crate::rvv::valu::{AluRequest, AluResult};

/// A memory read or write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemRequest {
    /// Target byte address.
    pub addr: u64,
    /// Bytes to store; `None` for a read.
    pub data: Option<Vec<u8>>,
    /// Access size in bytes.
    pub size: u32,
}

/// A memory read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemResponse {
    /// Address the data was read from.
    pub addr: u64,
    /// Returned bytes.
    pub data: Vec<u8>,
}

/// Payload carried by a [`Packet`]. One variant per data kind the fabric
/// moves.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An integer word (control values, addresses, counters).
    Word(u64),
    /// A boolean flag (mask bits, stall signals).
    Flag(bool),
    /// Operands bound for the vector ALU.
    AluRequest(AluRequest),
    /// Result produced by the vector ALU.
    AluResult(AluResult),
    /// Operands bound for the divide unit.
    DvuRequest(DvuRequest),
    /// Result produced by the divide unit.
    DvuResult(DvuResult),
    /// A memory request.
    MemRequest(MemRequest),
    /// A memory response.
    MemResponse(MemResponse),
    /// A vector instruction as issued by the scalar frontend.
    Instruction(InstructionRequest),
    /// A decoded micro-op.
    MicroOp(MicroOp),
    /// A micro-op flowing through the backend pipeline.
    Backend(BackendPacket),
}

/// Data envelope carried through ports and connections.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Simulated time of creation or last delivery.
    pub timestamp: u64,
    /// Validity flag; invalid packets are ignored by connections.
    pub valid: bool,
    /// The carried data.
    pub payload: Payload,
}

impl Packet {
    /// Creates a valid packet with timestamp zero.
    pub fn new(payload: Payload) -> Self {
        Self {
            timestamp: 0,
            valid: true,
            payload,
        }
    }

    /// Creates a valid integer-word packet.
    pub fn word(value: u64) -> Self {
        Self::new(Payload::Word(value))
    }

    /// Creates a valid flag packet.
    pub fn flag(value: bool) -> Self {
        Self::new(Payload::Flag(value))
    }

    /// Sets the timestamp and returns the packet (builder style).
    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The word value, if this packet carries one.
    pub fn as_word(&self) -> Option<u64> {
        match self.payload {
            Payload::Word(v) => Some(v),
            _ => None,
        }
    }
}
