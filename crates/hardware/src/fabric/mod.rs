//! Port and connection fabric.
//!
//! Components expose typed data slots (ports); connections move packets
//! between ports each cycle, with optional propagation latency. This module
//! provides:
//! 1. **Packets:** The polymorphic data envelope ([`Packet`], [`Payload`]).
//! 2. **Ports:** Named single-slot or bounded-FIFO slots ([`Port`]).
//! 3. **Connections:** Source-to-destination packet movers ([`Connection`]).
//! 4. **Register-file wire:** A buffered `(rd, value)` writeback binder
//!    ([`RegFileWire`]).

/// Connection between source and destination ports.
pub mod connection;
/// Packet envelope and payload variants.
pub mod packet;
/// Named data slots on components.
pub mod port;
/// Buffered register-file writeback wire.
pub mod wire;

pub use connection::Connection;
pub use packet::{MemRequest, MemResponse, Packet, Payload};
pub use port::{Port, PortDirection, PortMap};
pub use wire::RegFileWire;
