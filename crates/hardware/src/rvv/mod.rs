//! RVV out-of-order backend.
//!
//! The vector execution engine and its parts:
//! 1. **Interface:** The scalar-to-vector contract ([`interface`]).
//! 2. **Decode:** Stripmining expansion into micro-ops ([`decoder`]).
//! 3. **Dispatch:** Hazard checks, ROB allocation, forwarding
//!    ([`dispatch`]).
//! 4. **Execution:** Functional ALU/DVU models with category latency
//!    ([`valu`], [`dvu`], [`exec`]).
//! 5. **Commit:** Reorder buffer, WAW-resolving retire stage, and the
//!    vector register file ([`rob`], [`retire`], [`regfile`]).
//! 6. **Backend:** The assembled pipeline ([`backend`]).

/// The assembled backend pipeline.
pub mod backend;
/// Stripmining decoder.
pub mod decoder;
/// Dispatch stage and forwarding buffer.
pub mod dispatch;
/// Divide/remainder unit.
pub mod dvu;
/// Functional execute station.
pub mod exec;
/// Scalar-to-vector interface contract.
pub mod interface;
/// Vector register file.
pub mod regfile;
/// Retire stage with WAW resolution.
pub mod retire;
/// Reorder buffer.
pub mod rob;
/// Vector ALU.
pub mod valu;

pub use backend::{BackendConfig, VectorBackend};
pub use decoder::{Decoder, MicroOp};
pub use dispatch::{BackendPacket, DispatchUnit, ForwardingBuffer};
pub use interface::{InstructionRequest, RetireWrite, ScalarVectorInterface, VectorConfigState};
pub use regfile::VectorRegFile;
pub use retire::{RetireUnit, WriteRequest};
pub use rob::{DestFile, ReorderBuffer, RobEntry};
