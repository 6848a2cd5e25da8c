//! User-visible error taxonomy.
//!
//! Only program loading can fail fatally. Everything that happens inside the
//! backend during a run (queue-full rejections, hazard stalls, discarded
//! register groups, traps) is a recoverable value on its normal interface,
//! never an error that propagates through the scheduler.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the embedding application.
#[derive(Debug, Error)]
pub enum SimError {
    /// The program file could not be read from disk.
    #[error("could not read program file '{path}': {source}")]
    ProgramRead {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The program file is not valid JSON.
    #[error("could not parse program file '{path}': {source}")]
    ProgramParse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A field inside an otherwise well-formed program file is unusable.
    #[error("invalid program field: {0}")]
    InvalidProgram(String),

    /// The trace log could not be written.
    #[error("could not write trace output: {0}")]
    TraceWrite(#[from] io::Error),
}
