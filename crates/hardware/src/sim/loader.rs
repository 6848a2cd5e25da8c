//! Program loader.
//!
//! Reads a JSON program description into a [`Program`]:
//! 1. **Configuration:** The `core_config` / `vector_config` /
//!    `memory_config` / `simulation_config` / `rvv_config` sections, all
//!    optional with defaults.
//! 2. **Instructions:** `{address, binary}` entries; `binary` accepts a
//!    `"0xNNN"` hex string or a decimal number, and entries carrying only
//!    `"type": "comment"` are skipped.
//! 3. **Data memory:** `{address, values[]}` blocks written sequentially.
//!
//! Loading is the only fatal failure path of the simulator.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::error::SimError;
use crate::config::Config;
use crate::sim::memory::MemoryImage;

/// `binary` field: hex string or plain number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BinaryField {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
struct InstructionEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    address: Option<u64>,
    binary: Option<BinaryField>,
}

#[derive(Debug, Clone, Deserialize)]
struct DataBlock {
    address: u64,
    #[serde(default)]
    values: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProgramFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    config: Config,
    #[serde(default)]
    data_memory: Vec<DataBlock>,
    #[serde(default)]
    instructions: Vec<InstructionEntry>,
}

/// A loaded program: configuration, instruction stream, and data image.
#[derive(Debug, Clone)]
pub struct Program {
    /// Program name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Effective configuration.
    pub config: Config,
    /// `(address, encoding)` pairs in address order.
    pub instructions: Vec<(u64, u32)>,
    /// Initial data memory content.
    pub data: MemoryImage,
}

fn parse_binary(field: &BinaryField) -> Result<u32, SimError> {
    match field {
        BinaryField::Number(value) => Ok(*value as u32),
        BinaryField::Text(text) => {
            let trimmed = text.trim();
            let parsed = if let Some(hex) = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
            {
                u32::from_str_radix(hex, 16)
            } else {
                trimmed.parse::<u32>()
            };
            parsed
                .map_err(|_| SimError::InvalidProgram(format!("unparseable binary value '{text}'")))
        }
    }
}

fn resolve_instructions(entries: &[InstructionEntry]) -> Result<Vec<(u64, u32)>, SimError> {
    let mut resolved = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        // Comment entries are annotations, not instructions.
        if entry.kind.as_deref() == Some("comment") {
            continue;
        }
        let Some(binary) = &entry.binary else {
            return Err(SimError::InvalidProgram(format!(
                "instruction entry {i} has no binary field"
            )));
        };
        let word = parse_binary(binary)?;
        let address = entry.address.unwrap_or((resolved.len() as u64) * 4);
        resolved.push((address, word));
    }
    resolved.sort_by_key(|&(address, _)| address);
    Ok(resolved)
}

fn assemble(file: ProgramFile) -> Result<Program, SimError> {
    let instructions = resolve_instructions(&file.instructions)?;
    let mut data = MemoryImage::new();
    for block in &file.data_memory {
        data.write_block(block.address, &block.values);
    }
    Ok(Program {
        name: file.name.unwrap_or_default(),
        description: file.description.unwrap_or_default(),
        config: file.config,
        instructions,
        data,
    })
}

/// Parses a program from JSON text (configuration errors are fatal).
pub fn parse_program(json: &str) -> Result<Program, SimError> {
    let file: ProgramFile = serde_json::from_str(json)
        .map_err(|e| SimError::InvalidProgram(e.to_string()))?;
    assemble(file)
}

/// Loads a program from `path`. Fatal on I/O, JSON, or field errors.
pub fn load_program(path: impl AsRef<Path>) -> Result<Program, SimError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| SimError::ProgramRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ProgramFile = serde_json::from_str(&json).map_err(|source| SimError::ProgramParse {
        path: path.to_path_buf(),
        source,
    })?;
    let program = assemble(file)?;
    tracing::debug!(
        path = %path.display(),
        name = %program.name,
        instructions = program.instructions.len(),
        data_words = program.data.len(),
        "program loaded"
    );
    Ok(program)
}
