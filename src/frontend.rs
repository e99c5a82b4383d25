//! Inputs the core consumes directly: trace CSV files, signal map files,
//! and saved programs.
//!
//! The concrete-syntax parsers for the two surface languages are external
//! collaborators; they hand the core a [`Program`] either in memory or as
//! the saved-program serialization read by [`load_program`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::context::Program;
use crate::error::{CompileError, CompileResult};
use crate::log;

const MODULE: &str = "FRNT";

/// A mapping from signal names to signal ids.
pub type SignalMapping = HashMap<String, u32>;

/// Read a trace CSV, returning its length in time steps and, when the
/// file carries a `#`-header, the signal mapping derived from column
/// order. Duplicate header names warn and keep the rightmost column.
pub fn process_trace_file(
    path: &Path,
    map_file_provided: bool,
) -> CompileResult<(i64, Option<SignalMapping>)> {
    let content = fs::read_to_string(path)
        .map_err(|err| CompileError::file_io(format!("{}: {}", path.display(), err)))?;
    let lines: Vec<&str> = content.lines().collect();

    if lines.is_empty() {
        return Ok((-1, None));
    }

    if let Some(header) = lines[0].strip_prefix('#') {
        if map_file_provided {
            log::warning(
                MODULE,
                "Map file given and header included in trace file; header will be ignored",
            );
        }
        let mut mapping: SignalMapping = HashMap::new();
        for (index, name) in header.split(',').map(str::trim).enumerate() {
            if mapping.contains_key(name) {
                log::warning(
                    MODULE,
                    format!(
                        "Signal ID '{}' found multiple times in csv, using right-most value",
                        name
                    ),
                );
            }
            mapping.insert(name.to_string(), index as u32);
        }
        return Ok(((lines.len() - 1) as i64, Some(mapping)));
    }

    Ok((lines.len() as i64, None))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Read a `NAME:INT`-per-line signal map file. Duplicate names warn and
/// keep the latest value; a malformed line fails the whole file.
pub fn process_map_file(path: &Path) -> CompileResult<SignalMapping> {
    let content = fs::read_to_string(path)
        .map_err(|err| CompileError::file_io(format!("{}: {}", path.display(), err)))?;

    let mut mapping: SignalMapping = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = line.split_once(':').and_then(|(name, id)| {
            let name = name.trim();
            let id = id.trim();
            if is_identifier(name) {
                id.parse::<u32>().ok().map(|id| (name.to_string(), id))
            } else {
                None
            }
        });
        match parsed {
            Some((name, id)) => {
                if mapping.contains_key(&name) {
                    log::warning(
                        MODULE,
                        format!(
                            "Signal ID '{}' found multiple times in map file, using latest value (line {})",
                            name,
                            lineno + 1
                        ),
                    );
                }
                mapping.insert(name, id);
            }
            None => {
                return Err(CompileError::invalid_input(format!(
                    "invalid format for map line (found '{}')\n\tShould be of the form SYMBOL ':' NUMERAL",
                    line
                )));
            }
        }
    }

    Ok(mapping)
}

/// Load a saved program, bypassing the external parser.
pub fn load_program(path: &Path) -> CompileResult<Program> {
    let content = fs::read_to_string(path)
        .map_err(|err| CompileError::file_io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content)
        .map_err(|err| CompileError::parse(format!("bad saved program: {}", err)))
}
