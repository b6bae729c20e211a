//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

pub mod describe;
pub mod train;

/// Writes `value` as pretty JSON, creating parent directories.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Converts the configured delimiter to the single byte the CSV reader takes.
fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("Delimiter must be a single ASCII character, got {delimiter:?}"))
}
