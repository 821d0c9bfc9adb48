//! JSON output of chi^2 reports and balance series.
//!
//! Reports are written with keys sorted at every level and a trailing newline, so two runs
//! over the same input produce identical files. Non-finite numbers become `null`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ::serde::{de::DeserializeOwned, Serialize};
use log::debug;
use mjfit_core::errors::{ErrorInfo, MjfitError};
use serde_json::Value;

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = std::mem::take(map).into_iter().collect();
            for (key, mut entry) in sorted {
                sort_keys(&mut entry);
                map.insert(key, entry);
            }
        }
        Value::Array(values) => values.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

/// Serializes a report into pretty-printed JSON with sorted keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, MjfitError> {
    let mut value = serde_json::to_value(value).map_err(|err| {
        MjfitError::Serde(ErrorInfo::new("json-encode", err.to_string()))
    })?;
    sort_keys(&mut value);
    let mut bytes = serde_json::to_vec_pretty(&value)
        .map_err(|err| MjfitError::Serde(ErrorInfo::new("json-write", err.to_string())))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes a report as canonical JSON, creating missing parent directories.
pub fn write_canonical_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MjfitError> {
    let bytes = to_canonical_json_bytes(value)?;
    let write_error = |err: std::io::Error| {
        MjfitError::Input(
            ErrorInfo::new("write-failed", err.to_string()).with_context("path", path.display()),
        )
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, &bytes).map_err(write_error)?;
    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Restores a report from JSON bytes; parse errors carry the line and column.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, MjfitError> {
    serde_json::from_slice(data).map_err(|err| {
        MjfitError::Serde(
            ErrorInfo::new("json-read", err.to_string())
                .with_context("line", err.line())
                .with_context("column", err.column()),
        )
    })
}
