//! Synchronous JSON persistence used by the shutdown flush and realtime writes.
//!
//! Writes are blocking on purpose: the flush also runs right after a
//! termination signal, where every pending file must land before exit.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

/// Normalize a single map key to Unicode Normalization Form C.
pub fn normalize_key(key: &str) -> String {
    key.nfc().collect()
}

/// Normalize every object key of a JSON document to NFC, recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (normalize_key(&k), normalize_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Serialize `data` as 2-space pretty JSON with NFC keys, creating parent
/// directories as needed.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    let value = normalize_keys(serde_json::to_value(data)?);
    let content = serde_json::to_string_pretty(&value)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Best-effort variant: failures are logged and reported as `false`.
pub fn try_write_json_file<T: Serialize + ?Sized>(path: &Path, data: &T) -> bool {
    match write_json_file(path, data) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write {}: {}", path.display(), e);
            false
        }
    }
}

/// Read a JSON object file. A missing file yields `Ok(None)`.
pub fn read_json_object(path: &Path) -> Result<Option<Map<String, Value>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(Some(
            map.into_iter().map(|(k, v)| (normalize_key(&k), v)).collect(),
        )),
        _ => Ok(Some(Map::new())),
    }
}
