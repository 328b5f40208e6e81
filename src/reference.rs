//! Reference (source-language) table loading.
//!
//! The reference file is snapshotted into a temporary directory first, so
//! the parsed table and the whole-file fingerprint always come from the
//! same bytes even if the file is edited mid-run.

use std::path::Path;

use jsonc_parser::ParseOptions;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AltError, Result};
use crate::hash::calculate_hash;
use crate::persist::normalize_key;

/// Source-language key/value table in document order.
pub type ReferenceTable = Map<String, Value>;

pub const SUPPORTED_REFERENCE_FILE_EXTENSIONS: &[&str] = &["json", "jsonc"];

/// Parses reference file content into a JSON document.
pub trait ReferenceLoader {
    fn parse(&self, content: &str) -> Result<Value>;
}

/// Plain JSON documents.
pub struct JsonReferenceLoader;

impl ReferenceLoader for JsonReferenceLoader {
    fn parse(&self, content: &str) -> Result<Value> {
        Ok(serde_json::from_str(content)?)
    }
}

/// JSON with comments and trailing commas.
pub struct JsoncReferenceLoader;

impl ReferenceLoader for JsoncReferenceLoader {
    fn parse(&self, content: &str) -> Result<Value> {
        jsonc_parser::parse_to_serde_value(content, &ParseOptions::default())
            .map_err(|e| AltError::Reference(format!("Failed to parse JSONC: {}", e)))?
            .ok_or_else(|| AltError::Reference("Reference file is empty".to_string()))
    }
}

/// Pick a loader from the file extension.
pub fn loader_for(path: &Path) -> Result<Box<dyn ReferenceLoader>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" => Ok(Box::new(JsonReferenceLoader)),
        "jsonc" => Ok(Box::new(JsoncReferenceLoader)),
        _ => Err(AltError::UnsupportedFormat(format!(
            "Reference file extension \".{}\" is not supported. Supported extensions: {}",
            ext,
            SUPPORTED_REFERENCE_FILE_EXTENSIONS.join(", ")
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct LoadedReference {
    pub table: ReferenceTable,
    /// Fingerprint of the raw reference file bytes
    pub file_hash: String,
}

/// Snapshot `path` into `tmp_dir`, parse it, and select the table.
///
/// `exported_var_name`, when set, selects a top-level member of the document
/// as the table instead of the document root.
pub fn load_reference(
    path: &Path,
    exported_var_name: Option<&str>,
    tmp_dir: &Path,
) -> Result<LoadedReference> {
    if !path.is_file() {
        return Err(AltError::FileNotFound(path.display().to_string()));
    }
    let loader = loader_for(path)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| AltError::Reference(format!("Invalid reference path: {}", path.display())))?;
    let snapshot = tmp_dir.join(file_name);
    std::fs::copy(path, &snapshot)?;
    debug!("Copied reference file {} to {}", path.display(), snapshot.display());

    let bytes = std::fs::read(&snapshot)?;
    let file_hash = calculate_hash(&bytes);
    let content = String::from_utf8(bytes).map_err(|e| {
        AltError::Reference(format!("{} is not valid UTF-8: {}", path.display(), e))
    })?;

    let document = loader.parse(&content)?;
    let table = select_table(document, exported_var_name, path)?;

    Ok(LoadedReference { table, file_hash })
}

fn select_table(document: Value, exported_var_name: Option<&str>, path: &Path) -> Result<ReferenceTable> {
    let root = match exported_var_name.filter(|name| !name.is_empty()) {
        Some(name) => {
            let Value::Object(mut members) = document else {
                return Err(AltError::Reference(format!(
                    "No member \"{}\" in {}: document root is not an object",
                    name,
                    path.display()
                )));
            };
            match members.remove(name) {
                Some(value) => value,
                None => {
                    return Err(AltError::Reference(format!(
                        "No member \"{}\" in {}. Possible members: {}",
                        name,
                        path.display(),
                        members.keys().cloned().collect::<Vec<_>>().join(", ")
                    )));
                }
            }
        }
        None => document,
    };

    match root {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (normalize_key(&k), v)).collect()),
        _ => Err(AltError::Reference(format!(
            "No reference data found in {}: expected an object of key/value pairs",
            path.display()
        ))),
    }
}

/// Human-readable JSON type name, used in per-key diagnostics.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
