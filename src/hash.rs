use serde_json::Value;
use sha2::{Digest, Sha256};

/// Separator placed between a reference value and its context value.
pub const CONTEXT_SEPARATOR: &str = "_";

/// Hash arbitrary content into a lowercase hex digest.
pub fn calculate_hash(content: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(content.as_ref());
    format!("{:x}", digest)
}

/// Fingerprint of a reference value, coupled with its context value when present.
///
/// Changing either the value or the context yields a different fingerprint,
/// which in turn triggers a re-translation of the key.
pub fn reference_value_hash(value: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => {
            calculate_hash(format!("{}{}{}", value, CONTEXT_SEPARATOR, ctx))
        }
        _ => calculate_hash(value),
    }
}

/// Fingerprint of a value currently present in an output table.
///
/// A missing key, `null` and an empty string all count as "no value".
/// Non-string values are fingerprinted from their JSON text.
pub fn output_value_hash(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(calculate_hash(s)),
        other => Some(calculate_hash(other.to_string())),
    }
}
