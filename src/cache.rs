//! Persistent change-detection cache.
//!
//! One record lives in each output directory. It is loaded once as a
//! read-only snapshot; a deep clone is mutated as tasks complete and
//! flushed at shutdown (or after every task in realtime mode).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::persist;

/// File name of the cache, stored in the output directory.
pub const DEFAULT_CACHE_FILENAME: &str = ".localization.cache.json";

/// Per-language cache state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageState {
    /// key -> fingerprint of the translated value as last written
    #[serde(default)]
    pub key_hashes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    /// Fingerprint of the whole reference file, refreshed every run
    #[serde(default)]
    pub reference_hash: String,
    /// language -> key -> fingerprint of the reference content that produced the translation
    #[serde(default)]
    pub reference_key_hashes: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub state: BTreeMap<String, LanguageState>,
    /// Advisory timestamp of the last run (RFC 3339)
    #[serde(default)]
    pub last_run: Option<String>,
}

impl CacheRecord {
    /// Load a cache file. A missing or unreadable file is the first-run state,
    /// not an error.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No cache loaded from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<CacheRecord>(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unparsable cache file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Best-effort write; failures are logged and the run goes on.
    pub fn persist(&self, path: &Path) -> bool {
        persist::try_write_json_file(path, self)
    }

    pub fn stored_output_hash(&self, lang: &str, key: &str) -> Option<&str> {
        self.state
            .get(lang)
            .and_then(|s| s.key_hashes.get(key))
            .map(String::as_str)
    }

    pub fn stored_reference_hash(&self, lang: &str, key: &str) -> Option<&str> {
        self.reference_key_hashes
            .get(lang)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Make sure a language has a state entry.
    pub fn ensure_language(&mut self, lang: &str) -> bool {
        if self.state.contains_key(lang) {
            return false;
        }
        self.state.insert(lang.to_string(), LanguageState::default());
        true
    }

    /// Record a successful translation event for `(lang, key)`.
    pub fn record_translation(
        &mut self,
        lang: &str,
        key: &str,
        translated_hash: String,
        reference_hash: String,
    ) {
        self.state
            .entry(lang.to_string())
            .or_default()
            .key_hashes
            .insert(key.to_string(), translated_hash);
        self.reference_key_hashes
            .entry(lang.to_string())
            .or_default()
            .insert(key.to_string(), reference_hash);
    }
}
