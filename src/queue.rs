//! Work queue builder: decides, per (language, key), whether a translation
//! is needed and why.
//!
//! Three fingerprint lineages are compared: the current reference value
//! against the reference hash stored when the key was last translated, and
//! the current output value against the translated-value hash stored at
//! that same time. A human edit of the output always wins: such keys are
//! skipped even when the run is forced.

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::cache::CacheRecord;
use crate::context_keys::ContextKeyConvention;
use crate::hash::{output_value_hash, reference_value_hash};
use crate::messages::Messages;
use crate::reference::{value_type_name, ReferenceTable};

/// Translated key/value table for one target language.
pub type OutputTable = Map<String, Value>;

/// Why a key was queued. Any flag set makes the key eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReasons {
    pub forced: bool,
    pub output_file_did_not_exist: bool,
    pub user_missing_reference_value_hash: bool,
    pub user_modified_reference_value: bool,
    pub missing_output_key: bool,
    pub missing_output_value_hash: bool,
}

impl UpdateReasons {
    pub const NAMES: [&'static str; 6] = [
        "forced",
        "outputFileDidNotExist",
        "userMissingReferenceValueHash",
        "userModifiedReferenceValue",
        "missingOutputKey",
        "missingOutputValueHash",
    ];

    fn flags(&self) -> [bool; 6] {
        [
            self.forced,
            self.output_file_did_not_exist,
            self.user_missing_reference_value_hash,
            self.user_modified_reference_value,
            self.missing_output_key,
            self.missing_output_value_hash,
        ]
    }

    pub fn any(&self) -> bool {
        self.flags().iter().any(|f| *f)
    }

    /// Names of the reasons that are set, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .zip(self.flags())
            .filter(|(_, set)| *set)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Localized, comma-separated description for display.
    pub fn describe(&self, messages: &Messages) -> String {
        self.names()
            .iter()
            .map(|name| messages.localize(&format!("msg-translation-reason-{}", name)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Fingerprints observed when the task was enqueued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashSnapshot {
    pub reference_value_hash: String,
    pub stored_reference_hash: Option<String>,
    pub current_output_hash: Option<String>,
    pub stored_output_hash: Option<String>,
}

/// One unit of work for the executor. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTask {
    pub key: String,
    pub source_lang: String,
    pub target_lang: String,
    pub reasons: UpdateReasons,
    pub source_text: String,
    pub context_text: Option<String>,
    pub hashes: HashSnapshot,
}

/// Outcome of evaluating a single (language, key) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDecision {
    Translate(UpdateReasons),
    UpToDate,
    /// The output value was edited by hand since it was generated.
    UserModifiedTarget,
}

/// Per-key data problems. The key is skipped; the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    NotInReference { lang: String, key: String },
    NotAString { lang: String, key: String, type_name: &'static str },
}

impl KeyError {
    pub fn key(&self) -> &str {
        match self {
            Self::NotInReference { key, .. } | Self::NotAString { key, .. } => key,
        }
    }

    pub fn to_message(&self, messages: &Messages) -> String {
        match self {
            Self::NotInReference { key, .. } => {
                messages.format("error-value-not-in-reference-data", &[("key", key.clone())])
            }
            Self::NotAString { key, type_name, .. } => messages.format(
                "error-value-not-a-string",
                &[("key", key.clone()), ("type", type_name.to_string())],
            ),
        }
    }
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message(&Messages::default()))
    }
}

/// A target language as seen by the builder.
#[derive(Debug, Clone, Copy)]
pub struct LanguageTarget<'a> {
    pub lang: &'a str,
    pub output: &'a OutputTable,
    pub output_existed: bool,
}

/// Run-wide inputs of the builder.
#[derive(Debug, Clone, Copy)]
pub struct QueueInputs<'a> {
    pub reference: &'a ReferenceTable,
    /// Read-only cache snapshot taken at load time
    pub snapshot: &'a CacheRecord,
    pub source_lang: &'a str,
    /// Explicit key subset, in the order to process
    pub keys: Option<&'a [String]>,
    /// Set when context lookup is enabled
    pub context: Option<&'a ContextKeyConvention>,
    pub force: bool,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    pub tasks: Vec<TranslationTask>,
    pub errors: Vec<KeyError>,
}

/// Evaluate the decision rule for one key from its fingerprints.
pub fn decide(
    force: bool,
    output_existed: bool,
    output_has_key: bool,
    hashes: &HashSnapshot,
) -> KeyDecision {
    let stored_reference = hashes.stored_reference_hash.as_deref().filter(|h| !h.is_empty());
    let stored_output = hashes.stored_output_hash.as_deref().filter(|h| !h.is_empty());

    let reasons = UpdateReasons {
        forced: force,
        output_file_did_not_exist: !output_existed,
        user_missing_reference_value_hash: stored_reference.is_none(),
        user_modified_reference_value: stored_reference
            .is_some_and(|stored| stored != hashes.reference_value_hash),
        missing_output_key: !output_has_key,
        missing_output_value_hash: stored_output.is_none(),
    };

    let user_modified_target_value = match (stored_output, hashes.current_output_hash.as_deref()) {
        (Some(stored), Some(current)) => stored != current,
        _ => false,
    };

    if user_modified_target_value {
        KeyDecision::UserModifiedTarget
    } else if reasons.any() {
        KeyDecision::Translate(reasons)
    } else {
        KeyDecision::UpToDate
    }
}

/// Enumerate tasks for every target language, in configured order; within a
/// language, keys follow the explicit list or the reference table order.
pub fn build_work_queue(inputs: &QueueInputs<'_>, targets: &[LanguageTarget<'_>]) -> WorkQueue {
    let mut queue = WorkQueue::default();

    let keys: Vec<&str> = match inputs.keys {
        Some(keys) if !keys.is_empty() => keys.iter().map(String::as_str).collect(),
        _ => inputs.reference.keys().map(String::as_str).collect(),
    };
    let keys: Vec<&str> = match inputs.context {
        Some(convention) => keys.into_iter().filter(|k| !convention.is_context_key(k)).collect(),
        None => keys,
    };
    trace!("keys to process: {}", keys.join(","));

    for target in targets {
        debug!("Processing language {}...", target.lang);
        for key in &keys {
            match evaluate_key(inputs, target, key) {
                Ok(Some(task)) => queue.tasks.push(task),
                Ok(None) => {}
                Err(e) => queue.errors.push(e),
            }
        }
    }

    queue
}

fn evaluate_key(
    inputs: &QueueInputs<'_>,
    target: &LanguageTarget<'_>,
    key: &str,
) -> Result<Option<TranslationTask>, KeyError> {
    let source_text = match inputs.reference.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(KeyError::NotAString {
                lang: target.lang.to_string(),
                key: key.to_string(),
                type_name: value_type_name(other),
            });
        }
        None => {
            return Err(KeyError::NotInReference {
                lang: target.lang.to_string(),
                key: key.to_string(),
            });
        }
    };

    let context_text = inputs.context.and_then(|convention| {
        match inputs.reference.get(&convention.context_key_for(key)) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_)) | None => None,
            Some(other) => {
                debug!("Ignoring non-string context ({}) for key \"{}\"", value_type_name(other), key);
                None
            }
        }
    });

    let current_value = target.output.get(key);
    let hashes = HashSnapshot {
        reference_value_hash: reference_value_hash(&source_text, context_text.as_deref()),
        stored_reference_hash: inputs
            .snapshot
            .stored_reference_hash(target.lang, key)
            .map(str::to_string),
        current_output_hash: output_value_hash(current_value),
        stored_output_hash: inputs
            .snapshot
            .stored_output_hash(target.lang, key)
            .map(str::to_string),
    };

    debug!(
        "[{}] \"{}\" reference hash {} (stored {:?}), output hash {:?} (stored {:?})",
        target.lang,
        key,
        hashes.reference_value_hash,
        hashes.stored_reference_hash,
        hashes.current_output_hash,
        hashes.stored_output_hash
    );

    match decide(inputs.force, target.output_existed, current_value.is_some(), &hashes) {
        KeyDecision::Translate(reasons) => {
            debug!("Translation needed for {}/{}: {}", target.lang, key, reasons.names().join(", "));
            Ok(Some(TranslationTask {
                key: key.to_string(),
                source_lang: inputs.source_lang.to_string(),
                target_lang: target.lang.to_string(),
                reasons,
                source_text,
                context_text,
                hashes,
            }))
        }
        KeyDecision::UserModifiedTarget => {
            debug!(
                "[{}] {} modified by user; hashes differ ({:?} / {:?}), skipping",
                target.lang, key, hashes.current_output_hash, hashes.stored_output_hash
            );
            Ok(None)
        }
        KeyDecision::UpToDate => {
            debug!("[{}] {} no translation needed.", target.lang, key);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::calculate_hash;
    use serde_json::json;

    fn table(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    /// Cache and output as left behind by a clean previous run.
    fn translated_state(reference: &ReferenceTable, lang: &str) -> (CacheRecord, OutputTable) {
        let mut cache = CacheRecord::default();
        let mut output = OutputTable::new();
        for (key, value) in reference {
            let source = value.as_str().unwrap();
            let translated = format!("{}-{}", lang, source);
            cache.record_translation(
                lang,
                key,
                calculate_hash(&translated),
                reference_value_hash(source, None),
            );
            output.insert(key.clone(), Value::String(translated));
        }
        (cache, output)
    }

    fn inputs<'a>(reference: &'a ReferenceTable, snapshot: &'a CacheRecord) -> QueueInputs<'a> {
        QueueInputs {
            reference,
            snapshot,
            source_lang: "en",
            keys: None,
            context: None,
            force: false,
        }
    }

    #[test]
    fn test_first_run_queues_everything_with_reasons() {
        let reference = table(json!({ "a": "A", "b": "B" }));
        let cache = CacheRecord::default();
        let output = OutputTable::new();
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: false }];

        let queue = build_work_queue(&inputs(&reference, &cache), &targets);
        assert_eq!(queue.tasks.len(), 2);
        assert!(queue.errors.is_empty());

        let reasons = queue.tasks[0].reasons;
        assert!(!reasons.forced);
        assert!(reasons.output_file_did_not_exist);
        assert!(reasons.user_missing_reference_value_hash);
        assert!(!reasons.user_modified_reference_value);
        assert!(reasons.missing_output_key);
        assert!(reasons.missing_output_value_hash);
    }

    #[test]
    fn test_unchanged_state_is_idempotent() {
        let reference = table(json!({ "a": "A", "b": "B" }));
        let (cache, output) = translated_state(&reference, "fr");
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: true }];

        let queue = build_work_queue(&inputs(&reference, &cache), &targets);
        assert!(queue.tasks.is_empty());
    }

    #[test]
    fn test_reference_edit_requeues_only_that_key() {
        let original = table(json!({ "a": "A", "b": "B" }));
        let (cache, output) = translated_state(&original, "fr");
        let edited = table(json!({ "a": "A", "b": "B changed" }));
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: true }];

        let queue = build_work_queue(&inputs(&edited, &cache), &targets);
        assert_eq!(queue.tasks.len(), 1);
        assert_eq!(queue.tasks[0].key, "b");
        assert_eq!(queue.tasks[0].reasons.names(), vec!["userModifiedReferenceValue"]);
    }

    #[test]
    fn test_manual_edit_wins_even_when_forced() {
        let reference = table(json!({ "a": "A" }));
        let (cache, mut output) = translated_state(&reference, "fr");
        output.insert("a".to_string(), json!("edited by a human"));
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: true }];

        let mut run = inputs(&reference, &cache);
        assert!(build_work_queue(&run, &targets).tasks.is_empty());

        run.force = true;
        assert!(build_work_queue(&run, &targets).tasks.is_empty());
    }

    #[test]
    fn test_non_string_manual_edit_wins_even_when_forced() {
        let reference = table(json!({ "a": "A" }));
        let (cache, mut output) = translated_state(&reference, "fr");
        output.insert("a".to_string(), json!({ "one": "un", "other": "uns" }));
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: true }];

        let mut run = inputs(&reference, &cache);
        run.force = true;
        assert!(build_work_queue(&run, &targets).tasks.is_empty());

        let edited = table(json!({ "a": "A changed" }));
        let mut run = inputs(&edited, &cache);
        run.force = true;
        assert!(build_work_queue(&run, &targets).tasks.is_empty());
    }

    #[test]
    fn test_force_requeues_untouched_keys() {
        let reference = table(json!({ "a": "A" }));
        let (cache, output) = translated_state(&reference, "fr");
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: true }];

        let mut run = inputs(&reference, &cache);
        run.force = true;
        let queue = build_work_queue(&run, &targets);
        assert_eq!(queue.tasks.len(), 1);
        assert_eq!(queue.tasks[0].reasons.names(), vec!["forced"]);
    }

    #[test]
    fn test_deleted_output_value_is_retranslated() {
        let reference = table(json!({ "a": "A" }));
        let (cache, mut output) = translated_state(&reference, "fr");
        output.remove("a");
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: true }];

        let queue = build_work_queue(&inputs(&reference, &cache), &targets);
        assert_eq!(queue.tasks.len(), 1);
        assert!(queue.tasks[0].reasons.missing_output_key);
    }

    #[test]
    fn test_context_keys_excluded_and_coupled_into_hash() {
        let reference = table(json!({
            "save": "Save",
            "_ctx_save": "Button that saves the document",
        }));
        let convention = ContextKeyConvention::new("_ctx_", "");
        let cache = CacheRecord::default();
        let output = OutputTable::new();
        let targets = [LanguageTarget { lang: "de", output: &output, output_existed: false }];

        let mut run = inputs(&reference, &cache);
        run.context = Some(&convention);
        let queue = build_work_queue(&run, &targets);

        assert_eq!(queue.tasks.len(), 1);
        let task = &queue.tasks[0];
        assert_eq!(task.key, "save");
        assert_eq!(task.context_text.as_deref(), Some("Button that saves the document"));
        assert_eq!(
            task.hashes.reference_value_hash,
            reference_value_hash("Save", Some("Button that saves the document"))
        );
    }

    #[test]
    fn test_non_string_and_missing_keys_are_errors() {
        let reference = table(json!({ "list": ["a", "b"], "obj": {}, "ok": "Ok" }));
        let cache = CacheRecord::default();
        let output = OutputTable::new();
        let targets = [LanguageTarget { lang: "fr", output: &output, output_existed: false }];
        let keys = vec!["list".to_string(), "ghost".to_string(), "ok".to_string()];

        let mut run = inputs(&reference, &cache);
        run.keys = Some(&keys);
        let queue = build_work_queue(&run, &targets);

        assert_eq!(queue.tasks.len(), 1);
        assert_eq!(queue.tasks[0].key, "ok");
        assert_eq!(
            queue.errors,
            vec![
                KeyError::NotAString { lang: "fr".into(), key: "list".into(), type_name: "array" },
                KeyError::NotInReference { lang: "fr".into(), key: "ghost".into() },
            ]
        );
        assert!(queue.errors[0].to_string().contains("\"array\""));
        assert!(queue.errors[1].to_string().contains("did not exist"));
    }

    #[test]
    fn test_order_follows_languages_then_keys() {
        let reference = table(json!({ "z": "Z", "a": "A" }));
        let cache = CacheRecord::default();
        let output = OutputTable::new();
        let targets = [
            LanguageTarget { lang: "fr", output: &output, output_existed: false },
            LanguageTarget { lang: "de", output: &output, output_existed: false },
        ];

        let queue = build_work_queue(&inputs(&reference, &cache), &targets);
        let order: Vec<(String, String)> = queue
            .tasks
            .iter()
            .map(|t| (t.target_lang.clone(), t.key.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("fr".into(), "z".into()),
                ("fr".into(), "a".into()),
                ("de".into(), "z".into()),
                ("de".into(), "a".into()),
            ]
        );
    }

    #[test]
    fn test_describe_reasons() {
        let reasons = UpdateReasons { forced: true, missing_output_key: true, ..Default::default() };
        assert_eq!(
            reasons.describe(&Messages::default()),
            "Forced update, No existing translation found"
        );
    }
}
