//! Task executor: drains the work queue strictly in order.
//!
//! A rate-limit answer on any attempt sets a run-wide delay that every later
//! attempt, for this task or any following one, sleeps through before
//! calling the provider. The delay is cleared by the next successful call.
//! Generic failures retry immediately under whatever delay is pending.

use std::time::Duration;

use indicatif::ProgressBar;
use tracing::{debug, info, trace, warn};

use crate::hash::calculate_hash;
use crate::provider::{ProviderOutcome, TranslationBackend, TranslationRequest};
use crate::queue::TranslationTask;
use crate::state::AppState;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub realtime_writes: bool,
    pub app_context: Option<String>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            realtime_writes: false,
            app_context: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct TaskExecutor<'a> {
    backend: &'a dyn TranslationBackend,
    settings: ExecutorSettings,
    progress: ProgressBar,
    next_delay_ms: u64,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(backend: &'a dyn TranslationBackend, settings: ExecutorSettings) -> Self {
        Self {
            backend,
            settings,
            progress: ProgressBar::hidden(),
            next_delay_ms: 0,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Delay every upcoming attempt will wait before calling the provider.
    pub fn pending_delay_ms(&self) -> u64 {
        self.next_delay_ms
    }

    /// Run every task, one at a time. A failed task is recorded in `state`
    /// and does not stop the others.
    pub async fn execute(&mut self, tasks: Vec<TranslationTask>, state: &mut AppState) -> ExecutionSummary {
        let mut summary = ExecutionSummary {
            total: tasks.len(),
            ..Default::default()
        };
        self.progress.set_length(tasks.len() as u64);

        for (idx, task) in tasks.into_iter().enumerate() {
            let progress = if summary.total > 0 { idx * 100 / summary.total } else { 100 };
            debug!(
                "{}",
                state.messages().format(
                    "msg-processing-lang-and-key",
                    &[
                        ("progress", progress.to_string()),
                        ("targetLang", task.target_lang.clone()),
                        ("key", task.key.clone()),
                    ],
                )
            );
            self.progress.set_message(format!(
                "[{}] {} ({})",
                task.target_lang,
                task.key,
                task.reasons.describe(state.messages())
            ));

            if self.run_task(&task, state).await {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        summary
    }

    async fn run_task(&mut self, task: &TranslationTask, state: &mut AppState) -> bool {
        match self.translate(task, state).await {
            Some(new_value) => {
                self.commit(task, new_value, state);
                true
            }
            None => {
                let message = state.messages().format(
                    "error-translation-failed",
                    &[
                        ("targetLang", task.target_lang.clone()),
                        ("key", task.key.clone()),
                        ("refValue", task.source_text.clone()),
                    ],
                );
                warn!("{}", message);
                state.record_error(message);
                false
            }
        }
    }

    /// Translated text for `task`, or `None` once every attempt is spent.
    async fn translate(&mut self, task: &TranslationTask, state: &AppState) -> Option<String> {
        debug!(
            "[{}] {}",
            task.target_lang,
            state.messages().format("msg-translating-key", &[("key", task.key.clone())])
        );

        if task.source_lang == task.target_lang {
            debug!("Using reference value since source & target language are the same");
            return Some(task.source_text.clone());
        }

        let request = TranslationRequest {
            source_lang: task.source_lang.clone(),
            target_lang: task.target_lang.clone(),
            text: task.source_text.clone(),
            context: task.context_text.clone(),
            app_context: self.settings.app_context.clone(),
        };
        let provider_name = self.backend.name();

        for attempt in 0..=self.settings.max_retries {
            let attempt_str = if attempt > 0 {
                format!(" [Attempt: {}]", attempt + 1)
            } else {
                String::new()
            };

            if self.next_delay_ms > 0 {
                debug!(
                    "{}",
                    state.messages().format(
                        "msg-rate-limited-sleeping",
                        &[
                            ("interval", (self.next_delay_ms / 1000).to_string()),
                            ("attemptStr", attempt_str.clone()),
                        ],
                    )
                );
                tokio::time::sleep(Duration::from_millis(self.next_delay_ms)).await;
            }

            debug!(
                "{}",
                state.messages().format(
                    "msg-hitting-provider-endpoint",
                    &[
                        ("providerName", provider_name.clone()),
                        ("attemptStr", attempt_str),
                    ],
                )
            );

            match self.backend.translate(&request).await {
                ProviderOutcome::Translated(text) if !text.is_empty() => {
                    self.next_delay_ms = 0;
                    return Some(text);
                }
                ProviderOutcome::Translated(_) => {
                    warn!("{} translated text to empty string", provider_name);
                }
                ProviderOutcome::RateLimited { backoff_ms } => {
                    self.next_delay_ms = self.next_delay_ms.max(backoff_ms);
                    debug!("Rate limited; shared delay now {} ms", self.next_delay_ms);
                }
                ProviderOutcome::Failed(reason) => {
                    warn!("{} API failed: {}", provider_name, reason);
                }
            }
        }

        None
    }

    fn commit(&self, task: &TranslationTask, new_value: String, state: &mut AppState) {
        let translated_hash = calculate_hash(&new_value);
        trace!("translated text: {}", new_value);
        debug!(
            "Updating hash for translated {}.{}: {}",
            task.target_lang, task.key, translated_hash
        );
        info!(
            "{}",
            state.messages().format(
                "msg-show-translation-result",
                &[("key", task.key.clone()), ("newValue", new_value.clone())],
            )
        );

        match state.output_mut(&task.target_lang) {
            Some(doc) => {
                doc.table
                    .insert(task.key.clone(), serde_json::Value::String(new_value));
            }
            None => {
                warn!("No output registered for language {}", task.target_lang);
                return;
            }
        }

        if let Some(cache) = state.cache_mut() {
            cache.record_translation(
                &task.target_lang,
                &task.key,
                translated_hash,
                task.hashes.reference_value_hash.clone(),
            );
        }

        if self.settings.realtime_writes {
            state.flush_output(&task.target_lang);
            state.flush_cache();
        } else {
            state.mark_output_pending(&task.target_lang);
        }
    }
}
