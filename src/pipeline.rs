use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::cache::CacheRecord;
use crate::config::RunOptions;
use crate::error::{AltError, Result};
use crate::executor::{ExecutorSettings, TaskExecutor};
use crate::provider::{api_key_for, HttpTranslationBackend, ProviderFactory, TranslationBackend};
use crate::queue::{build_work_queue, LanguageTarget, QueueInputs};
use crate::reference::load_reference;
use crate::state::{AppState, OutputDocument};

/// Outcome of a completed translate run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tasks: usize,
    pub translated: usize,
    /// Tasks that failed after exhausting their retries
    pub failed: usize,
    /// Keys skipped for bad reference data
    pub key_errors: usize,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Translate run: setup, work queue, execution and summary.
pub struct Pipeline {
    options: RunOptions,
    backend: Box<dyn TranslationBackend>,
}

impl Pipeline {
    /// Pipeline talking to the configured provider. Fails when the provider
    /// is unknown or its API key is not set.
    pub fn new(options: RunOptions) -> Result<Self> {
        let provider = ProviderFactory::create(&options.provider)?;
        let api_key = api_key_for(&options.provider)?;
        let backend = HttpTranslationBackend::new(provider, api_key, options.model.clone())?;
        info!("Translation provider {} loaded (model {})", backend.name(), backend.model());

        Ok(Self::with_backend(options, Box::new(backend)))
    }

    pub fn with_backend(options: RunOptions, backend: Box<dyn TranslationBackend>) -> Self {
        Self { options, backend }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run against `state`. All mutations land in `state`, so a caller that
    /// abandons this future can still flush them with [`AppState::shutdown`].
    pub async fn run(&self, state: &mut AppState) -> Result<RunSummary> {
        let options = &self.options;

        if !options.output_dir.is_dir() {
            debug!("Directory \"{}\" did not exist -- creating...", options.output_dir.display());
            std::fs::create_dir_all(&options.output_dir).map_err(|e| {
                AltError::Setup(format!(
                    "Failed to create directory {}: {}",
                    options.output_dir.display(),
                    e
                ))
            })?;
        }

        let cache_path = options.cache_path();
        debug!("Attempting to load cache file from \"{}\"", cache_path.display());
        let snapshot = CacheRecord::load(&cache_path);

        let tmp_dir = TempDir::new()?;
        let tmp_path: PathBuf = tmp_dir.path().to_path_buf();
        state.set_tmp_dir(tmp_dir);

        let reference = load_reference(
            &options.reference_file,
            options.reference_exported_var_name.as_deref(),
            &tmp_path,
        )?;
        debug!("Loaded {} reference entries", reference.table.len());

        let mut writable = snapshot.clone();
        if reference.file_hash != snapshot.reference_hash {
            debug!("Reference file has changed since last run");
        }
        writable.reference_hash = reference.file_hash.clone();
        writable.last_run = Some(chrono::Utc::now().to_rfc3339());

        for lang in &options.target_languages {
            if writable.ensure_language(lang) {
                debug!("target language {} not in cache; update needed...", lang);
            }
            let document = OutputDocument::load(lang, options.output_path_for(lang))?;
            state.add_output(document);
        }
        state.register_cache(cache_path, writable);

        let queue = {
            let targets: Vec<LanguageTarget<'_>> = state
                .outputs()
                .iter()
                .map(|doc| LanguageTarget {
                    lang: &doc.lang,
                    output: &doc.table,
                    output_existed: doc.existed,
                })
                .collect();
            let inputs = QueueInputs {
                reference: &reference.table,
                snapshot: &snapshot,
                source_lang: &options.reference_language,
                keys: Some(options.keys.as_slice()),
                context: options.context.as_ref(),
                force: options.force,
            };
            build_work_queue(&inputs, &targets)
        };

        let key_errors = queue.errors.len();
        for error in &queue.errors {
            let message = error.to_message(state.messages());
            state.record_error(message);
        }

        let mut summary = RunSummary {
            tasks: queue.tasks.len(),
            key_errors,
            ..Default::default()
        };

        if queue.tasks.is_empty() {
            info!("{}", state.messages().localize("msg-nothing-to-do"));
            return Ok(summary);
        }

        let settings = ExecutorSettings {
            max_retries: options.max_retries,
            realtime_writes: options.realtime_writes,
            app_context: options.app_context_message.clone(),
        };
        let mut executor =
            TaskExecutor::new(self.backend.as_ref(), settings).with_progress(self.progress_bar(queue.tasks.len()));
        let executed = executor.execute(queue.tasks, state).await;

        summary.translated = executed.succeeded;
        summary.failed = executed.failed;

        if summary.failed > 0 {
            info!(
                "[100%] {}",
                state.messages().format(
                    "msg-finished-with-errors",
                    &[
                        ("errorsEncountered", summary.failed.to_string()),
                        ("s", if summary.failed > 1 { "s" } else { "" }.to_string()),
                    ],
                )
            );
        } else {
            info!("[100%] {}", state.messages().localize("msg-done"));
        }

        Ok(summary)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.options.tty {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        match ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => debug!("Default progress style in use: {}", e),
        }
        pb
    }
}
