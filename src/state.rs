//! Run context shared by the pipeline and the signal path.
//!
//! Holds every piece of mutable run state: the writable cache, one output
//! table per target language, the set of files still to be written, the
//! collected errors and the reference snapshot directory. [`AppState::shutdown`]
//! commits all of it and may be called from either trigger point; only the
//! first call does anything.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, error, info, trace, warn};

use crate::cache::CacheRecord;
use crate::messages::Messages;
use crate::persist;
use crate::queue::OutputTable;

/// One target language's output file, held in memory for the run.
#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub lang: String,
    pub path: PathBuf,
    pub table: OutputTable,
    /// Whether the file was on disk before this run
    pub existed: bool,
}

impl OutputDocument {
    /// Load `path`, or start empty when it does not exist yet.
    pub fn load(lang: &str, path: PathBuf) -> crate::error::Result<Self> {
        let loaded = persist::read_json_object(&path)?;
        let existed = loaded.is_some();
        debug!(
            "[{}] output file {} {}",
            lang,
            path.display(),
            if existed { "loaded" } else { "does not exist yet" }
        );
        Ok(Self {
            lang: lang.to_string(),
            path,
            table: loaded.unwrap_or_default(),
            existed,
        })
    }
}

#[derive(Debug)]
struct CacheFile {
    path: PathBuf,
    record: CacheRecord,
}

#[derive(Debug, Default)]
pub struct AppState {
    messages: Messages,
    errors: Vec<String>,
    outputs: Vec<OutputDocument>,
    cache: Option<CacheFile>,
    /// Output files with changes not yet on disk
    pending_outputs: BTreeSet<PathBuf>,
    tmp_dir: Option<TempDir>,
    shut_down: bool,
}

impl AppState {
    pub fn new(messages: Messages) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn set_tmp_dir(&mut self, dir: TempDir) {
        self.tmp_dir = Some(dir);
    }

    pub fn tmp_dir_path(&self) -> Option<&Path> {
        self.tmp_dir.as_ref().map(TempDir::path)
    }

    /// Register the writable cache; it is always written at shutdown.
    pub fn register_cache(&mut self, path: PathBuf, record: CacheRecord) {
        self.cache = Some(CacheFile { path, record });
    }

    pub fn cache(&self) -> Option<&CacheRecord> {
        self.cache.as_ref().map(|c| &c.record)
    }

    pub fn cache_mut(&mut self) -> Option<&mut CacheRecord> {
        self.cache.as_mut().map(|c| &mut c.record)
    }

    pub fn add_output(&mut self, document: OutputDocument) {
        self.outputs.push(document);
    }

    pub fn outputs(&self) -> &[OutputDocument] {
        &self.outputs
    }

    pub fn output(&self, lang: &str) -> Option<&OutputDocument> {
        self.outputs.iter().find(|o| o.lang == lang)
    }

    pub fn output_mut(&mut self, lang: &str) -> Option<&mut OutputDocument> {
        self.outputs.iter_mut().find(|o| o.lang == lang)
    }

    /// Note that `lang`'s output must be written on shutdown.
    pub fn mark_output_pending(&mut self, lang: &str) {
        if let Some(path) = self.output(lang).map(|o| o.path.clone()) {
            if self.pending_outputs.insert(path.clone()) {
                debug!("Noting write-on-quit needed for {}...", path.display());
            }
        }
    }

    pub fn has_pending_output(&self, lang: &str) -> bool {
        self.output(lang)
            .is_some_and(|o| self.pending_outputs.contains(&o.path))
    }

    /// Write `lang`'s output right away.
    pub fn flush_output(&self, lang: &str) -> bool {
        match self.output(lang) {
            Some(doc) => persist::try_write_json_file(&doc.path, &doc.table),
            None => false,
        }
    }

    /// Write the cache right away.
    pub fn flush_cache(&self) -> bool {
        match &self.cache {
            Some(cache) => cache.record.persist(&cache.path),
            None => false,
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("recorded error: {}", message);
        self.errors.push(message);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Report errors, write every pending file and remove the snapshot
    /// directory. Returns the number of files written; 0 on repeat calls.
    pub fn shutdown(&mut self, forced: bool) -> usize {
        if self.shut_down {
            trace!("shutdown already ran");
            return 0;
        }
        self.shut_down = true;

        if forced {
            info!("Forcing shutdown...");
        }

        if !self.errors.is_empty() {
            let text = self.messages.format(
                "msg-errors-encountered",
                &[("errors", self.errors.join("\n"))],
            );
            error!("{}", text);
        }

        let mut written = 0;
        let pending = std::mem::take(&mut self.pending_outputs);
        for doc in self.outputs.iter().filter(|o| pending.contains(&o.path)) {
            trace!("json: {:?}", doc.table);
            if persist::try_write_json_file(&doc.path, &doc.table) {
                written += 1;
            }
        }
        if self.flush_cache() {
            written += 1;
        }
        debug!("Wrote {} files to disk.", written);

        if let Some(dir) = self.tmp_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove temporary directory {}: {}", path.display(), e);
            }
        }

        written
    }
}
