//! Best-effort cache invalidation.
//!
//! Mutations compute an [`InvalidationSet`] from their before/after state
//! and hand it to the [`InvalidationPublisher`]. Publishing never waits on
//! the store: a background worker deletes each set in its own task, logs
//! failures and never retries them.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use super::{CacheKey, CacheStore};
use crate::telemetry;

/// Ordered, duplicate-free list of keys evicted by one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationSet {
    keys: Vec<CacheKey>,
}

impl InvalidationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key unless already present.
    pub fn with(mut self, key: CacheKey) -> Self {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    /// The default prompt config moved from `old_default` to `new_default`.
    ///
    /// Evicts both prompt-config keys and the application-level key that
    /// resolves the default.
    pub fn default_changed(application_id: &str, old_default: &str, new_default: &str) -> Self {
        Self::new()
            .with(CacheKey::prompt_config(application_id, old_default))
            .with(CacheKey::prompt_config(application_id, new_default))
            .with(CacheKey::application(application_id))
    }

    /// A prompt config was edited. The application-level key also caches
    /// it when it is the default.
    pub fn prompt_config_updated(
        application_id: &str,
        prompt_config_id: &str,
        is_default: bool,
    ) -> Self {
        let set = Self::new().with(CacheKey::prompt_config(application_id, prompt_config_id));
        if is_default {
            set.with(CacheKey::application(application_id))
        } else {
            set
        }
    }

    pub fn prompt_config_deleted(application_id: &str, prompt_config_id: &str) -> Self {
        Self::new().with(CacheKey::prompt_config(application_id, prompt_config_id))
    }

    pub fn application_changed(application_id: &str) -> Self {
        Self::new().with(CacheKey::application(application_id))
    }

    pub fn keys(&self) -> &[CacheKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }

    fn into_strings(self) -> Vec<String> {
        self.keys.into_iter().map(String::from).collect()
    }
}

enum Command {
    Invalidate(InvalidationSet),
    Shutdown,
}

/// Fire-and-forget invalidation front end.
///
/// Cheap to clone; all clones feed the same worker. [`shutdown`](Self::shutdown)
/// stops intake and waits for in-flight deletions.
#[derive(Clone)]
pub struct InvalidationPublisher {
    tx: mpsc::UnboundedSender<Command>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl InvalidationPublisher {
    /// Start the background worker.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn spawn(store: Arc<dyn CacheStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, rx));
        Self {
            tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Queue `set` for deletion and return immediately.
    pub fn invalidate(&self, set: InvalidationSet) {
        if set.is_empty() {
            return;
        }
        metrics::counter!(telemetry::INVALIDATED_KEYS_TOTAL).increment(set.len() as u64);
        if self.tx.send(Command::Invalidate(set)).is_err() {
            tracing::warn!("invalidation publisher stopped, dropping keys");
        }
    }

    /// Stop accepting work and wait for queued deletions to finish.
    ///
    /// Later calls are no-ops.
    pub async fn shutdown(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        let _ = self.tx.send(Command::Shutdown);
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "invalidation worker panicked");
        }
    }
}

async fn run_worker(store: Arc<dyn CacheStore>, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Invalidate(set)) => {
                    let store = Arc::clone(&store);
                    tasks.spawn(delete_keys(store, set));
                }
                Some(Command::Shutdown) | None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "invalidation task panicked");
                }
            }
        }
    }

    // Sets queued before shutdown still get deleted.
    rx.close();
    while let Ok(command) = rx.try_recv() {
        if let Command::Invalidate(set) = command {
            tasks.spawn(delete_keys(Arc::clone(&store), set));
        }
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "invalidation task panicked");
        }
    }
    tracing::debug!("invalidation worker stopped");
}

async fn delete_keys(store: Arc<dyn CacheStore>, set: InvalidationSet) {
    let keys = set.into_strings();
    match store.delete(&keys).await {
        Ok(deleted) => {
            tracing::debug!(keys = ?keys, deleted, "invalidated cache keys");
        }
        Err(e) => {
            metrics::counter!(telemetry::INVALIDATION_FAILURES_TOTAL).increment(1);
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "delete").increment(1);
            tracing::warn!(keys = ?keys, error = %e, "cache invalidation failed");
        }
    }
}
