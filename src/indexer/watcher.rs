// File watcher that keeps the index in sync with the working tree

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::discovery::{discover_files, relative_path};
use super::{Indexer, SyncOutcome};
use crate::config::Config;
use crate::progress::NoProgress;

/// Quiet period after the last relevant event before re-indexing
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Re-runs `Indexer::sync` after bursts of filesystem changes
pub struct FileWatcher {
    indexer: Arc<Indexer>,
    root: PathBuf,
    config: Config,
    debounce: Duration,
}

impl FileWatcher {
    pub fn new(indexer: Arc<Indexer>, root: PathBuf, config: Config) -> Self {
        Self {
            indexer,
            root,
            config,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Watch until the event channel closes
    pub async fn watch(&self) -> Result<()> {
        info!("Starting file watcher for: {}", self.root.display());

        let (tx, mut rx) = mpsc::channel(100);

        // notify calls back on its own thread, outside the runtime
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        error!("Failed to send file event: {}", e);
                    }
                }
                Err(e) => error!("File watch error: {}", e),
            },
            notify::Config::default(),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!("File watcher started. Monitoring for changes...");

        while let Some(event) = rx.recv().await {
            if !self.is_relevant(&event) {
                continue;
            }
            debug!("File event: {:?}", event);

            // Absorb the rest of the burst
            while let Ok(Some(_)) = tokio::time::timeout(self.debounce, rx.recv()).await {}

            self.resync().await;
        }

        Ok(())
    }

    /// Whether an event touches a file the index cares about
    pub fn is_relevant(&self, event: &Event) -> bool {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return false;
        }

        let index_dir = self.config.index_dir(&self.root);
        event.paths.iter().any(|path| {
            !path.starts_with(&index_dir) && self.is_indexable(path)
        })
    }

    fn is_indexable(&self, path: &Path) -> bool {
        relative_path(&self.root, path)
            .map(|relative| self.config.should_index_file(&relative))
            .unwrap_or(false)
    }

    async fn resync(&self) {
        let indexer = Arc::clone(&self.indexer);
        let root = self.root.clone();
        let config = self.config.clone();

        let result = tokio::task::spawn_blocking(move || {
            let files = discover_files(&root, &config);
            indexer.sync(&files, &NoProgress)
        })
        .await;

        match result {
            Ok(Ok(SyncOutcome::Incremental(outcome))) => info!("Index synced: {:?}", outcome),
            Ok(Ok(SyncOutcome::Rebuilt { total_chunks })) => {
                info!("Index rebuilt with {} chunks", total_chunks)
            }
            Ok(Err(e)) => error!("Failed to sync index: {}", e),
            Err(e) => error!("Sync task panicked: {}", e),
        }
    }
}
