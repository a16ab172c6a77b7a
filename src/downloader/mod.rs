//! Download orchestration split into focused submodules.
//!
//! - [`queue_processor`] - Drives a run: bounded concurrency, fail-fast, summary
//! - [`job`] - One job: directory, retrieval with retry, streaming write

mod job;
mod queue_processor;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::types::Event;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel; slow subscribers lag rather than block jobs
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Downloads the attachments described by a sequence of [`crate::DownloadJob`]s
///
/// Cloneable; all fields are shared.
#[derive(Clone)]
pub struct AttachmentDownloader {
    /// Run configuration
    pub(crate) config: Arc<Config>,
    /// Retrieval backend (trait object so tests can substitute it)
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancelled on external interruption; aborts in-flight transfers
    pub(crate) shutdown: CancellationToken,
}

impl AttachmentDownloader {
    /// Create a downloader retrieving over HTTP
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a downloader with a custom retrieval backend
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            event_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to per-job events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this downloader runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that interrupts runs when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Interrupt the current run: no new job starts and in-flight transfers are aborted
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}
