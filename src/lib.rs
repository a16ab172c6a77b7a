//! # board-attachments
//!
//! Extracts uploaded attachments from a board export (cards with attachments, as
//! exported by Trello-style tools) and downloads each one into a per-card directory.
//!
//! ## Layout
//!
//! Every uploaded attachment of a card with id `C` lands at
//! `<output_dir>/C/<position>-<basename>`, where `position` is the attachment's
//! index within the card and `basename` the last segment of its URL. Attachments
//! that merely link elsewhere (`isUpload: false`) are ignored.
//!
//! ## Quick Start
//!
//! ```no_run
//! use board_attachments::{AttachmentDownloader, Config, ExportDocument};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = ExportDocument::load(Path::new("board.json"))?;
//!     let extraction = document.extract();
//!
//!     let config = Config {
//!         output_dir: "attachments".into(),
//!         ..Default::default()
//!     };
//!     let downloader = AttachmentDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader.run(extraction.jobs).await?;
//!     println!("{} attachments downloaded", summary.completed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Export document model and job extraction
pub mod export;
/// Retrieval backends
pub mod fetcher;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ExistingFileAction, FailurePolicy, FileNaming, RetryConfig};
pub use downloader::AttachmentDownloader;
pub use error::{DirectoryError, DocumentError, Error, Result, RetrievalError};
pub use export::{ExportDocument, Extraction, ExtractionWarning};
pub use fetcher::{FetchedBody, Fetcher, HttpFetcher};
pub use types::{DownloadJob, Event, RunSummary};

/// Run the downloader over `jobs`, interrupting it on a termination signal.
///
/// On a signal the downloader's `shutdown()` is called: no new job starts,
/// in-flight transfers are aborted and the run resolves to [`Error::Cancelled`].
///
/// Ctrl+C is honored everywhere, SIGTERM on Unix.
///
/// # Example
///
/// ```no_run
/// use board_attachments::{AttachmentDownloader, Config, ExportDocument, run_with_shutdown};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let jobs = ExportDocument::load(Path::new("board.json"))?.extract().jobs;
///     let downloader = AttachmentDownloader::new(Config::default())?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&downloader, jobs).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown<I>(downloader: &AttachmentDownloader, jobs: I) -> Result<RunSummary>
where
    I: IntoIterator<Item = DownloadJob>,
    I::IntoIter: Send,
{
    let run = downloader.run(jobs);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        () = wait_for_signal() => {
            tracing::warn!("Aborting in-flight downloads");
            downloader.shutdown();
            run.await
        }
    }
}

/// Resolve on Ctrl+C, or on SIGTERM where that exists
///
/// A signal source that cannot be registered is logged and never fires.
async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Interrupted by Ctrl+C"),
        () = terminate => tracing::info!("Terminated by SIGTERM"),
    }
}
