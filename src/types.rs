//! Core types for board-attachments

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One attachment to fetch, produced by the extractor and consumed once by the downloader
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Identity of the owning card
    pub owner_id: String,
    /// Identity of the attachment within its card
    pub attachment_id: String,
    /// Zero-based index of the attachment within the card's attachment list
    pub position: usize,
    /// Remote location of the uploaded file
    pub source_url: String,
}

/// Event emitted while a run is in progress
///
/// Every per-job event carries both `owner_id` and `attachment_id`, so events stay
/// attributable when jobs run concurrently and complete out of order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A job has begun (emitted before its directory is created)
    Started {
        /// Owning card
        owner_id: String,
        /// Attachment being fetched
        attachment_id: String,
        /// Source URL
        url: String,
    },

    /// The attachment was written to disk
    Completed {
        /// Owning card
        owner_id: String,
        /// Attachment fetched
        attachment_id: String,
        /// Number of bytes written
        bytes_written: u64,
        /// Final location of the file
        destination: PathBuf,
    },

    /// The destination already existed and the run was told to keep it
    Skipped {
        /// Owning card
        owner_id: String,
        /// Attachment not fetched
        attachment_id: String,
        /// Existing file
        destination: PathBuf,
    },

    /// The job failed
    Failed {
        /// Owning card
        owner_id: String,
        /// Attachment that failed
        attachment_id: String,
        /// Source URL
        url: String,
        /// Human-readable cause
        error: String,
        /// Machine-readable cause (see [`crate::Error::error_code`])
        code: String,
    },

    /// The run is over (emitted on success and on failure)
    RunFinished {
        /// Totals for the run
        summary: RunSummary,
    },
}

/// How a single job ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    /// Body written to the destination
    Completed {
        /// Bytes written
        bytes_written: u64,
    },
    /// Destination already existed and was kept
    Skipped,
    /// Run was stopped before this job began
    NotStarted,
}

/// Totals for a finished run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Jobs handed to the run
    pub total: usize,
    /// Jobs whose file was written
    pub completed: usize,
    /// Jobs skipped because the destination already existed
    pub skipped: usize,
    /// Jobs that failed
    pub failed: usize,
    /// Jobs never started because the run stopped early
    pub not_started: usize,
    /// Sum of bytes written by completed jobs
    pub bytes_written: u64,
}

impl RunSummary {
    /// True when no job failed and every job was handled
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.not_started == 0
    }
}
