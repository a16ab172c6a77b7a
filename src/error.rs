//! Error types for board-attachments
//!
//! This module provides the error taxonomy of the extraction and download pipeline:
//! - [`DocumentError`] - the export cannot be read or parsed (fatal, before any job)
//! - [`DirectoryError`] - a per-owner destination directory cannot be created
//! - [`RetrievalError`] - fetching or writing a single attachment failed
//! - [`Error`] - crate-level error carrying owner/attachment context
//!
//! Per-item extraction problems are not errors; see [`crate::export::ExtractionWarning`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for board-attachments operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for board-attachments
///
/// Job-level variants always carry the owning card and attachment identity so that
/// the final message of a failed run names the job that was being processed.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// The export document could not be loaded
    #[error("export error: {0}")]
    Document(#[from] DocumentError),

    /// The destination directory of a job could not be created
    #[error("attachment {attachment_id} of {owner_id}: {source}")]
    Directory {
        /// Owning card identity
        owner_id: String,
        /// Attachment identity
        attachment_id: String,
        /// Underlying directory failure
        #[source]
        source: DirectoryError,
    },

    /// The attachment could not be retrieved or written
    #[error("attachment {attachment_id} of {owner_id} ({url}): {source}")]
    Retrieval {
        /// Owning card identity
        owner_id: String,
        /// Attachment identity
        attachment_id: String,
        /// Source URL of the attachment
        url: String,
        /// Underlying retrieval failure
        #[source]
        source: RetrievalError,
    },

    /// Run finished in continue-on-error mode with failed jobs
    #[error("{failed} of {total} attachments failed to download")]
    Incomplete {
        /// Number of failed jobs
        failed: usize,
        /// Number of jobs in the run
        total: usize,
    },

    /// Run was interrupted before all jobs were processed
    #[error("download run cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while turning raw bytes into an [`crate::export::ExportDocument`]
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The export file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the export file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not an export document (not an object, missing `cards`, wrong types)
    #[error("malformed export document: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// A per-owner destination directory could not be created
#[derive(Debug, Error)]
#[error("failed to create directory {path}: {source}")]
pub struct DirectoryError {
    /// Directory that could not be created
    pub path: PathBuf,
    /// Underlying I/O error
    #[source]
    pub source: std::io::Error,
}

/// Retrieval failures for a single attachment
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Connection or transport failure
    #[error("network error fetching {url}: {message}")]
    Network {
        /// URL being fetched
        url: String,
        /// Transport error description
        message: String,
    },

    /// Remote host answered with a non-success status
    #[error("HTTP status {status} fetching {url}")]
    Status {
        /// URL being fetched
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Request or body transfer exceeded the configured timeout
    #[error("timed out fetching {url}")]
    Timeout {
        /// URL being fetched
        url: String,
    },

    /// Body length did not match the declared Content-Length
    #[error("truncated body from {url}: expected {expected} bytes, received {received}")]
    Truncated {
        /// URL being fetched
        url: String,
        /// Declared length
        expected: u64,
        /// Bytes actually received
        received: u64,
    },

    /// Local file could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Transfer aborted by shutdown
    #[error("transfer of {url} cancelled")]
    Cancelled {
        /// URL being fetched
        url: String,
    },
}

impl RetrievalError {
    /// Classify a reqwest error into network/timeout variants
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            RetrievalError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            RetrievalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            RetrievalError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Document(DocumentError::Read { .. }) => "document_read_failed",
            Error::Document(DocumentError::Malformed(_)) => "document_malformed",
            Error::Directory { .. } => "directory_error",
            Error::Retrieval { source, .. } => match source {
                RetrievalError::Network { .. } => "network_error",
                RetrievalError::Status { .. } => "http_status",
                RetrievalError::Timeout { .. } => "timeout",
                RetrievalError::Truncated { .. } => "truncated_body",
                RetrievalError::Write { .. } => "write_failed",
                RetrievalError::Cancelled { .. } => "cancelled",
            },
            Error::Incomplete { .. } => "incomplete",
            Error::Cancelled => "cancelled",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the error ends the run under the fail-fast policy
    pub fn is_job_failure(&self) -> bool {
        matches!(self, Error::Directory { .. } | Error::Retrieval { .. })
    }
}
