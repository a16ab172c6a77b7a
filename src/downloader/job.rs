//! Single job execution: destination directory, retrieval, streaming write.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::AttachmentDownloader;
use crate::config::{ExistingFileAction, FailurePolicy};
use crate::error::{Error, RetrievalError, Result};
use crate::retry::fetch_with_retry;
use crate::types::{DownloadJob, Event, JobOutcome};
use crate::utils::{destination_path, ensure_dir, owner_dir};

/// Suffix of the file a body is streamed into before it replaces the destination
const PARTIAL_SUFFIX: &str = ".part";

impl AttachmentDownloader {
    /// Run one job unless the run has already been stopped
    ///
    /// A failure is logged, emitted as [`Event::Failed`], and under fail-fast cancels
    /// `run_token` so that no further job begins.
    pub(super) async fn run_job(
        &self,
        job: &DownloadJob,
        run_token: &CancellationToken,
    ) -> Result<JobOutcome> {
        if run_token.is_cancelled() {
            return Ok(JobOutcome::NotStarted);
        }

        let result = self.execute(job).await;

        if let Err(e) = &result {
            tracing::error!(
                owner_id = %job.owner_id,
                attachment_id = %job.attachment_id,
                url = %job.source_url,
                error = %e,
                "Could not download attachment"
            );
            self.emit(Event::Failed {
                owner_id: job.owner_id.clone(),
                attachment_id: job.attachment_id.clone(),
                url: job.source_url.clone(),
                error: e.to_string(),
                code: e.error_code().to_string(),
            });
            if self.config.failure_policy == FailurePolicy::FailFast {
                run_token.cancel();
            }
        }

        result
    }

    async fn execute(&self, job: &DownloadJob) -> Result<JobOutcome> {
        let output_root = &self.config.output_dir;
        let destination = destination_path(output_root, job, self.config.file_naming);

        tracing::info!(
            owner_id = %job.owner_id,
            attachment_id = %job.attachment_id,
            url = %job.source_url,
            "Processing attachment"
        );
        self.emit(Event::Started {
            owner_id: job.owner_id.clone(),
            attachment_id: job.attachment_id.clone(),
            url: job.source_url.clone(),
        });

        ensure_dir(&owner_dir(output_root, &job.owner_id))
            .await
            .map_err(|source| Error::Directory {
                owner_id: job.owner_id.clone(),
                attachment_id: job.attachment_id.clone(),
                source,
            })?;

        if self.config.existing_files == ExistingFileAction::Skip
            && self.destination_exists(&destination).await
        {
            tracing::info!(
                owner_id = %job.owner_id,
                attachment_id = %job.attachment_id,
                path = %destination.display(),
                "Attachment already present, skipping"
            );
            self.emit(Event::Skipped {
                owner_id: job.owner_id.clone(),
                attachment_id: job.attachment_id.clone(),
                destination,
            });
            return Ok(JobOutcome::Skipped);
        }

        let bytes_written = fetch_with_retry(&self.config.retry, || {
            self.transfer(&job.source_url, &destination)
        })
        .await
        .map_err(|source| Error::Retrieval {
            owner_id: job.owner_id.clone(),
            attachment_id: job.attachment_id.clone(),
            url: job.source_url.clone(),
            source,
        })?;

        tracing::info!(
            owner_id = %job.owner_id,
            attachment_id = %job.attachment_id,
            path = %destination.display(),
            bytes = bytes_written,
            "Finished download"
        );
        self.emit(Event::Completed {
            owner_id: job.owner_id.clone(),
            attachment_id: job.attachment_id.clone(),
            bytes_written,
            destination,
        });

        Ok(JobOutcome::Completed { bytes_written })
    }

    /// Whether a destination is already on disk; an unreadable one counts as absent
    async fn destination_exists(&self, destination: &Path) -> bool {
        match tokio::fs::try_exists(destination).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(
                    path = %destination.display(),
                    error = %e,
                    "Could not check for an existing file, downloading again"
                );
                false
            }
        }
    }

    /// One retrieval attempt: stream into `<destination>.part`, then rename over `destination`
    ///
    /// The partial file is removed on any failure. Shutdown aborts the transfer.
    async fn transfer(
        &self,
        url: &str,
        destination: &Path,
    ) -> std::result::Result<u64, RetrievalError> {
        let partial = partial_path(destination);

        let streamed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(RetrievalError::Cancelled {
                url: url.to_string(),
            }),
            result = self.stream_to_file(url, &partial) => result,
        };

        let result = match streamed {
            Ok(bytes) => tokio::fs::rename(&partial, destination)
                .await
                .map(|()| bytes)
                .map_err(|source| RetrievalError::Write {
                    path: destination.to_path_buf(),
                    source,
                }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            // Nothing to clean up if the request failed before the file was created
            tokio::fs::remove_file(&partial).await.ok();
        }
        result
    }

    async fn stream_to_file(
        &self,
        url: &str,
        path: &Path,
    ) -> std::result::Result<u64, RetrievalError> {
        let write_error = |source: std::io::Error| RetrievalError::Write {
            path: path.to_path_buf(),
            source,
        };

        let body = self.fetcher.fetch(url).await?;
        let mut file = tokio::fs::File::create(path).await.map_err(write_error)?;

        let mut written: u64 = 0;
        let mut stream = body.stream;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;

        if let Some(expected) = body.content_length
            && expected != written
        {
            return Err(RetrievalError::Truncated {
                url: url.to_string(),
                expected,
                received: written,
            });
        }

        Ok(written)
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
