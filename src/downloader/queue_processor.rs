//! Queue processor: feeds jobs to a bounded set of concurrent workers.

use futures::StreamExt;
use futures::stream;

use super::AttachmentDownloader;
use crate::config::FailurePolicy;
use crate::error::{Error, Result};
use crate::types::{DownloadJob, Event, JobOutcome, RunSummary};

impl AttachmentDownloader {
    /// Download every job and report the totals
    ///
    /// Jobs are pulled lazily from `jobs` and run at most
    /// `max_concurrent_downloads` at a time (1 = strictly sequential, in order).
    ///
    /// Under [`FailurePolicy::FailFast`] the first failure stops scheduling: jobs
    /// already in flight finish, later jobs never start, and that failure is
    /// returned. Under [`FailurePolicy::ContinueOnError`] every job is attempted and
    /// [`Error::Incomplete`] is returned if any failed.
    ///
    /// A [`Event::RunFinished`] event is emitted in every case.
    ///
    /// # Errors
    ///
    /// - [`Error::Directory`] / [`Error::Retrieval`] for the first failed job (fail-fast)
    /// - [`Error::Incomplete`] when jobs failed in continue-on-error mode
    /// - [`Error::Cancelled`] when [`AttachmentDownloader::shutdown`] interrupted the run
    pub async fn run<I>(&self, jobs: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = DownloadJob>,
        I::IntoIter: Send,
    {
        let run_token = self.shutdown.child_token();
        let concurrency = self.config.max_concurrent_downloads.max(1);

        tracing::info!(
            output_dir = %self.config.output_dir.display(),
            concurrency,
            policy = ?self.config.failure_policy,
            "Starting attachment downloads"
        );

        let mut results = stream::iter(jobs)
            .map(|job| {
                let token = run_token.clone();
                async move {
                    let outcome = self.run_job(&job, &token).await;
                    (job, outcome)
                }
            })
            .buffer_unordered(concurrency);

        let mut summary = RunSummary::default();
        let mut first_error: Option<Error> = None;

        while let Some((job, outcome)) = results.next().await {
            summary.total += 1;
            match outcome {
                Ok(JobOutcome::Completed { bytes_written }) => {
                    summary.completed += 1;
                    summary.bytes_written += bytes_written;
                }
                Ok(JobOutcome::Skipped) => summary.skipped += 1,
                Ok(JobOutcome::NotStarted) => summary.not_started += 1,
                Err(e) => {
                    summary.failed += 1;
                    if first_error.is_none() {
                        if self.config.failure_policy == FailurePolicy::FailFast {
                            tracing::error!(
                                owner_id = %job.owner_id,
                                attachment_id = %job.attachment_id,
                                "Stopping run after failed attachment"
                            );
                        }
                        first_error = Some(e);
                    }
                }
            }
        }
        drop(results);

        tracing::info!(
            total = summary.total,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            not_started = summary.not_started,
            bytes = summary.bytes_written,
            "Attachment run finished"
        );
        self.emit(Event::RunFinished {
            summary: summary.clone(),
        });

        if self.shutdown.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match (self.config.failure_policy, first_error) {
            (_, None) => Ok(summary),
            (FailurePolicy::FailFast, Some(e)) => Err(e),
            (FailurePolicy::ContinueOnError, Some(_)) => Err(Error::Incomplete {
                failed: summary.failed,
                total: summary.total,
            }),
        }
    }
}
