//! Sync module - Đồng bộ repository giữa GitHub và local directory.
//!
//! Module này chứa:
//! - [`SyncJob`] model với per-file outcomes
//! - Download: remote tree -> local files
//! - Upload: local files -> one contents API commit per file
//!
//! Files are processed sequentially. One file's failure never aborts the
//! others, except for authentication failures, which end the job.

pub mod download;
pub mod job;
pub mod upload;

#[cfg(test)]
pub(crate) mod fake;

pub use download::start_download;
pub use job::{
    Direction, FailureKind, FileContent, FileEntry, FileFailure, FileMode, FileOutcome, JobStatus,
    Outcome, SyncJob,
};
pub use upload::{collect_local_files, collect_sources, start_upload, start_upload_entries};

use crate::github::ApiError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that prevent a job from being built. Per-file errors never surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("duplicate path in job: {0}")]
    DuplicatePath(String),

    #[error("source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("source does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("cannot enumerate {}: {message}", .path.display())]
    Enumerate { path: PathBuf, message: String },

    #[error("cannot prepare destination {}: {source}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Best-effort cancellation, checked between files (never mid-transfer).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to do after a file hits the API rate limit. No automatic backoff either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitPolicy {
    /// Record the failure and keep going with the next file
    #[default]
    Continue,
    /// Record the failure and mark every remaining file as not attempted
    Stop,
}

/// Các tuỳ chọn cho sync operations
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub cancel: CancelToken,
    pub rate_limit: RateLimitPolicy,
    /// Commit message for uploaded files
    pub commit_message: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            rate_limit: RateLimitPolicy::default(),
            commit_message: crate::config::DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Drive a job file by file. `transfer` does one file; `progress` is called
/// after each attempted file.
pub(crate) fn run_job<T, P>(job: &mut SyncJob, options: &SyncOptions, mut transfer: T, mut progress: P)
where
    T: FnMut(&FileEntry) -> Result<u64, FileFailure>,
    P: FnMut(&SyncJob, &FileOutcome),
{
    job.begin();
    info!(
        repo = %job.repo().full_name(),
        direction = ?job.direction(),
        files = job.total_files(),
        "sync job started"
    );

    for index in 0..job.total_files() {
        if options.cancel.is_cancelled() {
            info!(remaining = job.total_files() - index, "sync job cancelled");
            job.abort_from(
                index,
                FileFailure::new(FailureKind::Cancelled, "cancelled before transfer"),
                FailureKind::Cancelled,
            );
            break;
        }

        let result = transfer(&job.entries()[index]);
        let stop = match &result {
            Err(failure) => {
                warn!(path = %job.entries()[index].path, kind = %failure.kind, reason = %failure.reason, "file failed");
                match failure.kind {
                    FailureKind::Auth => Some((
                        FileFailure::new(FailureKind::Auth, "not attempted: authentication failed"),
                        FailureKind::Auth,
                    )),
                    FailureKind::RateLimit if options.rate_limit == RateLimitPolicy::Stop => Some((
                        FileFailure::new(FailureKind::Cancelled, "not attempted: rate limit reached"),
                        FailureKind::RateLimit,
                    )),
                    _ => None,
                }
            }
            Ok(_) => None,
        };

        job.record(index, result);
        if let Some(last) = job.outcomes().last() {
            progress(job, last);
        }

        if let Some((failure, cause)) = stop {
            job.abort_from(index + 1, failure, cause);
            break;
        }
    }

    job.finish();
    info!(
        status = %job.status(),
        succeeded = job.succeeded_count(),
        failed = job.failed_count(),
        "sync job finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryRef;

    fn job(paths: &[&str]) -> SyncJob {
        let entries = paths.iter().map(|p| FileEntry::inline(*p, "x")).collect();
        SyncJob::new(
            Direction::Upload,
            RepositoryRef::new("octocat", "hello", "main"),
            entries,
        )
        .unwrap()
    }

    #[test]
    fn test_counts_always_add_up() {
        let mut job = job(&["a", "b", "c", "d"]);
        let mut seen = 0;
        run_job(
            &mut job,
            &SyncOptions::default(),
            |entry| match entry.path.as_str() {
                "b" => Err(FileFailure::new(FailureKind::Conflict, "changed")),
                "d" => Err(FileFailure::new(FailureKind::RateLimit, "slow down")),
                _ => Ok(1),
            },
            |job, _| {
                seen += 1;
                assert_eq!(job.status(), JobStatus::InProgress);
            },
        );

        assert_eq!(seen, 4);
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.succeeded_count() + job.failed_count(), job.total_files());
        assert_eq!(job.failed_count(), 2);
        assert_eq!(job.aborted(), None);
    }

    #[test]
    fn test_auth_failure_aborts_remaining_files() {
        let mut job = job(&["a", "b", "c"]);
        let mut attempted = Vec::new();
        run_job(
            &mut job,
            &SyncOptions::default(),
            |entry| {
                attempted.push(entry.path.clone());
                if entry.path == "b" {
                    Err(FileFailure::new(FailureKind::Auth, "Bad credentials"))
                } else {
                    Ok(1)
                }
            },
            |_, _| {},
        );

        assert_eq!(attempted, ["a", "b"]);
        assert_eq!(job.aborted(), Some(FailureKind::Auth));
        assert_eq!(job.status(), JobStatus::Completed);
        let kinds: Vec<_> = job.failures().map(|(p, f)| (p, f.kind)).collect();
        assert_eq!(kinds, [("b", FailureKind::Auth), ("c", FailureKind::Auth)]);
    }

    #[test]
    fn test_rate_limit_stop_policy() {
        let mut job = job(&["a", "b", "c"]);
        let options = SyncOptions {
            rate_limit: RateLimitPolicy::Stop,
            ..SyncOptions::default()
        };
        run_job(
            &mut job,
            &options,
            |_| Err(FileFailure::new(FailureKind::RateLimit, "rate limit exceeded")),
            |_, _| {},
        );

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.aborted(), Some(FailureKind::RateLimit));
        let kinds: Vec<_> = job.failures().map(|(_, f)| f.kind).collect();
        assert_eq!(
            kinds,
            [
                FailureKind::RateLimit,
                FailureKind::Cancelled,
                FailureKind::Cancelled
            ]
        );
    }

    #[test]
    fn test_cancel_between_files() {
        let mut job = job(&["a", "b", "c"]);
        let options = SyncOptions::default();
        let cancel = options.cancel.clone();
        run_job(
            &mut job,
            &options,
            |_| {
                cancel.cancel();
                Ok(3)
            },
            |_, _| {},
        );

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.succeeded_count(), 1);
        assert_eq!(job.aborted(), Some(FailureKind::Cancelled));
        assert_eq!(job.failed_count(), 2);
    }

    #[test]
    fn test_cancelled_before_start_is_failed() {
        let mut job = job(&["a"]);
        let options = SyncOptions::default();
        options.cancel.cancel();
        run_job(&mut job, &options, |_| Ok(1), |_, _| panic!("nothing attempted"));

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.failed_count(), 1);
    }
}
