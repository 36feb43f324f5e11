//! SyncJob model: one download or upload and its per-file outcomes.

use super::SyncError;
use crate::github::RepositoryRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

/// `Pending -> InProgress -> {Completed, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
    Symlink,
}

impl FileMode {
    /// Git tree modes: `100755` executable, `120000` symlink, anything else regular.
    pub fn from_git_mode(mode: &str) -> Self {
        match mode {
            "100755" => FileMode::Executable,
            "120000" => FileMode::Symlink,
            _ => FileMode::Regular,
        }
    }
}

/// Where a file's bytes come from. Resolved explicitly before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Bytes already in memory.
    Inline(Vec<u8>),
    /// Remote blob, fetched on demand.
    Blob { sha: String, size: Option<u64> },
    /// Local file, read on demand.
    Local(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative, `/`-separated. Unique within a job.
    pub path: String,
    pub content: FileContent,
    pub mode: FileMode,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: FileContent, mode: FileMode) -> Self {
        Self {
            path: path.into(),
            content,
            mode,
        }
    }

    pub fn inline(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(path, FileContent::Inline(bytes.into()), FileMode::Regular)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Network, decode or 404 while fetching remote content
    Fetch,
    /// Local I/O while writing, or a path escaping the destination
    Write,
    /// Local I/O while reading a file to upload
    Read,
    /// Token missing, invalid or expired
    Auth,
    /// Remote changed since the known state
    Conflict,
    RateLimit,
    /// Any other API failure on upload
    Push,
    /// Not attempted: job cancelled or aborted
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Fetch => "FetchError",
            FailureKind::Write => "WriteError",
            FailureKind::Read => "ReadError",
            FailureKind::Auth => "AuthError",
            FailureKind::Conflict => "ConflictError",
            FailureKind::RateLimit => "RateLimitError",
            FailureKind::Push => "PushError",
            FailureKind::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// A per-file failure before it is recorded into the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl FileFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { bytes: u64 },
    Failed(FileFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub outcome: Outcome,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }

    pub fn failure(&self) -> Option<&FileFailure> {
        match &self.outcome {
            Outcome::Failed(failure) => Some(failure),
            Outcome::Succeeded { .. } => None,
        }
    }
}

/// One download or upload. Owned by the invoking request, never persisted.
#[derive(Debug, Clone)]
pub struct SyncJob {
    direction: Direction,
    repo: RepositoryRef,
    entries: Vec<FileEntry>,
    status: JobStatus,
    outcomes: Vec<FileOutcome>,
    aborted: Option<FailureKind>,
}

impl SyncJob {
    /// Build a pending job. Duplicate paths are rejected here, never mid-transfer.
    pub fn new(
        direction: Direction,
        repo: RepositoryRef,
        entries: Vec<FileEntry>,
    ) -> Result<Self, SyncError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.path.as_str()) {
                return Err(SyncError::DuplicatePath(entry.path.clone()));
            }
        }

        Ok(Self {
            direction,
            repo,
            entries,
            status: JobStatus::Pending,
            outcomes: Vec::new(),
            aborted: None,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn repo(&self) -> &RepositoryRef {
        &self.repo
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// Why the job stopped early, if it did.
    pub fn aborted(&self) -> Option<FailureKind> {
        self.aborted
    }

    pub fn total_files(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FileFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure().map(|f| (o.path.as_str(), f)))
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.outcome {
                Outcome::Succeeded { bytes } => bytes,
                Outcome::Failed(_) => 0,
            })
            .sum()
    }

    pub(crate) fn begin(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::InProgress;
        }
    }

    pub(crate) fn record(&mut self, index: usize, result: Result<u64, FileFailure>) {
        let outcome = match result {
            Ok(bytes) => Outcome::Succeeded { bytes },
            Err(failure) => Outcome::Failed(failure),
        };
        self.outcomes.push(FileOutcome {
            path: self.entries[index].path.clone(),
            outcome,
        });
    }

    /// Record every entry from `from` onwards with the same failure.
    pub(crate) fn fail_from(&mut self, from: usize, failure: FileFailure) {
        for index in from..self.entries.len() {
            self.record(index, Err(failure.clone()));
        }
    }

    /// Like [`fail_from`](Self::fail_from), and mark the job as stopped early.
    pub(crate) fn abort_from(&mut self, from: usize, failure: FileFailure, cause: FailureKind) {
        self.fail_from(from, failure);
        self.aborted = Some(cause);
    }

    /// Settle the terminal state. `Failed` only when nothing succeeded and
    /// there was something to do; partial success is `Completed`.
    pub(crate) fn finish(&mut self) {
        debug_assert_eq!(self.outcomes.len(), self.entries.len());
        self.status = if self.total_files() > 0 && self.succeeded_count() == 0 {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("octocat", "hello", "main")
    }

    #[test]
    fn test_duplicate_paths_rejected_at_creation() {
        let entries = vec![
            FileEntry::inline("a.txt", "1"),
            FileEntry::inline("b.txt", "2"),
            FileEntry::inline("a.txt", "3"),
        ];
        let err = SyncJob::new(Direction::Upload, repo(), entries).unwrap_err();
        assert!(matches!(err, SyncError::DuplicatePath(ref p) if p == "a.txt"));
    }

    #[test]
    fn test_empty_job_completes() {
        let mut job = SyncJob::new(Direction::Download, repo(), Vec::new()).unwrap();
        assert_eq!(job.status(), JobStatus::Pending);
        job.begin();
        job.finish();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.failures().count(), 0);
    }

    #[test]
    fn test_partial_success_is_completed() {
        let entries = vec![FileEntry::inline("a", "x"), FileEntry::inline("b", "yy")];
        let mut job = SyncJob::new(Direction::Upload, repo(), entries).unwrap();
        job.begin();
        job.record(0, Err(FileFailure::new(FailureKind::Conflict, "sha mismatch")));
        job.record(1, Ok(2));
        job.finish();

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.succeeded_count(), 1);
        assert_eq!(job.failed_count(), 1);
        assert_eq!(job.bytes_transferred(), 2);
        let failures: Vec<_> = job.failures().map(|(p, f)| (p, f.kind)).collect();
        assert_eq!(failures, [("a", FailureKind::Conflict)]);
    }

    #[test]
    fn test_abort_before_any_success_is_failed() {
        let entries = vec![FileEntry::inline("a", "x"), FileEntry::inline("b", "y")];
        let mut job = SyncJob::new(Direction::Upload, repo(), entries).unwrap();
        job.begin();
        job.abort_from(
            0,
            FileFailure::new(FailureKind::Cancelled, "cancelled"),
            FailureKind::Cancelled,
        );
        job.finish();

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.aborted(), Some(FailureKind::Cancelled));
        assert_eq!(job.failed_count(), job.total_files());
    }

    #[test]
    fn test_git_mode_mapping() {
        assert_eq!(FileMode::from_git_mode("100755"), FileMode::Executable);
        assert_eq!(FileMode::from_git_mode("120000"), FileMode::Symlink);
        assert_eq!(FileMode::from_git_mode("100644"), FileMode::Regular);
    }
}
