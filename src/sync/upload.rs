//! Upload: local directory -> one create-or-update contents call per file.

use super::{
    run_job, Direction, FailureKind, FileContent, FileEntry, FileFailure, FileMode, FileOutcome,
    RateLimitPolicy, SyncError, SyncJob, SyncOptions,
};
use crate::github::{ApiError, GitHubApi, PutFile, RepositoryRef, TreeEntryKind};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Enumerate regular files under `source`, skipping `.git`. Paths are
/// relative and `/`-separated, in a stable order.
pub fn collect_local_files(source: &Path) -> Result<Vec<FileEntry>, SyncError> {
    if !source.is_dir() {
        return Err(SyncError::SourceNotDirectory(source.to_path_buf()));
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for item in walker {
        let item = item.map_err(|e| SyncError::Enumerate {
            path: e.path().unwrap_or(source).to_path_buf(),
            message: e.to_string(),
        })?;

        if item.file_type().is_symlink() {
            debug!(path = %item.path().display(), "skipping symlink");
            continue;
        }
        if !item.file_type().is_file() {
            continue;
        }

        let relative = item
            .path()
            .strip_prefix(source)
            .map_err(|e| SyncError::Enumerate {
                path: item.path().to_path_buf(),
                message: e.to_string(),
            })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            let part = component.as_os_str().to_str().ok_or_else(|| SyncError::Enumerate {
                path: item.path().to_path_buf(),
                message: "path is not valid UTF-8".to_string(),
            })?;
            parts.push(part);
        }

        entries.push(FileEntry::new(
            parts.join("/"),
            FileContent::Local(item.path().to_path_buf()),
            FileMode::Regular,
        ));
    }

    Ok(entries)
}

/// Entries for a mix of directories and single files. A directory
/// contributes its tree relative to itself; a file lands at the repository
/// root under its own name. Name clashes surface as duplicate paths when
/// the job is built.
pub fn collect_sources(sources: &[PathBuf]) -> Result<Vec<FileEntry>, SyncError> {
    let mut entries = Vec::new();
    for source in sources {
        if source.is_dir() {
            entries.extend(collect_local_files(source)?);
        } else if source.is_file() {
            let name = source
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| SyncError::Enumerate {
                    path: source.clone(),
                    message: "file name is not valid UTF-8".to_string(),
                })?;
            entries.push(FileEntry::new(
                name,
                FileContent::Local(source.clone()),
                FileMode::Regular,
            ));
        } else {
            return Err(SyncError::SourceNotFound(source.clone()));
        }
    }
    Ok(entries)
}

/// Upload every file under `source` to `repo`'s default branch.
pub fn start_upload<A, P>(
    api: &A,
    source: &Path,
    repo: &RepositoryRef,
    options: &SyncOptions,
    progress: P,
) -> Result<SyncJob, SyncError>
where
    A: GitHubApi + ?Sized,
    P: FnMut(&SyncJob, &FileOutcome),
{
    let entries = collect_local_files(source)?;
    info!(source = %source.display(), files = entries.len(), "collected local files");
    start_upload_entries(api, repo, entries, options, progress)
}

/// Upload an explicit set of entries.
///
/// The remote tree is read once up front to learn the known blob sha of
/// each path. A file whose remote copy changed after that point fails with
/// `Conflict`; nothing is merged or force-overwritten. An authentication
/// failure on that first call ends the job before any file is attempted.
pub fn start_upload_entries<A, P>(
    api: &A,
    repo: &RepositoryRef,
    entries: Vec<FileEntry>,
    options: &SyncOptions,
    progress: P,
) -> Result<SyncJob, SyncError>
where
    A: GitHubApi + ?Sized,
    P: FnMut(&SyncJob, &FileOutcome),
{
    let mut job = SyncJob::new(Direction::Upload, repo.clone(), entries)?;
    if job.total_files() == 0 {
        job.begin();
        job.finish();
        return Ok(job);
    }

    let known = match known_remote_state(api, repo) {
        Ok(known) => known,
        Err(err @ (ApiError::Auth(_) | ApiError::RateLimited { .. })) => {
            let failure = upload_failure(err);
            info!(repo = %repo.full_name(), error = %failure.reason, "no file attempted");
            job.begin();
            match (failure.kind, options.rate_limit) {
                // only Stop marks the job aborted
                (FailureKind::RateLimit, RateLimitPolicy::Continue) => job.fail_from(0, failure),
                (kind, _) => job.abort_from(0, failure, kind),
            }
            job.finish();
            return Ok(job);
        }
        Err(other) => return Err(other.into()),
    };

    run_job(
        &mut job,
        options,
        |entry| {
            let sha = known.get(&entry.path).map(String::as_str);
            upload_entry(api, repo, entry, sha, &options.commit_message)
        },
        progress,
    );

    Ok(job)
}

/// path -> blob sha on the default branch. Empty repositories (409) and
/// missing branches (404) have no known files. A 404 is only read as a
/// missing branch once the repository itself is confirmed to exist.
fn known_remote_state<A>(api: &A, repo: &RepositoryRef) -> Result<HashMap<String, String>, ApiError>
where
    A: GitHubApi + ?Sized,
{
    match api.get_tree(repo) {
        Ok(tree) => Ok(tree
            .entries
            .into_iter()
            .filter(|e| e.kind == TreeEntryKind::Blob)
            .map(|e| (e.path, e.sha))
            .collect()),
        Err(ApiError::Conflict(_)) => {
            debug!(repo = %repo.full_name(), "remote repository is empty");
            Ok(HashMap::new())
        }
        Err(ApiError::NotFound(_)) => {
            api.get_repository(&repo.owner, &repo.name)?;
            debug!(repo = %repo.full_name(), branch = %repo.default_branch, "remote branch does not exist yet");
            Ok(HashMap::new())
        }
        Err(err) => Err(err),
    }
}

fn upload_entry<A>(
    api: &A,
    repo: &RepositoryRef,
    entry: &FileEntry,
    known_sha: Option<&str>,
    message: &str,
) -> Result<u64, FileFailure>
where
    A: GitHubApi + ?Sized,
{
    let bytes = match &entry.content {
        FileContent::Inline(bytes) => bytes.clone(),
        FileContent::Local(path) => fs::read(path)
            .map_err(|e| FileFailure::new(FailureKind::Read, format!("{}: {}", path.display(), e)))?,
        FileContent::Blob { sha, .. } => {
            return Err(FileFailure::new(
                FailureKind::Read,
                format!("remote blob {} has no local content to upload", sha),
            ));
        }
    };

    let request = PutFile {
        path: &entry.path,
        content: &bytes,
        message,
        branch: &repo.default_branch,
        sha: known_sha,
    };

    let result = api.put_file(repo, &request).map_err(upload_failure)?;
    debug!(
        path = %entry.path,
        blob = %result.blob_sha,
        commit = %result.commit_sha,
        "file uploaded"
    );
    Ok(bytes.len() as u64)
}

fn upload_failure(err: ApiError) -> FileFailure {
    let kind = match &err {
        ApiError::Auth(_) => FailureKind::Auth,
        ApiError::RateLimited { .. } => FailureKind::RateLimit,
        ApiError::Conflict(_) => FailureKind::Conflict,
        // 422 when a file appeared remotely after the known state was taken
        ApiError::Validation(message) if message.contains("sha") => FailureKind::Conflict,
        _ => FailureKind::Push,
    };
    FileFailure::new(kind, err.to_string())
}
