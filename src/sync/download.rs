//! Download: remote tree -> files under a local destination.

use super::{
    run_job, Direction, FailureKind, FileContent, FileEntry, FileFailure, FileMode, FileOutcome,
    SyncError, SyncJob, SyncOptions,
};
use crate::github::{ApiError, GitHubApi, RepositoryRef, Tree, TreeEntryKind};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// List the repository tree and write every blob under `destination`.
///
/// Tree listing failures (including authentication) are job-fatal and
/// returned as `Err`. Everything after that is recorded per file.
/// Existing files are overwritten, so re-running yields the same file set.
pub fn start_download<A, P>(
    api: &A,
    repo: &RepositoryRef,
    destination: &Path,
    options: &SyncOptions,
    progress: P,
) -> Result<SyncJob, SyncError>
where
    A: GitHubApi + ?Sized,
    P: FnMut(&SyncJob, &FileOutcome),
{
    let tree = match api.get_tree(repo) {
        Ok(tree) => tree,
        // 409: the repository has no commits yet
        Err(ApiError::Conflict(message)) => {
            debug!(repo = %repo.full_name(), %message, "remote repository is empty");
            Tree {
                sha: String::new(),
                entries: Vec::new(),
                truncated: false,
            }
        }
        Err(err) => return Err(err.into()),
    };
    if tree.truncated {
        warn!(repo = %repo.full_name(), "tree listing truncated by GitHub, some files will be missing");
    }

    let entries = tree
        .entries
        .into_iter()
        .filter_map(|entry| match entry.kind {
            TreeEntryKind::Blob => Some(FileEntry::new(
                entry.path,
                FileContent::Blob {
                    sha: entry.sha,
                    size: entry.size,
                },
                FileMode::from_git_mode(&entry.mode),
            )),
            TreeEntryKind::Commit => {
                debug!(path = %entry.path, "skipping submodule");
                None
            }
            TreeEntryKind::Tree => None,
        })
        .collect();

    let mut job = SyncJob::new(Direction::Download, repo.clone(), entries)?;

    fs::create_dir_all(destination).map_err(|source| SyncError::Destination {
        path: destination.to_path_buf(),
        source,
    })?;

    run_job(
        &mut job,
        options,
        |entry| download_entry(api, repo, destination, entry),
        progress,
    );

    Ok(job)
}

fn download_entry<A>(
    api: &A,
    repo: &RepositoryRef,
    destination: &Path,
    entry: &FileEntry,
) -> Result<u64, FileFailure>
where
    A: GitHubApi + ?Sized,
{
    let target = resolve_target(destination, &entry.path)?;

    let bytes = match &entry.content {
        FileContent::Blob { sha, .. } => api.get_blob(repo, sha).map_err(fetch_failure)?,
        FileContent::Inline(bytes) => bytes.clone(),
        FileContent::Local(path) => fs::read(path)
            .map_err(|e| FileFailure::new(FailureKind::Fetch, format!("{}: {}", path.display(), e)))?,
    };

    write_file(&target, &bytes, entry.mode)
        .map_err(|e| FileFailure::new(FailureKind::Write, format!("{}: {}", target.display(), e)))?;

    debug!(path = %entry.path, bytes = bytes.len(), "file written");
    Ok(bytes.len() as u64)
}

fn fetch_failure(err: ApiError) -> FileFailure {
    let kind = match err {
        ApiError::Auth(_) => FailureKind::Auth,
        ApiError::RateLimited { .. } => FailureKind::RateLimit,
        _ => FailureKind::Fetch,
    };
    FileFailure::new(kind, err.to_string())
}

/// Join a remote path onto the destination, refusing anything that could escape it.
fn resolve_target(destination: &Path, relative: &str) -> Result<PathBuf, FileFailure> {
    let path = Path::new(relative);
    let safe = !relative.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if !safe {
        return Err(FileFailure::new(
            FailureKind::Write,
            format!("refusing to write outside destination: {}", relative),
        ));
    }

    Ok(destination.join(path))
}

/// Write through a uniquely named sibling temp file and rename it into place,
/// so a failed write never leaves a half-written target and never touches
/// another entry of the same tree.
fn write_file(target: &Path, bytes: &[u8], mode: FileMode) -> io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".repodeck-")
        .suffix(".part")
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    apply_mode(temp.as_file(), mode)?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Temp files are created `0600`; give the result normal checkout permissions.
#[cfg(unix)]
fn apply_mode(file: &fs::File, mode: FileMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bits = match mode {
        FileMode::Executable => 0o755,
        FileMode::Regular | FileMode::Symlink => 0o644,
    };
    file.set_permissions(fs::Permissions::from_mode(bits))
}

#[cfg(not(unix))]
fn apply_mode(_file: &fs::File, _mode: FileMode) -> io::Result<()> {
    Ok(())
}
