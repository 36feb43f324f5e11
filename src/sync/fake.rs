//! In-memory [`GitHubApi`] used by the workflow tests.

use crate::github::{
    ApiError, GitHubApi, NewRepository, PutFile, PutFileResult, RepoInfo, RepoOwner,
    RepositoryRef, Tree, TreeEntry, TreeEntryKind, UserInfo, Visibility,
};
use std::cell::RefCell;
use std::collections::HashMap;

/// Remote repository state plus scripted failures. Every call is logged.
#[derive(Default)]
pub struct FakeGitHub {
    /// path -> (blob sha, bytes, git mode)
    pub files: RefCell<HashMap<String, (String, Vec<u8>, String)>>,
    /// Error returned by every call when set (e.g. a revoked token)
    pub fail_all: Option<ApiError>,
    /// Error returned by `get_tree` when set
    pub tree_error: Option<ApiError>,
    /// `get_repository` answers 404
    pub repo_missing: bool,
    /// blob sha -> error for `get_blob`
    pub blob_errors: HashMap<String, ApiError>,
    /// path -> error for `put_file`
    pub put_errors: HashMap<String, ApiError>,
    pub calls: RefCell<Vec<String>>,
    pub next_sha: RefCell<u32>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        self.with_file_mode(path, bytes, "100644")
    }

    pub fn with_file_mode(self, path: &str, bytes: &[u8], mode: &str) -> Self {
        let sha = self.mint_sha();
        self.files
            .borrow_mut()
            .insert(path.to_string(), (sha, bytes.to_vec(), mode.to_string()));
        self
    }

    pub fn sha_of(&self, path: &str) -> String {
        self.files.borrow()[path].0.clone()
    }

    pub fn content_of(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).map(|(_, bytes, _)| bytes.clone())
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn mint_sha(&self) -> String {
        let mut next = self.next_sha.borrow_mut();
        *next += 1;
        format!("sha{:04}", *next)
    }

    fn log(&self, call: String) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(call);
        match &self.fail_all {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl GitHubApi for FakeGitHub {
    fn authenticated_user(&self) -> Result<UserInfo, ApiError> {
        self.log("user".to_string())?;
        Ok(UserInfo {
            login: "octocat".to_string(),
            name: None,
            email: None,
            public_repos: 1,
            total_private_repos: 0,
            avatar_url: None,
        })
    }

    fn list_repositories(&self, _visibility: Visibility) -> Result<Vec<RepoInfo>, ApiError> {
        self.log("list".to_string())?;
        Ok(Vec::new())
    }

    fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryRef, ApiError> {
        self.log(format!("repo {}/{}", owner, name))?;
        if self.repo_missing {
            return Err(ApiError::NotFound(format!("{}/{}", owner, name)));
        }
        Ok(RepositoryRef::new(owner, name, "main"))
    }

    fn get_tree(&self, _repo: &RepositoryRef) -> Result<Tree, ApiError> {
        self.log("tree".to_string())?;
        if let Some(err) = &self.tree_error {
            return Err(err.clone());
        }

        let mut entries: Vec<TreeEntry> = self
            .files
            .borrow()
            .iter()
            .map(|(path, (sha, bytes, mode))| TreeEntry {
                path: path.clone(),
                mode: mode.clone(),
                kind: TreeEntryKind::Blob,
                sha: sha.clone(),
                size: Some(bytes.len() as u64),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Tree {
            sha: "root".to_string(),
            entries,
            truncated: false,
        })
    }

    fn get_blob(&self, _repo: &RepositoryRef, sha: &str) -> Result<Vec<u8>, ApiError> {
        self.log(format!("blob {}", sha))?;
        if let Some(err) = self.blob_errors.get(sha) {
            return Err(err.clone());
        }
        self.files
            .borrow()
            .values()
            .find(|(s, _, _)| s == sha)
            .map(|(_, bytes, _)| bytes.clone())
            .ok_or_else(|| ApiError::NotFound(format!("blob {}", sha)))
    }

    fn put_file(&self, _repo: &RepositoryRef, file: &PutFile<'_>) -> Result<PutFileResult, ApiError> {
        self.log(format!("put {}", file.path))?;
        if let Some(err) = self.put_errors.get(file.path) {
            return Err(err.clone());
        }

        let current = self.files.borrow().get(file.path).map(|(sha, _, _)| sha.clone());
        match (current.as_deref(), file.sha) {
            (Some(remote), Some(known)) if remote != known => {
                return Err(ApiError::Conflict(format!(
                    "{} does not match {}",
                    file.path, known
                )));
            }
            (Some(_), None) => {
                return Err(ApiError::Validation(
                    "Invalid request.\n\n\"sha\" wasn't supplied.".to_string(),
                ));
            }
            _ => {}
        }

        let sha = self.mint_sha();
        self.files.borrow_mut().insert(
            file.path.to_string(),
            (sha.clone(), file.content.to_vec(), "100644".to_string()),
        );
        Ok(PutFileResult {
            blob_sha: sha,
            commit_sha: self.mint_sha(),
        })
    }

    fn create_repository(&self, request: &NewRepository) -> Result<RepoInfo, ApiError> {
        self.log(format!("create {}", request.name))?;
        Ok(RepoInfo {
            name: request.name.clone(),
            full_name: format!("octocat/{}", request.name),
            owner: RepoOwner {
                login: "octocat".to_string(),
            },
            description: Some(request.description.clone()),
            private: request.private,
            clone_url: format!("https://github.com/octocat/{}.git", request.name),
            html_url: format!("https://github.com/octocat/{}", request.name),
            language: None,
            size: 0,
            stars: 0,
            forks: 0,
            default_branch: "main".to_string(),
            updated_at: None,
        })
    }
}
