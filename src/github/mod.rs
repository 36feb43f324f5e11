//! GitHub module - Adapter cho GitHub REST API.
//!
//! Module này chứa:
//! - [`GitHubApi`]: the narrow interface the sync workflow depends on
//! - [`GitHubClient`]: blocking `reqwest` implementation authenticated with a PAT
//! - Repository listing helpers (visibility filter, search, reference parsing)

pub mod client;
pub mod error;
pub mod repos;

pub use client::GitHubClient;
pub use error::ApiError;
pub use repos::{search_repositories, RepoSpec};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a remote repository. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
}

impl RepositoryRef {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        default_branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            default_branch: default_branch.into(),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

/// One repository as returned by `GET /user/repos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub clone_url: String,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Size in KB, as reported by GitHub
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "stargazers_count")]
    pub stars: u64,
    #[serde(default, rename = "forks_count")]
    pub forks: u64,
    /// Missing on brand-new empty repositories
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_branch_name() -> String {
    "main".to_string()
}

impl RepoInfo {
    pub fn to_ref(&self) -> RepositoryRef {
        RepositoryRef::new(&self.owner.login, &self.name, &self.default_branch)
    }
}

/// Authenticated user, from `GET /user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub total_private_repos: u64,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.login)
    }

    pub fn total_repos(&self) -> u64 {
        self.public_repos + self.total_private_repos
    }
}

/// Visibility filter cho repository listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Visibility {
    #[default]
    All,
    Public,
    Private,
}

impl Visibility {
    pub fn as_query(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    /// Submodule pointer
    Commit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    /// Git file mode, e.g. `100644`, `100755`, `120000`
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Recursive tree listing of one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub sha: String,
    #[serde(rename = "tree")]
    pub entries: Vec<TreeEntry>,
    /// GitHub caps recursive listings; `true` means entries are incomplete
    #[serde(default)]
    pub truncated: bool,
}

impl Tree {
    /// Direct children of directory `dir` (`""` for the root), directories
    /// first, then by name. A `dir` naming a file yields just that file.
    pub fn children(&self, dir: &str) -> Vec<&TreeEntry> {
        let dir = dir.trim_matches('/');
        if let Some(file) = self
            .entries
            .iter()
            .find(|e| e.path == dir && e.kind != TreeEntryKind::Tree)
        {
            return vec![file];
        }

        let mut children: Vec<&TreeEntry> = self
            .entries
            .iter()
            .filter(|e| {
                let rest = if dir.is_empty() {
                    Some(e.path.as_str())
                } else {
                    e.path
                        .strip_prefix(dir)
                        .and_then(|r| r.strip_prefix('/'))
                };
                rest.is_some_and(|r| !r.is_empty() && !r.contains('/'))
            })
            .collect();

        children.sort_by(|a, b| {
            let a_file = a.kind != TreeEntryKind::Tree;
            let b_file = b.kind != TreeEntryKind::Tree;
            a_file.cmp(&b_file).then_with(|| a.name().cmp(b.name()))
        });
        children
    }
}

/// Create-or-update of a single file through the contents API.
#[derive(Debug, Clone)]
pub struct PutFile<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub message: &'a str,
    pub branch: &'a str,
    /// Blob sha of the file being replaced. `None` creates a new file.
    pub sha: Option<&'a str>,
}

/// Result of a successful [`GitHubApi::put_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutFileResult {
    pub blob_sha: String,
    pub commit_sha: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
    /// Create an initial commit so the default branch exists
    pub auto_init: bool,
}

/// The GitHub operations the rest of the crate depends on.
///
/// The token is bound when the implementor is constructed; nothing behind
/// this trait reads ambient configuration.
pub trait GitHubApi {
    fn authenticated_user(&self) -> Result<UserInfo, ApiError>;

    fn list_repositories(&self, visibility: Visibility) -> Result<Vec<RepoInfo>, ApiError>;

    fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryRef, ApiError>;

    /// Recursive tree of the repository's default branch.
    fn get_tree(&self, repo: &RepositoryRef) -> Result<Tree, ApiError>;

    /// Raw bytes of one blob.
    fn get_blob(&self, repo: &RepositoryRef, sha: &str) -> Result<Vec<u8>, ApiError>;

    fn put_file(&self, repo: &RepositoryRef, file: &PutFile<'_>) -> Result<PutFileResult, ApiError>;

    fn create_repository(&self, request: &NewRepository) -> Result<RepoInfo, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_info_from_github_json() {
        let json = r#"{
            "name": "hello",
            "full_name": "octocat/hello",
            "owner": {"login": "octocat"},
            "description": null,
            "private": true,
            "clone_url": "https://github.com/octocat/hello.git",
            "html_url": "https://github.com/octocat/hello",
            "language": "Rust",
            "size": 42,
            "stargazers_count": 7,
            "forks_count": 1,
            "default_branch": "trunk",
            "updated_at": "2024-05-01T10:00:00Z"
        }"#;

        let info: RepoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.stars, 7);
        assert!(info.description.is_none());
        assert_eq!(
            info.to_ref(),
            RepositoryRef::new("octocat", "hello", "trunk")
        );
        assert_eq!(info.to_ref().full_name(), "octocat/hello");
    }

    #[test]
    fn test_tree_from_github_json() {
        let json = r#"{
            "sha": "abc",
            "tree": [
                {"path": "src", "mode": "040000", "type": "tree", "sha": "t1"},
                {"path": "src/main.rs", "mode": "100644", "type": "blob", "sha": "b1", "size": 12},
                {"path": "vendor/lib", "mode": "160000", "type": "commit", "sha": "c1"}
            ],
            "truncated": false
        }"#;

        let tree: Tree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.entries.len(), 3);
        assert_eq!(tree.entries[1].kind, TreeEntryKind::Blob);
        assert_eq!(tree.entries[1].size, Some(12));
        assert_eq!(tree.entries[2].kind, TreeEntryKind::Commit);
    }

    #[test]
    fn test_tree_children() {
        let entry = |path: &str, kind| TreeEntry {
            path: path.to_string(),
            mode: "100644".to_string(),
            kind,
            sha: "s".to_string(),
            size: None,
        };
        let tree = Tree {
            sha: "root".to_string(),
            entries: vec![
                entry("README.md", TreeEntryKind::Blob),
                entry("src", TreeEntryKind::Tree),
                entry("src/main.rs", TreeEntryKind::Blob),
                entry("src/cli", TreeEntryKind::Tree),
                entry("src/cli/mod.rs", TreeEntryKind::Blob),
                entry("srcx.txt", TreeEntryKind::Blob),
            ],
            truncated: false,
        };

        let names = |dir: &str| -> Vec<String> {
            tree.children(dir).iter().map(|e| e.name().to_string()).collect()
        };
        assert_eq!(names(""), ["src", "README.md", "srcx.txt"]);
        assert_eq!(names("src/"), ["cli", "main.rs"]);
        assert_eq!(names("src/cli/mod.rs"), ["mod.rs"]);
        assert!(names("docs").is_empty());
    }

    #[test]
    fn test_user_totals() {
        let user: UserInfo = serde_json::from_str(
            r#"{"login": "octocat", "public_repos": 3, "total_private_repos": 2}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "octocat");
        assert_eq!(user.total_repos(), 5);
    }
}
