//! Repository reference parsing and listing filters.

use super::RepoInfo;
use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

/// A repository as typed by the user, before it is resolved against the API.
///
/// Accepts `name`, `owner/name`, `https://github.com/owner/name(.git)` and
/// `git@github.com:owner/name.git`. A bare `name` means "owned by the
/// authenticated user".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub owner: Option<String>,
    pub name: String,
}

impl RepoSpec {
    /// Owner to use, falling back to the authenticated user's login.
    pub fn owner_or<'a>(&'a self, login: &'a str) -> &'a str {
        self.owner.as_deref().unwrap_or(login)
    }
}

impl FromStr for RepoSpec {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches('/').trim_end_matches(".git");

        let path = trimmed
            .strip_prefix("https://github.com/")
            .or_else(|| trimmed.strip_prefix("http://github.com/"))
            .or_else(|| trimmed.strip_prefix("git@github.com:"))
            .or_else(|| trimmed.strip_prefix("ssh://git@github.com/"))
            .unwrap_or(trimmed);

        if path.contains("://") {
            bail!("Not a GitHub repository: {}", input);
        }

        let parts: Vec<&str> = path.split('/').collect();
        let spec = match parts.as_slice() {
            [name] => RepoSpec {
                owner: None,
                name: name.to_string(),
            },
            [owner, name] => RepoSpec {
                owner: Some(owner.to_string()),
                name: name.to_string(),
            },
            _ => bail!("Invalid repository reference: {}", input),
        };

        if spec.name.is_empty() || spec.owner.as_deref() == Some("") {
            bail!("Invalid repository reference: {}", input);
        }

        Ok(spec)
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}/{}", owner, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Case-insensitive search over name, description and language.
/// An empty query keeps every repository.
pub fn search_repositories<'a>(repos: &'a [RepoInfo], query: &str) -> Vec<&'a RepoInfo> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return repos.iter().collect();
    }

    let matches = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&query));

    repos
        .iter()
        .filter(|repo| {
            matches(Some(&repo.name))
                || matches(repo.description.as_deref())
                || matches(repo.language.as_deref())
        })
        .collect()
}
