//! Blocking GitHub REST client authenticated with a Personal Access Token.

use super::{
    ApiError, GitHubApi, NewRepository, PutFile, PutFileResult, RepoInfo, RepositoryRef, Tree,
    UserInfo, Visibility,
};
use base64::Engine;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "repodeck";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

/// GitHub REST client. The token is bound at construction and never re-read.
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    /// Client against the public GitHub API.
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Client against a custom API root (GitHub Enterprise: `https://host/api/v3`).
    pub fn with_api_url(token: impl Into<String>, api_url: &str) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_url, path);
        debug!(%method, %url, "GitHub API request");

        self.http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Send and turn any non-2xx status into a typed error.
    fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let header_num = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let remaining = header_num("X-RateLimit-Remaining").and_then(|v| v.parse::<u64>().ok());
        let reset = header_num("X-RateLimit-Reset").and_then(|v| v.parse::<i64>().ok());
        let body = response.text().unwrap_or_default();

        debug!(status = status.as_u16(), "GitHub API returned error");
        Err(ApiError::from_response(
            status.as_u16(),
            remaining,
            reset,
            &body,
        ))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path))?;
        Ok(response.json()?)
    }
}

/// `a dir/b#c.txt` -> `a%20dir/b%23c.txt`; the slashes stay literal.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

fn decode_blob(blob: BlobResponse) -> Result<Vec<u8>, ApiError> {
    match blob.encoding.as_str() {
        "base64" => {
            // GitHub wraps base64 payloads at 60 columns
            let compact: String = blob.content.split_whitespace().collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| ApiError::Decode(format!("invalid base64 blob: {}", e)))
        }
        "utf-8" => Ok(blob.content.into_bytes()),
        other => Err(ApiError::Decode(format!("unknown blob encoding '{}'", other))),
    }
}

#[derive(Serialize)]
struct PutFileBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutFileResponse {
    content: ShaOnly,
    commit: ShaOnly,
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

impl GitHubApi for GitHubClient {
    fn authenticated_user(&self) -> Result<UserInfo, ApiError> {
        self.get_json("/user")
    }

    fn list_repositories(&self, visibility: Visibility) -> Result<Vec<RepoInfo>, ApiError> {
        let mut repos = Vec::new();
        let mut page = 1;

        loop {
            let path = format!(
                "/user/repos?per_page={}&page={}&visibility={}&sort=updated",
                PER_PAGE,
                page,
                visibility.as_query()
            );
            let batch: Vec<RepoInfo> = self.get_json(&path)?;
            let done = batch.len() < PER_PAGE;
            repos.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        debug!(count = repos.len(), "listed repositories");
        Ok(repos)
    }

    fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryRef, ApiError> {
        let info: RepoInfo = self.get_json(&format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(name)
        ))?;
        Ok(info.to_ref())
    }

    fn get_tree(&self, repo: &RepositoryRef) -> Result<Tree, ApiError> {
        self.get_json(&format!(
            "/repos/{}/{}/git/trees/{}?recursive=1",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            urlencoding::encode(&repo.default_branch)
        ))
    }

    fn get_blob(&self, repo: &RepositoryRef, sha: &str) -> Result<Vec<u8>, ApiError> {
        let blob: BlobResponse = self.get_json(&format!(
            "/repos/{}/{}/git/blobs/{}",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            sha
        ))?;
        decode_blob(blob)
    }

    fn put_file(&self, repo: &RepositoryRef, file: &PutFile<'_>) -> Result<PutFileResult, ApiError> {
        let body = PutFileBody {
            message: file.message,
            content: base64::engine::general_purpose::STANDARD.encode(file.content),
            branch: file.branch,
            sha: file.sha,
        };
        let path = format!(
            "/repos/{}/{}/contents/{}",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            encode_path(file.path)
        );

        let response = self.send(self.request(Method::PUT, &path).json(&body))?;
        let put: PutFileResponse = response.json()?;

        Ok(PutFileResult {
            blob_sha: put.content.sha,
            commit_sha: put.commit.sha,
        })
    }

    fn create_repository(&self, request: &NewRepository) -> Result<RepoInfo, ApiError> {
        let builder = self.request(Method::POST, "/user/repos").json(request);

        match self.send(builder) {
            Ok(response) => Ok(response.json()?),
            Err(ApiError::Validation(message)) if message.contains("already exists") => {
                Err(ApiError::AlreadyExists(request.name.clone()))
            }
            Err(other) => Err(other),
        }
    }
}
