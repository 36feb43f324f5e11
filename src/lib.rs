//! repodeck - Browse, download and upload GitHub repositories with a Personal Access Token.
//!
//! Nguyên tắc: one token per process, resolved once and passed explicitly
//! into the GitHub client; every file transfer is independent.

pub mod config;
pub mod credentials;
pub mod github;
pub mod logging;
pub mod sync;

pub use config::Config;
pub use github::{GitHubApi, GitHubClient, RepositoryRef};
pub use sync::{start_download, start_upload, SyncJob, SyncOptions};
