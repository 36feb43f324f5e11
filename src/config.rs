//! Config module - Quản lý cấu hình repodeck (repodeck.toml).
//!
//! File cấu hình chứa:
//! - Default Personal Access Token (optional, keyring is preferred)
//! - GitHub API root
//! - Download directory and log level
//! - Sync settings (rate-limit policy, commit message)

use crate::github::client::DEFAULT_API_URL;
use crate::sync::{RateLimitPolicy, SyncOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Upload via repodeck";

/// Placeholder shipped in sample configs; never treated as a token.
const TOKEN_PLACEHOLDER: &str = "your_github_pat_here";

/// Cấu hình sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitPolicy::default(),
            commit_message: default_commit_message(),
        }
    }
}

/// Cấu hình chính của repodeck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Phiên bản config (để migrate trong tương lai)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Token used when neither `--token` nor `GITHUB_TOKEN` is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pat: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Parent directory for downloaded repositories
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// tracing level when `-v` is not given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Also write a daily log file (always at debug level)
    #[serde(default = "default_true")]
    pub log_file: bool,

    /// Directory for daily log files (default: <config dir>/logs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub sync: SyncSettings,
}

fn default_version() -> u32 {
    1
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_pat: None,
            api_url: default_api_url(),
            download_dir: default_download_dir(),
            log_level: default_log_level(),
            log_file: true,
            log_dir: None,
            sync: SyncSettings::default(),
        }
    }
}

/// Lấy download directory mặc định (~/Downloads/repodeck)
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("repodeck"))
        .unwrap_or_else(|| PathBuf::from("./repodeck"))
}

/// Lấy đường dẫn config directory mặc định (~/.config/repodeck/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("repodeck"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Lấy đường dẫn config file mặc định
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("repodeck.toml")
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config từ file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Lưu config ra file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        Ok(())
    }

    /// The configured token, ignoring blanks and the sample placeholder
    pub fn token(&self) -> Option<&str> {
        self.default_pat
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != TOKEN_PLACEHOLDER)
    }

    /// Where daily log files go, or `None` when file logging is off
    pub fn log_dir(&self) -> Option<PathBuf> {
        if !self.log_file {
            return None;
        }
        Some(
            self.log_dir
                .clone()
                .unwrap_or_else(|| default_config_dir().join("logs")),
        )
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            rate_limit: self.sync.rate_limit,
            commit_message: self.sync.commit_message.clone(),
            ..SyncOptions::default()
        }
    }
}
