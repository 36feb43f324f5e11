//! Credential provider cho GitHub Personal Access Token.
//!
//! The token is resolved once at startup, in order: `--token` flag,
//! `GITHUB_TOKEN`, config `default_pat`, system keyring. It is then handed to
//! [`GitHubClient`](crate::github::GitHubClient) explicitly.

use crate::config::Config;
use anyhow::{Context, Result};
use std::fmt;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const KEYRING_SERVICE: &str = "repodeck";
const KEYRING_USER: &str = "github_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Environment,
    ConfigFile,
    Keyring,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenSource::Flag => "--token",
            TokenSource::Environment => TOKEN_ENV,
            TokenSource::ConfigFile => "config file",
            TokenSource::Keyring => "system keyring",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub source: TokenSource,
}

// Never print the token itself
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve from the real environment and keyring.
pub fn resolve_token(flag: Option<&str>, config: &Config) -> Option<Credentials> {
    resolve_token_from(flag, std::env::var(TOKEN_ENV).ok(), config, load_from_keyring)
}

/// First non-blank candidate wins. The keyring is only queried when nothing
/// earlier matched.
pub fn resolve_token_from<K>(
    flag: Option<&str>,
    env: Option<String>,
    config: &Config,
    keyring: K,
) -> Option<Credentials>
where
    K: FnOnce() -> Option<String>,
{
    let usable = |t: &str| {
        let t = t.trim();
        (!t.is_empty()).then(|| t.to_string())
    };

    if let Some(token) = flag.and_then(usable) {
        return Some(Credentials {
            token,
            source: TokenSource::Flag,
        });
    }
    if let Some(token) = env.as_deref().and_then(usable) {
        return Some(Credentials {
            token,
            source: TokenSource::Environment,
        });
    }
    if let Some(token) = config.token().and_then(usable) {
        return Some(Credentials {
            token,
            source: TokenSource::ConfigFile,
        });
    }
    keyring()
        .as_deref()
        .and_then(usable)
        .map(|token| Credentials {
            token,
            source: TokenSource::Keyring,
        })
}

/// Classic (`ghp_` + 36 alphanumerics) or fine-grained
/// (`github_pat_` + 82 of `[A-Za-z0-9_]`) token shape.
pub fn validate_pat_format(token: &str) -> bool {
    if let Some(rest) = token.strip_prefix("github_pat_") {
        return rest.len() == 82 && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    }
    if let Some(rest) = token.strip_prefix("ghp_") {
        return rest.len() == 36 && rest.chars().all(|c| c.is_ascii_alphanumeric());
    }
    false
}

/// Lưu token vào keyring (system keychain)
pub fn save_to_keyring(token: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .context("Cannot open system keyring")?;
    entry
        .set_password(token)
        .context("Cannot store token in system keyring")?;
    Ok(())
}

pub fn load_from_keyring() -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

/// Xóa token khỏi keyring. Returns `false` if nothing was stored.
pub fn delete_from_keyring() -> Result<bool> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .context("Cannot open system keyring")?;
    match entry.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(e).context("Cannot remove token from system keyring"),
    }
}
