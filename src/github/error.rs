//! Typed errors cho GitHub REST API calls.
//!
//! Every non-2xx response is mapped to one variant by HTTP status so the
//! sync workflow can decide, per file, whether to record and continue or to
//! abort the whole job.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by [`GitHubApi`](super::GitHubApi) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 401, or 403 that is not a rate limit. Token missing, expired or lacking scope.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 429, or 403 with an exhausted rate-limit budget.
    #[error("rate limit exceeded{}", reset_hint(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("not found: {0}")]
    NotFound(String),

    /// 409. Remote state changed (sha mismatch) or the repository is empty.
    #[error("conflict: {0}")]
    Conflict(String),

    /// 422 validation failure.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("repository '{0}' already exists")]
    AlreadyExists(String),

    #[error("GitHub API error {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport failure: DNS, TLS, connection reset, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be parsed (JSON or base64).
    #[error("cannot decode response: {0}")]
    Decode(String),
}

fn reset_hint(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {})", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => String::new(),
    }
}

impl ApiError {
    /// Map an HTTP error response to an [`ApiError`].
    ///
    /// `rate_remaining` and `rate_reset` come from the `X-RateLimit-Remaining`
    /// and `X-RateLimit-Reset` headers. `body` is the raw response body; the
    /// GitHub `message` field is extracted from it when present.
    pub fn from_response(
        status: u16,
        rate_remaining: Option<u64>,
        rate_reset: Option<i64>,
        body: &str,
    ) -> Self {
        let message = github_message(body);
        let reset_at = rate_reset.and_then(|secs| DateTime::from_timestamp(secs, 0));

        match status {
            401 => ApiError::Auth(message),
            403 if rate_remaining == Some(0) || message.contains("rate limit") => {
                ApiError::RateLimited { reset_at }
            }
            403 => ApiError::Auth(message),
            429 => ApiError::RateLimited { reset_at },
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            422 => ApiError::Validation(message),
            _ => ApiError::Http { status, message },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// GitHub error bodies look like `{"message": "...", "documentation_url": "..."}`.
fn github_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no details".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let body = r#"{"message": "Bad credentials"}"#;
        assert_eq!(
            ApiError::from_response(401, None, None, body),
            ApiError::Auth("Bad credentials".to_string())
        );
        assert!(matches!(
            ApiError::from_response(404, None, None, r#"{"message":"Not Found"}"#),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_response(409, None, None, "{}"),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from_response(422, None, None, "{}"),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from_response(502, None, None, "bad gateway"),
            ApiError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_forbidden_is_rate_limit_only_when_budget_exhausted() {
        let exhausted = ApiError::from_response(403, Some(0), Some(1_700_000_000), "{}");
        match exhausted {
            ApiError::RateLimited { reset_at } => {
                assert_eq!(reset_at.map(|t| t.timestamp()), Some(1_700_000_000));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        let forbidden = ApiError::from_response(
            403,
            Some(4999),
            None,
            r#"{"message":"Resource not accessible by personal access token"}"#,
        );
        assert!(matches!(forbidden, ApiError::Auth(_)));

        assert!(matches!(
            ApiError::from_response(429, None, None, ""),
            ApiError::RateLimited { reset_at: None }
        ));
    }

    #[test]
    fn test_message_falls_back_to_raw_body() {
        let err = ApiError::from_response(500, None, None, "  upstream exploded ");
        assert_eq!(err.to_string(), "GitHub API error 500: upstream exploded");

        let err = ApiError::from_response(500, None, None, "");
        assert_eq!(err.to_string(), "GitHub API error 500: no details");
    }

    #[test]
    fn test_rate_limit_display_includes_reset() {
        let err = ApiError::from_response(429, None, Some(0), "");
        assert_eq!(
            err.to_string(),
            "rate limit exceeded (resets at 1970-01-01 00:00:00 UTC)"
        );
    }
}
