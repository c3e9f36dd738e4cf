//! Reddit API error types.
//!
//! This module defines error types that distinguish between transient and permanent
//! Reddit API failures. The distinction drives retry logic:
//!
//! - **Transient** errors are retriable (5xx, 429, network failures, `RATELIMIT`)
//! - **Permanent** errors are not (most 4xx, deleted targets, locked threads)

use std::fmt;
use thiserror::Error;

/// The kind of Reddit API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Transient error - safe to retry with backoff.
    ///
    /// Examples:
    /// - HTTP 5xx (Reddit is frequently overloaded)
    /// - HTTP 429 (rate limited)
    /// - `RATELIMIT` in a JSON error list ("you are doing that too much")
    /// - Connection resets and timeouts
    Transient,

    /// Permanent error - retrying will not help.
    ///
    /// Examples:
    /// - HTTP 401/403 (bad credentials, banned from the subreddit)
    /// - HTTP 404 (subreddit or user does not exist)
    /// - `DELETED_COMMENT`, `THREAD_LOCKED` in a JSON error list
    /// - Responses that do not have the expected shape
    Permanent,
}

impl ApiErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ApiErrorKind::Transient)
    }
}

/// A Reddit API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct RedditApiError {
    /// The kind of error (transient or permanent).
    pub kind: ApiErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying HTTP client error, if available.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for RedditApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "Reddit API error (HTTP {}): {}", code, self.message),
            None => write!(f, "Reddit API error: {}", self.message),
        }
    }
}

impl RedditApiError {
    /// Creates a permanent error without an HTTP source.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error without an HTTP source.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes an error response by HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: kind_for_status(status),
            status_code: Some(status),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a `reqwest` failure.
    ///
    /// A status code decides by itself. Without one, a body that would not
    /// decode means Reddit changed shape under us (permanent); anything that
    /// went wrong on the wire is worth another try.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = match status_code {
            Some(code) => kind_for_status(code),
            None if err.is_decode() || err.is_builder() => ApiErrorKind::Permanent,
            None => ApiErrorKind::Transient,
        };
        Self {
            kind,
            status_code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Categorizes the `json.errors` list Reddit returns from write endpoints.
    ///
    /// Each entry is `[code, message, field]`. The whole response is transient
    /// only if every listed code is transient.
    pub fn from_api_errors(errors: &[Vec<serde_json::Value>]) -> Self {
        let codes: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.first().and_then(|c| c.as_str()))
            .collect();
        let kind = if !codes.is_empty() && codes.iter().all(|c| is_transient_code(c)) {
            ApiErrorKind::Transient
        } else {
            ApiErrorKind::Permanent
        };
        let message = errors
            .iter()
            .map(|e| {
                e.iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            kind,
            status_code: None,
            message,
            source: None,
        }
    }
}

/// 408, 429 and 5xx are worth retrying; every other status is final.
fn kind_for_status(status: u16) -> ApiErrorKind {
    match status {
        408 | 429 | 500..=599 => ApiErrorKind::Transient,
        _ => ApiErrorKind::Permanent,
    }
}

/// `json.errors` codes that clear up on their own.
fn is_transient_code(code: &str) -> bool {
    matches!(code, "RATELIMIT" | "SERVER_ERROR" | "TRY_AGAIN")
}
