//! Crate-wide error hierarchy for mr-annotator.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - GitLab-aware mapping (401→Unauthorized, 429→RateLimited, 5xx→Server, etc.).
//! - Every remote failure names the operation that failed, so a broken run is
//!   diagnosable from the final message alone.
//! - No dynamic dispatch, ergonomic `?` via `From` impls.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type AnnotateResult<T> = Result<T, Error>;

/// Root error type for the mr-annotator crate.
#[derive(Debug, Error)]
pub enum Error {
    /// GitLab API related failure.
    #[error(transparent)]
    Gitlab(#[from] GitlabError),

    /// Unified diff parsing failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Configuration problems (missing token, commit SHA, base URL, etc.).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Report artifact I/O failure.
    #[error("failed to write report file {path}: {source}")]
    ReportFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Input validation errors (bad report payloads, unsupported values).
    #[error("validation error: {0}")]
    Validation(String),

    /// The run finished with a failing status under exit-code notification.
    #[error("{0}")]
    RunFailed(String),
}

/// Detailed GitLab-specific error used inside the client layer.
#[derive(Debug, Error)]
pub enum GitlabError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited,

    /// Gateway/Server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Non-success HTTP status for a named API operation.
    #[error("{op} failed: status {status}")]
    Api {
        op: &'static str,
        status: u16,
        body: Option<String>,
    },

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// JSON deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Unexpected/invalid shape of a GitLab response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Unified diff parser errors.
///
/// A malformed hunk header aborts the run: a partially indexed diff would
/// silently demote findings from inline to global and corrupt the report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unable to parse line:\n\t{line}\nfull patch:\n\t{patch}")]
    InvalidHunkHeader { line: String, patch: String },
}

/// Configuration and setup errors (base API URL, missing token, etc.).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required property {0}")]
    MissingProperty(&'static str),

    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),

    #[error("unknown value {value:?} for {property}")]
    UnknownValue { property: &'static str, value: String },
}

// ===== Conversions for `?` ergonomics =====

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Gitlab(GitlabError::from(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Gitlab(GitlabError::Serde(e))
    }
}

impl From<reqwest::Error> for GitlabError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GitlabError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => GitlabError::Unauthorized,
                403 => GitlabError::Forbidden,
                404 => GitlabError::NotFound,
                429 => GitlabError::RateLimited,
                500..=599 => GitlabError::Server(code),
                _ => GitlabError::Network(e.to_string()),
            };
        }
        GitlabError::Network(e.to_string())
    }
}
