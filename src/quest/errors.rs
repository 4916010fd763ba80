use thiserror::Error;

use crate::storage::StoreError;

/// Errors that can arise while driving the quest engine or talking to the backend.
///
/// The taxonomy mirrors the failure-handling contract: configuration and
/// authorization failures are detected locally before any network call,
/// transport failures are surfaced but never retried, and persistence failures
/// are contained close to the store (most writes log-and-continue instead of
/// reaching this type).
#[derive(Debug, Error)]
pub enum QuestError {
    /// Backend endpoint not configured; backend-dependent operations degrade to
    /// a local failure return.
    #[error("backend endpoint not configured")]
    Unconfigured,

    /// Authentication token missing or empty when a backend call requires it.
    /// Fails closed: no network call is attempted.
    #[error("session is not authenticated")]
    Unauthorized,

    /// Request exceeded the configured timeout.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Wrapper around reqwest transport errors.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    /// Location id has no match in the location graph.
    #[error("unknown location: {0}")]
    UnknownLocation(String),

    /// Location exists but earlier locations are not completed yet.
    #[error("location is locked: {0}")]
    LocationLocked(String),

    /// Hint budget for the session is spent.
    #[error("hint budget exhausted")]
    HintsExhausted,

    /// Wrapper around progress store errors (store open/reset paths).
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
