//! Error and retry-policy types for the issue labeler domain.
//!
//! [`GitHubError`] and [`PredictionError`] are the errors port implementations
//! return. [`TriageError`] is what domain operations surface to the caller.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::IssueNumber;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// GitHub errors
// ---------------------------------------------------------------------------

/// Failures of a call to the GitHub API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GitHubError {
    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("GitHub request failed: {message}")]
    Transport { message: String },

    /// The token was missing, invalid, or lacked the required scope.
    #[error("GitHub rejected the credentials ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// The primary or secondary rate limit was hit.
    #[error("GitHub rate limit exceeded")]
    RateLimited {
        /// Time until the limit resets, when GitHub reported it.
        reset_after: Option<Duration>,
    },

    #[error("GitHub resource not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success status.
    #[error("GitHub returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to decode GitHub response: {message}")]
    Decode { message: String },

    /// A client could not be constructed (bad base URL, missing token, ...).
    #[error("Failed to create GitHub client: {message}")]
    ClientCreation { message: String },
}

impl GitHubError {
    /// Short, stable name of the variant, used as the `error.kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Authentication { .. } => "authentication",
            Self::RateLimited { .. } => "rate_limited",
            Self::NotFound { .. } => "not_found",
            Self::Http { .. } => "http",
            Self::Decode { .. } => "decode",
            Self::ClientCreation { .. } => "client_creation",
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::RateLimited { reset_after } => RetryPolicy::Retryable {
                after: *reset_after,
            },
            Self::Http { status, .. } if *status >= 500 => RetryPolicy::Retryable { after: None },
            // A fresh client may carry a fresh token.
            Self::Authentication { .. } => RetryPolicy::Retryable { after: None },
            Self::NotFound { .. }
            | Self::Http { .. }
            | Self::Decode { .. }
            | Self::ClientCreation { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction errors
// ---------------------------------------------------------------------------

/// Failures of the label prediction model.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictionError {
    #[error("Prediction model unavailable: {message}")]
    Unavailable { message: String },

    #[error("Prediction model returned an invalid response: {message}")]
    InvalidResponse { message: String },
}

// ---------------------------------------------------------------------------
// Domain-level errors
// ---------------------------------------------------------------------------

/// Errors surfaced by labeler and board triage operations.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// A card on the board pointed at an issue that could not be loaded.
    #[error("Issue #{number} referenced by a project card could not be loaded: {source}")]
    CardContent {
        number: IssueNumber,
        #[source]
        source: GitHubError,
    },

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; no operation starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_errors_carry_reset_delay_into_retry_policy() {
        let err = GitHubError::RateLimited {
            reset_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(30))
            }
        );
    }

    #[test]
    fn client_errors_are_not_retryable_but_server_errors_are() {
        let not_found = GitHubError::NotFound {
            resource: "issue #1".into(),
        };
        assert_eq!(not_found.retry_policy(), RetryPolicy::NonRetryable);

        let bad_gateway = GitHubError::Http {
            status: 502,
            message: "Bad Gateway".into(),
        };
        assert_eq!(
            bad_gateway.retry_policy(),
            RetryPolicy::Retryable { after: None }
        );

        let unprocessable = GitHubError::Http {
            status: 422,
            message: "Validation Failed".into(),
        };
        assert_eq!(unprocessable.retry_policy(), RetryPolicy::NonRetryable);
    }
}
