//! Issue labeler GitHub infrastructure adapter.
//!
//! Implements the GitHub-facing traits defined in the [`triage`] crate
//! (`IssueTracker`, `PullRequestManager`, `ProjectBoard`) over the GitHub REST
//! API using `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! All GitHub API details (authentication headers, pagination, status code
//! mapping, rate-limit headers) are handled here; the [`triage`] crate never
//! sees them.
//!
//! ## Clients
//!
//! - [`GithubClient`] talks to the API directly.
//! - [`RetryingClient`] wraps a [`ClientFactory`] and retries every failed
//!   call once on a freshly created client. Both the labeler and the board
//!   routines go through it; the board uses the user token when configured.

mod client;
mod retry;
mod wire;

pub use client::{GithubClient, GithubSettings, DEFAULT_API_URL};
pub use retry::{ClientFactory, RetryingClient, TokenClientFactory};
