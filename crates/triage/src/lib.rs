//! Core domain for the issue labeler.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, error type, and port trait used by the workspace, together with the
//! two pieces of business logic: label prediction ([`Labeler`]) and project
//! board triage ([`BoardTriage`]).
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `github` and `predictor` crates define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueNumber`, `ColumnId`, `RepositoryRef`, etc.) |
//! | [`types`] | Issue, pull request, project card and prediction value types |
//! | [`errors`] | `GitHubError`, `PredictionError`, `TriageError`, `RetryPolicy` |
//! | [`ports`] | Traits implemented by infrastructure crates |
//! | [`card_content`] | Card content url to issue number extraction |
//! | [`rules`] | Card rules for board sync routines |
//! | [`board`] | Board sync and milestone move routines |
//! | [`labeler`] | Label prediction and application |

pub mod board;
pub mod card_content;
pub mod errors;
pub mod identifiers;
pub mod labeler;
pub mod ports;
pub mod rules;
pub mod types;

#[cfg(test)]
mod fakes;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use board::{BoardTriage, CardFailure, MoveReport, SyncReport};
pub use card_content::CardContentMatcher;
pub use errors::{GitHubError, PredictionError, RetryPolicy, TriageError};
pub use identifiers::{
    CardId, ColumnId, IssueId, IssueNumber, ProjectId, PullRequestId, RepositoryRef, RunId,
};
pub use labeler::{LabelOutcome, Labeler, LabelerSettings};
pub use ports::{IssueTracker, LabelPredictor, ProjectBoard, PullRequestManager};
pub use rules::{CardRule, Rejection, SearchStrategy};
pub use types::{
    CardMove, CardPosition, Issue, ItemKind, ItemState, LabelPrediction, LabelScore,
    LabelSuggestion, Milestone, NewCard, PredictionInput, ProjectCard, ProjectColumn, PullRequest,
    PullRequestFile, SearchPage, SearchQuery, Timestamp,
};
