//! Shared value types for the issue labeler domain.
//!
//! These are transient projections of GitHub resources: they are fetched,
//! inspected, and dropped within a single invocation. Wire formats live in the
//! `github` crate; nothing here knows about JSON field names used by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CardId, ColumnId, IssueId, IssueNumber, PullRequestId, RepositoryRef};

// ---------------------------------------------------------------------------
// Issues and pull requests
// ---------------------------------------------------------------------------

/// Whether an item is a plain issue or a pull request.
///
/// Serialises to the strings GitHub uses for a card's `content_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    /// The search qualifier value for this kind (`is:issue` / `is:pr`).
    pub fn search_qualifier(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pr",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Issue => write!(f, "Issue"),
            Self::PullRequest => write!(f, "PullRequest"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// A milestone attached to an issue. Only the title participates in triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
}

/// An issue (or the issue view of a pull request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub number: IssueNumber,
    pub title: String,
    pub body: Option<String>,
    /// Login of the user who opened the item.
    pub author: Option<String>,
    pub state: ItemState,
    /// Label names, in the order GitHub returned them.
    pub labels: Vec<String>,
    pub milestone: Option<Milestone>,
    /// `true` when this issue is the issue view of a pull request.
    pub is_pull_request: bool,
    pub html_url: Option<String>,
    pub updated_at: Option<Timestamp>,
}

impl Issue {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }

    pub fn milestone_title(&self) -> Option<&str> {
        self.milestone.as_ref().map(|m| m.title.as_str())
    }

    pub fn kind(&self) -> ItemKind {
        if self.is_pull_request {
            ItemKind::PullRequest
        } else {
            ItemKind::Issue
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: PullRequestId,
    pub number: IssueNumber,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub state: ItemState,
    pub draft: bool,
}

/// One file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestFile {
    /// Path relative to the repository root.
    pub filename: String,
    /// `added`, `modified`, `removed`, `renamed`, ...
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// An issue search scoped to one repository.
///
/// Rendered into GitHub's search syntax by [`SearchQuery::to_query_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub repo: RepositoryRef,
    pub kind: ItemKind,
    pub state: ItemState,
    /// Every label must be present on a hit.
    pub labels: Vec<String>,
}

impl SearchQuery {
    pub fn new(repo: RepositoryRef, kind: ItemKind) -> Self {
        Self {
            repo,
            kind,
            state: ItemState::Open,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Renders the `q` parameter, e.g.
    /// `repo:dotnet/runtime is:issue is:open label:"needs further triage"`.
    pub fn to_query_string(&self) -> String {
        let mut q = format!(
            "repo:{} is:{} is:{}",
            self.repo,
            self.kind.search_qualifier(),
            self.state.as_str()
        );
        for label in &self.labels {
            q.push_str(&format!(" label:\"{label}\""));
        }
        q
    }
}

/// One page of issue search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Vec<Issue>,
}

// ---------------------------------------------------------------------------
// Project boards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectColumn {
    pub id: ColumnId,
    pub name: String,
}

/// A card on a classic project board.
///
/// Cards backed by an issue or pull request carry a `content_url`; free-text
/// note cards carry a `note` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub id: CardId,
    pub content_url: Option<String>,
    pub note: Option<String>,
}

/// Request body for creating a card from an existing issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub content_id: u64,
    pub content_type: ItemKind,
}

impl NewCard {
    pub fn for_issue(id: IssueId) -> Self {
        Self {
            content_id: id.as_u64(),
            content_type: ItemKind::Issue,
        }
    }

    pub fn for_pull_request(id: PullRequestId) -> Self {
        Self {
            content_id: id.as_u64(),
            content_type: ItemKind::PullRequest,
        }
    }
}

/// Where a moved card lands within its target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPosition {
    Top,
    After(CardId),
}

impl std::fmt::Display for CardPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::After(card) => write!(f, "after:{card}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardMove {
    pub position: CardPosition,
    pub column: ColumnId,
}

impl CardMove {
    pub fn to_top_of(column: ColumnId) -> Self {
        Self {
            position: CardPosition::Top,
            column,
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// A model confidence score in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LabelScore(f64);

impl LabelScore {
    /// Creates a [`LabelScore`], returning `None` if `value` is outside
    /// the valid range `[0.0, 1.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for LabelScore {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("score {value} is outside [0, 1]"))
    }
}

impl From<LabelScore> for f64 {
    fn from(score: LabelScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for LabelScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrediction {
    pub label: String,
    pub score: LabelScore,
}

/// Everything the model sees about one issue or pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub repo: RepositoryRef,
    pub number: IssueNumber,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub is_pull_request: bool,
    /// Paths touched by a pull request; empty for issues.
    pub file_paths: Vec<String>,
}

/// The ranked label predictions for one item, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSuggestion {
    pub repo: RepositoryRef,
    pub number: IssueNumber,
    pub predictions: Vec<LabelPrediction>,
}

impl LabelSuggestion {
    pub fn best(&self) -> Option<&LabelPrediction> {
        self.predictions.first()
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
