//! REST payload shapes and their conversion into domain types.
//!
//! Only the fields the labeler reads are declared; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use triage::{
    CardId, ColumnId, Issue, IssueId, IssueNumber, ItemState, Milestone, ProjectCard,
    ProjectColumn, PullRequest, PullRequestFile, PullRequestId, SearchPage, Timestamp,
};

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMilestone {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: Option<WireUser>,
    pub state: ItemState,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    pub milestone: Option<WireMilestone>,
    /// Present (as an object of links) only when the issue is a pull request.
    pub pull_request: Option<serde_json::Value>,
    pub html_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<WireIssue> for Issue {
    fn from(w: WireIssue) -> Self {
        Issue {
            id: IssueId::new(w.id),
            number: IssueNumber::new(w.number),
            title: w.title,
            body: w.body,
            author: w.user.map(|u| u.login),
            state: w.state,
            labels: w.labels.into_iter().map(|l| l.name).collect(),
            milestone: w.milestone.map(|m| Milestone {
                number: m.number,
                title: m.title,
            }),
            is_pull_request: w.pull_request.is_some(),
            html_url: w.html_url,
            updated_at: w.updated_at.map(Timestamp::from_utc),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: Option<WireUser>,
    pub state: ItemState,
    #[serde(default)]
    pub draft: bool,
}

impl From<WirePullRequest> for PullRequest {
    fn from(w: WirePullRequest) -> Self {
        PullRequest {
            id: PullRequestId::new(w.id),
            number: IssueNumber::new(w.number),
            title: w.title,
            body: w.body,
            author: w.user.map(|u| u.login),
            state: w.state,
            draft: w.draft,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePullRequestFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl From<WirePullRequestFile> for PullRequestFile {
    fn from(w: WirePullRequestFile) -> Self {
        PullRequestFile {
            filename: w.filename,
            status: w.status,
            additions: w.additions,
            deletions: w.deletions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSearchResult {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<WireIssue>,
}

impl From<WireSearchResult> for SearchPage {
    fn from(w: WireSearchResult) -> Self {
        SearchPage {
            total_count: w.total_count,
            incomplete_results: w.incomplete_results,
            items: w.items.into_iter().map(Issue::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireColumn {
    pub id: u64,
    pub name: String,
}

impl From<WireColumn> for ProjectColumn {
    fn from(w: WireColumn) -> Self {
        ProjectColumn {
            id: ColumnId::new(w.id),
            name: w.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCard {
    pub id: u64,
    pub content_url: Option<String>,
    pub note: Option<String>,
}

impl From<WireCard> for ProjectCard {
    fn from(w: WireCard) -> Self {
        ProjectCard {
            id: CardId::new(w.id),
            content_url: w.content_url,
            note: w.note,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireCardMove {
    pub position: String,
    pub column_id: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireLabels<'a> {
    pub labels: &'a [String],
}

/// Error body returned by GitHub for most non-success responses.
#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub message: String,
}
