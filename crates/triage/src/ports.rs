//! Port traits implemented by infrastructure crates.
//!
//! The `github` crate implements [`IssueTracker`], [`PullRequestManager`] and
//! [`ProjectBoard`] over the REST API; the `predictor` crate implements
//! [`LabelPredictor`]. Domain code in this crate depends only on these traits.
//!
//! Implementations handle pagination internally: every `list_*` method returns
//! the complete collection. [`IssueTracker::search_issues`] is the exception,
//! because callers need to see `total_count` to decide when to stop.

use async_trait::async_trait;

use crate::{
    CardId, CardMove, ColumnId, GitHubError, Issue, IssueNumber, LabelPrediction, NewCard,
    PredictionError, PredictionInput, ProjectCard, ProjectColumn, ProjectId, PullRequest,
    PullRequestFile, RepositoryRef, SearchPage, SearchQuery,
};

/// Read and label issues.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_issue(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Issue, GitHubError>;

    /// Returns one page (1-based) of search results.
    async fn search_issues(&self, query: &SearchQuery, page: u32)
        -> Result<SearchPage, GitHubError>;

    /// Adds labels to an issue or pull request. Existing labels are kept.
    async fn add_labels(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
        labels: &[String],
    ) -> Result<(), GitHubError>;
}

/// Read pull requests and their changed files.
#[async_trait]
pub trait PullRequestManager: Send + Sync {
    async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<PullRequest, GitHubError>;

    async fn get_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Vec<PullRequestFile>, GitHubError>;
}

/// Classic project board columns and cards.
#[async_trait]
pub trait ProjectBoard: Send + Sync {
    async fn list_columns(&self, project: ProjectId) -> Result<Vec<ProjectColumn>, GitHubError>;

    async fn list_cards(&self, column: ColumnId) -> Result<Vec<ProjectCard>, GitHubError>;

    async fn get_card(&self, card: CardId) -> Result<ProjectCard, GitHubError>;

    async fn create_card(
        &self,
        column: ColumnId,
        card: NewCard,
    ) -> Result<ProjectCard, GitHubError>;

    async fn move_card(&self, card: CardId, to: CardMove) -> Result<(), GitHubError>;
}

/// The label prediction model.
///
/// Implementations return predictions in any order; ranking and truncation
/// happen in [`crate::Labeler`].
#[async_trait]
pub trait LabelPredictor: Send + Sync {
    async fn predict(&self, input: &PredictionInput)
        -> Result<Vec<LabelPrediction>, PredictionError>;
}
