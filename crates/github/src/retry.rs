//! Client factory and the retry-once client wrapper.
//!
//! [`RetryingClient`] creates its inner client lazily through a
//! [`ClientFactory`]. When a call fails for any reason it logs the error,
//! throws the client away, builds a fresh one, and repeats the call exactly
//! once with no back-off. A second failure, or a failure of the factory
//! itself, is returned to the caller.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error};

use triage::{
    CardId, CardMove, ColumnId, GitHubError, Issue, IssueNumber, IssueTracker, NewCard,
    ProjectBoard, ProjectCard, ProjectColumn, ProjectId, PullRequest, PullRequestFile,
    PullRequestManager, RepositoryRef, SearchPage, SearchQuery,
};

use crate::client::{GithubClient, GithubSettings};

/// Creates authenticated GitHub clients.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: IssueTracker + PullRequestManager + ProjectBoard + 'static;

    async fn create(&self) -> Result<Self::Client, GitHubError>;
}

/// Builds [`GithubClient`]s from fixed settings.
///
/// When `token_env` is set the token is re-read from that environment
/// variable on every [`ClientFactory::create`], so a recreated client picks up
/// a rotated token; the configured token is only the fallback. Leave
/// `token_env` unset when an explicit token must always be used.
#[derive(Debug, Clone)]
pub struct TokenClientFactory {
    settings: GithubSettings,
    token_env: Option<String>,
}

impl TokenClientFactory {
    pub fn new(settings: GithubSettings) -> Self {
        Self {
            settings,
            token_env: None,
        }
    }

    pub fn with_token_env(mut self, var: impl Into<String>) -> Self {
        self.token_env = Some(var.into());
        self
    }

    fn current_settings(&self) -> GithubSettings {
        let mut settings = self.settings.clone();
        if let Some(token) = self
            .token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|t| !t.trim().is_empty())
        {
            settings.token = token;
        }
        settings
    }
}

#[async_trait]
impl ClientFactory for TokenClientFactory {
    type Client = GithubClient;

    async fn create(&self) -> Result<GithubClient, GitHubError> {
        GithubClient::new(&self.current_settings())
    }
}

/// Wraps a factory-built client with the retry-once policy.
pub struct RetryingClient<F: ClientFactory> {
    factory: F,
    client: Mutex<Option<Arc<F::Client>>>,
}

impl<F: ClientFactory> RetryingClient<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            client: Mutex::new(None),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    async fn current(&self) -> Result<Arc<F::Client>, GitHubError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }
        debug!("Creating GitHub client");
        let client = Arc::new(self.factory.create().await?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn recreate(&self) -> Result<Arc<F::Client>, GitHubError> {
        let mut slot = self.client.lock().await;
        let client = Arc::new(self.factory.create().await?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Runs `op` against the current client, and once more against a fresh
    /// client if the first attempt fails.
    pub async fn call<T, Op, Fut>(&self, operation: &'static str, op: Op) -> Result<T, GitHubError>
    where
        Op: Fn(Arc<F::Client>) -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        let client = self.current().await?;
        match op(client).await {
            Ok(value) => Ok(value),
            Err(err) => {
                error!(
                    operation,
                    error.kind = err.kind(),
                    error.message = %err,
                    "GitHub call failed; recreating client and retrying once"
                );
                let client = self.recreate().await?;
                op(client).await
            }
        }
    }
}

#[async_trait]
impl<F: ClientFactory> IssueTracker for RetryingClient<F> {
    async fn get_issue(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Issue, GitHubError> {
        self.call("get_issue", |c| async move { c.get_issue(repo, number).await })
            .await
    }

    async fn search_issues(
        &self,
        query: &SearchQuery,
        page: u32,
    ) -> Result<SearchPage, GitHubError> {
        self.call("search_issues", |c| async move {
            c.search_issues(query, page).await
        })
        .await
    }

    async fn add_labels(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        self.call("add_labels", |c| async move {
            c.add_labels(repo, number, labels).await
        })
        .await
    }
}

#[async_trait]
impl<F: ClientFactory> PullRequestManager for RetryingClient<F> {
    async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<PullRequest, GitHubError> {
        self.call("get_pull_request", |c| async move {
            c.get_pull_request(repo, number).await
        })
        .await
    }

    async fn get_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        self.call("get_pull_request_files", |c| async move {
            c.get_pull_request_files(repo, number).await
        })
        .await
    }
}

#[async_trait]
impl<F: ClientFactory> ProjectBoard for RetryingClient<F> {
    async fn list_columns(&self, project: ProjectId) -> Result<Vec<ProjectColumn>, GitHubError> {
        self.call("list_columns", |c| async move { c.list_columns(project).await })
            .await
    }

    async fn list_cards(&self, column: ColumnId) -> Result<Vec<ProjectCard>, GitHubError> {
        self.call("list_cards", |c| async move { c.list_cards(column).await })
            .await
    }

    async fn get_card(&self, card: CardId) -> Result<ProjectCard, GitHubError> {
        self.call("get_card", |c| async move { c.get_card(card).await })
            .await
    }

    async fn create_card(
        &self,
        column: ColumnId,
        card: NewCard,
    ) -> Result<ProjectCard, GitHubError> {
        self.call("create_card", |c| async move { c.create_card(column, card).await })
            .await
    }

    async fn move_card(&self, card: CardId, to: CardMove) -> Result<(), GitHubError> {
        self.call("move_card", |c| async move { c.move_card(card, to).await })
            .await
    }
}
