//! REST client for the GitHub API.
//!
//! [`GithubClient`] implements the `triage` port traits one endpoint at a
//! time. Every list endpoint is paged to completion with `per_page=100`;
//! search returns one page per call so the caller can see `total_count`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use triage::{
    CardId, CardMove, ColumnId, GitHubError, Issue, IssueNumber, IssueTracker, NewCard,
    ProjectBoard, ProjectCard, ProjectColumn, ProjectId, PullRequest, PullRequestFile,
    PullRequestManager, RepositoryRef, SearchPage, SearchQuery,
};

use crate::wire::{
    WireCard, WireCardMove, WireColumn, WireError, WireIssue, WireLabels, WirePullRequest,
    WirePullRequestFile, WireSearchResult,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

/// Connection settings for one authenticated client.
#[derive(Debug, Clone)]
pub struct GithubSettings {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    pub token: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            token: String::new(),
            user_agent: concat!("issue-labeler/", env!("CARGO_PKG_VERSION")).into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Authenticated GitHub REST client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(settings: &GithubSettings) -> Result<Self, GitHubError> {
        if settings.token.trim().is_empty() {
            return Err(GitHubError::ClientCreation {
                message: "no GitHub token configured".into(),
            });
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.token.trim()))
            .map_err(|e| GitHubError::ClientCreation {
                message: format!("token is not a valid header value: {e}"),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GitHubError::ClientCreation {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, GitHubError> {
        let request = self.http.get(self.url(path)).query(query);
        let response = send(request, resource).await?;
        decode(response).await
    }

    /// Follows page numbers until a short page comes back.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<Vec<T>, GitHubError> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: Vec<T> = self
                .get_json(
                    path,
                    &[
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                    resource,
                )
                .await?;
            let count = batch.len();
            all.extend(batch);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(resource, items = all.len(), pages = page, "Listed");
        Ok(all)
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    #[instrument(skip(self, repo, number), fields(repo = %repo, issue = %number))]
    async fn get_issue(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Issue, GitHubError> {
        let path = format!("/repos/{}/{}/issues/{}", repo.owner(), repo.name(), number);
        let issue: WireIssue = self
            .get_json(&path, &[], &format!("issue {repo}#{number}"))
            .await?;
        Ok(issue.into())
    }

    #[instrument(skip(self, query), fields(q = %query.to_query_string()))]
    async fn search_issues(
        &self,
        query: &SearchQuery,
        page: u32,
    ) -> Result<SearchPage, GitHubError> {
        let result: WireSearchResult = self
            .get_json(
                "/search/issues",
                &[
                    ("q", query.to_query_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
                "issue search",
            )
            .await?;
        Ok(result.into())
    }

    #[instrument(skip(self, repo, number), fields(repo = %repo, issue = %number))]
    async fn add_labels(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/labels",
            repo.owner(),
            repo.name(),
            number
        );
        let request = self.http.post(self.url(&path)).json(&WireLabels { labels });
        send(request, &format!("issue {repo}#{number}")).await?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestManager for GithubClient {
    #[instrument(skip(self, repo, number), fields(repo = %repo, pr = %number))]
    async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<PullRequest, GitHubError> {
        let path = format!("/repos/{}/{}/pulls/{}", repo.owner(), repo.name(), number);
        let pr: WirePullRequest = self
            .get_json(&path, &[], &format!("pull request {repo}#{number}"))
            .await?;
        Ok(pr.into())
    }

    #[instrument(skip(self, repo, number), fields(repo = %repo, pr = %number))]
    async fn get_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        let path = format!(
            "/repos/{}/{}/pulls/{}/files",
            repo.owner(),
            repo.name(),
            number
        );
        let files: Vec<WirePullRequestFile> = self
            .get_all(&path, &format!("files of pull request {repo}#{number}"))
            .await?;
        Ok(files.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ProjectBoard for GithubClient {
    #[instrument(skip(self))]
    async fn list_columns(&self, project: ProjectId) -> Result<Vec<ProjectColumn>, GitHubError> {
        let columns: Vec<WireColumn> = self
            .get_all(
                &format!("/projects/{project}/columns"),
                &format!("columns of project {project}"),
            )
            .await?;
        Ok(columns.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_cards(&self, column: ColumnId) -> Result<Vec<ProjectCard>, GitHubError> {
        let cards: Vec<WireCard> = self
            .get_all(
                &format!("/projects/columns/{column}/cards"),
                &format!("cards of column {column}"),
            )
            .await?;
        Ok(cards.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn get_card(&self, card: CardId) -> Result<ProjectCard, GitHubError> {
        let card: WireCard = self
            .get_json(
                &format!("/projects/columns/cards/{card}"),
                &[],
                &format!("card {card}"),
            )
            .await?;
        Ok(card.into())
    }

    #[instrument(skip(self))]
    async fn create_card(
        &self,
        column: ColumnId,
        card: NewCard,
    ) -> Result<ProjectCard, GitHubError> {
        let request = self
            .http
            .post(self.url(&format!("/projects/columns/{column}/cards")))
            .json(&card);
        let response = send(request, &format!("column {column}")).await?;
        let created: WireCard = decode(response).await?;
        Ok(created.into())
    }

    #[instrument(skip(self))]
    async fn move_card(&self, card: CardId, to: CardMove) -> Result<(), GitHubError> {
        let body = WireCardMove {
            position: to.position.to_string(),
            column_id: to.column.as_u64(),
        };
        let request = self
            .http
            .post(self.url(&format!("/projects/columns/cards/{card}/moves")))
            .json(&body);
        send(request, &format!("card {card}")).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

async fn send(request: RequestBuilder, resource: &str) -> Result<Response, GitHubError> {
    let response = request.send().await.map_err(|e| GitHubError::Transport {
        message: e.to_string(),
    })?;
    check_status(response, resource).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GitHubError> {
    let bytes = response.bytes().await.map_err(|e| GitHubError::Transport {
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| GitHubError::Decode {
        message: e.to_string(),
    })
}

/// Maps a non-success response onto a [`GitHubError`].
async fn check_status(response: Response, resource: &str) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<WireError>(&text)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (header_str(&headers, "x-ratelimit-remaining") == Some("0")
                || headers.contains_key("retry-after")));

    Err(if rate_limited {
        GitHubError::RateLimited {
            reset_after: reset_after(&headers),
        }
    } else {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GitHubError::Authentication {
                status: status.as_u16(),
                message,
            },
            StatusCode::NOT_FOUND => GitHubError::NotFound {
                resource: resource.to_string(),
            },
            _ => GitHubError::Http {
                status: status.as_u16(),
                message,
            },
        }
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Delay until the rate limit resets, from `retry-after` (seconds) or
/// `x-ratelimit-reset` (epoch seconds).
fn reset_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(secs) = header_str(headers, "retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }
    let reset = header_str(headers, "x-ratelimit-reset")?
        .parse::<i64>()
        .ok()?;
    let remaining = reset - chrono::Utc::now().timestamp();
    Some(Duration::from_secs(remaining.max(0) as u64))
}
