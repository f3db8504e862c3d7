//! In-memory port implementations for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    CardId, CardMove, ColumnId, GitHubError, Issue, IssueId, IssueNumber, IssueTracker,
    ItemState, LabelPrediction, LabelPredictor, LabelScore, Milestone, NewCard, PredictionError,
    PredictionInput, ProjectBoard, ProjectCard, ProjectColumn, ProjectId, PullRequest,
    PullRequestFile, PullRequestId, PullRequestManager, RepositoryRef, SearchPage, SearchQuery,
};

/// Builds an issue whose global id is `1000 + number`.
pub fn issue(number: u64, labels: &[&str], milestone: Option<&str>) -> Issue {
    Issue {
        id: IssueId::new(1000 + number),
        number: IssueNumber::new(number),
        title: format!("Issue {number}"),
        body: Some(format!("Body of {number}")),
        author: Some("octocat".into()),
        state: ItemState::Open,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        milestone: milestone.map(|title| Milestone {
            number: 1,
            title: title.into(),
        }),
        is_pull_request: false,
        html_url: None,
        updated_at: None,
    }
}

/// Builds the issue view of a pull request; its pull request id is `5000 + number`.
pub fn pr_issue(number: u64, labels: &[&str]) -> Issue {
    Issue {
        is_pull_request: true,
        ..issue(number, labels, None)
    }
}

#[derive(Default)]
struct State {
    issues: HashMap<IssueNumber, Issue>,
    searches: HashMap<String, Vec<Issue>>,
    search_calls: usize,
    cards: HashMap<ColumnId, Vec<ProjectCard>>,
    next_card: u64,
    created: Vec<(ColumnId, NewCard)>,
    moved: Vec<(CardId, CardMove)>,
    failing_content: HashSet<u64>,
    failing_moves: HashSet<CardId>,
    failing_pull_requests: HashSet<IssueNumber>,
    fail_listing: bool,
    files: HashMap<IssueNumber, Vec<String>>,
    labels_added: Vec<(IssueNumber, Vec<String>)>,
}

pub struct FakeGitHub {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 100,
        }
    }
}

impl FakeGitHub {
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn add_issue(&self, issue: Issue) {
        let mut s = self.state.lock().unwrap();
        s.issues.insert(issue.number, issue);
    }

    pub fn add_search_results(&self, query: &str, items: Vec<Issue>) {
        let mut s = self.state.lock().unwrap();
        s.searches.insert(query.to_string(), items);
    }

    pub fn add_card(&self, column: ColumnId, content_url: Option<&str>) -> CardId {
        let mut s = self.state.lock().unwrap();
        s.next_card += 1;
        let id = CardId::new(s.next_card);
        s.cards.entry(column).or_default().push(ProjectCard {
            id,
            content_url: content_url.map(str::to_owned),
            note: content_url.is_none().then(|| "a note".to_string()),
        });
        id
    }

    pub fn add_pull_request_files(&self, number: u64, files: &[&str]) {
        let mut s = self.state.lock().unwrap();
        s.files.insert(
            IssueNumber::new(number),
            files.iter().map(|f| f.to_string()).collect(),
        );
    }

    pub fn fail_card_creation_for(&self, content_id: u64) {
        self.state.lock().unwrap().failing_content.insert(content_id);
    }

    pub fn fail_move_for(&self, card: CardId) {
        self.state.lock().unwrap().failing_moves.insert(card);
    }

    pub fn fail_pull_request_lookup(&self, number: u64) {
        self.state
            .lock()
            .unwrap()
            .failing_pull_requests
            .insert(IssueNumber::new(number));
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn created_cards(&self) -> Vec<(ColumnId, NewCard)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn moved_cards(&self) -> Vec<(CardId, CardMove)> {
        self.state.lock().unwrap().moved.clone()
    }

    pub fn search_calls(&self) -> usize {
        self.state.lock().unwrap().search_calls
    }

    pub fn labels_added(&self) -> Vec<(IssueNumber, Vec<String>)> {
        self.state.lock().unwrap().labels_added.clone()
    }
}

fn server_error() -> GitHubError {
    GitHubError::Http {
        status: 500,
        message: "Internal Server Error".into(),
    }
}

#[async_trait]
impl IssueTracker for FakeGitHub {
    async fn get_issue(
        &self,
        _repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Issue, GitHubError> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&number)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound {
                resource: format!("issue #{number}"),
            })
    }

    async fn search_issues(
        &self,
        query: &SearchQuery,
        page: u32,
    ) -> Result<SearchPage, GitHubError> {
        let mut s = self.state.lock().unwrap();
        s.search_calls += 1;
        let all = s
            .searches
            .get(&query.to_query_string())
            .cloned()
            .unwrap_or_default();
        let start = (page as usize - 1) * self.page_size;
        let items = all
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        Ok(SearchPage {
            total_count: all.len() as u64,
            incomplete_results: false,
            items,
        })
    }

    async fn add_labels(
        &self,
        _repo: &RepositoryRef,
        number: IssueNumber,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        self.state
            .lock()
            .unwrap()
            .labels_added
            .push((number, labels.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl PullRequestManager for FakeGitHub {
    async fn get_pull_request(
        &self,
        _repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<PullRequest, GitHubError> {
        if self
            .state
            .lock()
            .unwrap()
            .failing_pull_requests
            .contains(&number)
        {
            return Err(GitHubError::NotFound {
                resource: format!("pull request #{number}"),
            });
        }
        Ok(PullRequest {
            id: PullRequestId::new(5000 + number.as_u64()),
            number,
            title: format!("PR {number}"),
            body: Some(format!("PR body {number}")),
            author: Some("contributor".into()),
            state: ItemState::Open,
            draft: false,
        })
    }

    async fn get_pull_request_files(
        &self,
        _repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        let s = self.state.lock().unwrap();
        Ok(s.files
            .get(&number)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|filename| PullRequestFile {
                filename,
                status: "modified".into(),
                additions: 1,
                deletions: 0,
            })
            .collect())
    }
}

#[async_trait]
impl ProjectBoard for FakeGitHub {
    async fn list_columns(&self, _project: ProjectId) -> Result<Vec<ProjectColumn>, GitHubError> {
        let s = self.state.lock().unwrap();
        if s.fail_listing {
            return Err(server_error());
        }
        Ok(s.cards
            .keys()
            .map(|id| ProjectColumn {
                id: *id,
                name: format!("Column {id}"),
            })
            .collect())
    }

    async fn list_cards(&self, column: ColumnId) -> Result<Vec<ProjectCard>, GitHubError> {
        let s = self.state.lock().unwrap();
        if s.fail_listing {
            return Err(server_error());
        }
        Ok(s.cards.get(&column).cloned().unwrap_or_default())
    }

    async fn get_card(&self, card: CardId) -> Result<ProjectCard, GitHubError> {
        let s = self.state.lock().unwrap();
        s.cards
            .values()
            .flatten()
            .find(|c| c.id == card)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound {
                resource: format!("card {card}"),
            })
    }

    async fn create_card(
        &self,
        column: ColumnId,
        card: NewCard,
    ) -> Result<ProjectCard, GitHubError> {
        let mut s = self.state.lock().unwrap();
        if s.failing_content.contains(&card.content_id) {
            return Err(GitHubError::Http {
                status: 422,
                message: "Project already has the associated issue".into(),
            });
        }
        s.next_card += 1;
        let created = ProjectCard {
            id: CardId::new(s.next_card),
            content_url: None,
            note: None,
        };
        s.created.push((column, card));
        Ok(created)
    }

    async fn move_card(&self, card: CardId, to: CardMove) -> Result<(), GitHubError> {
        let mut s = self.state.lock().unwrap();
        if s.failing_moves.contains(&card) {
            return Err(server_error());
        }
        s.moved.push((card, to));
        Ok(())
    }
}

/// Returns a fixed set of predictions and records every input it saw.
#[derive(Default)]
pub struct FakePredictor {
    predictions: Vec<(String, f64)>,
    inputs: Mutex<Vec<PredictionInput>>,
    fail: bool,
}

impl FakePredictor {
    pub fn returning(predictions: &[(&str, f64)]) -> Self {
        Self {
            predictions: predictions
                .iter()
                .map(|(l, s)| (l.to_string(), *s))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn inputs(&self) -> Vec<PredictionInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LabelPredictor for FakePredictor {
    async fn predict(
        &self,
        input: &PredictionInput,
    ) -> Result<Vec<LabelPrediction>, PredictionError> {
        self.inputs.lock().unwrap().push(input.clone());
        if self.fail {
            return Err(PredictionError::Unavailable {
                message: "model not loaded".into(),
            });
        }
        Ok(self
            .predictions
            .iter()
            .filter_map(|(label, score)| {
                LabelScore::new(*score).map(|score| LabelPrediction {
                    label: label.clone(),
                    score,
                })
            })
            .collect())
    }
}
