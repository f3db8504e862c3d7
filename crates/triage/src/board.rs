//! Project board triage routines.
//!
//! [`BoardTriage`] keeps a classic project board in step with the labels and
//! milestones of a repository's issues:
//!
//! - [`BoardTriage::sync`] adds a card for every search hit admitted by a
//!   [`CardRule`] that is not already in the rule's target column.
//! - [`BoardTriage::move_by_milestone`] moves cards whose issue carries a
//!   given milestone from one column to the top of another.
//!
//! Both routines are strictly sequential. A failure to create or move one
//! card is logged and recorded in the report; failures to list or search
//! abort the routine.

use std::collections::HashSet;

use tracing::{debug, error, info, instrument, warn};

use crate::card_content::CardContentMatcher;
use crate::rules::CardRule;
use crate::{
    CardId, CardMove, ColumnId, GitHubError, Issue, IssueNumber, IssueTracker, ItemKind,
    NewCard, ProjectBoard, ProjectId, PullRequestManager, RepositoryRef, SearchQuery,
    TriageError,
};

/// GitHub search never returns more than 1000 results (10 pages of 100).
const MAX_SEARCH_PAGES: u32 = 10;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// An item whose card could not be created or moved.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFailure {
    pub number: IssueNumber,
    pub error: GitHubError,
}

/// Outcome of [`BoardTriage::sync`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub rule: String,
    /// Items that received a new card, in creation order.
    pub created: Vec<IssueNumber>,
    /// Hits skipped because the item is already in the target column (or was
    /// carded earlier in this run).
    pub already_present: usize,
    /// Hits the rule rejected.
    pub not_admitted: usize,
    pub failed: Vec<CardFailure>,
}

/// Outcome of [`BoardTriage::move_by_milestone`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveReport {
    pub moved: Vec<IssueNumber>,
    /// Cards whose issue does not carry the milestone (or has none).
    pub left_in_place: usize,
    /// Matching cards skipped because their issue is on the skip list.
    pub skipped: Vec<IssueNumber>,
    pub failed: Vec<CardFailure>,
}

// ---------------------------------------------------------------------------
// Routines
// ---------------------------------------------------------------------------

/// Runs triage routines for one repository against one project board.
pub struct BoardTriage<G> {
    github: G,
    repo: RepositoryRef,
    project: ProjectId,
    matcher: CardContentMatcher,
}

impl<G> BoardTriage<G>
where
    G: IssueTracker + PullRequestManager + ProjectBoard,
{
    pub fn new(github: G, repo: RepositoryRef, project: ProjectId) -> Result<Self, TriageError> {
        let matcher = CardContentMatcher::new(&repo).map_err(|e| TriageError::Configuration {
            message: format!("cannot build card matcher for {repo}: {e}"),
        })?;
        Ok(Self {
            github,
            repo,
            project,
            matcher,
        })
    }

    pub fn github(&self) -> &G {
        &self.github
    }

    pub fn repo(&self) -> &RepositoryRef {
        &self.repo
    }

    /// Adds cards for every admitted search hit missing from the rule's column.
    #[instrument(skip(self, rule), fields(repo = %self.repo, rule = %rule.name, column = %rule.target_column))]
    pub async fn sync(&self, rule: &CardRule) -> Result<SyncReport, TriageError> {
        self.log_columns().await?;

        let existing = self.github.list_cards(rule.target_column).await?;
        let mut seen: HashSet<IssueNumber> = self.matcher.issue_numbers(&existing);
        debug!(existing = seen.len(), "Loaded existing cards");

        let mut report = SyncReport {
            rule: rule.name.clone(),
            ..SyncReport::default()
        };

        for label in rule.search_labels() {
            let query = SearchQuery::new(self.repo.clone(), rule.item_kind).with_label(label);
            let hits = self.search_all(&query).await?;

            for item in hits {
                if seen.contains(&item.number) {
                    report.already_present += 1;
                    continue;
                }
                if let Err(reason) = rule.evaluate(&item) {
                    debug!(issue = %item.number, ?reason, "Not admitted");
                    report.not_admitted += 1;
                    continue;
                }
                seen.insert(item.number);

                match self.create_card_for(&item, rule).await {
                    Ok(card) => {
                        info!(issue = %item.number, card = %card, "Created card");
                        report.created.push(item.number);
                    }
                    Err(err) => {
                        error!(
                            issue = %item.number,
                            error.kind = err.kind(),
                            error.message = %err,
                            "Failed to create card"
                        );
                        report.failed.push(CardFailure {
                            number: item.number,
                            error: err,
                        });
                    }
                }
            }
        }

        info!(
            created = report.created.len(),
            already_present = report.already_present,
            not_admitted = report.not_admitted,
            failed = report.failed.len(),
            "Card sync finished"
        );
        Ok(report)
    }

    /// Moves cards in `from` whose issue carries `milestone` to the top of `to`.
    ///
    /// Issues listed in `skip` stay where they are.
    #[instrument(skip(self, skip), fields(repo = %self.repo, from = %from, to = %to))]
    pub async fn move_by_milestone(
        &self,
        from: ColumnId,
        to: ColumnId,
        milestone: &str,
        skip: &HashSet<IssueNumber>,
    ) -> Result<MoveReport, TriageError> {
        self.log_columns().await?;

        let cards = self.github.list_cards(from).await?;
        let mut report = MoveReport::default();
        let mut to_move: Vec<(IssueNumber, CardId)> = Vec::new();

        for card in &cards {
            let Some(number) = self.matcher.card_issue_number(card) else {
                continue;
            };
            let issue = self
                .github
                .get_issue(&self.repo, number)
                .await
                .map_err(|source| TriageError::CardContent { number, source })?;

            if issue.milestone_title() == Some(milestone) {
                to_move.push((number, card.id));
            } else {
                report.left_in_place += 1;
            }
        }

        for (number, card) in to_move {
            if skip.contains(&number) {
                debug!(issue = %number, "Skipping listed issue");
                report.skipped.push(number);
                continue;
            }
            match self.github.move_card(card, CardMove::to_top_of(to)).await {
                Ok(()) => {
                    info!(issue = %number, card = %card, "Moved card");
                    report.moved.push(number);
                }
                Err(err) => {
                    error!(
                        issue = %number,
                        error.kind = err.kind(),
                        error.message = %err,
                        "Failed to move card"
                    );
                    report.failed.push(CardFailure { number, error: err });
                }
            }
        }

        info!(
            moved = report.moved.len(),
            left_in_place = report.left_in_place,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Milestone move finished"
        );
        Ok(report)
    }

    async fn log_columns(&self) -> Result<(), TriageError> {
        let columns = self.github.list_columns(self.project).await?;
        for column in &columns {
            info!(project = %self.project, column = %column.id, name = %column.name, "Project column");
        }
        Ok(())
    }

    async fn create_card_for(&self, item: &Issue, rule: &CardRule) -> Result<CardId, GitHubError> {
        let card = match rule.item_kind {
            ItemKind::Issue => NewCard::for_issue(item.id),
            ItemKind::PullRequest => {
                let pr = self.github.get_pull_request(&self.repo, item.number).await?;
                NewCard::for_pull_request(pr.id)
            }
        };
        let created = self.github.create_card(rule.target_column, card).await?;
        Ok(created.id)
    }

    /// Collects every page of a search, preserving API order.
    async fn search_all(&self, query: &SearchQuery) -> Result<Vec<Issue>, GitHubError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let result = self.github.search_issues(query, page).await?;
            let fetched = result.items.len();
            items.extend(result.items);

            if result.incomplete_results {
                warn!(page, "Search results incomplete");
            }
            if fetched == 0 || items.len() as u64 >= result.total_count {
                break;
            }
            if page >= MAX_SEARCH_PAGES {
                warn!(total = result.total_count, collected = items.len(), "Search result cap reached");
                break;
            }
            page += 1;
        }
        debug!(query = %query.to_query_string(), hits = items.len(), "Search complete");
        Ok(items)
    }
}
