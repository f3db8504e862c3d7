//! Card rules: which search results belong in which project column.
//!
//! Every "add cards" routine on the board is the same loop with different
//! parameters. A [`CardRule`] captures those parameters; [`crate::BoardTriage`]
//! runs the loop.

use serde::{Deserialize, Serialize};

use crate::{ColumnId, Issue, ItemKind};

/// How a rule finds candidate items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SearchStrategy {
    /// One search filtered by a single label (e.g. `needs further triage`).
    Single { label: String },
    /// One search per area label, in allow-list order.
    PerAreaLabel,
}

/// Parameters of one card-creation routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRule {
    /// Human-readable name used in logs and reports.
    pub name: String,
    pub target_column: ColumnId,
    pub item_kind: ItemKind,
    pub search: SearchStrategy,
    /// An item qualifies only if at least one of its labels is listed here.
    pub area_labels: Vec<String>,
    /// When set, the item's milestone title must match exactly.
    pub required_milestone: Option<String>,
    /// Items carrying any of these labels are never carded.
    pub excluded_labels: Vec<String>,
}

/// Why an item was not admitted by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    WrongKind,
    ExcludedLabel,
    NoAreaLabel,
    MilestoneMismatch,
}

impl CardRule {
    /// Untriaged issues labelled `needs further triage` in any listed area.
    pub fn untriaged_issues(
        target_column: ColumnId,
        triage_label: impl Into<String>,
        area_labels: Vec<String>,
    ) -> Self {
        Self {
            name: "add-untriaged".into(),
            target_column,
            item_kind: ItemKind::Issue,
            search: SearchStrategy::Single {
                label: triage_label.into(),
            },
            area_labels,
            required_milestone: None,
            excluded_labels: Vec::new(),
        }
    }

    /// Open pull requests in any listed area.
    pub fn active_pull_requests(target_column: ColumnId, area_labels: Vec<String>) -> Self {
        Self {
            name: "add-prs".into(),
            target_column,
            item_kind: ItemKind::PullRequest,
            search: SearchStrategy::PerAreaLabel,
            area_labels,
            required_milestone: None,
            excluded_labels: Vec::new(),
        }
    }

    /// Triaged issues in any listed area that carry `milestone` but are
    /// missing from its column.
    pub fn triaged_with_milestone(
        target_column: ColumnId,
        milestone: impl Into<String>,
        area_labels: Vec<String>,
        triage_labels: Vec<String>,
    ) -> Self {
        let milestone = milestone.into();
        Self {
            name: format!("add-milestone:{milestone}"),
            target_column,
            item_kind: ItemKind::Issue,
            search: SearchStrategy::PerAreaLabel,
            area_labels,
            required_milestone: Some(milestone),
            excluded_labels: triage_labels,
        }
    }

    /// Search label sets to issue, in order. Each entry becomes one query.
    pub fn search_labels(&self) -> Vec<String> {
        match &self.search {
            SearchStrategy::Single { label } => vec![label.clone()],
            SearchStrategy::PerAreaLabel => self.area_labels.clone(),
        }
    }

    /// Checks an item against the rule.
    pub fn evaluate(&self, item: &Issue) -> Result<(), Rejection> {
        if item.kind() != self.item_kind {
            return Err(Rejection::WrongKind);
        }
        if self.excluded_labels.iter().any(|l| item.has_label(l)) {
            return Err(Rejection::ExcludedLabel);
        }
        if !item.labels.iter().any(|l| self.area_labels.contains(l)) {
            return Err(Rejection::NoAreaLabel);
        }
        if let Some(required) = &self.required_milestone {
            if item.milestone_title() != Some(required.as_str()) {
                return Err(Rejection::MilestoneMismatch);
            }
        }
        Ok(())
    }

    pub fn admits(&self, item: &Issue) -> bool {
        self.evaluate(item).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IssueId, IssueNumber, ItemState, Milestone};

    fn areas() -> Vec<String> {
        vec![
            "area-Extensions-Logging".into(),
            "area-System.Drawing".into(),
        ]
    }

    fn issue(labels: &[&str], milestone: Option<&str>, is_pr: bool) -> Issue {
        Issue {
            id: IssueId::new(1),
            number: IssueNumber::new(1),
            title: "t".into(),
            body: None,
            author: None,
            state: ItemState::Open,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            milestone: milestone.map(|title| Milestone {
                number: 1,
                title: title.into(),
            }),
            is_pull_request: is_pr,
            html_url: None,
            updated_at: None,
        }
    }

    #[test]
    fn untriaged_rule_admits_any_issue_with_an_area_label() {
        let rule = CardRule::untriaged_issues(ColumnId::new(1), "needs further triage", areas());
        assert!(rule.admits(&issue(
            &["needs further triage", "area-System.Drawing"],
            None,
            false
        )));
        assert_eq!(
            rule.evaluate(&issue(&["needs further triage", "area-Other"], None, false)),
            Err(Rejection::NoAreaLabel)
        );
    }

    #[test]
    fn milestone_rule_requires_exact_title_and_skips_untriaged() {
        let rule = CardRule::triaged_with_milestone(
            ColumnId::new(1),
            "Future",
            areas(),
            vec!["untriaged".into(), "needs further triage".into()],
        );
        assert!(rule.admits(&issue(&["area-System.Drawing"], Some("Future"), false)));
        assert_eq!(
            rule.evaluate(&issue(&["area-System.Drawing"], Some("6.0.0"), false)),
            Err(Rejection::MilestoneMismatch)
        );
        assert_eq!(
            rule.evaluate(&issue(&["area-System.Drawing"], None, false)),
            Err(Rejection::MilestoneMismatch)
        );
        assert_eq!(
            rule.evaluate(&issue(
                &["area-System.Drawing", "untriaged"],
                Some("Future"),
                false
            )),
            Err(Rejection::ExcludedLabel)
        );
    }

    #[test]
    fn pull_request_rule_rejects_plain_issues() {
        let rule = CardRule::active_pull_requests(ColumnId::new(1), areas());
        assert!(rule.admits(&issue(&["area-Extensions-Logging"], None, true)));
        assert_eq!(
            rule.evaluate(&issue(&["area-Extensions-Logging"], None, false)),
            Err(Rejection::WrongKind)
        );
    }

    #[test]
    fn per_area_rules_search_each_area_in_order() {
        let rule = CardRule::active_pull_requests(ColumnId::new(1), areas());
        assert_eq!(rule.search_labels(), areas());

        let single = CardRule::untriaged_issues(ColumnId::new(1), "needs further triage", areas());
        assert_eq!(single.search_labels(), vec!["needs further triage".to_string()]);
    }
}
