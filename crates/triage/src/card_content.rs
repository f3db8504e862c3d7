//! Mapping project cards back to the issues they represent.
//!
//! A card created from an issue or pull request carries a `content_url` such
//! as `https://api.github.com/repos/dotnet/runtime/issues/40848`. Pull-request
//! cards use the issue url too, so one pattern covers both.

use std::collections::HashSet;

use regex::Regex;

use crate::{IssueNumber, ProjectCard, RepositoryRef};

/// Extracts issue numbers from card content urls for one repository.
#[derive(Debug, Clone)]
pub struct CardContentMatcher {
    pattern: Regex,
}

impl CardContentMatcher {
    pub fn new(repo: &RepositoryRef) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"(?:^|/){}/{}/issues/(\d+)(?:[/?#]|$)",
            regex::escape(repo.owner()),
            regex::escape(repo.name())
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Returns the issue number a url points at, or `None` for urls in other
    /// repositories or with a number that does not fit in a `u64`.
    pub fn issue_number(&self, content_url: &str) -> Option<IssueNumber> {
        let caps = self.pattern.captures(content_url)?;
        caps.get(1)?.as_str().parse::<u64>().ok().map(IssueNumber::new)
    }

    /// Issue number of a card; note cards yield `None`.
    pub fn card_issue_number(&self, card: &ProjectCard) -> Option<IssueNumber> {
        card.content_url
            .as_deref()
            .and_then(|url| self.issue_number(url))
    }

    /// The set of issue numbers already present among `cards`.
    pub fn issue_numbers<'a>(
        &self,
        cards: impl IntoIterator<Item = &'a ProjectCard>,
    ) -> HashSet<IssueNumber> {
        cards
            .into_iter()
            .filter_map(|card| self.card_issue_number(card))
            .collect()
    }
}
