//! Newtype domain identifiers.
//!
//! GitHub hands out several unrelated integer sequences (issue numbers, global
//! issue ids, project column ids, card ids). Each one gets its own newtype so a
//! [`CardId`] can never be passed where a [`ColumnId`] is expected, even though
//! both are `u64` under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy, transparent serde), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// The per-repository number of an issue or pull request (`#1234`).
    ///
    /// Issues and pull requests share one number sequence within a repository.
    IssueNumber
}

u64_id! {
    /// The global database id of an issue, as returned by the issues and
    /// search endpoints. Used as the content id when creating an issue card.
    IssueId
}

u64_id! {
    /// The global database id of a pull request. Differs from the [`IssueId`]
    /// of the same item and is the content id for pull-request cards.
    PullRequestId
}

u64_id! {
    /// Identifies a classic project board.
    ProjectId
}

u64_id! {
    /// Identifies a column within a classic project board.
    ColumnId
}

u64_id! {
    /// Identifies a card within a project column.
    CardId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one invocation of the tool.
///
/// Generated fresh for every CLI run and recorded on the root span so all
/// activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Repository reference
// ---------------------------------------------------------------------------

/// A GitHub repository in `owner/name` form.
///
/// Both halves are non-empty and contain no `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Creates a repository reference, returning `None` if either part is
    /// empty or contains a `/`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        let owner = owner.into();
        let name = name.into();
        let valid = |s: &str| !s.is_empty() && !s.contains('/');
        if valid(&owner) && valid(&name) {
            Some(Self { owner, name })
        } else {
            None
        }
    }

    /// Parses an `owner/name` slug.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.trim().split_once('/')?;
        Self::new(owner, name)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepositoryRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("expected 'owner/name', got '{s}'"))
    }
}
