//! Tree policy configuration
//!
//! Sibling tie-breaks, orphan handling and the resolver's default branch are
//! policy points rather than hard-coded rules.

use serde::{Deserialize, Serialize};

/// Order of siblings sharing a `version_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earlier insertion first
    #[default]
    InsertionOrder,

    /// Later insertion first
    ReverseInsertion,
}

/// Handling of a record whose parent is not in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Temporary root, moved under the parent once it arrives
    #[default]
    ReattachOnArrival,

    /// Permanent root; the unknown parent link is dropped
    Detach,
}

/// Child followed when the branch map has no valid selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultBranch {
    /// Highest `version_index`
    #[default]
    Latest,

    /// Lowest `version_index`
    Earliest,
}

/// Tree configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Sibling tie-break rule
    pub tie_break: TieBreak,
    /// Orphan handling
    pub orphan_policy: OrphanPolicy,
    /// Resolver fallback
    pub default_branch: DefaultBranch,
}

impl TreeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With tie-break rule
    #[inline]
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// With orphan policy
    #[inline]
    #[must_use]
    pub fn with_orphan_policy(mut self, orphan_policy: OrphanPolicy) -> Self {
        self.orphan_policy = orphan_policy;
        self
    }

    /// With resolver default branch
    #[inline]
    #[must_use]
    pub fn with_default_branch(mut self, default_branch: DefaultBranch) -> Self {
        self.default_branch = default_branch;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input or unknown variants
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sort key for a node with the given version and insertion sequence
    #[inline]
    pub(crate) fn sort_key(&self, version_index: u32, seq: u64) -> (u32, i128) {
        let tie = match self.tie_break {
            TieBreak::InsertionOrder => i128::from(seq),
            TieBreak::ReverseInsertion => -i128::from(seq),
        };
        (version_index, tie)
    }
}
