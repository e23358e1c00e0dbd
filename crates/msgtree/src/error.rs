//! Error types for msgtree
//!
//! All failures are explicit and synchronous. The tree never logs, retries or
//! swallows an error; recovery policy belongs to the caller.

use crate::types::MessageId;

/// Crate result type
pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Tree operation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Record id already present
    #[error("duplicate message id: {id}")]
    DuplicateId {
        /// The rejected id
        id: MessageId,
    },

    /// Id not present (or not a root where a root is required)
    #[error("message not found: {id}")]
    NotFound {
        /// The missing id
        id: MessageId,
    },

    /// Structural invariant violated
    #[error("tree corrupted: {reason}")]
    Corrupted {
        /// First violation found
        reason: String,
    },
}

impl TreeError {
    /// Create duplicate id error
    #[inline]
    #[must_use]
    pub fn duplicate(id: impl Into<MessageId>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create not found error
    #[inline]
    #[must_use]
    pub fn not_found(id: impl Into<MessageId>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create corruption error
    #[inline]
    #[must_use]
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::Corrupted {
            reason: reason.into(),
        }
    }

    /// Check if error is a duplicate insert
    #[inline]
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateId { .. })
    }

    /// Check if error is a missing id
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Id the error refers to, if any
    #[must_use]
    pub fn id(&self) -> Option<&MessageId> {
        match self {
            Self::DuplicateId { id } | Self::NotFound { id } => Some(id),
            Self::Corrupted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            TreeError::duplicate("m1").to_string(),
            "duplicate message id: m1"
        );
        assert_eq!(TreeError::not_found("x").to_string(), "message not found: x");
        assert_eq!(
            TreeError::corrupted("cycle at a").to_string(),
            "tree corrupted: cycle at a"
        );
    }

    #[test]
    fn error_classification() {
        let dup = TreeError::duplicate("m1");
        assert!(dup.is_duplicate());
        assert!(!dup.is_not_found());
        assert_eq!(dup.id().map(MessageId::as_str), Some("m1"));

        assert!(TreeError::corrupted("x").id().is_none());
    }
}
