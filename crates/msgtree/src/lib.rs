//! msgtree - Branching Conversation Tree
//!
//! In-memory forest of chat messages where any message may have several
//! child versions (edits, regenerations, multi-participant replies).
//!
//! # Overview
//!
//! - **NodeStore**: authoritative `id -> node` map
//! - **MessageTree**: ordered roots, child lists, late-parent reattachment,
//!   removal with reparenting
//! - **BranchMap** / resolver: active linear path from a caller-owned
//!   branch selection
//! - **Snapshots**: O(1) structurally shared copies for copy-on-write state
//!
//! The tree is synchronous and single-owner. Callers that mutate it from
//! several tasks provide their own exclusion, or publish new snapshots
//! instead of mutating a shared instance.
//!
//! # Example
//!
//! ```rust
//! use msgtree::{BranchMap, Message, MessageId, MessageTree};
//!
//! let mut tree = MessageTree::new();
//! tree.add_message(Message::new("m1", "hi"))?;
//! tree.add_message(Message::new("m2", "hello").with_parent("m1"))?;
//! tree.add_message(Message::new("m3", "hey").with_parent("m1").with_version(1))?;
//!
//! // No selection: newest version wins
//! let path = tree.resolve_path("m1", &BranchMap::new())?;
//! assert_eq!(path, vec![MessageId::from("m1"), MessageId::from("m3")]);
//!
//! // Explicit selection
//! let mut branches = BranchMap::new();
//! branches.select("m1", "m2");
//! let path = tree.resolve_path("m1", &branches)?;
//! assert_eq!(path, vec![MessageId::from("m1"), MessageId::from("m2")]);
//! # Ok::<(), msgtree::TreeError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod forest;
pub mod resolver;
pub mod snapshot;
pub mod store;
pub mod types;
mod validate;

// Re-exports
pub use config::{DefaultBranch, OrphanPolicy, TieBreak, TreeConfig};
pub use error::{Result, TreeError};
pub use forest::MessageTree;
pub use resolver::BranchMap;
pub use store::{NodeMap, NodeStore};
pub use types::{BranchPosition, Message, MessageId, MessageRecord, TreeNode};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with message trees
    pub use crate::{
        BranchMap, BranchPosition, Message, MessageId, MessageRecord, MessageTree, TreeConfig,
        TreeError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn msg(id: &str, parent: Option<&str>, version: u32) -> Message {
        let m = Message::new(id, ()).with_version(version);
        match parent {
            Some(p) => m.with_parent(p),
            None => m,
        }
    }

    fn ids(list: &im::Vector<MessageId>) -> Vec<&str> {
        list.iter().map(MessageId::as_str).collect()
    }

    #[test]
    fn documented_walkthrough() {
        let mut tree = MessageTree::new();

        tree.add_message(msg("m1", None, 0)).unwrap();
        assert_eq!(ids(tree.roots()), vec!["m1"]);
        assert_eq!(tree.messages_count(), 1);

        tree.add_message(msg("m2", Some("m1"), 0)).unwrap();
        assert_eq!(ids(&tree.list_branches_at("m1").unwrap()), vec!["m2"]);

        tree.add_message(msg("m3", Some("m1"), 1)).unwrap();
        assert_eq!(ids(&tree.list_branches_at("m1").unwrap()), vec!["m2", "m3"]);
        let path = tree.resolve_path("m1", &BranchMap::new()).unwrap();
        assert_eq!(path, vec![MessageId::from("m1"), MessageId::from("m3")]);

        tree.remove_message("m1").unwrap();
        assert_eq!(ids(tree.roots()), vec!["m2", "m3"]);
        assert_eq!(tree.messages_count(), 2);
    }

    #[test]
    fn child_before_parent() {
        let mut tree = MessageTree::new();

        tree.add_message(msg("x2", Some("x1"), 0)).unwrap();
        assert!(tree.roots().contains(&MessageId::from("x2")));

        tree.add_message(msg("x1", None, 0)).unwrap();
        assert_eq!(ids(tree.roots()), vec!["x1"]);
        assert_eq!(ids(&tree.list_branches_at("x1").unwrap()), vec!["x2"]);
        tree.validate().unwrap();
    }
}
