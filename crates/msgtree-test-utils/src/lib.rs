//! Testing utilities for the msgtree workspace
//!
//! Shared fixtures, generators and tracing setup.

#![allow(missing_docs)]

use msgtree::{DefaultBranch, Message, MessageId, MessageTree, OrphanPolicy, TieBreak, TreeConfig};
use proptest::prelude::*;

pub type TextMessage = Message<String>;

/// Build a text message; `parent` of `None` makes a root
pub fn msg(id: &str, parent: Option<&str>, version: u32) -> TextMessage {
    let message = Message::new(id, format!("text of {id}")).with_version(version);
    match parent {
        Some(parent) => message.with_parent(parent),
        None => message,
    }
}

pub fn ids(list: &im::Vector<MessageId>) -> Vec<&str> {
    list.iter().map(MessageId::as_str).collect()
}

pub fn path(ids: &[&str]) -> Vec<MessageId> {
    ids.iter().copied().map(MessageId::from).collect()
}

/// Single chain `m0 -> m1 -> ... -> m{len-1}`
pub fn linear_conversation(len: usize) -> MessageTree<TextMessage> {
    let mut tree = MessageTree::new();
    for i in 0..len {
        let id = format!("m{i}");
        let parent = i.checked_sub(1).map(|p| format!("m{p}"));
        tree.add_message(msg(&id, parent.as_deref(), 0)).unwrap();
    }
    tree
}

/// Chain of `depth` turns where every turn has `versions` alternatives
///
/// Ids are `t{turn}v{version}`; each version of turn `n + 1` hangs off the
/// latest version of turn `n`.
pub fn regenerated_conversation(depth: usize, versions: u32) -> MessageTree<TextMessage> {
    let mut tree = MessageTree::new();
    let mut parent: Option<String> = None;
    for turn in 0..depth {
        for version in 0..versions {
            let id = format!("t{turn}v{version}");
            tree.add_message(msg(&id, parent.as_deref(), version)).unwrap();
        }
        parent = Some(format!("t{turn}v{}", versions.saturating_sub(1)));
    }
    tree
}

/// Mutation applied by property tests
#[derive(Debug, Clone)]
pub enum TreeOp {
    Add {
        id: String,
        parent: Option<String>,
        version: u32,
    },
    Remove {
        id: String,
    },
}

impl TreeOp {
    /// Apply to a tree, returning whether the operation succeeded
    pub fn apply(&self, tree: &mut MessageTree<TextMessage>) -> bool {
        match self {
            Self::Add {
                id,
                parent,
                version,
            } => tree
                .add_message(msg(id, parent.as_deref(), *version))
                .is_ok(),
            Self::Remove { id } => tree.remove_message(id).is_ok(),
        }
    }
}

fn small_id() -> impl Strategy<Value = String> {
    (0..12u8).prop_map(|n| format!("n{n}"))
}

/// Random add/remove operation over a small id space so collisions,
/// removals of known ids and out-of-order parents are all common
pub fn tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        3 => (small_id(), proptest::option::of(small_id()), 0..4u32)
            .prop_map(|(id, parent, version)| TreeOp::Add { id, parent, version }),
        1 => small_id().prop_map(|id| TreeOp::Remove { id }),
    ]
}

pub fn tree_ops(max_len: usize) -> impl Strategy<Value = Vec<TreeOp>> {
    proptest::collection::vec(tree_op(), 0..max_len)
}

/// Any combination of the configurable policies
pub fn tree_config() -> impl Strategy<Value = TreeConfig> {
    (
        prop_oneof![Just(TieBreak::InsertionOrder), Just(TieBreak::ReverseInsertion)],
        prop_oneof![Just(OrphanPolicy::ReattachOnArrival), Just(OrphanPolicy::Detach)],
        prop_oneof![Just(DefaultBranch::Latest), Just(DefaultBranch::Earliest)],
    )
        .prop_map(|(tie_break, orphan_policy, default_branch)| {
            TreeConfig::new()
                .with_tie_break(tie_break)
                .with_orphan_policy(orphan_policy)
                .with_default_branch(default_branch)
        })
}

/// Install a fmt subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
