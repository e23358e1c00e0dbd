//! Structural invariant checks
//!
//! Public operations keep these invariants on their own; [`validate`] exists
//! for trees assembled with [`MessageTree::from_parts`] and for tests.
//!
//! [`validate`]: MessageTree::validate

use crate::error::{Result, TreeError};
use crate::forest::MessageTree;
use crate::types::{MessageId, MessageRecord};
use im::Vector;
use std::collections::HashSet;

impl<M: MessageRecord> MessageTree<M> {
    /// Check every structural invariant
    ///
    /// - roots exist and have no parent in the tree
    /// - children exist and point back at their parent
    /// - no id is listed twice
    /// - roots waiting for a missing parent are indexed under it
    /// - sibling lists are sorted by version (then tie-break)
    /// - every node is reachable from exactly one root (no cycles)
    ///
    /// # Errors
    /// Returns [`TreeError::Corrupted`] describing the first violation
    pub fn validate(&self) -> Result<()> {
        self.check_sorted("roots", &self.roots)?;

        let mut listed: HashSet<&str> = HashSet::with_capacity(self.store.size());
        let mut waiting_roots = 0usize;

        for root in &self.roots {
            let node = self
                .get(root)
                .ok_or_else(|| TreeError::corrupted(format!("root {root} not in map")))?;
            if node.parent_id().is_some_and(|parent| self.contains(parent)) {
                return Err(TreeError::corrupted(format!(
                    "root {root} has parent in tree"
                )));
            }
            if !listed.insert(root) {
                return Err(TreeError::corrupted(format!("{root} listed twice")));
            }
            if let Some(parent) = node.parent_id() {
                waiting_roots += 1;
                if !self.waiting.get(parent).is_some_and(|list| list.contains(root)) {
                    return Err(TreeError::corrupted(format!(
                        "root {root} not indexed as waiting for {parent}"
                    )));
                }
            }
        }

        let indexed: usize = self.waiting.values().map(Vector::len).sum();
        if indexed != waiting_roots {
            return Err(TreeError::corrupted(format!(
                "{indexed} roots indexed as waiting, {waiting_roots} actually waiting"
            )));
        }

        for node in self.iter() {
            let id = node.id();
            if self.get(id).map(|stored| stored.id()) != Some(id) {
                return Err(TreeError::corrupted(format!("{id} stored under another key")));
            }

            self.check_sorted(id, node.child_ids())?;

            for child in node.child_ids() {
                let child_node = self.get(child).ok_or_else(|| {
                    TreeError::corrupted(format!("{id} lists missing child {child}"))
                })?;
                if child_node.parent_id() != Some(id) {
                    return Err(TreeError::corrupted(format!(
                        "{child} listed under {id} but points at {:?}",
                        child_node.parent_id()
                    )));
                }
                if !listed.insert(child) {
                    return Err(TreeError::corrupted(format!("{child} listed twice")));
                }
            }
        }

        if listed.len() != self.store.size() {
            return Err(TreeError::corrupted(format!(
                "{} of {} messages are not listed under a parent or as root",
                self.store.size() - listed.len(),
                self.store.size()
            )));
        }

        self.check_reachable()
    }

    fn check_sorted(&self, owner: &str, list: &Vector<MessageId>) -> Result<()> {
        let out_of_order = list
            .iter()
            .zip(list.iter().skip(1))
            .find(|(a, b)| self.sort_key(a) > self.sort_key(b));

        match out_of_order {
            Some((a, b)) => Err(TreeError::corrupted(format!(
                "{owner}: {a} sorted before {b}"
            ))),
            None => Ok(()),
        }
    }

    /// Walk down from the roots; anything not reached sits on a cycle
    fn check_reachable(&self) -> Result<()> {
        let mut stack: Vec<&MessageId> = self.roots.iter().collect();
        let mut reached = 0usize;

        while let Some(id) = stack.pop() {
            reached += 1;
            if reached > self.store.size() {
                return Err(TreeError::corrupted("cycle below roots"));
            }
            if let Some(node) = self.get(id) {
                stack.extend(node.child_ids().iter());
            }
        }

        if reached == self.store.size() {
            Ok(())
        } else {
            Err(TreeError::corrupted(format!(
                "{} messages unreachable from roots",
                self.store.size() - reached
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, TreeNode};
    use std::sync::Arc;

    fn msg(id: &str, parent: Option<&str>, version: u32) -> Message {
        let m = Message::new(id, ()).with_version(version);
        match parent {
            Some(p) => m.with_parent(p),
            None => m,
        }
    }

    fn sample() -> MessageTree<Message> {
        let mut tree = MessageTree::new();
        tree.add_message(msg("a", None, 0)).unwrap();
        tree.add_message(msg("b", Some("a"), 0)).unwrap();
        tree.add_message(msg("c", Some("a"), 1)).unwrap();
        tree
    }

    #[test]
    fn valid_tree_passes() {
        let mut tree = sample();
        tree.validate().unwrap();

        tree.remove_message("a").unwrap();
        tree.validate().unwrap();
    }

    #[test]
    fn detects_missing_root() {
        let tree = sample();
        let mut roots = tree.roots().clone();
        roots.push_back(MessageId::from("ghost"));

        let broken = MessageTree::from_parts(tree.map().clone(), roots);
        assert!(matches!(broken.validate(), Err(TreeError::Corrupted { .. })));
    }

    #[test]
    fn detects_unlisted_node() {
        let tree = sample();
        let mut map = tree.map().clone();
        let stray = TreeNode::new(Arc::new(msg("stray", None, 0)), 99);
        map.insert(MessageId::from("stray"), Arc::new(stray));

        let broken = MessageTree::from_parts(map, tree.roots().clone());
        assert!(matches!(broken.validate(), Err(TreeError::Corrupted { .. })));
    }

    #[test]
    fn detects_unsorted_children() {
        let tree = sample();
        let mut map = tree.map().clone();
        let original = map.get("a").unwrap();
        let mut parent = TreeNode::new(Arc::clone(original.record_arc()), original.seq());
        parent.child_ids = original.child_ids().iter().rev().cloned().collect();
        assert!(Arc::ptr_eq(parent.record_arc(), original.record_arc()));
        map.insert(MessageId::from("a"), Arc::new(parent));

        let broken = MessageTree::from_parts(map, tree.roots().clone());
        assert!(matches!(broken.validate(), Err(TreeError::Corrupted { .. })));
    }

    #[test]
    fn detects_cycle_and_resolver_stops() {
        let mut map = crate::store::NodeMap::new();
        let mut x = TreeNode::new(Arc::new(msg("x", Some("y"), 0)), 0);
        let mut y = TreeNode::new(Arc::new(msg("y", Some("x"), 0)), 1);
        x.child_ids.push_back(MessageId::from("y"));
        y.child_ids.push_back(MessageId::from("x"));
        map.insert(MessageId::from("x"), Arc::new(x));
        map.insert(MessageId::from("y"), Arc::new(y));

        let broken: MessageTree<Message> = MessageTree::from_parts(map, Vector::new());
        assert!(broken.validate().is_err());

        let err = broken
            .resolve_from("x", &crate::resolver::BranchMap::new())
            .unwrap_err();
        assert!(matches!(err, TreeError::Corrupted { .. }));
    }
}
