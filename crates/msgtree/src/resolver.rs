//! Branch resolver
//!
//! Turns a caller-owned [`BranchMap`] (`parent id -> chosen child id`) into
//! the single linear path a thread should display. Nodes without a valid
//! selection fall back to the configured [`DefaultBranch`], which is the
//! newest version unless configured otherwise.
//!
//! The resolver never mutates the branch map; persisting selections is the
//! caller's job.

use crate::config::DefaultBranch;
use crate::error::{Result, TreeError};
use crate::forest::MessageTree;
use crate::types::{MessageId, MessageRecord, TreeNode};
use im::Vector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Branch selection map: parent id -> selected child id
///
/// Plain serialisable state (a JSON object) owned by the caller, e.g.
/// persisted next to the conversation in local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchMap(IndexMap<MessageId, MessageId>);

impl BranchMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `child` under `parent`, returning the previous selection
    pub fn select(
        &mut self,
        parent: impl Into<MessageId>,
        child: impl Into<MessageId>,
    ) -> Option<MessageId> {
        self.0.insert(parent.into(), child.into())
    }

    /// Selected child under `parent`
    #[inline]
    #[must_use]
    pub fn selected(&self, parent: &str) -> Option<&MessageId> {
        self.0.get(parent)
    }

    /// Clear the selection under `parent`
    pub fn deselect(&mut self, parent: &str) -> Option<MessageId> {
        self.0.shift_remove(parent)
    }

    /// Number of selections
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no selections are recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate selections in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&MessageId, &MessageId)> + '_ {
        self.0.iter()
    }

    /// Record selections so that resolution passes through `id`
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if `id` is not in the tree
    pub fn select_path_to<M: MessageRecord>(&mut self, tree: &MessageTree<M>, id: &str) -> Result<()> {
        let path = tree.path_to(id)?;
        for pair in path.windows(2) {
            self.select(&pair[0], &pair[1]);
        }
        Ok(())
    }

    /// Drop selections that no longer match the tree
    ///
    /// An entry is stale when its parent is gone or its child is no longer
    /// one of that parent's children. Returns the number dropped.
    pub fn prune<M: MessageRecord>(&mut self, tree: &MessageTree<M>) -> usize {
        let before = self.0.len();
        self.0.retain(|parent, child| {
            tree.get(parent)
                .is_some_and(|node| node.child_ids().contains(child))
        });
        before - self.0.len()
    }
}

impl<P, C> FromIterator<(P, C)> for BranchMap
where
    P: Into<MessageId>,
    C: Into<MessageId>,
{
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(parent, child)| (parent.into(), child.into()))
                .collect(),
        )
    }
}

impl<M: MessageRecord> MessageTree<M> {
    /// Resolve the active path of the thread starting at a root
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if `root_id` is not a root
    pub fn resolve_path(&self, root_id: &str, branches: &BranchMap) -> Result<Vec<MessageId>> {
        if !self.roots.iter().any(|root| root == root_id) {
            return Err(TreeError::not_found(root_id));
        }
        self.resolve_from(root_id, branches)
    }

    /// Resolve the active path below any node, starting with the node itself
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if `start` is unknown, or
    /// [`TreeError::Corrupted`] if the walk revisits a node
    pub fn resolve_from(&self, start: &str, branches: &BranchMap) -> Result<Vec<MessageId>> {
        let mut current = self.node(start)?;
        let mut path = vec![current.id().clone()];

        while let Some(next) = self.choose_child(current, branches) {
            if path.len() >= self.store.size() {
                return Err(TreeError::corrupted(format!(
                    "branch walk from {start} does not terminate"
                )));
            }
            current = self.store.get(next).ok_or_else(|| {
                TreeError::corrupted(format!("{} lists missing child {next}", current.id()))
            })?;
            path.push(next.clone());
        }

        tracing::trace!("Resolved path from {} ({} messages)", start, path.len());
        Ok(path)
    }

    /// Resolve the active path of a root and return its records
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if `root_id` is not a root
    pub fn resolve_records(&self, root_id: &str, branches: &BranchMap) -> Result<Vec<&M>> {
        self.resolve_path(root_id, branches)?
            .iter()
            .map(|id| self.node(id).map(TreeNode::record))
            .collect()
    }

    /// Ordered child versions of a message
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if `parent_id` is unknown
    pub fn list_branches_at(&self, parent_id: &str) -> Result<Vector<MessageId>> {
        Ok(self.node(parent_id)?.child_ids.clone())
    }

    /// Child to follow from `node`: a valid selection, else the default
    fn choose_child<'a>(&self, node: &'a TreeNode<M>, branches: &BranchMap) -> Option<&'a MessageId> {
        let children = node.child_ids();

        if let Some(selected) = branches.selected(node.id()) {
            if let Some(child) = children.iter().find(|child| *child == selected) {
                return Some(child);
            }
        }

        match self.config.default_branch {
            DefaultBranch::Latest => children.back(),
            DefaultBranch::Earliest => children.front(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::types::Message;

    fn msg(id: &str, parent: Option<&str>, version: u32) -> Message {
        let m = Message::new(id, ()).with_version(version);
        match parent {
            Some(p) => m.with_parent(p),
            None => m,
        }
    }

    fn path(ids: &[&str]) -> Vec<MessageId> {
        ids.iter().copied().map(MessageId::from).collect()
    }

    /// m1 -> {m2 (v0) -> m4, m3 (v1) -> {m5 (v0), m6 (v1)}}
    fn sample() -> MessageTree<Message> {
        let mut tree = MessageTree::new();
        tree.add_message(msg("m1", None, 0)).unwrap();
        tree.add_message(msg("m2", Some("m1"), 0)).unwrap();
        tree.add_message(msg("m3", Some("m1"), 1)).unwrap();
        tree.add_message(msg("m4", Some("m2"), 0)).unwrap();
        tree.add_message(msg("m5", Some("m3"), 0)).unwrap();
        tree.add_message(msg("m6", Some("m3"), 1)).unwrap();
        tree
    }

    #[test]
    fn default_follows_latest() {
        let tree = sample();
        let resolved = tree.resolve_path("m1", &BranchMap::new()).unwrap();
        assert_eq!(resolved, path(&["m1", "m3", "m6"]));
    }

    #[test]
    fn selection_overrides_latest() {
        let tree = sample();
        let branches: BranchMap = [("m1", "m2")].into_iter().collect();

        let resolved = tree.resolve_path("m1", &branches).unwrap();
        assert_eq!(resolved, path(&["m1", "m2", "m4"]));
    }

    #[test]
    fn nested_selection() {
        let tree = sample();
        let branches: BranchMap = [("m3", "m5")].into_iter().collect();

        let resolved = tree.resolve_path("m1", &branches).unwrap();
        assert_eq!(resolved, path(&["m1", "m3", "m5"]));
    }

    #[test]
    fn invalid_selection_falls_back() {
        let tree = sample();
        // m4 is not a child of m1
        let branches: BranchMap = [("m1", "m4")].into_iter().collect();

        let resolved = tree.resolve_path("m1", &branches).unwrap();
        assert_eq!(resolved, path(&["m1", "m3", "m6"]));
    }

    #[test]
    fn earliest_default_branch() {
        let config = TreeConfig::new().with_default_branch(DefaultBranch::Earliest);
        let mut tree = MessageTree::with_config(config);
        tree.add_message(msg("r", None, 0)).unwrap();
        tree.add_message(msg("a", Some("r"), 0)).unwrap();
        tree.add_message(msg("b", Some("r"), 1)).unwrap();

        let resolved = tree.resolve_path("r", &BranchMap::new()).unwrap();
        assert_eq!(resolved, path(&["r", "a"]));
    }

    #[test]
    fn resolve_requires_root() {
        let tree = sample();
        let err = tree.resolve_path("m3", &BranchMap::new()).unwrap_err();
        assert!(err.is_not_found());

        let err = tree.resolve_path("nope", &BranchMap::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn resolve_from_interior() {
        let tree = sample();
        let resolved = tree.resolve_from("m2", &BranchMap::new()).unwrap();
        assert_eq!(resolved, path(&["m2", "m4"]));
    }

    #[test]
    fn resolve_records_returns_payloads() {
        let tree = sample();
        let records = tree.resolve_records("m1", &BranchMap::new()).unwrap();
        let ids: Vec<&str> = records.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3", "m6"]);
    }

    #[test]
    fn list_branches() {
        let tree = sample();
        let branches = tree.list_branches_at("m1").unwrap();
        assert_eq!(branches.iter().cloned().collect::<Vec<_>>(), path(&["m2", "m3"]));

        assert!(tree.list_branches_at("m6").unwrap().is_empty());
        assert!(tree.list_branches_at("zz").unwrap_err().is_not_found());
    }

    #[test]
    fn select_path_to_leaf() {
        let tree = sample();
        let mut branches = BranchMap::new();
        branches.select_path_to(&tree, "m4").unwrap();

        assert_eq!(branches.selected("m1").map(MessageId::as_str), Some("m2"));
        assert_eq!(branches.selected("m2").map(MessageId::as_str), Some("m4"));
        assert_eq!(tree.resolve_path("m1", &branches).unwrap(), path(&["m1", "m2", "m4"]));
    }

    #[test]
    fn prune_drops_stale_entries() {
        let mut tree = sample();
        let mut branches: BranchMap = [("m1", "m2"), ("m3", "m5"), ("gone", "x")]
            .into_iter()
            .collect();

        tree.remove_message("m3").unwrap();
        // m5 is now a child of m1, so the m3 entry and the unknown parent are stale
        let dropped = branches.prune(&tree);

        assert_eq!(dropped, 2);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches.selected("m1").map(MessageId::as_str), Some("m2"));
    }

    #[test]
    fn resolve_does_not_touch_branch_map() {
        let tree = sample();
        let branches: BranchMap = [("m1", "m2")].into_iter().collect();
        let before = branches.clone();

        tree.resolve_path("m1", &branches).unwrap();
        assert_eq!(branches, before);
    }

    #[test]
    fn branch_map_json_is_plain_object() {
        let branches: BranchMap = [("m1", "m2")].into_iter().collect();
        let json = serde_json::to_string(&branches).unwrap();
        assert_eq!(json, r#"{"m1":"m2"}"#);

        let back: BranchMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, branches);
    }

    #[test]
    fn deselect_restores_default() {
        let tree = sample();
        let mut branches = BranchMap::new();
        branches.select("m1", "m2");
        assert_eq!(branches.deselect("m1").map(|id| id.to_string()), Some("m2".to_string()));
        assert!(branches.is_empty());
        assert_eq!(tree.resolve_path("m1", &branches).unwrap(), path(&["m1", "m3", "m6"]));
    }
}
