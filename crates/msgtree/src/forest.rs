//! Forest and root tracking
//!
//! [`MessageTree`] keeps the ordered root list and every node's child list
//! consistent with the `parent_id` each record declares:
//!
//! - A record whose parent is absent (or not yet arrived) becomes a root.
//! - When a missing parent arrives later, waiting roots are moved under it.
//! - Removing a node splices it out; its children move up one level.
//!
//! Sibling lists (roots included) stay sorted by `version_index`, ties
//! broken by [`TieBreak`](crate::TieBreak).

use crate::config::{OrphanPolicy, TreeConfig};
use crate::error::{Result, TreeError};
use crate::store::NodeStore;
use crate::types::{BranchPosition, MessageId, MessageRecord, TreeNode};
use im::{HashMap, Vector};
use std::sync::Arc;

/// Roots whose declared parent has not arrived, keyed by that parent
pub(crate) type WaitingIndex = HashMap<MessageId, Vector<MessageId>>;

/// Branching conversation tree
///
/// A forest of messages where any message may have several child versions.
/// Cloning is O(1): the node map and root list are persistent collections.
///
/// # Example
/// ```
/// use msgtree::{BranchMap, Message, MessageId, MessageTree};
///
/// let mut tree = MessageTree::new();
/// tree.add_message(Message::new("m1", ()))?;
/// tree.add_message(Message::new("m2", ()).with_parent("m1"))?;
/// tree.add_message(Message::new("m3", ()).with_parent("m1").with_version(1))?;
///
/// let path = tree.resolve_path("m1", &BranchMap::new())?;
/// assert_eq!(path, vec![MessageId::from("m1"), MessageId::from("m3")]);
/// # Ok::<(), msgtree::TreeError>(())
/// ```
#[derive(Debug)]
pub struct MessageTree<M> {
    pub(crate) store: NodeStore<M>,
    pub(crate) roots: Vector<MessageId>,
    pub(crate) waiting: WaitingIndex,
    pub(crate) config: TreeConfig,
}

impl<M> Clone for MessageTree<M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            roots: self.roots.clone(),
            waiting: self.waiting.clone(),
            config: self.config,
        }
    }
}

/// Where a node hangs in the forest
enum Slot {
    Root,
    Child(MessageId),
}

impl<M: MessageRecord> MessageTree<M> {
    /// Create empty tree with default policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Create empty tree with explicit policy
    #[inline]
    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            store: NodeStore::new(),
            roots: Vector::new(),
            waiting: HashMap::new(),
            config,
        }
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Insert a record and link it into the forest
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateId`] if the id is already known
    pub fn add_message(&mut self, record: M) -> Result<()> {
        self.add_shared_message(Arc::new(record))
    }

    /// Insert a record already behind an `Arc`
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateId`] if the id is already known
    pub fn add_shared_message(&mut self, record: Arc<M>) -> Result<()> {
        let id = record.id().clone();
        if self.store.contains(&id) {
            return Err(TreeError::duplicate(id));
        }

        // Resolved before the insert so a record naming itself as parent
        // never attaches to itself.
        let declared_parent = record.parent_id().cloned();
        let attach_to = declared_parent
            .as_ref()
            .filter(|parent| self.store.contains(parent))
            .cloned();

        self.store.insert(record)?;

        match attach_to {
            Some(parent) => {
                self.link(&id, &Slot::Child(parent.clone()));
                tracing::debug!("Attached message {} under {}", id, parent);
            }
            None => {
                let self_parent = declared_parent.as_ref() == Some(&id);
                let detach = declared_parent.is_some()
                    && self.config.orphan_policy == OrphanPolicy::Detach;
                if self_parent || detach {
                    if let Some(node) = self.store.get_mut(&id) {
                        node.parent_id = None;
                    }
                }
                self.link(&id, &Slot::Root);
                tracing::debug!(
                    "Added message {} as root (declared parent: {:?})",
                    id,
                    declared_parent
                );
            }
        }

        if let Some(waiting) = self.waiting.remove(&id) {
            match self.config.orphan_policy {
                OrphanPolicy::ReattachOnArrival => self.adopt_waiting_roots(&id, waiting),
                OrphanPolicy::Detach => self.detach_waiting_roots(&id, waiting),
            }
        }

        Ok(())
    }

    /// Remove a message, promoting its children one level up
    ///
    /// Children take the removed node's place: under its parent, or in the
    /// root list if it was a root. Their own subtrees are untouched.
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown
    pub fn remove_message(&mut self, id: &str) -> Result<()> {
        let node = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| TreeError::not_found(id))?;

        let slot = self.slot_of(&node);
        self.unlink(node.id(), &slot);

        for child in &node.child_ids {
            if let Some(child_node) = self.store.get_mut(child) {
                child_node.parent_id = node.parent_id.clone();
            }
            self.link(child, &slot);
        }

        self.store.delete(id)?;

        tracing::debug!(
            "Removed message {} ({} children promoted)",
            id,
            node.child_ids.len()
        );
        Ok(())
    }

    /// Lookup node
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TreeNode<M>> {
        self.store.get(id)
    }

    /// Lookup record
    #[inline]
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&M> {
        self.store.get(id).map(TreeNode::record)
    }

    /// Check if id is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    /// Check if tree has no messages
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterate over nodes in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode<M>> + '_ {
        self.store.iter()
    }

    /// Attached parent of a message (`None` for roots)
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown
    pub fn parent_of(&self, id: &str) -> Result<Option<&MessageId>> {
        let node = self.node(id)?;
        Ok(match self.slot_of(node) {
            Slot::Root => None,
            Slot::Child(_) => node.parent_id(),
        })
    }

    /// Ancestors of a message, nearest first, ending at its root
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown, or
    /// [`TreeError::Corrupted`] if the parent chain loops
    pub fn ancestors(&self, id: &str) -> Result<Vec<MessageId>> {
        let mut current = self.node(id)?;
        let mut ancestors = Vec::new();

        while let Slot::Child(parent) = self.slot_of(current) {
            if ancestors.len() >= self.store.size() {
                return Err(TreeError::corrupted(format!(
                    "parent chain of {id} does not terminate"
                )));
            }
            current = self.node(&parent)?;
            ancestors.push(parent);
        }

        Ok(ancestors)
    }

    /// Path from the root down to a message, inclusive
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown
    pub fn path_to(&self, id: &str) -> Result<Vec<MessageId>> {
        let mut path = self.ancestors(id)?;
        path.reverse();
        path.push(self.node(id)?.id().clone());
        Ok(path)
    }

    /// Sibling list a message belongs to, itself included
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown
    pub fn siblings(&self, id: &str) -> Result<Vector<MessageId>> {
        let node = self.node(id)?;
        match self.slot_of(node) {
            Slot::Root => Ok(self.roots.clone()),
            Slot::Child(parent) => Ok(self.node(&parent)?.child_ids.clone()),
        }
    }

    /// Position of a message among its siblings
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown
    pub fn branch_position(&self, id: &str) -> Result<BranchPosition> {
        let siblings = self.siblings(id)?;
        let index = siblings
            .iter()
            .position(|sibling| sibling == id)
            .ok_or_else(|| {
                TreeError::corrupted(format!("{id} missing from its sibling list"))
            })?;

        Ok(BranchPosition {
            index,
            count: siblings.len(),
        })
    }

    /// Number of nodes in the subtree rooted at a message, itself included
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is unknown
    pub fn subtree_size(&self, id: &str) -> Result<usize> {
        let mut stack = vec![self.node(id)?];
        let mut count = 0;

        while let Some(node) = stack.pop() {
            count += 1;
            if count > self.store.size() {
                return Err(TreeError::corrupted(format!(
                    "subtree of {id} contains a cycle"
                )));
            }
            for child in &node.child_ids {
                stack.push(self.node(child)?);
            }
        }

        Ok(count)
    }

    /// Node lookup that fails with `NotFound`
    pub(crate) fn node(&self, id: &str) -> Result<&TreeNode<M>> {
        self.store.get(id).ok_or_else(|| TreeError::not_found(id))
    }

    /// A node is a child iff its parent link names a node in the store
    fn slot_of(&self, node: &TreeNode<M>) -> Slot {
        match node.parent_id() {
            Some(parent) if self.store.contains(parent) => Slot::Child(parent.clone()),
            _ => Slot::Root,
        }
    }

    /// Move roots waiting for `id` underneath it
    ///
    /// `waiting` has already been taken out of the index.
    fn adopt_waiting_roots(&mut self, id: &MessageId, waiting: Vector<MessageId>) {
        let own_root = self.root_of(id);
        for orphan in waiting {
            if own_root.as_ref() == Some(&orphan) {
                // The new node descends from this orphan; attaching would
                // close a cycle. The orphan becomes a permanent root.
                if let Some(node) = self.store.get_mut(&orphan) {
                    node.parent_id = None;
                }
                tracing::debug!("Kept {} as root: its parent {} is a descendant", orphan, id);
                continue;
            }

            self.unlink(&orphan, &Slot::Root);
            self.link(&orphan, &Slot::Child(id.clone()));
            tracing::debug!("Reattached {} under late parent {}", orphan, id);
        }
    }

    /// Turn roots waiting for `id` into permanent roots
    ///
    /// Only trees rebuilt from parts under another policy have any.
    fn detach_waiting_roots(&mut self, id: &MessageId, waiting: Vector<MessageId>) {
        for orphan in waiting {
            if let Some(node) = self.store.get_mut(&orphan) {
                node.parent_id = None;
            }
            tracing::debug!("Detached {} from late parent {}", orphan, id);
        }
    }

    /// Root of the tree containing a freshly inserted `id`
    ///
    /// Roots waiting for `id` already resolve to it as a parent, so the walk
    /// stops at a node whose parent is `id` itself.
    fn root_of(&self, id: &MessageId) -> Option<MessageId> {
        let mut current = self.store.get(id)?;
        for _ in 0..self.store.size() {
            match current.parent_id() {
                Some(parent) if parent != id && self.store.contains(parent) => {
                    current = self.store.get(parent)?;
                }
                _ => return Some(current.id().clone()),
            }
        }
        None
    }

    /// Insert `id` into a sibling list at its sorted position
    ///
    /// A root that still declares a parent is registered as waiting for it.
    fn link(&mut self, id: &MessageId, slot: &Slot) {
        match slot {
            Slot::Root => {
                let pos = self.sorted_position(&self.roots, id);
                self.roots.insert(pos, id.clone());
                if let Some(parent) = self.store.get(id).and_then(TreeNode::parent_id) {
                    self.waiting
                        .entry(parent.clone())
                        .or_insert_with(Vector::new)
                        .push_back(id.clone());
                }
            }
            Slot::Child(parent) => {
                let Some(pos) = self
                    .store
                    .get(parent)
                    .map(|node| self.sorted_position(&node.child_ids, id))
                else {
                    return;
                };
                if let Some(node) = self.store.get_mut(parent) {
                    node.child_ids.insert(pos, id.clone());
                }
            }
        }
    }

    /// Remove `id` from a sibling list
    ///
    /// Must run while the node still carries the parent it was linked with.
    fn unlink(&mut self, id: &MessageId, slot: &Slot) {
        if let Slot::Root = slot {
            if let Some(parent) = self.store.get(id).and_then(TreeNode::parent_id).cloned() {
                self.stop_waiting(id, &parent);
            }
        }

        let index = match slot {
            Slot::Root => self.position_in(&self.roots, id),
            Slot::Child(parent) => self
                .store
                .get(parent)
                .and_then(|node| self.position_in(&node.child_ids, id)),
        };
        let Some(index) = index else { return };

        match slot {
            Slot::Root => {
                self.roots.remove(index);
            }
            Slot::Child(parent) => {
                if let Some(node) = self.store.get_mut(parent) {
                    node.child_ids.remove(index);
                }
            }
        }
    }

    /// Drop `id` from the roots waiting for `parent`
    fn stop_waiting(&mut self, id: &MessageId, parent: &MessageId) {
        let Some(list) = self.waiting.get_mut(parent) else {
            return;
        };
        if let Some(index) = list.index_of(id) {
            list.remove(index);
        }
        if list.is_empty() {
            self.waiting.remove(parent);
        }
    }

    /// Index of `id` in a sorted sibling list
    ///
    /// Binary search on the sort key; lists that are not sorted (trees
    /// rebuilt from bad parts) fall back to a scan.
    fn position_in(&self, list: &Vector<MessageId>, id: &MessageId) -> Option<usize> {
        let key = self.sort_key(id);
        let (mut lo, mut hi) = (0, list.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.sort_key(&list[mid]) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        match list.get(lo) {
            Some(found) if found == id => Some(lo),
            _ => list.index_of(id),
        }
    }

    /// Binary search for the slot of `id` in a sorted sibling list
    fn sorted_position(&self, list: &Vector<MessageId>, id: &MessageId) -> usize {
        let key = self.sort_key(id);
        let (mut lo, mut hi) = (0, list.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.sort_key(&list[mid]) <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    pub(crate) fn sort_key(&self, id: &str) -> (u32, i128) {
        self.store.get(id).map_or((u32::MAX, i128::MAX), |node| {
            self.config.sort_key(node.version_index(), node.seq)
        })
    }
}

impl<M: MessageRecord> Default for MessageTree<M> {
    fn default() -> Self {
        Self::new()
    }
}
