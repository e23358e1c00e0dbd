//! Snapshot and copy-on-write support
//!
//! Reactive state stores treat a published [`MessageTree`] as immutable:
//! they copy it, mutate the copy and publish the new instance. Because the
//! node map and root list are persistent collections, copies share structure
//! and a mutation only copies the nodes it touches.

use crate::config::TreeConfig;
use crate::error::Result;
use crate::forest::{MessageTree, WaitingIndex};
use crate::store::{NodeMap, NodeStore};
use crate::types::{MessageId, MessageRecord, TreeNode};
use im::Vector;

impl<M: MessageRecord> MessageTree<M> {
    /// Build a tree from an existing node map and root list
    ///
    /// No insert is replayed and nothing is checked; call
    /// [`validate`](Self::validate) when the parts come from an untrusted
    /// source.
    #[must_use]
    pub fn from_parts(map: NodeMap<M>, roots: Vector<MessageId>) -> Self {
        Self::from_parts_with_config(map, roots, TreeConfig::default())
    }

    /// Build a tree from parts with an explicit policy
    ///
    /// Roots that still declare a missing parent are handled by `config`
    /// when that parent arrives, whatever policy built the parts.
    #[must_use]
    pub fn from_parts_with_config(
        map: NodeMap<M>,
        roots: Vector<MessageId>,
        config: TreeConfig,
    ) -> Self {
        let store = NodeStore::from_map(map);

        let mut waiting = WaitingIndex::new();
        for root in &roots {
            if let Some(parent) = store.get(root).and_then(TreeNode::parent_id) {
                if !store.contains(parent) {
                    waiting
                        .entry(parent.clone())
                        .or_insert_with(Vector::new)
                        .push_back(root.clone());
                }
            }
        }

        Self {
            store,
            roots,
            waiting,
            config,
        }
    }

    /// Split into node map and root list
    #[must_use]
    pub fn into_parts(self) -> (NodeMap<M>, Vector<MessageId>) {
        (self.store.into_map(), self.roots)
    }

    /// Current root ids, ordered by version
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &Vector<MessageId> {
        &self.roots
    }

    /// Current `id -> node` map
    ///
    /// Cloning the returned map is O(1).
    #[inline]
    #[must_use]
    pub fn map(&self) -> &NodeMap<M> {
        self.store.map()
    }

    /// Number of messages in the tree
    #[inline]
    #[must_use]
    pub fn messages_count(&self) -> usize {
        self.store.size()
    }

    /// Structurally shared copy with a new identity
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Copy-on-write update
    ///
    /// Applies `update` to a copy and returns it. `self` is never modified,
    /// including when `update` fails.
    ///
    /// # Example
    /// ```
    /// use msgtree::{Message, MessageTree};
    ///
    /// let published: MessageTree<Message> = MessageTree::new();
    /// let next = published.with(|tree| tree.add_message(Message::new("m1", ())))?;
    ///
    /// assert_eq!(published.messages_count(), 0);
    /// assert_eq!(next.messages_count(), 1);
    /// # Ok::<(), msgtree::TreeError>(())
    /// ```
    ///
    /// # Errors
    /// Returns whatever error `update` returns
    pub fn with<F>(&self, update: F) -> Result<Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut next = self.snapshot();
        update(&mut next)?;
        Ok(next)
    }
}
