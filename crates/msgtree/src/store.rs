//! Message node store
//!
//! Authoritative `id -> node` mapping. [`NodeStore`] only owns raw
//! insert/lookup/delete; linking nodes into parents and the root list is the
//! job of [`MessageTree`](crate::MessageTree).
//!
//! Nodes live behind `Arc` in a persistent [`im::HashMap`], so cloning the
//! store is O(1) and mutating a clone copies only the touched nodes.

use crate::error::{Result, TreeError};
use crate::types::{MessageId, MessageRecord, TreeNode};
use im::HashMap;
use std::sync::Arc;

/// Persistent `id -> node` map
pub type NodeMap<M> = HashMap<MessageId, Arc<TreeNode<M>>>;

/// Store of tree nodes keyed by message id
#[derive(Debug)]
pub struct NodeStore<M> {
    /// Node map
    nodes: NodeMap<M>,

    /// Next insertion sequence number
    next_seq: u64,
}

impl<M> Clone for NodeStore<M> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            next_seq: self.next_seq,
        }
    }
}

impl<M: MessageRecord> NodeStore<M> {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Wrap an existing node map
    ///
    /// New inserts are sequenced after every node already in the map.
    #[must_use]
    pub fn from_map(nodes: NodeMap<M>) -> Self {
        let next_seq = nodes
            .values()
            .map(|node| node.seq.saturating_add(1))
            .max()
            .unwrap_or(0);
        Self { nodes, next_seq }
    }

    /// Insert record as a detached node
    ///
    /// # Errors
    /// Returns [`TreeError::DuplicateId`] if the id is already present
    pub fn insert(&mut self, record: Arc<M>) -> Result<MessageId> {
        let id = record.id().clone();

        if self.nodes.contains_key(&id) {
            return Err(TreeError::duplicate(id));
        }

        let node = TreeNode::new(record, self.next_seq);
        self.next_seq += 1;
        self.nodes.insert(id.clone(), Arc::new(node));

        Ok(id)
    }

    /// Lookup node; a miss is not an error
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TreeNode<M>> {
        self.nodes.get(id).map(|node| &**node)
    }

    /// Mutable lookup, copying the node if it is shared with a snapshot
    #[inline]
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut TreeNode<M>> {
        self.nodes.get_mut(id).map(Arc::make_mut)
    }

    /// Check if id is present
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Remove node by id
    ///
    /// Parent/child links are left untouched.
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if the id is absent
    pub fn delete(&mut self, id: &str) -> Result<Arc<TreeNode<M>>> {
        self.nodes
            .remove(id)
            .ok_or_else(|| TreeError::not_found(id))
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Underlying map
    #[inline]
    #[must_use]
    pub fn map(&self) -> &NodeMap<M> {
        &self.nodes
    }

    /// Consume into the underlying map
    #[inline]
    #[must_use]
    pub fn into_map(self) -> NodeMap<M> {
        self.nodes
    }

    /// Iterate over nodes in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode<M>> + '_ {
        self.nodes.values().map(|node| &**node)
    }
}

impl<M: MessageRecord> Default for NodeStore<M> {
    fn default() -> Self {
        Self::new()
    }
}
