//! Core types: message ids, records and tree nodes
//!
//! Provides [`MessageId`], the [`MessageRecord`] seam for caller-supplied
//! records, a ready-made [`Message`] record and the internal [`TreeNode`]
//! wrapper.

use im::Vector;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Unique message identifier
///
/// Backed by `Arc<str>` so ids can be shared between the node map, root list
/// and child lists without reallocating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Arc<str>);

impl MessageId {
    /// Create id from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&MessageId> for MessageId {
    fn from(id: &MessageId) -> Self {
        id.clone()
    }
}

impl Deref for MessageId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MessageId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for MessageId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Caller-supplied message record
///
/// The tree only reads these three fields; everything else a record carries
/// is opaque payload and is never mutated.
pub trait MessageRecord {
    /// Unique id, immutable once created
    fn id(&self) -> &MessageId;

    /// Logical parent, `None` for a root message
    fn parent_id(&self) -> Option<&MessageId>;

    /// Sibling order among messages sharing a parent (lower = earlier)
    fn version_index(&self) -> u32;
}

/// Generic message record with an arbitrary payload
///
/// Serialises in camelCase (`id`, `parentId`, `versionIndex`, `payload`).
///
/// # Example
/// ```
/// use msgtree::{Message, MessageRecord};
///
/// let reply = Message::new("m2", "hello").with_parent("m1").with_version(1);
/// assert_eq!(reply.version_index(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message<P = ()> {
    /// Message id
    pub id: MessageId,

    /// Parent message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,

    /// Version index among siblings
    #[serde(default)]
    pub version_index: u32,

    /// Opaque payload
    pub payload: P,
}

impl<P> Message<P> {
    /// Create root message at version 0
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<MessageId>, payload: P) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            version_index: 0,
            payload,
        }
    }

    /// With parent
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// With version index
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version_index: u32) -> Self {
        self.version_index = version_index;
        self
    }
}

impl<P> MessageRecord for Message<P> {
    fn id(&self) -> &MessageId {
        &self.id
    }

    fn parent_id(&self) -> Option<&MessageId> {
        self.parent_id.as_ref()
    }

    fn version_index(&self) -> u32 {
        self.version_index
    }
}

/// Tree node wrapping one record
///
/// `parent_id` is the attached parent for interior nodes. For a root it is
/// either `None` or the id of a parent that is not (yet) in the tree.
#[derive(Debug)]
pub struct TreeNode<M> {
    pub(crate) record: Arc<M>,
    pub(crate) parent_id: Option<MessageId>,
    pub(crate) child_ids: Vector<MessageId>,
    pub(crate) seq: u64,
}

// Manual impl: `M` itself need not be `Clone`, the record is behind an `Arc`.
impl<M> Clone for TreeNode<M> {
    fn clone(&self) -> Self {
        Self {
            record: Arc::clone(&self.record),
            parent_id: self.parent_id.clone(),
            child_ids: self.child_ids.clone(),
            seq: self.seq,
        }
    }
}

impl<M: MessageRecord> TreeNode<M> {
    /// Create detached node
    #[must_use]
    pub fn new(record: Arc<M>, seq: u64) -> Self {
        let parent_id = record.parent_id().cloned();
        Self {
            record,
            parent_id,
            child_ids: Vector::new(),
            seq,
        }
    }

    /// Node id (the record's id)
    #[inline]
    #[must_use]
    pub fn id(&self) -> &MessageId {
        self.record.id()
    }

    /// Wrapped record
    #[inline]
    #[must_use]
    pub fn record(&self) -> &M {
        &self.record
    }

    /// Shared handle to the wrapped record
    #[inline]
    #[must_use]
    pub fn record_arc(&self) -> &Arc<M> {
        &self.record
    }

    /// Record version index
    #[inline]
    #[must_use]
    pub fn version_index(&self) -> u32 {
        self.record.version_index()
    }

    /// Current parent link
    #[inline]
    #[must_use]
    pub fn parent_id(&self) -> Option<&MessageId> {
        self.parent_id.as_ref()
    }

    /// Ordered child ids
    #[inline]
    #[must_use]
    pub fn child_ids(&self) -> &Vector<MessageId> {
        &self.child_ids
    }

    /// Insertion sequence number
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether node has no children
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }
}

/// Position of a message among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPosition {
    /// Zero-based index in the sibling list
    pub index: usize,

    /// Number of siblings, including the message itself
    pub count: usize,
}

impl BranchPosition {
    /// Whether an earlier sibling exists
    #[inline]
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// Whether a later sibling exists
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.index + 1 < self.count
    }
}
