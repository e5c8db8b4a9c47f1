//! Cursor: a detached, copyable position inside a `ChainedSet`.
//!
//! A cursor names one node of one bucket array, or is the end sentinel.
//! Unlike `Iter`, it does not borrow the set, so it can be kept across
//! mutations; it is then checked on every use. Any rebuild of the bucket
//! array (growth, shrink, `clear`) and the removal of its own node make a
//! cursor stale: it resolves to `None` and refuses to advance.

use crate::bucket_table::{BucketTable, Generation};
use crate::chained_set::ChainedSet;
use crate::node::NodeId;
use core::fmt;
use core::hash::{Hash, Hasher};

#[derive(Copy, Clone, Debug)]
struct Position {
    generation: Generation,
    bucket: usize,
    node: NodeId,
}

/// Position of one element, or the end sentinel.
///
/// Equality is node identity: all end cursors are equal to each other, and
/// two positioned cursors are equal when they name the same node of the
/// same bucket array, however they were obtained. Cursors from different
/// sets are never equal unless both are at the end.
#[derive(Copy, Clone, Debug, Default)]
pub struct Cursor {
    pos: Option<Position>,
}

/// The cursor no longer names a live element of the set it was used with.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StaleCursor;

impl fmt::Display for StaleCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cursor was invalidated by a rehash or removal, or belongs to another set")
    }
}

impl std::error::Error for StaleCursor {}

impl Cursor {
    /// The end sentinel.
    pub const fn end() -> Self {
        Cursor { pos: None }
    }

    pub(crate) fn at<K, S>(table: &BucketTable<K, S>, bucket: usize, node: NodeId) -> Self {
        Cursor {
            pos: Some(Position {
                generation: table.generation(),
                bucket,
                node,
            }),
        }
    }

    pub(crate) fn from_step<K, S>(table: &BucketTable<K, S>, step: Option<(usize, NodeId)>) -> Self {
        match step {
            Some((bucket, node)) => Cursor::at(table, bucket, node),
            None => Cursor::end(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.pos.is_none()
    }

    /// The element under the cursor. `None` at the end or when stale.
    pub fn key<'a, K, const N: usize, S>(&self, set: &'a ChainedSet<K, N, S>) -> Option<&'a K> {
        let pos = self.pos?;
        set.table()
            .resolve(pos.generation, pos.node)
            .map(|node| &node.key)
    }

    /// Move to the next element in traversal order: the rest of the current
    /// chain first, then the following non-empty buckets. Advancing the end
    /// cursor leaves it at the end.
    pub fn advance<K, const N: usize, S>(&mut self, set: &ChainedSet<K, N, S>) -> Result<(), StaleCursor> {
        let Some(pos) = self.pos else {
            return Ok(());
        };
        let table = set.table();
        table.resolve(pos.generation, pos.node).ok_or(StaleCursor)?;
        *self = Cursor::from_step(table, table.step(pos.bucket, pos.node));
        Ok(())
    }

    /// Whether the cursor is the end sentinel or names a live element of
    /// `set`.
    pub fn is_valid_for<K, const N: usize, S>(&self, set: &ChainedSet<K, N, S>) -> bool {
        self.is_end() || self.key(set).is_some()
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        match (self.pos, other.pos) {
            (None, None) => true,
            (Some(a), Some(b)) => a.generation == b.generation && a.node == b.node,
            _ => false,
        }
    }
}

impl Eq for Cursor {}

impl Hash for Cursor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pos.map(|p| (p.generation, p.node)).hash(state);
    }
}
