//! Borrowing and owning iterators over a `ChainedSet`.

use crate::bucket_table::BucketTable;
use crate::cursor::Cursor;
use crate::node::{Node, NodeId};
use core::iter::FusedIterator;
use slotmap::DefaultKey;

/// Iterator over the keys of a `ChainedSet`, in bucket order and head
/// first within a chain. Holding it borrows the set, so no rebuild can
/// happen underneath it.
pub struct Iter<'a, K, S> {
    table: &'a BucketTable<K, S>,
    next: Option<(usize, NodeId)>,
    remaining: usize,
}

impl<'a, K, S> Iter<'a, K, S> {
    pub(crate) fn new(table: &'a BucketTable<K, S>) -> Self {
        Self {
            table,
            next: table.first_from(0),
            remaining: table.len(),
        }
    }

    /// Cursor at the element the next call to `next` will yield.
    pub fn cursor(&self) -> Cursor {
        Cursor::from_step(self.table, self.next)
    }
}

impl<'a, K, S> Iterator for Iter<'a, K, S> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (bucket, id) = self.next?;
        let node = self.table.node(id)?;
        self.next = match node.next {
            Some(next) => Some((bucket, next)),
            None => self.table.first_from(bucket + 1),
        };
        self.remaining -= 1;
        Some(&node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, S> ExactSizeIterator for Iter<'_, K, S> {}

impl<K, S> FusedIterator for Iter<'_, K, S> {}

impl<K, S> Clone for Iter<'_, K, S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

/// Owning iterator over the keys of a `ChainedSet`, in unspecified order.
pub struct IntoIter<K> {
    it: slotmap::basic::IntoIter<DefaultKey, Node<K>>,
}

impl<K> IntoIter<K> {
    pub(crate) fn new<S>(table: BucketTable<K, S>) -> Self {
        Self {
            it: table.into_nodes().into_iter(),
        }
    }
}

impl<K> Iterator for IntoIter<K> {
    type Item = K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, node)| node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}
