//! BucketTable: the separate-chaining engine.
//!
//! Chains are singly linked through a `SlotMap` arena rather than through
//! owning pointers, so dropping a long chain is an iterative arena drop.
//! The bucket array is a plain `Vec` of chain heads that is only ever
//! replaced as a whole, by `rehash`.

use crate::load_factor::LoadFactor;
use crate::node::{Node, NodeId};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicU64, Ordering};
use slotmap::{DefaultKey, SlotMap};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Identity of one bucket array. Every table and every rebuild of a table
/// gets a fresh value, so positions recorded against an older array (or a
/// different set) can be told apart from live ones.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Generation(u64);

impl Generation {
    fn fresh() -> Self {
        Generation(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct BucketTable<K, S> {
    heads: Vec<Option<NodeId>>,
    nodes: SlotMap<DefaultKey, Node<K>>,
    hasher: S,
    max_load_factor: LoadFactor,
    min_size: usize,
    generation: Generation,
}

impl<K, S> BucketTable<K, S> {
    /// Create an empty table of `max(size, min_size)` buckets. A minimum of
    /// zero is treated as one so that indexing is always defined.
    pub(crate) fn new(size: usize, min_size: usize, hasher: S, max_load_factor: LoadFactor) -> Self {
        let min_size = min_size.max(1);
        Self {
            heads: vec![None; size.max(min_size)],
            nodes: SlotMap::with_key(),
            hasher,
            max_load_factor,
            min_size,
            generation: Generation::fresh(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn table_size(&self) -> usize {
        self.heads.len()
    }

    pub(crate) fn min_size(&self) -> usize {
        self.min_size
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    pub(crate) fn max_load_factor(&self) -> LoadFactor {
        self.max_load_factor
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node<K>> {
        self.nodes.get(id.raw())
    }

    /// Resolve a recorded position. Fails if the table was rebuilt since the
    /// position was taken or the node has been unlinked.
    pub(crate) fn resolve(&self, generation: Generation, id: NodeId) -> Option<&Node<K>> {
        if generation != self.generation {
            return None;
        }
        self.node(id)
    }

    /// Walk the chain hanging off `bucket`, head first.
    pub(crate) fn chain(&self, bucket: usize) -> Chain<'_, K> {
        Chain {
            nodes: &self.nodes,
            cur: self.heads.get(bucket).copied().flatten(),
        }
    }

    /// First occupied position at or after bucket `start`.
    pub(crate) fn first_from(&self, start: usize) -> Option<(usize, NodeId)> {
        self.heads
            .get(start..)?
            .iter()
            .enumerate()
            .find_map(|(i, head)| head.map(|id| (start + i, id)))
    }

    /// Position following `(bucket, id)`: the chain successor if there is
    /// one, otherwise the head of the next non-empty bucket.
    pub(crate) fn step(&self, bucket: usize, id: NodeId) -> Option<(usize, NodeId)> {
        match self.node(id).and_then(|n| n.next) {
            Some(next) => Some((bucket, next)),
            None => self.first_from(bucket + 1),
        }
    }

    /// Link a key whose absence the caller has already established. The new
    /// node becomes the head of its chain.
    pub(crate) fn insert_unchecked(&mut self, key: K, hash: u64) -> (usize, NodeId) {
        let bucket = self.bucket_of(hash);
        let next = self.heads[bucket];
        let id = NodeId::new(self.nodes.insert(Node::new(key, hash, next)));
        self.heads[bucket] = Some(id);
        (bucket, id)
    }

    /// Unlink node `id` from the chain at `bucket` and hand back its key.
    /// Returns `None`, leaving the table untouched, if `id` is not on that
    /// chain.
    pub(crate) fn unlink(&mut self, bucket: usize, id: NodeId) -> Option<K> {
        let next = self.node(id)?.next;
        let head = self.heads.get(bucket).copied().flatten()?;
        if head == id {
            self.heads[bucket] = next;
        } else {
            let mut prev = head;
            loop {
                let prev_node = self.nodes.get_mut(prev.raw())?;
                if prev_node.next == Some(id) {
                    prev_node.next = next;
                    break;
                }
                prev = prev_node.next?;
            }
        }
        self.nodes.remove(id.raw()).map(|n| n.key)
    }

    /// Make room for `n` keys. Sizes step as `size * 4 + 1` until the load
    /// factor admits `n`; the rebuild itself is left to `rehash`.
    pub(crate) fn reserve(&mut self, n: usize) {
        let lf = self.max_load_factor.get();
        if self.table_size() as f64 * lf >= n as f64 {
            return;
        }
        let mut new_size = self.table_size();
        while (new_size as f64) * lf < n as f64 {
            new_size = match new_size.checked_mul(4).and_then(|s| s.checked_add(1)) {
                Some(s) => s,
                None => capacity_overflow(),
            };
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(requested = n, from = self.table_size(), to = new_size, "reserve");
        self.rehash(new_size);
    }

    /// Rebuild into `max(min_size, n, len / max_load_factor)` buckets. Keys
    /// move into a fresh arena under the new size; every previously issued
    /// position becomes stale.
    pub(crate) fn rehash(&mut self, n: usize) {
        let by_load = (self.len() as f64 / self.max_load_factor.get()) as usize;
        let new_size = self.min_size.max(n).max(by_load);

        let live = self.len();
        let old_heads = core::mem::replace(&mut self.heads, vec![None; new_size]);
        let mut old_nodes = core::mem::replace(&mut self.nodes, SlotMap::with_capacity(live));
        self.generation = Generation::fresh();

        #[cfg(feature = "tracing")]
        tracing::debug!(from = old_heads.len(), to = new_size, len = live, "rehash");

        for head in old_heads {
            let mut cur = head;
            while let Some(id) = cur {
                let Some(node) = old_nodes.remove(id.raw()) else {
                    break;
                };
                cur = node.next;
                self.insert_unchecked(node.key, node.hash);
            }
        }
        debug_assert!(old_nodes.is_empty(), "rehash left nodes behind");
    }

    /// Deep copy with the same bucket count. Cached hashes are reused, which
    /// is sound because the cloned hasher hashes identically.
    pub(crate) fn duplicate(&self) -> Self
    where
        K: Clone,
        S: Clone,
    {
        let mut copy = Self::new(self.table_size(), self.min_size, self.hasher.clone(), self.max_load_factor);
        let mut pos = self.first_from(0);
        while let Some((bucket, id)) = pos {
            if let Some(node) = self.node(id) {
                copy.insert_unchecked(node.key.clone(), node.hash);
            }
            pos = self.step(bucket, id);
        }
        copy
    }

    pub(crate) fn into_nodes(self) -> SlotMap<DefaultKey, Node<K>> {
        self.nodes
    }
}

impl<K, S: BuildHasher> BucketTable<K, S> {
    pub(crate) fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Find the node holding a key equal to `q`, given `q`'s full hash.
    pub(crate) fn locate_hashed<Q>(&self, hash: u64, q: &Q) -> Option<(usize, NodeId)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bucket = self.bucket_of(hash);
        self.chain(bucket)
            .find(|(_, node)| node.hash == hash && node.key.borrow() == q)
            .map(|(id, _)| (bucket, id))
    }

    pub(crate) fn locate<Q>(&self, q: &Q) -> Option<(usize, NodeId)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate_hashed(self.make_hash(q), q)
    }
}

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

/// Iterator over one bucket's chain.
pub(crate) struct Chain<'a, K> {
    nodes: &'a SlotMap<DefaultKey, Node<K>>,
    cur: Option<NodeId>,
}

impl<'a, K> Iterator for Chain<'a, K> {
    type Item = (NodeId, &'a Node<K>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = self.nodes.get(id.raw())?;
        self.cur = node.next;
        Some((id, node))
    }
}

#[cfg(test)]
impl<K: Eq + Hash, S: BuildHasher> BucketTable<K, S> {
    /// Panics unless every structural invariant holds.
    pub(crate) fn assert_invariants(&self) {
        assert!(self.table_size() >= self.min_size, "table below minimum size");
        assert!(self.len() <= self.table_size(), "more keys than buckets");
        let mut reachable = 0;
        for bucket in 0..self.table_size() {
            for (_, node) in self.chain(bucket) {
                assert_eq!(node.hash, self.make_hash(&node.key), "stale cached hash");
                assert_eq!(self.bucket_of(node.hash), bucket, "node in the wrong bucket");
                let dupes = self.chain(bucket).filter(|(_, n)| n.key == node.key).count();
                assert_eq!(dupes, 1, "duplicate key in chain");
                reachable += 1;
            }
        }
        assert_eq!(reachable, self.len(), "unreachable nodes in arena");
    }
}
