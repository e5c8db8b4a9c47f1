//! Chain nodes: one key plus the link to the rest of its bucket's chain.

use slotmap::DefaultKey;

/// Arena identity of a chain node. Versioned, so an id whose node was
/// removed never resolves to a node inserted later into the same slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct NodeId(DefaultKey);

impl NodeId {
    pub(crate) fn new(k: DefaultKey) -> Self {
        NodeId(k)
    }
    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
pub(crate) struct Node<K> {
    pub(crate) key: K,
    /// Full hash of `key`, cached so rebuilding never calls `K: Hash`.
    pub(crate) hash: u64,
    pub(crate) next: Option<NodeId>,
}

impl<K> Node<K> {
    pub(crate) fn new(key: K, hash: u64, next: Option<NodeId>) -> Self {
        Self { key, hash, next }
    }
}
