//! chained-set: a single-threaded hash set built on separate chaining, with
//! load-factor driven growth and shrink and cursor-based traversal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a set whose table policy is explicit and inspectable: bucket
//!   count, growth steps and shrink threshold are all observable.
//! - Layers:
//!   - Node: one key, its cached hash, and the link to the next node of
//!     the same bucket. Nodes live in a `SlotMap` arena and link by
//!     versioned arena key.
//!   - BucketTable<K, S>: the bucket array (chain heads) plus the arena.
//!     Computes placement, links/unlinks nodes, and owns the only rebuild
//!     operation, `rehash`.
//!   - ChainedSet<K, N, S>: public API. Rejects duplicates, decides when
//!     to grow (before an insert) and when to shrink (after an erase), and
//!     hands out `Cursor`s and iterators.
//!
//! Table policy
//! - `index(k) = hash(k) mod table_size`; new nodes go to the chain head.
//! - Growth: before inserting the `n`th key, if `table_size * lf < n`, the
//!   size steps through `size * 4 + 1` until it fits (7, 29, 117, 469, ...).
//! - Shrink: after an erase, if `len < table_size / 5`, the table is rebuilt
//!   with `max(N, len, len / lf)` buckets.
//! - A rebuild moves every key into a fresh arena and bucket array. Node
//!   identities do not survive it.
//!
//! Cursors and iteration
//! - `Iter` borrows the set and walks buckets in index order, head first.
//! - `Cursor` is a detached, `Copy` position tagged with the generation of
//!   the bucket array it was taken from. Rebuilds bump the generation and
//!   removals bump the arena slot version, so stale cursors resolve to
//!   `None` instead of reading some other element.
//! - Cursor equality is node identity; every end cursor equals every other.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (marker in the reentrancy guard).
//! - Each node caches its full `u64` hash; rebuilds never call `K: Hash`.
//! - Reentrancy: operations that call `K: Hash`/`K: Eq` hold a debug-only
//!   guard; re-entering the same set from those calls panics in debug
//!   builds. Keys dropped by the set (rejected duplicates, erased keys) are
//!   dropped after the guard is released.
//! - Allocation failure while building a table is fatal, as for `Vec`.
//!
//! Logging
//! - With the `tracing` feature, `reserve` emits `trace!` and `rehash` emits
//!   `debug!` events carrying the old and new bucket counts.

mod bucket_table;
mod chained_set;
mod chained_set_proptest;
mod cursor;
mod iter;
mod load_factor;
mod node;
mod reentrancy;

// Public surface
pub use chained_set::{ChainedSet, InsertError, DEFAULT_MIN_TABLE_SIZE};
pub use cursor::{Cursor, StaleCursor};
pub use iter::{IntoIter, Iter};
pub use load_factor::{InvalidLoadFactor, LoadFactor};
