#![cfg(test)]

// Property tests for ChainedSet kept inside the crate so they can check the
// bucket table's structural invariants after every step.

use crate::{ChainedSet, Cursor};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize),
    InsertMany(Vec<usize>),
    Erase(usize),
    Find(usize),
    Contains(String),
    Iterate,
    Walk,
    Clear,
    Copy,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => idx.clone().prop_map(OpI::Insert),
            1 => proptest::collection::vec(idx.clone(), 0..10).prop_map(OpI::InsertMany),
            4 => idx.clone().prop_map(OpI::Erase),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,4}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Walk),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Copy),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S>(mut sut: ChainedSet<Key, 7, S>, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashSet<Key> = HashSet::new();
    // Every cursor ever handed out, with the key it was positioned at.
    let mut issued: Vec<(Key, Cursor)> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i) => {
                let k = key_from(pool, i);
                let before = sut.len();
                let (c, added) = sut.insert(k.clone());
                prop_assert_eq!(added, model.insert(k.clone()), "added flag must match model");
                prop_assert_eq!(sut.len(), before + added as usize);
                prop_assert_eq!(c.key(&sut), Some(&k), "insert cursor must point at the key");
                issued.push((k, c));
            }
            OpI::InsertMany(is) => {
                let keys: Vec<Key> = is.iter().map(|&i| key_from(pool, i)).collect();
                let expected = keys.iter().filter(|&k| model.insert(k.clone())).count();
                prop_assert_eq!(sut.insert_many(keys), expected);
            }
            OpI::Erase(i) => {
                let k = key_from(pool, i);
                let removed = sut.erase(&k);
                prop_assert_eq!(removed, model.remove(&k) as usize);
                prop_assert!(sut.find(&k).is_end());
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                let c = sut.find(&k);
                prop_assert_eq!(!c.is_end(), model.contains(&k));
                prop_assert_eq!(sut.count(&k), model.contains(&k) as usize);
                if !c.is_end() {
                    prop_assert_eq!(c.key(&sut), Some(&k));
                    issued.push((k, c));
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains(s.as_str());
                let has_model = model.iter().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Iterate => {
                let s_keys: Vec<_> = sut.iter().cloned().collect();
                let distinct: BTreeSet<_> = s_keys.iter().cloned().collect();
                prop_assert_eq!(s_keys.len(), distinct.len(), "iteration repeated a key");
                let m_keys: BTreeSet<_> = model.iter().cloned().collect();
                prop_assert_eq!(distinct, m_keys);
            }
            OpI::Walk => {
                let mut c = sut.begin();
                let mut walked = Vec::new();
                while let Some(k) = c.key(&sut) {
                    walked.push(k.clone());
                    prop_assert!(c.advance(&sut).is_ok());
                }
                prop_assert!(c.is_end(), "a fresh cursor never goes stale mid-walk");
                let from_iter: Vec<_> = sut.iter().cloned().collect();
                prop_assert_eq!(walked, from_iter, "cursor walk and iterator disagree");
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.table_size(), 7);
            }
            OpI::Copy => {
                let copy = sut.clone();
                prop_assert!(copy == sut);
                prop_assert_eq!(copy.table_size(), sut.table_size());
                copy.table().assert_invariants();
            }
        }

        // Post-conditions after each op
        // 1) Structure: placement, reachability, no duplicates, size bounds.
        sut.table().assert_invariants();
        prop_assert!(sut.table_size() >= 7);
        prop_assert!(sut.len() <= sut.table_size());
        // 2) A cursor resolves to its own key or to nothing, never to another key.
        for (k, c) in &issued {
            if let Some(got) = c.key(&sut) {
                prop_assert_eq!(got, k);
            }
        }
        // 3) Size parity
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashSet.
// Invariants exercised across random operation sequences:
// - Duplicate inserts report `false` and leave the set unchanged.
// - `find`/`count`/`contains` parity with the model; erase counts match.
// - `iter` and a cursor walk both yield each live key exactly once.
// - Rebuilds never leave a cursor aliasing a different key.
// - table_size >= N and len <= table_size after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(ChainedSet::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher). Every key shares one chain, so
// unlinking is exercised at head, middle and tail positions.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ChainedSet::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

// Property: equality ignores insertion order and growth history.
proptest! {
    #[test]
    fn prop_equality_is_order_independent(keys in proptest::collection::vec(0u16..500, 0..200), seed in any::<u64>()) {
        let a: ChainedSet<u16> = keys.iter().copied().collect();
        let mut shuffled = keys.clone();
        // Deterministic Fisher-Yates driven by an LCG.
        let mut s = seed;
        for i in (1..shuffled.len()).rev() {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            let j = (s >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }
        let mut b: ChainedSet<u16, 3> = ChainedSet::new();
        for k in shuffled {
            b.insert(k);
        }
        let b_as_a: ChainedSet<u16> = b.iter().copied().collect();
        prop_assert!(a == b_as_a);
        if let Some(&k) = keys.first() {
            let mut c = a.clone();
            c.erase(&k);
            prop_assert!(c != a);
        }
    }
}
