use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeSet;

/// Reference model: a `BTreeSet` keyed so that its order matches `compare_keys`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ModelKey(usize, Vec<u8>);

impl ModelKey {
    fn new(key: &[u8]) -> Self {
        Self(key.len(), key.to_vec())
    }
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A narrow alphabet and short keys so that inserts collide and removes hit.
    prop::collection::vec(0u8..4, 0..=4)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 30)]
    Remove(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 19)]
    Contains(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 1)]
    Clear,
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=2000)) {
        let mut t = AvlTree::new();
        let mut m: BTreeSet<ModelKey> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    let got = t.insert(&key);
                    let expected = if m.insert(ModelKey::new(&key)) {
                        Ok(())
                    } else {
                        Err(Error::AlreadyExists)
                    };
                    prop_assert_eq!(got, expected);
                    prop_assert!(t.contains(&key));
                    t.validate().map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
                Op::Remove(key) => {
                    let got = t.remove(&key);
                    let expected = if m.remove(&ModelKey::new(&key)) {
                        Ok(())
                    } else {
                        Err(Error::NotFound)
                    };
                    prop_assert_eq!(got, expected);
                    prop_assert!(!t.contains(&key));
                    t.validate().map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
                Op::Contains(key) => {
                    prop_assert_eq!(t.contains(&key), m.contains(&ModelKey::new(&key)));
                }
                Op::Clear => {
                    prop_assert_eq!(t.clear(), m.len());
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        let got: Vec<Vec<u8>> = t.iter().map(<[u8]>::to_vec).collect();
        let expected: Vec<Vec<u8>> = m.into_iter().map(|ModelKey(_, k)| k).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_traversal_strictly_ascending(keys in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=8), 0..=500)) {
        let mut t = AvlTree::new();
        for key in &keys {
            let _ = t.insert(key);
        }
        let got: Vec<&[u8]> = t.iter().collect();
        prop_assert_eq!(got.len(), t.len());
        for pair in got.windows(2) {
            prop_assert_eq!(compare_keys(pair[0], pair[1]), Ordering::Less);
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_key_set() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"c".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
        b"".to_vec(),
    ]
}

fn sorted_by_comparator(mut keys: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    keys.sort_by(|a, b| compare_keys(a, b));
    keys
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_key_set();
    let expected = sorted_by_comparator(keys.clone());

    for_each_permutation(&keys, |perm| {
        let mut t = AvlTree::new();
        for k in &perm {
            assert_eq!(t.insert(k), Ok(()));
            t.validate().unwrap();
        }
        for k in &perm {
            assert_eq!(t.insert(k), Err(Error::AlreadyExists));
        }

        assert_eq!(t.len(), keys.len());
        let got: Vec<Vec<u8>> = t.iter().map(<[u8]>::to_vec).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_key_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base = AvlTree::new();
    for k in &keys {
        base.insert(k).unwrap();
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut live = keys.len();

        for k in perm {
            assert_eq!(t.remove(&k), Ok(()));
            assert_eq!(t.remove(&k), Err(Error::NotFound));
            live -= 1;
            assert_eq!(t.len(), live);
            t.validate().unwrap();
        }
        assert_eq!(t.len(), 0);
        assert!(t.root.is_none());
    });
}
