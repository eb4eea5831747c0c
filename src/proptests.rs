use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(i64, u64),
    FingerInsert(i64, u64),
    Delete(i64),
    Search(i64),
    FingerSearch(i64),
}

fn key_strategy() -> impl Strategy<Value = i64> + Clone {
    // A small key range keeps deletes and repeat lookups likely.
    0i64..256
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        35 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        15 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::FingerInsert(k, v)),
        25 => key.clone().prop_map(Op::Delete),
        15 => key.clone().prop_map(Op::Search),
        10 => key.prop_map(Op::FingerSearch),
    ];
    prop::collection::vec(op, 0..=800)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_btreemap(ops in ops_strategy()) {
        let mut t: AvlTree<u64> = AvlTree::new();
        let mut m: BTreeMap<i64, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    // Duplicate keys are a caller contract violation; skip them.
                    if m.contains_key(&k) {
                        continue;
                    }
                    t.insert(k, v);
                    m.insert(k, v);
                }
                Op::FingerInsert(k, v) => {
                    if m.contains_key(&k) {
                        continue;
                    }
                    t.finger_insert(k, v);
                    m.insert(k, v);
                }
                Op::Delete(k) => {
                    let (node, _) = t.search(k);
                    match node {
                        Some(node) => {
                            let removed = t.delete(node);
                            prop_assert_eq!(m.remove(&k), Some(removed));
                        }
                        None => prop_assert_eq!(m.remove(&k), None),
                    }
                }
                Op::Search(k) => {
                    let (node, _) = t.search(k);
                    prop_assert_eq!(node.map(|n| *t.value(n)), m.get(&k).copied());
                }
                Op::FingerSearch(k) => {
                    let (node, _) = t.finger_search(k);
                    prop_assert_eq!(node.map(|n| t.key(n)), m.get(&k).map(|_| k));
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        t.check_consistency();
        let got: Vec<(i64, u64)> = t.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(i64, u64)> = m.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_finger_search_matches_search(
        keys in prop::collection::btree_set(key_strategy(), 0..200),
        probes in prop::collection::vec(key_strategy(), 0..100),
    ) {
        let mut t: AvlTree<u64> = AvlTree::new();
        for (i, &k) in keys.iter().enumerate() {
            t.insert(k, i as u64);
        }

        for k in probes {
            let (a, _) = t.search(k);
            let (b, _) = t.finger_search(k);
            prop_assert_eq!(a.map(|n| t.key(n)), b.map(|n| t.key(n)));
        }
    }

    #[test]
    fn prop_split_then_join_restores_order(
        keys in prop::collection::btree_set(key_strategy(), 1..200),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut t: AvlTree<u64> = AvlTree::new();
        for (i, &k) in keys.iter().enumerate() {
            t.insert(k, i as u64);
        }
        let before: Vec<(i64, u64)> = t.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();

        let keys: Vec<i64> = keys.into_iter().collect();
        let split_key = keys[pick.index(keys.len())];
        let (node, _) = t.search(split_key);
        let node = node.expect("split key was inserted");
        let sep_value = *t.value(node);

        let (mut left, right) = t.split(node);
        left.check_consistency();
        right.check_consistency();
        for (k, _) in left.to_ordered_vec() {
            prop_assert!(k < split_key);
        }
        for (k, _) in right.to_ordered_vec() {
            prop_assert!(k > split_key);
        }

        left.join(right, split_key, sep_value);
        left.check_consistency();
        let after: Vec<(i64, u64)> = left.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
        prop_assert_eq!(after, before);
    }

    #[test]
    fn prop_join_disjoint_ranges(
        low in prop::collection::btree_set(0i64..100, 0..60),
        high in prop::collection::btree_set(200i64..300, 0..60),
    ) {
        let mut t1: AvlTree<u64> = AvlTree::new();
        for (i, &k) in low.iter().enumerate() {
            t1.insert(k, i as u64);
        }
        let mut t2: AvlTree<u64> = AvlTree::new();
        for (i, &k) in high.iter().enumerate() {
            t2.insert(k, i as u64);
        }

        let expected: Vec<i64> = low
            .iter()
            .copied()
            .chain(Some(150))
            .chain(high.iter().copied())
            .collect();
        t1.join(t2, 150, 0);
        t1.check_consistency();
        let got: Vec<i64> = t1.to_ordered_vec().into_iter().map(|(k, _)| k).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_join_receiver_holds_larger_keys(
        low in prop::collection::btree_set(0i64..100, 0..60),
        high in prop::collection::btree_set(200i64..300, 0..60),
    ) {
        let mut t1: AvlTree<u64> = AvlTree::new();
        for (i, &k) in high.iter().enumerate() {
            t1.insert(k, i as u64);
        }
        let mut t2: AvlTree<u64> = AvlTree::new();
        for (i, &k) in low.iter().enumerate() {
            t2.insert(k, i as u64);
        }

        let expected: Vec<i64> = low
            .iter()
            .copied()
            .chain(Some(150))
            .chain(high.iter().copied())
            .collect();
        t1.join(t2, 150, 0);
        t1.check_consistency();
        let got: Vec<i64> = t1.to_ordered_vec().into_iter().map(|(k, _)| k).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_finger_insert_builds_the_same_map(
        pairs in prop::collection::vec((key_strategy(), any::<u64>()), 0..300),
    ) {
        let mut a: AvlTree<u64> = AvlTree::new();
        let mut b: AvlTree<u64> = AvlTree::new();
        let mut seen = BTreeMap::new();

        for (k, v) in pairs {
            if seen.contains_key(&k) {
                continue;
            }
            seen.insert(k, v);
            a.insert(k, v);
            b.finger_insert(k, v);
        }

        a.check_consistency();
        b.check_consistency();
        let got_a: Vec<(i64, u64)> = a.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
        let got_b: Vec<(i64, u64)> = b.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
        prop_assert_eq!(&got_a, &got_b);
        let expected: Vec<(i64, u64)> = seen.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(got_a, expected);
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

#[test]
fn duplicate_pairs_keep_the_first_value() {
    // A repeated key must be skipped without touching the model either.
    let pairs = [(148i64, 0u64), (148, 1), (3, 7), (3, 9)];

    let mut a: AvlTree<u64> = AvlTree::new();
    let mut b: AvlTree<u64> = AvlTree::new();
    let mut seen = BTreeMap::new();

    for (k, v) in pairs {
        if seen.contains_key(&k) {
            continue;
        }
        seen.insert(k, v);
        a.insert(k, v);
        b.finger_insert(k, v);
    }

    let got_a: Vec<(i64, u64)> = a.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
    let got_b: Vec<(i64, u64)> = b.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
    assert_eq!(got_a, vec![(3, 7), (148, 0)]);
    assert_eq!(got_a, got_b);
    let expected: Vec<(i64, u64)> = seen.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(got_a, expected);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<i64> = vec![1, 2, 3, 10, 20, 30];

    for_each_permutation(&keys, |perm| {
        let mut t: AvlTree<u64> = AvlTree::new();
        let mut m: BTreeMap<i64, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            t.insert(k, v);
            m.insert(k, v);
            t.check_consistency();
        }

        let got: Vec<(i64, u64)> = t.to_ordered_vec().into_iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(i64, u64)> = m.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_delete_order_small_set() {
    let keys: Vec<i64> = vec![1, 2, 3, 10, 20, 30];

    // Insert in a fixed order, then delete in all permutations.
    let mut base: AvlTree<u64> = AvlTree::new();
    for (i, &k) in keys.iter().enumerate() {
        base.insert(k, i as u64);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();

        for k in perm {
            let (node, _) = t.search(k);
            t.delete(node.expect("key is still present"));
            t.check_consistency();
        }
        assert!(t.is_empty());
        assert_eq!(t.max_node(), None);
    });
}
