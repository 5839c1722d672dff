use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
enum Op {
    Put(u32, u32),
    Remove(u32),
    Get(u32),
}

// Zero is the sentinel for both keys and values.
fn ops_strategy(key_space: u32) -> impl Strategy<Value = Vec<Op>> {
    let key = 1..=key_space;
    let op = prop_oneof![
        4 => (key.clone(), 1..u32::MAX).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key.clone().prop_map(Op::Remove),
        2 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=1500)
}

fn check_against_model(
    map: &mut PropertyMap<u32, u32>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<u32, u32> = HashMap::new();

    for op in ops {
        match op {
            Op::Put(key, value) => {
                map.put(key, value);
                model.insert(key, value);
            }
            Op::Remove(key) => {
                prop_assert_eq!(map.remove(&key), model.remove(&key).is_some());
            }
            Op::Get(key) => {
                prop_assert_eq!(map.get(&key), model.get(&key));
            }
        }
        prop_assert_eq!(map.len(), model.len());
    }

    for (key, value) in &model {
        prop_assert_eq!(map.get(key), Some(value));
    }
    let live: BTreeMap<u32, u32> = map.iter().map(|(k, v)| (*k, *v)).collect();
    let expected: BTreeMap<u32, u32> = model.into_iter().collect();
    prop_assert_eq!(live, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_matches_model_dense_keys(ops in ops_strategy(64)) {
        let mut map = PropertyMap::with_buckets(3);
        check_against_model(&mut map, ops)?;
    }

    #[test]
    fn prop_map_matches_model_sparse_keys(ops in ops_strategy(100_000)) {
        let mut map = PropertyMap::new();
        check_against_model(&mut map, ops)?;
    }

    #[test]
    fn prop_map_single_bucket_growth(
        keys in prop::collection::vec(1u32..10_000, 1..400)
    ) {
        let mut map = PropertyMap::with_buckets(1);
        for &key in &keys {
            map.put(key, key);
        }
        for &key in &keys {
            prop_assert_eq!(map.get(&key), Some(&key));
        }
        let distinct: std::collections::BTreeSet<u32> =
            keys.iter().copied().collect();
        prop_assert_eq!(map.len(), distinct.len());
    }

    #[test]
    fn prop_stack_branches_are_independent(
        base in prop::collection::vec(any::<i32>(), 0..50),
        left in prop::collection::vec(any::<i32>(), 0..50),
        right in prop::collection::vec(any::<i32>(), 0..50),
    ) {
        let shared = base.iter().fold(Stack::new(), |s, &v| s.push(v));
        let l = left.iter().fold(shared.clone(), |s, &v| s.push(v));
        let r = right.iter().fold(shared.clone(), |s, &v| s.push(v));

        let expect = |extra: &[i32]| -> Vec<i32> {
            base.iter().chain(extra).rev().copied().collect()
        };
        prop_assert_eq!(l.iter().copied().collect::<Vec<_>>(), expect(&left));
        prop_assert_eq!(r.iter().copied().collect::<Vec<_>>(), expect(&right));

        let mut tail = l;
        for _ in 0..left.len() {
            tail = tail.pop().unwrap();
        }
        prop_assert!(tail.ptr_eq(&shared));
    }
}
