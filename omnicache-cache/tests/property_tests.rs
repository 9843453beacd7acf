//! Property tests for the run/sentinel structure
//!
//! Random insert/append histories are replayed against a `BTreeSet`
//! model: the resident entry set must match the model exactly, and the
//! level-0 chain must keep its shape invariants (strictly increasing
//! keys, no adjacent sentinels, sentinel-guarded bounds).

use omnicache_cache::skiplist::{CacheSkipList, SENTINEL_STR};
use omnicache_cache::CacheConfig;
use omnicache_core::{BytewiseComparator, MemoryStore, MetricRegistry};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn new_list() -> Arc<CacheSkipList> {
    let config = CacheConfig {
        enabled: true,
        max_size_bytes: 1 << 30,
        ..Default::default()
    };
    Arc::new(
        CacheSkipList::new(
            config,
            Arc::new(BytewiseComparator),
            Arc::new(MemoryStore::new()),
            &MetricRegistry::disabled(),
        )
        .unwrap(),
    )
}

fn key(i: u16) -> Vec<u8> {
    format!("{:05}", i).into_bytes()
}

#[derive(Debug, Clone)]
enum Op {
    /// A fresh singleton run
    Insert(u16),
    /// Extend whatever precedes the key
    Append(u16),
    /// A scanned range: insert the base, append the rest
    Range(u16, u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u16..500).prop_map(Op::Insert),
        (0u16..500).prop_map(Op::Append),
        ((0u16..500), 1u8..8).prop_map(|(base, len)| Op::Range(base, len)),
    ]
}

fn apply(list: &Arc<CacheSkipList>, model: &mut BTreeSet<Vec<u8>>, op: &Op) {
    match op {
        Op::Insert(k) => {
            let kb = key(*k);
            list.insert(&kb, &kb);
            model.insert(kb);
        }
        Op::Append(k) => {
            let kb = key(*k);
            list.append(&kb, &kb);
            model.insert(kb);
        }
        Op::Range(base, len) => {
            for (offset, k) in (*base..base.saturating_add(*len as u16)).enumerate() {
                let kb = key(k);
                if offset == 0 {
                    list.insert(&kb, &kb);
                } else {
                    list.append(&kb, &kb);
                }
                model.insert(kb);
            }
        }
    }
}

/// Shape invariants of the level-0 chain
fn check_shape(list: &CacheSkipList) -> Result<(), TestCaseError> {
    let dump = list.dump_nodes();
    prop_assert!(dump.len() >= 3);
    prop_assert_eq!(&dump[0], "");
    prop_assert_eq!(&dump[1], SENTINEL_STR);
    prop_assert_eq!(&dump[dump.len() - 1], "TAIL");
    prop_assert_eq!(&dump[dump.len() - 2], SENTINEL_STR);

    let mut last_key: Option<&String> = None;
    for pair in dump[1..dump.len() - 1].windows(2) {
        prop_assert!(
            !(pair[0] == SENTINEL_STR && pair[1] == SENTINEL_STR),
            "adjacent sentinels in {:?}",
            dump
        );
    }
    for item in &dump[1..dump.len() - 1] {
        if item == SENTINEL_STR {
            continue;
        }
        if let Some(prev) = last_key {
            // Zero-padded keys order lexicographically.
            prop_assert!(prev < item, "keys out of order: {} !< {}", prev, item);
        }
        last_key = Some(item);
    }
    Ok(())
}

proptest! {
    #[test]
    fn random_histories_match_the_model(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let list = new_list();
        let mut model = BTreeSet::new();
        for op in &ops {
            apply(&list, &mut model, op);
        }

        let expected: Vec<Vec<u8>> = model.iter().cloned().collect();
        prop_assert_eq!(list.dump_entry_keys(), expected);
        check_shape(&list)?;
    }

    #[test]
    fn every_cached_key_is_a_seek_hit(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let list = new_list();
        let mut model = BTreeSet::new();
        for op in &ops {
            apply(&list, &mut model, op);
        }

        for k in &model {
            let iter = list.seek(k);
            prop_assert!(iter.valid(), "lost key {:?}", String::from_utf8_lossy(k));
            prop_assert_eq!(iter.key(), k.as_slice());
            prop_assert_eq!(iter.value(), k.as_slice());
        }
    }

    #[test]
    fn updates_replace_values_in_place(k in 0u16..500, v1 in ".{0,24}", v2 in ".{0,24}") {
        let list = new_list();
        let kb = key(k);
        list.insert(&kb, v1.as_bytes());
        let iter = list.seek(&kb);
        prop_assert!(iter.valid());
        prop_assert_eq!(iter.value(), v1.as_bytes());

        list.insert(&kb, v2.as_bytes());
        let iter = list.seek(&kb);
        prop_assert!(iter.valid());
        prop_assert_eq!(iter.value(), v2.as_bytes());
        prop_assert_eq!(list.len(), 1);
    }
}
