//! Level-0 structure scenarios
//!
//! Each scenario drives the index through a short history and checks the
//! exact node chain it leaves behind: entries, sentinels, and the
//! permanent bounds.

use omnicache_cache::skiplist::{CacheSkipList, SENTINEL_STR};
use omnicache_cache::{CacheConfig, WriteBackMode};
use omnicache_core::{BytewiseComparator, KeyValue, MemoryStore, MetricRegistry};
use std::sync::Arc;

fn new_list(max_size_bytes: usize) -> (Arc<CacheSkipList>, Arc<MemoryStore>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MemoryStore::new());
    let config = CacheConfig {
        enabled: true,
        max_size_bytes,
        write_back: WriteBackMode::BestEffort,
        ..Default::default()
    };
    let list = CacheSkipList::new(
        config,
        Arc::new(BytewiseComparator),
        Arc::clone(&store) as Arc<dyn omnicache_core::BackingStore>,
        &MetricRegistry::disabled(),
    )
    .unwrap();
    (Arc::new(list), store)
}

/// Insert the first key of a range, append the rest
fn insert_range(list: &Arc<CacheSkipList>, base: u32, count: u32) {
    for i in base..base + count {
        let s = i.to_string();
        if i == base {
            list.insert(s.as_bytes(), s.as_bytes());
        } else {
            list.append(s.as_bytes(), s.as_bytes());
        }
    }
}

fn append_range(list: &Arc<CacheSkipList>, base: u32, count: u32) {
    for i in base..base + count {
        let s = i.to_string();
        list.append(s.as_bytes(), s.as_bytes());
    }
}

#[test]
fn empty_index_dumps_bounds_only() {
    let (list, _) = new_list(1 << 20);
    assert_eq!(list.dump_nodes(), vec!["", SENTINEL_STR, "TAIL"]);
}

#[test]
fn single_insert_is_a_bordered_singleton_run() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 1);
    assert_eq!(
        list.dump_nodes(),
        vec!["", SENTINEL_STR, "10", SENTINEL_STR, "TAIL"]
    );
}

#[test]
fn append_extends_the_run_without_a_sentinel() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 2);
    assert_eq!(
        list.dump_nodes(),
        vec!["", SENTINEL_STR, "10", "11", SENTINEL_STR, "TAIL"]
    );

    let mut iter = list.seek(b"10");
    assert!(iter.valid());
    iter.next();
    assert!(iter.valid());
    assert_eq!(iter.key(), b"11");
    assert_eq!(iter.value(), b"11");
}

#[test]
fn disjoint_ranges_keep_their_gap() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 2);
    insert_range(&list, 15, 2);
    assert_eq!(
        list.dump_nodes(),
        vec![
            "",
            SENTINEL_STR,
            "10",
            "11",
            SENTINEL_STR,
            "15",
            "16",
            SENTINEL_STR,
            "TAIL"
        ]
    );

    // A scan from "11" exhausts at the gap.
    let mut iter = list.seek(b"11");
    assert!(iter.valid());
    iter.next();
    assert!(!iter.valid());
}

#[test]
fn seek_hits_inside_runs_and_misses_in_gaps() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 2);
    insert_range(&list, 15, 2);

    for key in ["10", "11", "15", "16"] {
        let iter = list.seek(key.as_bytes());
        assert!(iter.valid(), "seek {}", key);
        assert_eq!(iter.key(), key.as_bytes());
    }
    for key in ["0", "12", "13", "14", "17"] {
        let iter = list.seek(key.as_bytes());
        assert!(!iter.valid(), "seek {}", key);
    }
}

#[test]
fn reinserting_overlapping_ranges_is_stable() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 1);
    assert_eq!(
        list.dump_nodes(),
        vec!["", SENTINEL_STR, "10", SENTINEL_STR, "TAIL"]
    );
    insert_range(&list, 10, 1);
    assert_eq!(
        list.dump_nodes(),
        vec!["", SENTINEL_STR, "10", SENTINEL_STR, "TAIL"]
    );
    insert_range(&list, 10, 2);
    assert_eq!(
        list.dump_nodes(),
        vec!["", SENTINEL_STR, "10", "11", SENTINEL_STR, "TAIL"]
    );
    insert_range(&list, 15, 2);
    assert_eq!(
        list.dump_nodes(),
        vec![
            "",
            SENTINEL_STR,
            "10",
            "11",
            SENTINEL_STR,
            "15",
            "16",
            SENTINEL_STR,
            "TAIL"
        ]
    );
}

#[test]
fn appending_across_the_gap_fuses_runs() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 2);
    insert_range(&list, 15, 2);
    append_range(&list, 12, 4);
    assert_eq!(
        list.dump_nodes(),
        vec![
            "",
            SENTINEL_STR,
            "10",
            "11",
            "12",
            "13",
            "14",
            "15",
            "16",
            SENTINEL_STR,
            "TAIL"
        ]
    );

    // The fused range scans end to end.
    let mut iter = list.seek(b"10");
    for expected in 10..=16 {
        assert!(iter.valid());
        assert_eq!(iter.key(), expected.to_string().as_bytes());
        iter.next();
    }
    assert!(!iter.valid());
}

#[test]
fn appends_between_singleton_runs_grow_the_left_run() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 1);
    insert_range(&list, 11, 1);
    assert_eq!(
        list.dump_nodes(),
        vec!["", SENTINEL_STR, "10", SENTINEL_STR, "11", SENTINEL_STR, "TAIL"]
    );
    append_range(&list, 101, 2);
    assert_eq!(
        list.dump_nodes(),
        vec![
            "",
            SENTINEL_STR,
            "10",
            "101",
            "102",
            SENTINEL_STR,
            "11",
            SENTINEL_STR,
            "TAIL"
        ]
    );
    insert_range(&list, 130, 1);
    assert_eq!(
        list.dump_nodes(),
        vec![
            "",
            SENTINEL_STR,
            "10",
            "101",
            "102",
            SENTINEL_STR,
            "11",
            SENTINEL_STR,
            "130",
            SENTINEL_STR,
            "TAIL"
        ]
    );
}

#[test]
fn eviction_punches_a_sentinel_into_the_run() {
    let (list, store) = new_list(13_000);
    insert_range(&list, 10, 6);
    // Make the future victim dirty, then cool it down relative to the
    // rest of the run.
    list.insert(b"13", b"dirty");
    for key in ["10", "11", "12", "14", "15"] {
        assert!(list.seek(key.as_bytes()).valid());
    }

    list.evict();

    assert_eq!(
        list.dump_nodes(),
        vec![
            "",
            SENTINEL_STR,
            "10",
            "11",
            "12",
            SENTINEL_STR,
            "14",
            "15",
            SENTINEL_STR,
            "TAIL"
        ]
    );
    // The dirty victim landed in the store's write log.
    assert_eq!(store.logged_puts(), vec![KeyValue::new(b"13", b"dirty")]);
    assert!(store.logged_options().iter().all(|o| o.disable_wal));
}

#[test]
fn iterator_positions_are_gap_bounds_at_the_edges() {
    let (list, _) = new_list(1 << 20);
    insert_range(&list, 10, 2);

    let mut iter = list.new_iterator();
    assert!(!iter.valid());
    iter.seek_to_first();
    assert!(!iter.valid());
    iter.next();
    assert!(iter.valid());
    assert_eq!(iter.key(), b"10");

    iter.seek_to_last();
    assert!(!iter.valid());
}
