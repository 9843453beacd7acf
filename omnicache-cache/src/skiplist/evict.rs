//! Size-watermark eviction feeding the write-back path
//!
//! Victims come off the cold end of the recency queue. Removing an entry
//! must leave the run structure honest: a hole in the middle of a run gets
//! a fresh sentinel, a hole next to an existing sentinel is absorbed by
//! it, and two sentinels meeting across a hole coalesce into one.

use super::list::CacheSkipList;
use super::node::{Node, NodeBody, MAX_HEIGHT};
use crate::config::WriteBackMode;
use crossbeam::epoch::{self, Guard, Owned, Shared};
use omnicache_core::{ColumnFamilyId, WriteBatch, WriteOptions};
use std::sync::atomic::Ordering as AtomicOrdering;

/// Victims drained per eviction round
pub(crate) const EVICT_BATCH: usize = 1024;

/// How the level-0 gap left by a victim is repaired
#[derive(Clone, Copy)]
enum Repair<'g> {
    /// Entry neighbors on both sides: a new sentinel marks the hole
    Insert(Shared<'g, Node>),
    /// Sentinel neighbors on both sides: the successor sentinel goes too
    Coalesce(Shared<'g, Node>),
    /// One adjacent sentinel already marks the gap
    Absorb,
}

impl CacheSkipList {
    /// True when resident value bytes exceed the watermark; the factor
    /// approximates per-entry amortized overhead
    pub fn should_evict(&self) -> bool {
        self.stats.value_bytes().saturating_mul(1000) > self.max_size_bytes as u64
    }

    /// Runs one eviction cycle when the watermark is exceeded, unless
    /// another thread is already evicting. Returns whether a cycle ran.
    pub(super) fn maybe_evict(&self) -> bool {
        if !self.should_evict() {
            return false;
        }
        let _gate = match self.evict_gate.try_lock() {
            Some(gate) => gate,
            None => return false,
        };
        self.evict();
        true
    }

    /// Drains cold entries in rounds of up to `EVICT_BATCH` until the
    /// watermark clears or the recency queue runs dry; dirty victims are
    /// pushed down to the backing store
    pub fn evict(&self) {
        self.stats.on_evict();
        loop {
            let guard = epoch::pin();
            let cf = self.store.default_column_family();
            let mut batch = WriteBatch::new();
            let mut popped = 0u64;
            let mut drained = 0u64;

            for _ in 0..EVICT_BATCH {
                if !self.should_evict() {
                    break;
                }
                let key = match self.recency.pop() {
                    Some(key) => key,
                    None => break,
                };
                popped += 1;
                if self.evict_one(&key, cf, &mut batch, &guard) {
                    drained += 1;
                }
            }
            self.stats.on_evict_length(drained);

            if !batch.is_empty() {
                self.write_back(batch);
            }
            if popped == 0 || !self.should_evict() {
                break;
            }
        }
        log::debug!(
            "eviction cycle done, {} entries / {} value bytes resident",
            self.stats.length(),
            self.stats.value_bytes()
        );
    }

    /// Marks, snapshots, and unlinks the entry behind a popped key.
    ///
    /// Returns false when the key is no longer a live entry (stale queue
    /// stamp) and nothing was removed.
    fn evict_one(
        &self,
        key: &[u8],
        cf: ColumnFamilyId,
        batch: &mut WriteBatch,
        guard: &Guard,
    ) -> bool {
        let fr = self.find(key, guard);
        if fr.found.is_none() {
            return false;
        }
        let node = fr.succs[0];
        let node_ref = unsafe { node.deref() };
        if !node_ref.fully_linked.load(AtomicOrdering::SeqCst) {
            // Mid-publication; keep the key tracked and move on.
            self.recency.push(key);
            return false;
        }

        // Mark and snapshot under the node lock, so a racing value update
        // cannot slip between the tombstone and the captured payload.
        {
            let _held = node_ref.lock.lock();
            if node_ref.marked.load(AtomicOrdering::SeqCst) {
                return false;
            }
            node_ref.marked.store(true, AtomicOrdering::SeqCst);
            if let NodeBody::Entry { value, dirty, .. } = &node_ref.body {
                if dirty.swap(false, AtomicOrdering::SeqCst) {
                    let payload =
                        unsafe { value.load(AtomicOrdering::Acquire, guard).deref() }.clone();
                    batch.put(cf, key.to_vec(), payload);
                }
            }
        }

        self.unlink_marked(node, key, guard);
        true
    }

    /// Unlinks a marked victim at every level and repairs the sentinel
    /// structure around the hole
    fn unlink_marked<'g>(&self, node: Shared<'g, Node>, key: &[u8], guard: &'g Guard) {
        let node_ref = unsafe { node.deref() };
        let height = node_ref.height();

        loop {
            // Full-height search: the observed top can sit below a tall
            // victim while a raise and a decay race.
            let fr = self.find_from(key, MAX_HEIGHT - 1, guard);
            if fr.succs[0] != node {
                return;
            }

            // The victim is marked, so its own forward pointers are frozen:
            // nothing links after a marked predecessor.
            let succ0 = node_ref.next(0).load(AtomicOrdering::Acquire, guard);
            let pred0 = fr.preds[0];
            let pred_is_sentinel = unsafe { pred0.deref() }.is_sentinel();
            let succ_is_sentinel = unsafe { succ0.deref() }.is_sentinel();

            let repair = if !pred_is_sentinel && !succ_is_sentinel {
                Repair::Insert(Owned::new(Node::sentinel()).into_shared(guard))
            } else if pred_is_sentinel && succ_is_sentinel {
                Repair::Coalesce(succ0)
            } else {
                Repair::Absorb
            };

            // When the successor sentinel goes too, its lock is taken up
            // front: it is the rightmost node in this edit, and holding it
            // keeps a concurrent insert from linking into the gap behind
            // it mid-unlink. Rightmost-first is the global lock order.
            let _succ_held = match repair {
                Repair::Coalesce(sentinel) => Some(unsafe { sentinel.deref() }.lock.lock()),
                _ => None,
            };

            let unlinked = self.locked_exec_unlink(&fr.preds, node, height, guard, || {
                let pred0_ref = unsafe { pred0.deref() };
                match repair {
                    Repair::Insert(sentinel) => {
                        let sent_ref = unsafe { sentinel.deref() };
                        sent_ref.next(0).store(succ0, AtomicOrdering::Release);
                        sent_ref.fully_linked.store(true, AtomicOrdering::SeqCst);
                        pred0_ref.next(0).store(sentinel, AtomicOrdering::Release);
                        self.stats.on_link(sent_ref, guard);
                    }
                    Repair::Coalesce(sentinel) => {
                        let sent_ref = unsafe { sentinel.deref() };
                        sent_ref.marked.store(true, AtomicOrdering::SeqCst);
                        pred0_ref.next(0).store(
                            sent_ref.next(0).load(AtomicOrdering::Acquire, guard),
                            AtomicOrdering::Release,
                        );
                        self.stats.on_unlink(sent_ref, guard);
                        unsafe { guard.defer_destroy(sentinel) };
                    }
                    Repair::Absorb => {
                        pred0_ref.next(0).store(succ0, AtomicOrdering::Release);
                    }
                }
                for level in 1..height {
                    unsafe { fr.preds[level].deref() }.next(level).store(
                        node_ref.next(level).load(AtomicOrdering::Acquire, guard),
                        AtomicOrdering::Release,
                    );
                }
                self.stats.on_unlink(node_ref, guard);
            });

            if unlinked {
                unsafe { guard.defer_destroy(node) };
                self.maybe_decrease_height(guard);
                return;
            }
            if let Repair::Insert(sentinel) = repair {
                // Never published; reclaim immediately.
                unsafe { drop(sentinel.into_owned()) };
            }
        }
    }

    fn write_back(&self, batch: WriteBatch) {
        let options = WriteOptions {
            disable_wal: self.write_back == WriteBackMode::BestEffort,
        };
        let count = batch.len();
        match &self.writeback {
            Some(worker) => worker.submit(options, batch),
            None => {
                if let Err(err) = self.store.write(&options, batch) {
                    // At-most-once: the dirty bits are already cleared.
                    log::warn!("write-back of {} evicted entries failed: {}", count, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::skiplist::SENTINEL_STR;
    use omnicache_core::{BytewiseComparator, KeyValue, MemoryStore, MetricRegistry};
    use std::sync::Arc;

    fn new_list(
        max_size_bytes: usize,
        mode: WriteBackMode,
    ) -> (Arc<CacheSkipList>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig {
            enabled: true,
            max_size_bytes,
            write_back: mode,
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

    #[test]
    fn test_watermark_math() {
        let (list, _) = new_list(10_000, WriteBackMode::BestEffort);
        assert!(!list.should_evict());
        list.insert(b"10", b"0123456789");
        // 10 bytes resident, amortized x1000 against a 10_000 watermark.
        assert!(!list.should_evict());
        list.insert(b"11", b"x");
        assert!(list.should_evict());
    }

    #[test]
    fn test_evict_interior_entry_leaves_sentinel() {
        let (list, _) = new_list(11_000, WriteBackMode::BestEffort);
        for i in 10..16 {
            let s = i.to_string();
            if i == 10 {
                list.insert(s.as_bytes(), s.as_bytes());
            } else {
                list.append(s.as_bytes(), s.as_bytes());
            }
        }
        // Warm everything except "13".
        for key in [&b"10"[..], b"11", b"12", b"14", b"15"] {
            let iter = list.seek(key);
            assert!(iter.valid());
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
        assert_eq!(list.stats().evict_length(), 1);
        // The survivors still hit.
        assert!(list.seek(b"12").valid());
        assert!(list.seek(b"14").valid());
        assert!(!list.seek(b"13").valid());
    }

    #[test]
    fn test_evict_singleton_run_coalesces_sentinels() {
        let (list, store) = new_list(10_000, WriteBackMode::BestEffort);
        list.insert(b"10", b"aa");
        list.insert(b"10", b"bb"); // dirty now
        // Push past the watermark with a warmer neighbor run.
        list.insert(b"zz", b"012345678");

        list.evict();

        // "10" was the cold singleton; its surrounding sentinels coalesced.
        assert_eq!(
            list.dump_nodes(),
            vec!["", SENTINEL_STR, "zz", SENTINEL_STR, "TAIL"]
        );
        assert_eq!(list.stats().sentinel_count(), 2);
        assert_eq!(list.len(), 1);
        assert_eq!(list.value_bytes(), 9);

        // The dirty victim reached the store, WAL disabled.
        assert_eq!(store.logged_puts(), vec![KeyValue::new(b"10", b"bb")]);
        assert!(store.logged_options().iter().all(|o| o.disable_wal));
        assert_eq!(store.get(b"10"), Some(b"bb".to_vec()));
    }

    #[test]
    fn test_clean_victims_are_not_written_back() {
        let (list, store) = new_list(1_000, WriteBackMode::BestEffort);
        list.insert(b"10", b"aa");
        list.evict();
        assert_eq!(list.len(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_durable_mode_keeps_wal() {
        let (list, store) = new_list(10_000, WriteBackMode::Durable);
        list.insert(b"10", b"aa");
        list.insert(b"10", b"bb"); // dirty now
        list.insert(b"zz", b"012345678");
        list.evict();
        assert_eq!(store.write_count(), 1);
        assert!(store.logged_options().iter().all(|o| !o.disable_wal));
    }

    #[test]
    fn test_insert_triggers_eviction() {
        let (list, _) = new_list(1_000, WriteBackMode::BestEffort);
        list.insert(b"10", b"aa");
        assert_eq!(list.stats().evict_count(), 0);

        // The watermark is exceeded before this call, so it must evict
        // before linking its own entry.
        list.insert(b"20", b"bb");
        assert_eq!(list.stats().evict_count(), 1);
        assert_eq!(
            list.dump_nodes(),
            vec!["", SENTINEL_STR, "20", SENTINEL_STR, "TAIL"]
        );
    }

    #[test]
    fn test_append_demotes_to_insert_after_eviction() {
        let (list, _) = new_list(1_000, WriteBackMode::BestEffort);
        list.insert(b"10", b"aa");
        // Eviction removes the run "21" would have extended.
        list.append(b"21", b"cc");
        assert_eq!(
            list.dump_nodes(),
            vec!["", SENTINEL_STR, "21", SENTINEL_STR, "TAIL"]
        );
    }

    #[test]
    fn test_eviction_drains_to_watermark_or_empty() {
        let (list, _) = new_list(5_000, WriteBackMode::BestEffort);
        for i in 0..100u32 {
            let key = format!("k{:03}", i);
            list.insert(key.as_bytes(), b"0123456789");
        }
        list.evict();
        assert!(!list.should_evict() || list.recency.is_empty());
    }
}
