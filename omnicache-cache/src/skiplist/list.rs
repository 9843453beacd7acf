//! The ordered concurrent index
//!
//! Level-0 layout invariants:
//!
//! - keys are strictly increasing along the chain
//! - no two sentinels are adjacent; the permanent bounds are
//!   `head -> sentinel -> tail` in the empty state
//! - head's immediate successor is always a sentinel, and so is tail's
//!   immediate predecessor
//!
//! Mutators run `find` without locks, then lock predecessors in the fixed
//! order `preds[0], prev, preds[1], preds[2], ...` and re-validate every
//! level before editing. A failed validation releases everything and the
//! operation retries from a fresh `find`.

use super::iter::CacheIterator;
use super::node::{Node, NodeBody, MAX_HEIGHT};
use super::stats::SkipListStats;
use crate::config::{CacheConfig, WriteBackMode};
use crate::recency::RecencyQueue;
use crate::writeback::WriteBackWorker;
use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use omnicache_core::{BackingStore, Comparator, MetricRegistry, Result};
use parking_lot::{Mutex, ReentrantMutexGuard};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Key carried by the permanent tail bound; compared by identity, the byte
/// pattern only shows up in diagnostics
pub const TAIL_KEY: &[u8] = b"\xff\xff\xff\xff\xff\xff\xff\xffTAIL";

/// How sentinels print in diagnostic dumps
pub const SENTINEL_STR: &str = "sentinel";

/// Wait-free lookup outcome: the neighborhood of a key at every level
pub(super) struct FindResult<'g> {
    /// Last non-sentinel node stepped over at level 0; the run tail a
    /// sentinel predecessor belongs to
    pub(super) prev: Shared<'g, Node>,
    pub(super) preds: [Shared<'g, Node>; MAX_HEIGHT],
    pub(super) succs: [Shared<'g, Node>; MAX_HEIGHT],
    /// Highest level at which the exact key was observed
    pub(super) found: Option<usize>,
}

/// Concurrent skip list over sentinel-delimited contiguous runs
pub struct CacheSkipList {
    pub(super) head: Atomic<Node>,
    pub(super) tail: Atomic<Node>,
    /// Current top level index, raised by tall inserts, decayed by unlinks
    pub(super) level: AtomicUsize,
    pub(super) cmp: Arc<dyn Comparator>,
    pub(super) store: Arc<dyn BackingStore>,
    pub(super) recency: RecencyQueue,
    pub(super) stats: Arc<SkipListStats>,
    pub(super) max_size_bytes: usize,
    pub(super) write_back: WriteBackMode,
    pub(super) writeback: Option<WriteBackWorker>,
    /// Admits one eviction cycle at a time
    pub(super) evict_gate: Mutex<()>,
    rng: Mutex<StdRng>,
}

impl CacheSkipList {
    /// Builds an empty index: `head -> sentinel -> tail`
    pub fn new(
        config: CacheConfig,
        cmp: Arc<dyn Comparator>,
        store: Arc<dyn BackingStore>,
        registry: &MetricRegistry,
    ) -> Result<Self> {
        let stats = SkipListStats::new();
        stats.register(registry);

        let writeback = if config.async_write_back {
            Some(WriteBackWorker::spawn(Arc::clone(&store))?)
        } else {
            None
        };

        let list = Self {
            head: Atomic::new(Node::entry(Vec::new(), Vec::new(), MAX_HEIGHT)),
            tail: Atomic::new(Node::entry(TAIL_KEY.to_vec(), Vec::new(), MAX_HEIGHT)),
            level: AtomicUsize::new(0),
            cmp,
            store,
            recency: RecencyQueue::new(),
            stats,
            max_size_bytes: config.max_size_bytes,
            write_back: config.write_back,
            writeback,
            evict_gate: Mutex::new(()),
            rng: Mutex::new(StdRng::from_entropy()),
        };

        let guard = epoch::pin();
        let head = list.head.load(AtomicOrdering::Acquire, &guard);
        let tail = list.tail.load(AtomicOrdering::Acquire, &guard);
        let head_ref = unsafe { head.deref() };
        let tail_ref = unsafe { tail.deref() };
        for level in 0..MAX_HEIGHT {
            head_ref.next(level).store(tail, AtomicOrdering::Release);
        }
        head_ref
            .fully_linked
            .store(true, AtomicOrdering::SeqCst);
        tail_ref
            .fully_linked
            .store(true, AtomicOrdering::SeqCst);

        // The permanent gap marker between the bounds.
        let sentinel = Owned::new(Node::sentinel()).into_shared(&guard);
        let sent_ref = unsafe { sentinel.deref() };
        sent_ref.next(0).store(tail, AtomicOrdering::Release);
        sent_ref.fully_linked.store(true, AtomicOrdering::SeqCst);
        head_ref.next(0).store(sentinel, AtomicOrdering::Release);
        list.stats.on_link(sent_ref, &guard);

        log::debug!(
            "range cache index created, watermark {} bytes, comparator {}",
            list.max_size_bytes,
            list.cmp.name()
        );
        Ok(list)
    }

    /// Number of resident entries
    pub fn len(&self) -> u64 {
        self.stats.length()
    }

    /// True when no entries are resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by resident values
    pub fn value_bytes(&self) -> u64 {
        self.stats.value_bytes()
    }

    /// The index's counters
    pub fn stats(&self) -> &SkipListStats {
        &self.stats
    }

    /// Orders a linked node against a search key.
    ///
    /// Tail compares greater than every key and sentinels compare less, so
    /// a level scan stops at the first entry >= key while walking straight
    /// through gap markers.
    fn cmp_node(&self, node: Shared<'_, Node>, key: &[u8], tail: Shared<'_, Node>) -> Ordering {
        if node == tail {
            return Ordering::Greater;
        }
        let node_ref = unsafe { node.deref() };
        if node_ref.is_sentinel() {
            return Ordering::Less;
        }
        self.cmp.compare(node_ref.key(), key)
    }

    /// Wait-free lookup: records the predecessor and successor of `key` at
    /// every level, the last non-sentinel level-0 predecessor, and the
    /// highest level where the key itself was seen.
    pub(super) fn find<'g>(&self, key: &[u8], guard: &'g Guard) -> FindResult<'g> {
        let top = self.level.load(AtomicOrdering::Acquire);
        self.find_from(key, top, guard)
    }

    /// Lookup starting at an explicit top level.
    ///
    /// Unlink needs `MAX_HEIGHT - 1`: the observed top can momentarily
    /// decay below the height of a still-linked tall node, and a search
    /// capped at the decayed top would never produce its upper-level
    /// predecessors.
    pub(super) fn find_from<'g>(&self, key: &[u8], top: usize, guard: &'g Guard) -> FindResult<'g> {
        self.stats.on_find();
        let head = self.head.load(AtomicOrdering::Acquire, guard);
        let tail = self.tail.load(AtomicOrdering::Acquire, guard);

        let mut preds = [head; MAX_HEIGHT];
        let mut succs = [tail; MAX_HEIGHT];
        let mut prev = head;
        let mut x = head;
        let mut found = None;

        for level in (0..=top).rev() {
            let mut next = unsafe { x.deref() }.next(level).load(AtomicOrdering::Acquire, guard);
            while self.cmp_node(next, key, tail) == Ordering::Less {
                self.stats.on_find_step();
                prev = x;
                x = next;
                next = unsafe { x.deref() }.next(level).load(AtomicOrdering::Acquire, guard);
            }
            if found.is_none() && self.cmp_node(next, key, tail) == Ordering::Equal {
                found = Some(level);
            }
            preds[level] = x;
            succs[level] = next;
        }
        // Sentinels have height 1, so a sentinel preds[0] was stepped onto
        // at level 0 and prev is the entry (or head) right before it.

        FindResult {
            prev,
            preds,
            succs,
            found,
        }
    }

    /// Positions a lookup: the smallest entry >= `key` inside the run
    /// covering `key`, or the sentinel marking the gap `key` falls into.
    pub(super) fn seek_node<'g>(&self, key: &[u8], guard: &'g Guard) -> Shared<'g, Node> {
        let tail = self.tail.load(AtomicOrdering::Acquire, guard);
        let fr = self.find(key, guard);
        let x = fr.preds[0];
        let next = fr.succs[0];

        let candidate = if !unsafe { x.deref() }.is_sentinel() {
            // ..., (x < key), (next >= key): next shares x's run
            next
        } else if self.cmp_node(next, key, tail) == Ordering::Equal {
            // ..., |, key: the key starts the next run
            next
        } else {
            // ..., (a < key), |, (b > key): key is in unobserved territory
            x
        };

        let cand_ref = unsafe { candidate.deref() };
        if cand_ref.is_sentinel() {
            cand_ref.record_gap_hit();
        } else if candidate != tail
            && cand_ref.fully_linked.load(AtomicOrdering::SeqCst)
            && !cand_ref.marked.load(AtomicOrdering::SeqCst)
        {
            self.recency.touch(cand_ref.key());
        }
        candidate
    }

    /// Creates or updates `key` as the start of a new contiguous run
    ///
    /// A fresh key is linked with a sentinel to its right, so the new run
    /// asserts nothing about the key space beyond it. An existing key is
    /// updated in place and marked dirty.
    pub fn insert(self: &Arc<Self>, key: &[u8], value: &[u8]) -> CacheIterator {
        self.stats.on_insert();
        self.maybe_evict();
        self.insert_inner(key, value)
    }

    fn insert_inner(self: &Arc<Self>, key: &[u8], value: &[u8]) -> CacheIterator {
        let guard = epoch::pin();
        loop {
            let height = self.random_update_level();
            let fr = self.find(key, &guard);

            if let Some(level) = fr.found {
                let node = fr.succs[level];
                if unsafe { node.deref() }.marked.load(AtomicOrdering::SeqCst) {
                    // Doomed twin still linked; wait for its unlink.
                    continue;
                }
                if !self.update_value(node, value, &guard) {
                    continue;
                }
                self.recency.touch(key);
                return CacheIterator::at(Arc::clone(self), node.as_raw());
            }

            if let Some(node) = self.link_singleton(&fr, key, value, height, &guard) {
                self.recency.push(key);
                return CacheIterator::at(Arc::clone(self), node.as_raw());
            }
        }
    }

    /// Extends the run of the immediately preceding entry with `key`
    ///
    /// The new entry joins its predecessor's run without introducing a
    /// sentinel: the caller asserts the source has no keys between the run
    /// tail and `key`. When `key` already exists as the start of the next
    /// run, the separating sentinel is removed and the runs fuse; the
    /// resident entry's value is kept. With no preceding run to extend,
    /// append degrades to insert semantics.
    pub fn append(self: &Arc<Self>, key: &[u8], value: &[u8]) -> CacheIterator {
        self.stats.on_append();
        if self.maybe_evict() {
            // Eviction may have removed the predecessor run, so the
            // adjacency claim no longer holds.
            return self.insert_inner(key, value);
        }
        self.append_inner(key, value)
    }

    fn append_inner(self: &Arc<Self>, key: &[u8], value: &[u8]) -> CacheIterator {
        let guard = epoch::pin();
        loop {
            let height = self.random_update_level();
            let fr = self.find(key, &guard);
            let head = self.head.load(AtomicOrdering::Acquire, &guard);
            let pred = fr.preds[0];
            let pred_is_sentinel = unsafe { pred.deref() }.is_sentinel();

            if let Some(level) = fr.found {
                let node = fr.succs[level];
                if unsafe { node.deref() }.marked.load(AtomicOrdering::SeqCst) {
                    continue;
                }
                if pred_is_sentinel && fr.prev != head {
                    // ..., run, |, key: fuse the two runs. The resident
                    // entry keeps its value and dirty bit.
                    if self.remove_sentinel(fr.prev, pred, node, &guard) {
                        self.recency.touch(key);
                        return CacheIterator::at(Arc::clone(self), node.as_raw());
                    }
                    continue;
                }
                if pred_is_sentinel {
                    // First run in the cache; there is no run to fuse with.
                    self.recency.touch(key);
                    return CacheIterator::at(Arc::clone(self), node.as_raw());
                }
                if !self.update_value(node, value, &guard) {
                    continue;
                }
                self.recency.touch(key);
                return CacheIterator::at(Arc::clone(self), node.as_raw());
            }

            let linked = if pred_is_sentinel {
                if fr.prev == head {
                    // No preceding entry: insert semantics.
                    self.link_singleton(&fr, key, value, height, &guard)
                } else {
                    self.link_run_extension(&fr, key, value, height, &guard)
                }
            } else {
                // Absent key strictly inside a run: trivially contiguous
                // with both neighbors, no sentinel edits.
                self.link_in_run(&fr, key, value, height, &guard)
            };
            if let Some(node) = linked {
                self.recency.push(key);
                return CacheIterator::at(Arc::clone(self), node.as_raw());
            }
        }
    }

    /// A forward iterator positioned before the first run
    pub fn new_iterator(self: &Arc<Self>) -> CacheIterator {
        CacheIterator::new(Arc::clone(self))
    }

    /// A forward iterator positioned by seek semantics: at the matching
    /// entry on a hit, on the gap sentinel on a miss
    pub fn seek(self: &Arc<Self>, key: &[u8]) -> CacheIterator {
        let mut iter = self.new_iterator();
        iter.seek(key);
        iter
    }

    /// Insert edit: `preds[0] -> NEW -> sentinel -> succs[0]`
    fn link_singleton<'g>(
        &self,
        fr: &FindResult<'g>,
        key: &[u8],
        value: &[u8],
        height: usize,
        guard: &'g Guard,
    ) -> Option<Shared<'g, Node>> {
        let new_node =
            Owned::new(Node::entry(key.to_vec(), value.to_vec(), height)).into_shared(guard);
        let sentinel = Owned::new(Node::sentinel()).into_shared(guard);

        let linked = self.locked_exec(&fr.preds, &fr.succs, None, height, guard, || {
            let new_ref = unsafe { new_node.deref() };
            let sent_ref = unsafe { sentinel.deref() };

            // Sentinel first, so the entry is born inside a valid run end.
            sent_ref.next(0).store(fr.succs[0], AtomicOrdering::Release);
            sent_ref.fully_linked.store(true, AtomicOrdering::SeqCst);

            new_ref.next(0).store(sentinel, AtomicOrdering::Release);
            for level in 1..height {
                new_ref
                    .next(level)
                    .store(fr.succs[level], AtomicOrdering::Release);
            }
            for level in 0..height {
                unsafe { fr.preds[level].deref() }
                    .next(level)
                    .store(new_node, AtomicOrdering::Release);
            }
            new_ref.fully_linked.store(true, AtomicOrdering::SeqCst);

            self.stats.on_link(new_ref, guard);
            self.stats.on_link(sent_ref, guard);
        });

        if linked {
            Some(new_node)
        } else {
            // Never published; reclaim immediately.
            unsafe {
                drop(new_node.into_owned());
                drop(sentinel.into_owned());
            }
            None
        }
    }

    /// Append edit: `prev -> NEW -> preds[0](sentinel) -> ...`
    fn link_run_extension<'g>(
        &self,
        fr: &FindResult<'g>,
        key: &[u8],
        value: &[u8],
        height: usize,
        guard: &'g Guard,
    ) -> Option<Shared<'g, Node>> {
        debug_assert!(unsafe { fr.preds[0].deref() }.is_sentinel());
        debug_assert!(!unsafe { fr.prev.deref() }.is_sentinel());

        let new_node =
            Owned::new(Node::entry(key.to_vec(), value.to_vec(), height)).into_shared(guard);

        let linked = self.locked_exec(&fr.preds, &fr.succs, Some(fr.prev), height, guard, || {
            let new_ref = unsafe { new_node.deref() };
            new_ref.next(0).store(fr.preds[0], AtomicOrdering::Release);
            for level in 1..height {
                new_ref
                    .next(level)
                    .store(fr.succs[level], AtomicOrdering::Release);
            }
            unsafe { fr.prev.deref() }
                .next(0)
                .store(new_node, AtomicOrdering::Release);
            for level in 1..height {
                unsafe { fr.preds[level].deref() }
                    .next(level)
                    .store(new_node, AtomicOrdering::Release);
            }
            new_ref.fully_linked.store(true, AtomicOrdering::SeqCst);
            self.stats.on_link(new_ref, guard);
        });

        if linked {
            Some(new_node)
        } else {
            unsafe { drop(new_node.into_owned()) };
            None
        }
    }

    /// Mid-run edit: plain link, no sentinel changes
    fn link_in_run<'g>(
        &self,
        fr: &FindResult<'g>,
        key: &[u8],
        value: &[u8],
        height: usize,
        guard: &'g Guard,
    ) -> Option<Shared<'g, Node>> {
        let new_node =
            Owned::new(Node::entry(key.to_vec(), value.to_vec(), height)).into_shared(guard);

        let linked = self.locked_exec(&fr.preds, &fr.succs, None, height, guard, || {
            let new_ref = unsafe { new_node.deref() };
            for level in 0..height {
                new_ref
                    .next(level)
                    .store(fr.succs[level], AtomicOrdering::Release);
            }
            for level in 0..height {
                unsafe { fr.preds[level].deref() }
                    .next(level)
                    .store(new_node, AtomicOrdering::Release);
            }
            new_ref.fully_linked.store(true, AtomicOrdering::SeqCst);
            self.stats.on_link(new_ref, guard);
        });

        if linked {
            Some(new_node)
        } else {
            unsafe { drop(new_node.into_owned()) };
            None
        }
    }

    /// Replaces the value of a resident entry under its own lock
    fn update_value(&self, node: Shared<'_, Node>, value: &[u8], guard: &Guard) -> bool {
        let node_ref = unsafe { node.deref() };
        let _held = node_ref.lock.lock();
        if node_ref.marked.load(AtomicOrdering::SeqCst) {
            return false;
        }
        match &node_ref.body {
            NodeBody::Entry { value: slot, dirty, .. } => {
                let old = slot.swap(Owned::new(value.to_vec()), AtomicOrdering::AcqRel, guard);
                let old_len = unsafe { old.deref() }.len();
                dirty.store(true, AtomicOrdering::SeqCst);
                self.stats.on_update(old_len, value.len());
                unsafe { guard.defer_destroy(old) };
                true
            }
            NodeBody::Sentinel { .. } => unreachable!("update targets an entry"),
        }
    }

    /// Unlinks the sentinel between a run tail and the entry that starts
    /// the following run, fusing the two runs.
    ///
    /// `succ` is the entry the caller observed right after the sentinel;
    /// the fusion only holds if the sentinel still leads to it. Lock order
    /// matches the mutators that use this sentinel as `preds[0]`: the
    /// sentinel first, then `prev`.
    pub(super) fn remove_sentinel(
        &self,
        prev: Shared<'_, Node>,
        sentinel: Shared<'_, Node>,
        succ: Shared<'_, Node>,
        guard: &Guard,
    ) -> bool {
        let prev_ref = unsafe { prev.deref() };
        let sent_ref = unsafe { sentinel.deref() };
        debug_assert!(sent_ref.is_sentinel());

        let removed = {
            let _sent_held = sent_ref.lock.lock();
            let _prev_held = prev_ref.lock.lock();
            if sent_ref.marked.load(AtomicOrdering::SeqCst)
                || prev_ref.marked.load(AtomicOrdering::SeqCst)
                || prev_ref.next(0).load(AtomicOrdering::Acquire, guard) != sentinel
                || sent_ref.next(0).load(AtomicOrdering::Acquire, guard) != succ
            {
                false
            } else {
                sent_ref.marked.store(true, AtomicOrdering::SeqCst);
                prev_ref.next(0).store(succ, AtomicOrdering::Release);
                self.stats.on_unlink(sent_ref, guard);
                true
            }
        };
        if removed {
            unsafe { guard.defer_destroy(sentinel) };
        }
        removed
    }

    /// Locks the edit neighborhood in the fixed global order and validates
    /// it; runs `edit` only when every level still matches the lookup.
    ///
    /// Locks are released on every exit path when the guard vector drops.
    pub(super) fn locked_exec<'g, F: FnOnce()>(
        &self,
        preds: &[Shared<'g, Node>; MAX_HEIGHT],
        succs: &[Shared<'g, Node>; MAX_HEIGHT],
        prev: Option<Shared<'g, Node>>,
        levels: usize,
        guard: &'g Guard,
        edit: F,
    ) -> bool {
        let mut held: Vec<ReentrantMutexGuard<'g, ()>> = Vec::with_capacity(levels + 1);

        if !Self::lock_check(preds[0], succs[0], 0, &mut held, guard) {
            return false;
        }
        if let Some(prev) = prev {
            if !Self::lock_check(prev, preds[0], 0, &mut held, guard) {
                return false;
            }
        }
        for level in 1..levels {
            if !Self::lock_check(preds[level], succs[level], level, &mut held, guard) {
                return false;
            }
        }

        edit();
        true
    }

    fn lock_check<'g>(
        pred: Shared<'g, Node>,
        succ: Shared<'g, Node>,
        level: usize,
        held: &mut Vec<ReentrantMutexGuard<'g, ()>>,
        guard: &'g Guard,
    ) -> bool {
        let pred_ref = unsafe { pred.deref() };
        held.push(pred_ref.lock.lock());
        !pred_ref.marked.load(AtomicOrdering::SeqCst)
            && !unsafe { succ.deref() }.marked.load(AtomicOrdering::SeqCst)
            && pred_ref.next(level).load(AtomicOrdering::Acquire, guard) == succ
    }

    /// Unlink variant: the victim is already marked, so only the
    /// predecessors are validated.
    pub(super) fn locked_exec_unlink<'g, F: FnOnce()>(
        &self,
        preds: &[Shared<'g, Node>; MAX_HEIGHT],
        victim: Shared<'g, Node>,
        levels: usize,
        guard: &'g Guard,
        edit: F,
    ) -> bool {
        let mut held: Vec<ReentrantMutexGuard<'g, ()>> = Vec::with_capacity(levels);
        for level in 0..levels {
            let pred_ref = unsafe { preds[level].deref() };
            held.push(pred_ref.lock.lock());
            if pred_ref.marked.load(AtomicOrdering::SeqCst)
                || pred_ref.next(level).load(AtomicOrdering::Acquire, guard) != victim
            {
                return false;
            }
        }
        edit();
        true
    }

    fn random_height(&self) -> usize {
        let mut height = 1;
        let mut rng = self.rng.lock();
        while height < MAX_HEIGHT && rng.gen_ratio(1, 4) {
            height += 1;
        }
        height
    }

    /// Draws a node height and raises the observed top level to cover it.
    ///
    /// Head already points at tail on every level, so raising the top is a
    /// single counter bump.
    fn random_update_level(&self) -> usize {
        let height = self.random_height();
        loop {
            let current = self.level.load(AtomicOrdering::Acquire);
            if height - 1 <= current {
                break;
            }
            if self
                .level
                .compare_exchange(
                    current,
                    height - 1,
                    AtomicOrdering::Release,
                    AtomicOrdering::Acquire,
                )
                .is_ok()
            {
                break;
            }
        }
        height
    }

    /// Drops the observed top while its head pointer leads straight to tail
    pub(super) fn maybe_decrease_height(&self, guard: &Guard) {
        let tail = self.tail.load(AtomicOrdering::Acquire, guard);
        loop {
            let level = self.level.load(AtomicOrdering::Acquire);
            if level == 0 {
                break;
            }
            let head = self.head.load(AtomicOrdering::Acquire, guard);
            if unsafe { head.deref() }.next(level).load(AtomicOrdering::Acquire, guard) != tail {
                break;
            }
            if self
                .level
                .compare_exchange(
                    level,
                    level - 1,
                    AtomicOrdering::Release,
                    AtomicOrdering::Acquire,
                )
                .is_err()
            {
                break;
            }
        }
    }

    pub(super) fn touch_key(&self, key: &[u8]) {
        self.recency.touch(key);
    }

    /// Level-0 chain as readable markers: `""` for head, `"sentinel"` for
    /// gap markers, `"TAIL"` for the tail bound, lossy UTF-8 for entry keys
    pub fn dump_nodes(&self) -> Vec<String> {
        let guard = epoch::pin();
        let head = self.head.load(AtomicOrdering::Acquire, &guard);
        let tail = self.tail.load(AtomicOrdering::Acquire, &guard);

        let mut out = Vec::new();
        let mut cur = head;
        loop {
            let cur_ref = unsafe { cur.deref() };
            if cur == head {
                out.push(String::new());
            } else if cur == tail {
                out.push("TAIL".to_string());
                break;
            } else if cur_ref.is_sentinel() {
                out.push(SENTINEL_STR.to_string());
            } else {
                out.push(String::from_utf8_lossy(cur_ref.key()).into_owned());
            }
            cur = cur_ref.next(0).load(AtomicOrdering::Acquire, &guard);
        }
        out
    }

    /// Resident entry keys in order, bounds and sentinels excluded
    pub fn dump_entry_keys(&self) -> Vec<Vec<u8>> {
        let guard = epoch::pin();
        let head = self.head.load(AtomicOrdering::Acquire, &guard);
        let tail = self.tail.load(AtomicOrdering::Acquire, &guard);

        let mut out = Vec::new();
        let mut cur = unsafe { head.deref() }.next(0).load(AtomicOrdering::Acquire, &guard);
        while cur != tail {
            let cur_ref = unsafe { cur.deref() };
            if !cur_ref.is_sentinel() {
                out.push(cur_ref.key().to_vec());
            }
            cur = cur_ref.next(0).load(AtomicOrdering::Acquire, &guard);
        }
        out
    }
}

impl Drop for CacheSkipList {
    fn drop(&mut self) {
        // No iterator can outlive the list (they hold an Arc), so the
        // level-0 chain is exclusively ours here.
        unsafe {
            let guard = epoch::unprotected();
            let mut cur = self.head.load(AtomicOrdering::Relaxed, guard);
            while !cur.is_null() {
                let next = cur.deref().next(0).load(AtomicOrdering::Relaxed, guard);
                drop(cur.into_owned());
                cur = next;
            }
        }
    }
}
