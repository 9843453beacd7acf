//! Pinned forward iterator over the level-0 chain

use super::list::CacheSkipList;
use super::node::Node;
use crossbeam::epoch::{self, Guard};
use std::ptr;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;

/// Forward iterator over cache entries
///
/// The iterator shares ownership of the index and holds an epoch guard, so
/// nodes it points at cannot be reclaimed underneath it even after they
/// are unlinked. `valid()` is true only while the current position is a
/// published, live entry; stepping into a gap sentinel reads as an
/// exhausted scan and the caller must re-seek the backing store.
///
/// Iterators are single-threaded objects; the epoch guard pins them to the
/// creating thread and the type is deliberately `!Send`.
pub struct CacheIterator {
    list: Arc<CacheSkipList>,
    guard: Guard,
    current: *const Node,
}

impl CacheIterator {
    /// Positions before the first run, on the permanent leading sentinel
    pub(super) fn new(list: Arc<CacheSkipList>) -> Self {
        let guard = epoch::pin();
        let current = {
            let head = list.head.load(AtomicOrdering::Acquire, &guard);
            unsafe { head.deref() }
                .next(0)
                .load(AtomicOrdering::Acquire, &guard)
                .as_raw()
        };
        Self {
            list,
            guard,
            current,
        }
    }

    /// Adopts a node the caller just located under its own pin
    pub(super) fn at(list: Arc<CacheSkipList>, node: *const Node) -> Self {
        // The caller's guard is still pinned, so `node` stays protected
        // across this second pin.
        let guard = epoch::pin();
        Self {
            list,
            guard,
            current: node,
        }
    }

    /// Moves to the smallest entry >= `key` in the run covering `key`, or
    /// onto the sentinel of the gap `key` falls into
    pub fn seek(&mut self, key: &[u8]) {
        self.guard.repin();
        let node = self.list.seek_node(key, &self.guard);
        self.current = node.as_raw();
    }

    /// Moves onto the permanent leading sentinel.
    ///
    /// The cache cannot assert anything about the key space before its
    /// first entry, so the first position is always a gap.
    pub fn seek_to_first(&mut self) {
        self.guard.repin();
        let head = self.list.head.load(AtomicOrdering::Acquire, &self.guard);
        let first = unsafe { head.deref() }
            .next(0)
            .load(AtomicOrdering::Acquire, &self.guard);
        self.current = first.as_raw();
    }

    /// Moves onto the trailing sentinel before the tail bound.
    ///
    /// Like the first position, the last position of a range cache is
    /// always a gap bound.
    pub fn seek_to_last(&mut self) {
        self.guard.repin();
        let guard = &self.guard;
        let tail = self.list.tail.load(AtomicOrdering::Acquire, guard);
        let mut cur = self.list.head.load(AtomicOrdering::Acquire, guard);
        let top = self.list.level.load(AtomicOrdering::Acquire);
        for level in (0..=top).rev() {
            loop {
                let next = unsafe { cur.deref() }.next(level).load(AtomicOrdering::Acquire, guard);
                if next == tail || next.is_null() {
                    break;
                }
                cur = next;
            }
        }
        self.current = cur.as_raw();
    }

    /// Advances one step along level 0
    ///
    /// Unpublished and logically deleted nodes are skipped as absent; a
    /// sentinel ends the scan.
    pub fn next(&mut self) {
        if self.current.is_null() {
            return;
        }
        let guard = &self.guard;
        let tail = self.list.tail.load(AtomicOrdering::Acquire, guard).as_raw();

        let cur_ref = unsafe { &*self.current };
        let mut next = cur_ref.next(0).load(AtomicOrdering::Acquire, guard);
        loop {
            if next.is_null() {
                // Stepped off the tail bound.
                self.current = ptr::null();
                return;
            }
            if next.as_raw() == tail {
                break;
            }
            let next_ref = unsafe { next.deref() };
            if !next_ref.fully_linked.load(AtomicOrdering::SeqCst)
                || next_ref.marked.load(AtomicOrdering::SeqCst)
            {
                next = next_ref.next(0).load(AtomicOrdering::Acquire, guard);
                continue;
            }
            break;
        }
        self.current = next.as_raw();

        let node = unsafe { &*self.current };
        if self.current != tail && !node.is_sentinel() {
            self.list.touch_key(node.key());
        }
    }

    /// True while positioned on a published, live entry
    pub fn valid(&self) -> bool {
        if self.current.is_null() {
            return false;
        }
        let head = self
            .list
            .head
            .load(AtomicOrdering::Relaxed, &self.guard)
            .as_raw();
        let tail = self
            .list
            .tail
            .load(AtomicOrdering::Relaxed, &self.guard)
            .as_raw();
        if self.current == head || self.current == tail {
            return false;
        }
        let node = unsafe { &*self.current };
        !node.is_sentinel()
            && node.fully_linked.load(AtomicOrdering::SeqCst)
            && !node.marked.load(AtomicOrdering::SeqCst)
    }

    /// The current entry's key; empty when the position is not an entry
    pub fn key(&self) -> &[u8] {
        if self.current.is_null() {
            return &[];
        }
        unsafe { &*self.current }.key()
    }

    /// The current entry's value as of some instant during this call;
    /// empty when the position is not an entry
    pub fn value(&self) -> &[u8] {
        if self.current.is_null() {
            return &[];
        }
        unsafe { &*self.current }.value(&self.guard)
    }
}
