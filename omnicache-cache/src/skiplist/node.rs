//! Skip-list node layout

use crossbeam::epoch::{Atomic, Guard, Shared};
use omnicache_core::{Key, Value};
use parking_lot::ReentrantMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Maximum height of the skip list
pub(crate) const MAX_HEIGHT: usize = 12;

/// Discriminated node body: a cached pair or a gap marker
pub(super) enum NodeBody {
    /// Marks an interval of unknown content between two runs
    Sentinel {
        /// Seeks that landed in this gap
        hits: AtomicU64,
    },
    /// A cached key-value pair
    Entry {
        key: Key,
        /// Swapped wholesale under the node lock; readers load through an
        /// epoch guard and never observe a torn value
        value: Atomic<Value>,
        /// Updated in cache but not yet written back
        dirty: AtomicBool,
    },
}

/// A node on the ordered level-0 chain
///
/// The level-0 forward pointer is stored inline next to the body; higher
/// levels live in a separate boxed slice so the common read path touches
/// one allocation.
pub(super) struct Node {
    pub(super) body: NodeBody,
    next0: Atomic<Node>,
    higher: Box<[Atomic<Node>]>,
    /// Logical-deletion tombstone; set once, under the node lock
    pub(super) marked: AtomicBool,
    /// Set after every forward pointer is published; readers treat
    /// unlinked-in-progress nodes as absent
    pub(super) fully_linked: AtomicBool,
    /// Recursive: multi-level acquisition may revisit the same predecessor
    pub(super) lock: ReentrantMutex<()>,
}

impl Node {
    pub(super) fn entry(key: Key, value: Value, height: usize) -> Self {
        debug_assert!((1..=MAX_HEIGHT).contains(&height));
        Self {
            body: NodeBody::Entry {
                key,
                value: Atomic::new(value),
                dirty: AtomicBool::new(false),
            },
            next0: Atomic::null(),
            higher: (1..height).map(|_| Atomic::null()).collect(),
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(false),
            lock: ReentrantMutex::new(()),
        }
    }

    /// Sentinels always have height 1
    pub(super) fn sentinel() -> Self {
        Self {
            body: NodeBody::Sentinel {
                hits: AtomicU64::new(0),
            },
            next0: Atomic::null(),
            higher: Box::new([]),
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(false),
            lock: ReentrantMutex::new(()),
        }
    }

    pub(super) fn height(&self) -> usize {
        self.higher.len() + 1
    }

    pub(super) fn next(&self, level: usize) -> &Atomic<Node> {
        if level == 0 {
            &self.next0
        } else {
            &self.higher[level - 1]
        }
    }

    pub(super) fn is_sentinel(&self) -> bool {
        matches!(self.body, NodeBody::Sentinel { .. })
    }

    /// The entry key; empty for sentinels
    pub(super) fn key(&self) -> &[u8] {
        match &self.body {
            NodeBody::Entry { key, .. } => key,
            NodeBody::Sentinel { .. } => &[],
        }
    }

    /// Loads the current value through `guard`; empty for sentinels
    pub(super) fn value<'g>(&self, guard: &'g Guard) -> &'g [u8] {
        match &self.body {
            NodeBody::Entry { value, .. } => {
                let shared: Shared<'g, Value> = value.load(Ordering::Acquire, guard);
                // A published entry always carries a value.
                unsafe { shared.deref() }.as_slice()
            }
            NodeBody::Sentinel { .. } => &[],
        }
    }

    pub(super) fn value_len(&self, guard: &Guard) -> usize {
        self.value(guard).len()
    }

    pub(super) fn record_gap_hit(&self) {
        if let NodeBody::Sentinel { hits } = &self.body {
            hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[cfg(test)]
    pub(super) fn gap_hits(&self) -> u64 {
        match &self.body {
            NodeBody::Sentinel { hits } => hits.load(Ordering::Relaxed),
            NodeBody::Entry { .. } => 0,
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let NodeBody::Entry { value, .. } = &self.body {
            // The node is unreachable by the time it is dropped; the value
            // pointer is exclusively ours.
            unsafe {
                let shared = value.load(Ordering::Relaxed, crossbeam::epoch::unprotected());
                if !shared.is_null() {
                    drop(shared.into_owned());
                }
            }
        }
    }
}
