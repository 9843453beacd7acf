//! Recency approximation for eviction victim selection
//!
//! A sharded, tick-stamped queue over entry keys. Every push or touch
//! stamps the key with a fresh global tick and appends it to its shard;
//! older stamps for the same key become stale and are discarded lazily.
//! `pop` returns the globally coldest live key across shard fronts.
//!
//! Keys, not node pointers, are queued: a popped key is re-located in the
//! index before eviction, so the queue never holds references into
//! epoch-managed memory.

use omnicache_core::Key;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

const SHARD_COUNT: usize = 8;

#[derive(Default)]
struct Shard {
    /// Latest tick per live key
    live: HashMap<Key, u64>,
    /// Tick-stamped history, stale entries skipped on pop
    queue: VecDeque<(u64, Key)>,
}

impl Shard {
    fn record(&mut self, key: &[u8], tick: u64) {
        self.live.insert(key.to_vec(), tick);
        self.queue.push_back((tick, key.to_vec()));
        if self.queue.len() > 4 * self.live.len() + 16 {
            let live = &self.live;
            self.queue.retain(|(tick, key)| live.get(key) == Some(tick));
        }
    }

    /// Tick of the coldest live key, discarding stale fronts
    fn front(&mut self) -> Option<u64> {
        loop {
            let stale = match self.queue.front() {
                None => return None,
                Some((tick, key)) => self.live.get(key) != Some(tick),
            };
            if !stale {
                return self.queue.front().map(|(tick, _)| *tick);
            }
            self.queue.pop_front();
        }
    }

    fn pop_front(&mut self) -> Option<Key> {
        while let Some((tick, key)) = self.queue.pop_front() {
            if self.live.get(&key) == Some(&tick) {
                self.live.remove(&key);
                return Some(key);
            }
        }
        None
    }
}

/// Approximate LRU over entry keys
pub struct RecencyQueue {
    shards: Vec<Mutex<Shard>>,
    ticks: AtomicU64,
}

impl RecencyQueue {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(Shard::default())).collect(),
            ticks: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: &[u8]) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Starts tracking a key at the hot end
    pub fn push(&self, key: &[u8]) {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        self.shard(key).lock().record(key, tick);
    }

    /// Moves a key to the hot end; re-recording under a fresh tick is the
    /// move
    pub fn touch(&self, key: &[u8]) {
        self.push(key);
    }

    /// Removes and returns the coldest tracked key
    pub fn pop(&self) -> Option<Key> {
        let mut coldest: Option<(u64, usize)> = None;
        for (idx, shard) in self.shards.iter().enumerate() {
            if let Some(tick) = shard.lock().front() {
                if coldest.map_or(true, |(t, _)| tick < t) {
                    coldest = Some((tick, idx));
                }
            }
        }
        let (_, idx) = coldest?;
        self.shards[idx].lock().pop_front()
    }

    /// Number of live tracked keys
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().live.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecencyQueue {
    fn default() -> Self {
        Self::new()
    }
}
