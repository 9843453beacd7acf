//! Skip-list counters and their telemetry wiring

use super::node::{Node, MAX_HEIGHT};
use crossbeam::epoch::Guard;
use omnicache_core::MetricRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const METRIC_PREFIX: &str = "/oc/skiplist/";

/// Monotonic counters describing the index
///
/// All counters are relaxed atomics: they feed telemetry and the eviction
/// watermark, neither of which needs cross-counter consistency.
#[derive(Default)]
pub struct SkipListStats {
    length: AtomicU64,
    key_bytes: AtomicU64,
    value_bytes: AtomicU64,
    insert_count: AtomicU64,
    append_count: AtomicU64,
    evict_count: AtomicU64,
    evict_length: AtomicU64,
    sentinel_count: AtomicU64,
    find_count: AtomicU64,
    find_iter_count: AtomicU64,
    level_length: [AtomicU64; MAX_HEIGHT],
}

impl SkipListStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of resident entries
    pub fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    /// Bytes held by resident keys
    pub fn key_bytes(&self) -> u64 {
        self.key_bytes.load(Ordering::Relaxed)
    }

    /// Bytes held by resident values; drives the eviction watermark
    pub fn value_bytes(&self) -> u64 {
        self.value_bytes.load(Ordering::Relaxed)
    }

    /// Number of resident sentinels
    pub fn sentinel_count(&self) -> u64 {
        self.sentinel_count.load(Ordering::Relaxed)
    }

    /// Eviction cycles run
    pub fn evict_count(&self) -> u64 {
        self.evict_count.load(Ordering::Relaxed)
    }

    /// Entries removed by eviction
    pub fn evict_length(&self) -> u64 {
        self.evict_length.load(Ordering::Relaxed)
    }

    /// Entries resident at `level` (0-based)
    pub fn level_length(&self, level: usize) -> u64 {
        self.level_length[level].load(Ordering::Relaxed)
    }

    pub(super) fn on_link(&self, node: &Node, guard: &Guard) {
        if node.is_sentinel() {
            self.sentinel_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.length.fetch_add(1, Ordering::Relaxed);
            self.key_bytes
                .fetch_add(node.key().len() as u64, Ordering::Relaxed);
            self.value_bytes
                .fetch_add(node.value_len(guard) as u64, Ordering::Relaxed);
        }
        self.level_length[node.height() - 1].fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn on_unlink(&self, node: &Node, guard: &Guard) {
        if node.is_sentinel() {
            self.sentinel_count.fetch_sub(1, Ordering::Relaxed);
        } else {
            self.length.fetch_sub(1, Ordering::Relaxed);
            self.key_bytes
                .fetch_sub(node.key().len() as u64, Ordering::Relaxed);
            self.value_bytes
                .fetch_sub(node.value_len(guard) as u64, Ordering::Relaxed);
        }
        self.level_length[node.height() - 1].fetch_sub(1, Ordering::Relaxed);
    }

    pub(super) fn on_update(&self, old_len: usize, new_len: usize) {
        if new_len >= old_len {
            self.value_bytes
                .fetch_add((new_len - old_len) as u64, Ordering::Relaxed);
        } else {
            self.value_bytes
                .fetch_sub((old_len - new_len) as u64, Ordering::Relaxed);
        }
    }

    pub(super) fn on_insert(&self) {
        self.insert_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn on_append(&self) {
        self.append_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn on_evict(&self) {
        self.evict_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn on_evict_length(&self, evicted: u64) {
        self.evict_length.fetch_add(evicted, Ordering::Relaxed);
    }

    pub(super) fn on_find(&self) {
        self.find_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn on_find_step(&self) {
        self.find_iter_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Wires every counter into the registry under `/oc/skiplist/`
    pub fn register(self: &Arc<Self>, registry: &MetricRegistry) {
        macro_rules! register_counter {
            ($name:literal, $field:ident) => {{
                let stats = Arc::clone(self);
                registry.register_metric(concat!("/oc/skiplist/", $name), move || {
                    stats.$field.load(Ordering::Relaxed) as f64
                });
            }};
        }

        register_counter!("length_", length);
        register_counter!("keySize_", key_bytes);
        register_counter!("valueSize_", value_bytes);
        register_counter!("insertCount_", insert_count);
        register_counter!("appendCount_", append_count);
        register_counter!("evictCount_", evict_count);
        register_counter!("evictLength_", evict_length);
        register_counter!("sentinelCount_", sentinel_count);
        register_counter!("findCount_", find_count);
        register_counter!("findIterCount_", find_iter_count);

        for level in 0..MAX_HEIGHT {
            let stats = Arc::clone(self);
            registry.register_metric(format!("{}levelLength_{}", METRIC_PREFIX, level), move || {
                stats.level_length[level].load(Ordering::Relaxed) as f64
            });
        }
    }
}
