//! The cache facade
//!
//! Ties the index to its collaborators and carries the master switch: a
//! disabled cache holds no index at all, and every operation reports a
//! miss by returning `None`. Callers treat that exactly like a seek that
//! landed in a gap.

use crate::config::CacheConfig;
use crate::skiplist::{CacheIterator, CacheSkipList};
use omnicache_core::{BackingStore, Comparator, MetricRegistry, Result};
use std::sync::Arc;

const METRIC_PREFIX: &str = "/oc/skiplist/";

/// Ordered range cache over a backing store
///
/// # Example
///
/// ```
/// use omnicache_cache::{CacheConfig, OmniCache};
/// use omnicache_core::{BytewiseComparator, MemoryStore, MetricRegistry};
/// use std::sync::Arc;
///
/// let config = CacheConfig { enabled: true, ..Default::default() };
/// let cache = OmniCache::new(
///     config,
///     Arc::new(BytewiseComparator),
///     Arc::new(MemoryStore::new()),
///     Arc::new(MetricRegistry::disabled()),
/// )?;
/// assert!(cache.enabled());
/// # Ok::<(), omnicache_core::Error>(())
/// ```
pub struct OmniCache {
    inner: Option<Arc<CacheSkipList>>,
    registry: Arc<MetricRegistry>,
}

impl OmniCache {
    /// Builds the cache from its injected collaborators.
    ///
    /// With `config.enabled` off, no index is allocated and every
    /// operation returns `None`.
    pub fn new(
        config: CacheConfig,
        cmp: Arc<dyn Comparator>,
        store: Arc<dyn BackingStore>,
        registry: Arc<MetricRegistry>,
    ) -> Result<Self> {
        if !config.enabled {
            log::info!("range cache disabled");
            return Ok(Self {
                inner: None,
                registry,
            });
        }
        let list = CacheSkipList::new(config, cmp, store, &registry)?;
        Ok(Self {
            inner: Some(Arc::new(list)),
            registry,
        })
    }

    /// True when the master switch is on
    pub fn enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// The underlying index, when enabled
    pub fn index(&self) -> Option<&Arc<CacheSkipList>> {
        self.inner.as_ref()
    }

    /// Positions an iterator at the smallest cached entry `>= key` inside
    /// the run covering `key`; the iterator is invalid on a miss
    pub fn seek(&self, key: &[u8]) -> Option<CacheIterator> {
        self.inner.as_ref().map(|list| list.seek(key))
    }

    /// Caches `key` as the start of a new contiguous run
    pub fn insert(&self, key: &[u8], value: &[u8]) -> Option<CacheIterator> {
        self.inner.as_ref().map(|list| list.insert(key, value))
    }

    /// Caches `key` as an extension of the run that precedes it
    pub fn append(&self, key: &[u8], value: &[u8]) -> Option<CacheIterator> {
        self.inner.as_ref().map(|list| list.append(key, value))
    }

    /// A fresh iterator positioned before the first run
    pub fn new_iterator(&self) -> Option<CacheIterator> {
        self.inner.as_ref().map(|list| list.new_iterator())
    }

    /// Logs every `/oc/skiplist/` metric
    pub fn dump_metrics(&self) {
        self.registry.dump_metric(METRIC_PREFIX);
    }
}
