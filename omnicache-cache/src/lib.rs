//! Ordered in-memory range cache for OmniCache
//!
//! This crate implements a cache that accelerates range scans over a
//! persistent key-value store by memoizing contiguous, already-scanned key
//! ranges. Its components:
//!
//! - **Skip list index**: a concurrent ordered list with wait-free lookup
//!   and lock-coupled mutation
//! - **Sentinels**: gap markers interleaved with entries so the cache can
//!   tell "this run of keys is contiguous" from "unknown territory"
//! - **Recency queue**: an approximate LRU that nominates eviction victims
//! - **Write-back**: dirty victims are pushed down to the backing store in
//!   batches when the size watermark is exceeded
//!
//! # Architecture
//!
//! ```text
//! Scan hit:
//! Caller -> Seek -> skip list run -> Next, Next, ... -> sentinel (re-seek store)
//!
//! Write path:
//! Caller -> Insert/Append -> (watermark?) -> evict batch -> BackingStore
//! ```
//!
//! # Example
//!
//! ```
//! use omnicache_cache::{CacheConfig, OmniCache};
//! use omnicache_core::{BytewiseComparator, MemoryStore, MetricRegistry};
//! use std::sync::Arc;
//!
//! let config = CacheConfig {
//!     enabled: true,
//!     ..Default::default()
//! };
//! let cache = OmniCache::new(
//!     config,
//!     Arc::new(BytewiseComparator),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MetricRegistry::disabled()),
//! )?;
//!
//! cache.insert(b"10", b"a");
//! cache.append(b"11", b"b");
//!
//! let mut iter = cache.seek(b"10").unwrap();
//! assert!(iter.valid());
//! iter.next();
//! assert_eq!(iter.key(), b"11");
//! # Ok::<(), omnicache_core::Error>(())
//! ```

pub mod cache;
pub mod config;
pub mod recency;
pub mod skiplist;
pub mod writeback;

pub use cache::OmniCache;
pub use config::{CacheConfig, WriteBackMode};
pub use skiplist::{CacheIterator, CacheSkipList};
