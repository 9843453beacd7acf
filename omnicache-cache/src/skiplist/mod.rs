//! Concurrent ordered index with sentinel-delimited runs
//!
//! The skip list stores two kinds of node on its level-0 chain: *entries*
//! (cached key-value pairs) and *sentinels* (markers for key-space the
//! cache has not observed). Entries between two sentinels form a *run*:
//! a range the cache knows to be contiguous in the backing store, so a
//! forward scan inside a run never needs to touch the store.
//!
//! Lookups are wait-free; mutations use optimistic lock coupling: find the
//! affected position without locks, lock the predecessors bottom-up,
//! re-validate, and retry from scratch if the neighborhood changed.
//! Readers never block, so unlinked nodes are reclaimed through
//! crossbeam's epochs rather than freed in place.

mod evict;
mod iter;
mod list;
mod node;
mod stats;

pub use iter::CacheIterator;
pub use list::{CacheSkipList, SENTINEL_STR, TAIL_KEY};
pub use stats::SkipListStats;
