//! Backing store contract
//!
//! The cache sits above a persistent key-value store. During eviction it
//! pushes dirty entries back down through this interface; it never reads
//! through it (a cache miss is reported to the caller, who re-seeks the
//! store itself).
//!
//! The surface is deliberately small: batched writes with a WAL toggle,
//! an opaque default column family, and a single-key fallback primitive.
//!
//! # Example
//!
//! ```
//! use omnicache_core::{BackingStore, MemoryStore, WriteBatch, WriteOptions};
//!
//! let store = MemoryStore::new();
//! let mut batch = WriteBatch::new();
//! batch.put(store.default_column_family(), b"k".to_vec(), b"v".to_vec());
//! store.write(&WriteOptions::default(), batch)?;
//! assert_eq!(store.get(b"k"), Some(b"v".to_vec()));
//! # Ok::<(), omnicache_core::Error>(())
//! ```

use crate::{Key, KeyValue, Result, Value};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Options applied to a single batched write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Skip the store's write-ahead log for this batch.
    ///
    /// Evicted entries are best-effort by default; disabling the WAL trades
    /// their crash durability for throughput.
    pub disable_wal: bool,
}

/// Opaque handle to a column family of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnFamilyId(pub u32);

/// A single put recorded in a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPut {
    /// Target column family
    pub cf: ColumnFamilyId,
    /// The key
    pub key: Key,
    /// The value
    pub value: Value,
}

/// An ordered collection of puts submitted to the store in one call
#[derive(Debug, Default)]
pub struct WriteBatch {
    puts: Vec<BatchPut>,
}

impl WriteBatch {
    /// Creates an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a put to the batch
    pub fn put(&mut self, cf: ColumnFamilyId, key: Key, value: Value) {
        self.puts.push(BatchPut { cf, key, value });
    }

    /// Number of puts in the batch
    pub fn len(&self) -> usize {
        self.puts.len()
    }

    /// True when the batch holds no puts
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// The recorded puts, in submission order
    pub fn puts(&self) -> &[BatchPut] {
        &self.puts
    }
}

/// The persistent store underneath the cache
///
/// Implementations must be safe to call from the eviction path of multiple
/// cache mutators; the cache never holds node locks across these calls.
pub trait BackingStore: Send + Sync {
    /// Applies a batch of puts
    fn write(&self, options: &WriteOptions, batch: WriteBatch) -> Result<()>;

    /// The column family evicted entries are written to
    fn default_column_family(&self) -> ColumnFamilyId;

    /// Single-key write-back primitive, used when batching is unavailable
    fn put_evicted(&self, key: &[u8], value: &[u8]) -> Result<()>;
}

#[derive(Default)]
struct MemoryStoreInner {
    map: HashMap<Key, Value>,
    log: Vec<(WriteOptions, Vec<KeyValue>)>,
}

/// In-memory reference implementation of [`BackingStore`]
///
/// Applies writes to a hash map and records every submission in a write
/// log, which tests use to observe what the eviction path pushed down.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a key back out of the store
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.inner.lock().map.get(key).cloned()
    }

    /// Number of write submissions the store has received
    pub fn write_count(&self) -> usize {
        self.inner.lock().log.len()
    }

    /// Every put the store has received, in arrival order
    pub fn logged_puts(&self) -> Vec<KeyValue> {
        let inner = self.inner.lock();
        inner
            .log
            .iter()
            .flat_map(|(_, kvs)| kvs.iter().cloned())
            .collect()
    }

    /// The options each write submission arrived with
    pub fn logged_options(&self) -> Vec<WriteOptions> {
        self.inner.lock().log.iter().map(|(o, _)| *o).collect()
    }
}

impl BackingStore for MemoryStore {
    fn write(&self, options: &WriteOptions, batch: WriteBatch) -> Result<()> {
        let mut inner = self.inner.lock();
        let mut kvs = Vec::with_capacity(batch.len());
        for put in batch.puts() {
            inner.map.insert(put.key.clone(), put.value.clone());
            kvs.push(KeyValue {
                key: put.key.clone(),
                value: put.value.clone(),
            });
        }
        inner.log.push((*options, kvs));
        Ok(())
    }

    fn default_column_family(&self) -> ColumnFamilyId {
        ColumnFamilyId(0)
    }

    fn put_evicted(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.map.insert(key.to_vec(), value.to_vec());
        let kv = vec![KeyValue::new(key, value)];
        inner.log.push((WriteOptions { disable_wal: true }, kv));
        Ok(())
    }
}
