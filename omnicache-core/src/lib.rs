//! Core types and contracts for OmniCache
//!
//! This crate contains the fundamental types and the abstractions for the
//! external collaborators of the OmniCache range cache. It provides:
//!
//! - Common error handling with [`Error`] and [`Result`]
//! - Basic data types like [`Key`], [`Value`], and [`KeyValue`]
//! - The [`Comparator`] capability that totally orders byte-string keys
//! - The [`BackingStore`] contract the cache writes evicted entries to
//! - The [`MetricRegistry`] telemetry sink
//!
//! # Example
//!
//! ```
//! use omnicache_core::{BytewiseComparator, Comparator, Key, Value};
//!
//! let key: Key = b"user:123".to_vec();
//! let value: Value = b"John Doe".to_vec();
//! let cmp = BytewiseComparator;
//! assert!(cmp.compare(&key, b"user:124").is_lt());
//! ```

pub mod comparator;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;

pub use comparator::{BytewiseComparator, Comparator};
pub use error::{Error, Result};
pub use metrics::MetricRegistry;
pub use store::{BackingStore, ColumnFamilyId, MemoryStore, WriteBatch, WriteOptions};
pub use types::*;
