//! Core types used throughout OmniCache
//!
//! This module contains the fundamental data types that form the basis
//! of the cache's data model.

use serde::{Deserialize, Serialize};

/// A key in the cache, represented as a byte vector
pub type Key = Vec<u8>;

/// A value in the cache, represented as a byte vector
pub type Value = Vec<u8>;

/// A simple key-value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key
    pub key: Key,
    /// The value
    pub value: Value,
}

impl KeyValue {
    /// Creates a key-value pair from borrowed byte strings
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }
}
