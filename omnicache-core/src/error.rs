//! Error types for OmniCache
//!
//! This module defines the error types used throughout OmniCache.
//! Invariant violations inside the index are not represented here: once the
//! ordered structure is untrustworthy the process panics instead of limping
//! along with a corrupt cache.

use thiserror::Error;

/// The main error type for OmniCache operations
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value could not be interpreted
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backing store rejected an operation
    #[error("Backing store error: {0}")]
    Store(String),

    /// A write-back of evicted entries failed
    #[error("Write-back error: {0}")]
    WriteBack(String),
}

/// A specialized Result type for OmniCache operations
pub type Result<T> = std::result::Result<T, Error>;
