//! objcache - A disk-backed object cache
//!
//! Stores serializable values under string keys as one file per entry,
//! with optional TTL expiration and sweeping of expired entries.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Codec, DiskCache, JsonCodec};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
