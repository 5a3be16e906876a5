//! Cache Module
//!
//! Provides a disk-backed object cache with TTL expiration.

mod codec;
mod directory;
mod entry;
mod expiry;
mod key;
mod store;


// Re-export public types
pub use codec::{Codec, CodecError, JsonCodec};
pub use directory::CacheDirectory;
pub use entry::{CacheEntry, HeaderError, HEADER_LEN};
pub use expiry::ExpiryStore;
pub use key::resolve_key;
pub use store::DiskCache;

// == Public Constants ==
/// Subdirectory created under the platform cache directory
pub const CACHE_DIR_NAME: &str = "objcache";

/// File extension of entry files
pub const ENTRY_EXTENSION: &str = "entry";

/// File name prefix of in-flight temp files
pub const TEMP_PREFIX: &str = ".tmp-";
