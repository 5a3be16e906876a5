//! Cache Store Module
//!
//! Main cache engine combining the key codec, entry format, expiry store
//! and directory manager.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::cache::{resolve_key, CacheDirectory, CacheEntry, Codec, ExpiryStore, JsonCodec};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Disk Cache ==
/// Disk-backed object cache with TTL support.
///
/// Keeps no state besides its configuration; the directory on disk is the
/// only source of truth, so several instances may share one root.
#[derive(Debug, Clone)]
pub struct DiskCache<C = JsonCodec> {
    /// Entry file access
    directory: CacheDirectory,
    /// Value serializer
    codec: C,
    /// TTL for entries stored without an explicit TTL
    default_ttl: Option<Duration>,
}

impl DiskCache<JsonCodec> {
    // == Constructors ==
    /// Opens a JSON-encoded cache rooted at `root`, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(&Config::new(root))
    }

    /// Opens a JSON-encoded cache as described by `config`.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_codec(config, JsonCodec)
    }

    /// Opens a JSON-encoded cache under the platform cache directory.
    pub fn platform() -> Result<Self> {
        Self::open(&Config::platform()?)
    }
}

impl<C: Codec> DiskCache<C> {
    /// Opens a cache as described by `config`, encoding values with `codec`.
    ///
    /// Fails if the root cannot be created; no instance is returned in that case.
    pub fn with_codec(config: &Config, codec: C) -> Result<Self> {
        let directory = CacheDirectory::new(&config.cache_dir);
        directory.ensure_exists()?;
        debug!(root = %directory.root().display(), "Cache directory ready");

        Ok(Self {
            directory,
            codec,
            default_ttl: config.default_ttl,
        })
    }

    /// Returns the cache root.
    pub fn root(&self) -> &Path {
        self.directory.root()
    }

    /// Returns the path of the file that stores `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.path_of(&resolve_key(key))
    }

    // == Put ==
    /// Stores a value under `key`, replacing any previous entry.
    ///
    /// The entry expires `ttl` from now; without a TTL the configured default
    /// applies, and without either it never expires.
    ///
    /// # Errors
    /// - `EncodingFailed` if the codec rejects the value
    /// - `WriteFailed` on I/O errors
    pub fn put<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let payload = self
            .codec
            .encode(value)
            .map_err(|source| CacheError::EncodingFailed {
                key: key.to_string(),
                source,
            })?;

        let entry = CacheEntry::new(payload, ttl.or(self.default_ttl));
        self.directory
            .write(&resolve_key(key), &entry.to_bytes())
            .map_err(|source| CacheError::WriteFailed {
                key: key.to_string(),
                source,
            })?;

        trace!(key, expires_at = ?entry.expires_at, "Stored cache entry");
        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// Returns None if there is no entry or it has expired; expired entries
    /// are deleted on the way out.
    ///
    /// # Errors
    /// - `ReadFailed` if the entry exists but cannot be read
    /// - `DecodingFailed` if the entry is damaged or is not a `T`
    /// - `RemovalFailed` if an expired entry cannot be deleted
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let file_name = resolve_key(key);

        let bytes = match self.directory.read(&file_name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                trace!(key, "Cache miss");
                return Ok(None);
            }
            Err(source) => {
                return Err(CacheError::ReadFailed {
                    key: key.to_string(),
                    source,
                })
            }
        };

        let entry = CacheEntry::from_bytes(&bytes).map_err(|source| CacheError::DecodingFailed {
            key: key.to_string(),
            source: source.into(),
        })?;

        if entry.is_expired() {
            // A concurrent put may have replaced the file since it was read
            let removed = ExpiryStore::new(&self.directory)
                .remove_if_deadline(&file_name, entry.expires_at)
                .map_err(|source| CacheError::removal(self.directory.path_of(&file_name), source))?;
            debug!(key, removed, "Expired cache entry");
            return Ok(None);
        }

        self.codec
            .decode(&entry.payload)
            .map(Some)
            .map_err(|source| CacheError::DecodingFailed {
                key: key.to_string(),
                source,
            })
    }

    // == Remove ==
    /// Removes the entry stored under `key`.
    ///
    /// Removing an absent key succeeds.
    pub fn remove(&self, key: &str) -> Result<()> {
        let file_name = resolve_key(key);
        let existed = self
            .directory
            .remove(&file_name)
            .map_err(|source| CacheError::removal(self.directory.path_of(&file_name), source))?;

        trace!(key, existed, "Removed cache entry");
        Ok(())
    }

    // == Clear ==
    /// Removes every file directly under the cache root.
    ///
    /// Not atomic: concurrent readers may see a partially cleared cache.
    /// Keeps going after a failed deletion and then reports `RemovalFailed`.
    /// Returns the number of files removed.
    pub fn clear(&self) -> Result<usize> {
        let files = self.directory.list_files().map_err(|source| {
            CacheError::removal(self.directory.root().to_path_buf(), source)
        })?;

        let removed = self.directory.remove_all(&files)?;
        debug!(removed, "Cleared cache");
        Ok(removed)
    }

    // == Sweep ==
    /// Removes every entry whose deadline has been reached.
    ///
    /// Live entries are untouched. Same failure policy as [`DiskCache::clear`];
    /// entries whose header cannot be read for I/O reasons count as failures,
    /// while damaged headers are skipped and left for `get` to report.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> Result<usize> {
        self.sweep_at(Utc::now())
    }

    /// Removes every entry whose deadline has been reached as of `now`.
    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let names = self.directory.list_entries().map_err(|source| {
            CacheError::removal(self.directory.root().to_path_buf(), source)
        })?;

        let expiry = ExpiryStore::new(&self.directory);
        let mut expired = Vec::new();
        let mut unreadable = 0;
        let mut first_error: Option<(PathBuf, io::Error)> = None;

        for name in names {
            match expiry.is_expired(&name, now) {
                Ok(true) => expired.push(name),
                Ok(false) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(file = %name, error = %e, "Skipping damaged cache entry");
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "Failed to read cache entry header");
                    unreadable += 1;
                    if first_error.is_none() {
                        first_error = Some((self.directory.path_of(&name), e));
                    }
                }
            }
        }

        match (self.directory.remove_all(&expired), first_error) {
            (Ok(removed), None) => {
                debug!(removed, "Swept expired cache entries");
                Ok(removed)
            }
            (Ok(_), Some((path, source))) => Err(CacheError::RemovalFailed {
                path,
                failed: unreadable,
                source,
            }),
            (Err(CacheError::RemovalFailed { path, failed, source }), _) => {
                Err(CacheError::RemovalFailed {
                    path,
                    failed: failed + unreadable,
                    source,
                })
            }
            (Err(e), _) => Err(e),
        }
    }
}
