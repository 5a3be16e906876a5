//! Expiry Store
//!
//! Reads and writes entry deadlines, which live in each entry file's header.

use std::io;

use chrono::{DateTime, Utc};

use crate::cache::entry::{decode_header, is_past, CacheEntry};
use crate::cache::{CacheDirectory, HEADER_LEN};

/// Deadline access for entry files under one cache directory.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryStore<'a> {
    directory: &'a CacheDirectory,
}

impl<'a> ExpiryStore<'a> {
    pub fn new(directory: &'a CacheDirectory) -> Self {
        Self { directory }
    }

    /// Replaces the deadline of an existing entry, keeping its payload.
    ///
    /// Fails with `NotFound` if the entry does not exist and with
    /// `InvalidData` if its header is damaged.
    pub fn set_deadline(&self, file_name: &str, deadline: Option<DateTime<Utc>>) -> io::Result<()> {
        let bytes = self
            .directory
            .read(file_name)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cache entry not found"))?;
        let mut entry = CacheEntry::from_bytes(&bytes).map_err(invalid_data)?;
        entry.expires_at = deadline;
        self.directory.write(file_name, &entry.to_bytes())
    }

    /// Returns the deadline of an entry, reading only its header.
    ///
    /// Fails with `NotFound` if the entry does not exist and with
    /// `InvalidData` if its header is damaged.
    pub fn get_deadline(&self, file_name: &str) -> io::Result<Option<DateTime<Utc>>> {
        let header = self
            .directory
            .read_prefix(file_name, HEADER_LEN)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cache entry not found"))?;
        decode_header(&header).map_err(invalid_data)
    }

    /// Checks whether an entry's deadline has been reached as of `now`.
    pub fn is_expired(&self, file_name: &str, now: DateTime<Utc>) -> io::Result<bool> {
        Ok(is_past(self.get_deadline(file_name)?, now))
    }

    /// Removes an entry only if its deadline still equals `expected`.
    ///
    /// Returns false when the entry is gone or has been rewritten with a
    /// different deadline in the meantime.
    pub fn remove_if_deadline(
        &self,
        file_name: &str,
        expected: Option<DateTime<Utc>>,
    ) -> io::Result<bool> {
        match self.get_deadline(file_name) {
            Ok(current) if current == expected => self.directory.remove(file_name),
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn invalid_data<E>(e: E) -> io::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    io::Error::new(io::ErrorKind::InvalidData, e)
}
