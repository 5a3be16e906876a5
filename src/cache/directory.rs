//! Cache Directory Manager
//!
//! Owns the cache root and is the only code that touches entry files.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::Builder;
use tracing::{debug, warn};

use crate::cache::{ENTRY_EXTENSION, TEMP_PREFIX};
use crate::error::{CacheError, Result};

/// Age after which a leftover temp file is treated as orphaned
const ORPHAN_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

// == Cache Directory ==
/// Filesystem access for the cache root.
///
/// Holds no open handles between calls; every operation opens and releases
/// its own files.
#[derive(Debug, Clone)]
pub struct CacheDirectory {
    root: PathBuf,
}

impl CacheDirectory {
    /// Creates a manager for `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the full path of an entry file.
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    // == Ensure Exists ==
    /// Creates the root if needed and drops orphaned temp files.
    ///
    /// Idempotent. Fails with `DirectoryCreationFailed` if the root cannot be
    /// created or exists as something other than a directory.
    pub fn ensure_exists(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| CacheError::DirectoryCreationFailed {
            path: self.root.clone(),
            source,
        })?;

        self.clean_orphaned_temp_files();
        Ok(())
    }

    fn clean_orphaned_temp_files(&self) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        let now = SystemTime::now();

        for entry in entries.flatten() {
            if !is_temp_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if age.is_some_and(|age| age >= ORPHAN_TEMP_AGE) {
                let path = entry.path();
                match fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Removed orphaned temp file"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove orphaned temp file")
                    }
                }
            }
        }
    }

    // == Write ==
    /// Atomically replaces `file_name` with `bytes`.
    ///
    /// The bytes go to a uniquely named temp file in the root which is then
    /// renamed over the target, so readers see either the old or the new
    /// file in full.
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut temp = Builder::new().prefix(TEMP_PREFIX).tempfile_in(&self.root)?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.persist(self.path_of(file_name)).map_err(|e| e.error)?;
        Ok(())
    }

    // == Read ==
    /// Reads a whole entry file, or None if it does not exist.
    pub fn read(&self, file_name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_of(file_name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reads the first `len` bytes of an entry file, or fewer if it is shorter.
    ///
    /// Returns None if the file does not exist.
    pub fn read_prefix(&self, file_name: &str, len: usize) -> io::Result<Option<Vec<u8>>> {
        let file = match File::open(self.path_of(file_name)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut buf = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    // == Remove ==
    /// Deletes an entry file. Returns false if it was already absent.
    pub fn remove(&self, file_name: &str) -> io::Result<bool> {
        remove_path(&self.path_of(file_name))
    }

    // == Listing ==
    /// Lists the file names of all entry files directly under the root.
    pub fn list_entries(&self) -> io::Result<Vec<String>> {
        Ok(self
            .list_names()?
            .into_iter()
            .filter(|name| is_entry_name(name))
            .collect())
    }

    /// Lists every child of the root except in-flight temp files.
    pub fn list_files(&self) -> io::Result<Vec<String>> {
        Ok(self
            .list_names()?
            .into_iter()
            .filter(|name| !is_temp_name(name))
            .collect())
    }

    fn list_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            // Entry names are ASCII; anything else is foreign and listed lossily
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    // == Bulk Remove ==
    /// Deletes every named file, continuing past failures.
    ///
    /// Returns the number of files actually removed. Files that vanished in
    /// the meantime are not failures. If any removal failed, reports
    /// `RemovalFailed` with the failure count and the first error.
    pub fn remove_all<I>(&self, file_names: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut removed = 0;
        let mut failed = 0;
        let mut first_error: Option<(PathBuf, io::Error)> = None;

        for name in file_names {
            let path = self.path_of(name.as_ref());
            match remove_path(&path) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some((path, e));
                    }
                }
            }
        }

        match first_error {
            Some((path, source)) => Err(CacheError::RemovalFailed {
                path,
                failed,
                source,
            }),
            None => Ok(removed),
        }
    }
}

fn remove_path(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

fn is_entry_name(name: &str) -> bool {
    !is_temp_name(name)
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext == ENTRY_EXTENSION)
}
