//! Key Codec
//!
//! Maps arbitrary cache keys to fixed-length, filesystem-safe file names.

use sha2::{Digest, Sha256};

use crate::cache::ENTRY_EXTENSION;

/// Resolves a cache key to its entry file name.
///
/// The name is the lowercase hex SHA-256 of the key's UTF-8 bytes plus the
/// entry extension, so it never contains separators or traversal components
/// and stays stable across process restarts.
pub fn resolve_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}.{}", hasher.finalize(), ENTRY_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_deterministic() {
        assert_eq!(resolve_key("user:42"), resolve_key("user:42"));
    }

    #[test]
    fn test_resolve_known_digest() {
        assert_eq!(
            resolve_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855.entry"
        );
    }

    #[test]
    fn test_resolve_distinct_keys() {
        assert_ne!(resolve_key("a"), resolve_key("b"));
        assert_ne!(resolve_key("a/b"), resolve_key("a_b"));
    }

    #[test]
    fn test_resolve_neutralizes_traversal() {
        for key in ["../../etc/passwd", "/absolute", "a\\b", "nul\0byte", "."] {
            let name = resolve_key(key);
            assert!(!name.contains('/'));
            assert!(!name.contains('\\'));
            assert!(!name.contains(".."));
            assert_eq!(name.len(), 64 + 1 + ENTRY_EXTENSION.len());
        }
    }
}
