//! Cache Entry Module
//!
//! Defines the on-disk entry format: a fixed header carrying the optional
//! deadline, followed by the payload bytes.
//!
//! ```text
//! [0..4)   magic "OBJC"
//! [4]      format version
//! [5]      flags (bit 0 = deadline present)
//! [6..14)  deadline, Unix milliseconds, i64 little-endian
//! [14..)   payload
//! ```
//!
//! Deadlines are rounded up to the next millisecond when stored, so an entry
//! never expires earlier than its TTL asks for.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

// == Format Constants ==
const MAGIC: &[u8; 4] = b"OBJC";
const FORMAT_VERSION: u8 = 1;
const FLAG_DEADLINE: u8 = 0b0000_0001;

/// Size of the entry header in bytes
pub const HEADER_LEN: usize = 14;

// == Header Error ==
/// Reasons an entry header cannot be parsed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("entry is {0} bytes, shorter than the header")]
    Truncated(usize),

    #[error("entry does not start with the cache magic")]
    BadMagic,

    #[error("unsupported entry format version {0}")]
    UnsupportedVersion(u8),

    #[error("deadline {0} ms is out of range")]
    DeadlineOutOfRange(i64),
}

// == Cache Entry ==
/// A single cache entry: payload bytes plus an optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The serialized value
    pub payload: Vec<u8>,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// A TTL too large to represent is treated as no expiration.
    pub fn new(payload: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            payload,
            expires_at: ttl.and_then(|ttl| deadline_after(Utc::now(), ttl)),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired as of `now`.
    ///
    /// An entry is expired once `now` reaches its deadline.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_past(self.expires_at, now)
    }

    /// Checks whether the entry has expired as of the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            (expires - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }

    // == Encoding ==
    /// Serializes the entry into its on-disk bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&encode_header(self.expires_at));
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parses an entry from its on-disk bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        let expires_at = decode_header(bytes)?;
        Ok(Self {
            payload: bytes[HEADER_LEN..].to_vec(),
            expires_at,
        })
    }
}

// == Header Helpers ==
/// Encodes the header for an entry with the given deadline.
pub(crate) fn encode_header(deadline: Option<DateTime<Utc>>) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(MAGIC);
    header[4] = FORMAT_VERSION;
    if let Some(deadline) = deadline {
        header[5] = FLAG_DEADLINE;
        header[6..].copy_from_slice(&ceil_millis(deadline).to_le_bytes());
    }
    header
}

/// Decodes the deadline from the first `HEADER_LEN` bytes of an entry.
pub(crate) fn decode_header(bytes: &[u8]) -> Result<Option<DateTime<Utc>>, HeaderError> {
    if bytes.len() < HEADER_LEN {
        return Err(HeaderError::Truncated(bytes.len()));
    }
    if &bytes[..4] != MAGIC {
        return Err(HeaderError::BadMagic);
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(HeaderError::UnsupportedVersion(bytes[4]));
    }
    if bytes[5] & FLAG_DEADLINE == 0 {
        return Ok(None);
    }

    let mut millis = [0u8; 8];
    millis.copy_from_slice(&bytes[6..HEADER_LEN]);
    let millis = i64::from_le_bytes(millis);
    DateTime::from_timestamp_millis(millis)
        .map(Some)
        .ok_or(HeaderError::DeadlineOutOfRange(millis))
}

/// Returns the instant `ttl` after `now` at millisecond precision, or None if
/// it cannot be represented.
pub(crate) fn deadline_after(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .and_then(|deadline| DateTime::from_timestamp_millis(ceil_millis(deadline)))
}

/// Unix milliseconds of `instant`, rounded up.
fn ceil_millis(instant: DateTime<Utc>) -> i64 {
    let millis = instant.timestamp_millis();
    if instant.timestamp_subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis.saturating_add(1)
    }
}

/// The single expiry comparison shared by reads and sweeps.
pub(crate) fn is_past(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match deadline {
        Some(deadline) => now >= deadline,
        None => false,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(b"payload".to_vec(), None);

        assert_eq!(entry.payload, b"payload");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(b"payload".to_vec(), Some(Duration::from_secs(10)));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());

        let remaining = entry.ttl_remaining().unwrap();
        // The stored deadline may round up by under a millisecond
        assert!(remaining <= Duration::from_millis(10_001));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(b"payload".to_vec(), Some(Duration::from_millis(50)));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(100));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new(Vec::new(), Some(Duration::ZERO));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_sub_millisecond_ttl_rounds_deadline_up() {
        let now = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let ttl = Duration::from_micros(900);

        let deadline = deadline_after(now, ttl).unwrap();
        assert_eq!(deadline, millis(1_700_000_000_125));
        assert!(deadline >= now + TimeDelta::from_std(ttl).unwrap());
        assert!(!is_past(Some(deadline), now));
    }

    #[test]
    fn test_encoded_deadline_is_never_earlier() {
        let deadline = DateTime::from_timestamp(1_700_000_000, 1).unwrap();
        let header = encode_header(Some(deadline));

        let stored = decode_header(&header).unwrap().unwrap();
        assert_eq!(stored, millis(1_700_000_000_001));
        assert!(stored >= deadline);

        let exact = millis(1_700_000_000_000);
        assert_eq!(decode_header(&encode_header(Some(exact))).unwrap(), Some(exact));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let entry = CacheEntry::new(Vec::new(), Some(Duration::MAX));
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let deadline = millis(1_700_000_000_000);
        let entry = CacheEntry {
            payload: Vec::new(),
            expires_at: Some(deadline),
        };

        assert!(!entry.is_expired_at(millis(1_699_999_999_999)));
        assert!(entry.is_expired_at(deadline), "Entry should be expired at boundary");
        assert!(entry.is_expired_at(millis(1_700_000_000_001)));
    }

    #[test]
    fn test_bytes_layout_with_deadline() {
        let entry = CacheEntry {
            payload: b"abc".to_vec(),
            expires_at: Some(millis(1_000)),
        };

        let bytes = entry.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN + 3);
        assert_eq!(&bytes[..4], b"OBJC");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(bytes[5], FLAG_DEADLINE);
        assert_eq!(&bytes[6..14], &1_000i64.to_le_bytes());
        assert_eq!(&bytes[14..], b"abc");
        assert_eq!(CacheEntry::from_bytes(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_no_deadline_is_distinct_from_epoch_deadline() {
        let never = CacheEntry {
            payload: Vec::new(),
            expires_at: None,
        };
        let epoch = CacheEntry {
            payload: Vec::new(),
            expires_at: Some(millis(0)),
        };

        assert_ne!(never.to_bytes(), epoch.to_bytes());
        assert_eq!(decode_header(&never.to_bytes()).unwrap(), None);
        assert_eq!(decode_header(&epoch.to_bytes()).unwrap(), Some(millis(0)));
    }

    #[test]
    fn test_decode_rejects_bad_headers() {
        assert_eq!(decode_header(b"OBJ"), Err(HeaderError::Truncated(3)));

        let mut bytes = encode_header(None).to_vec();
        bytes[0] = b'X';
        assert_eq!(decode_header(&bytes), Err(HeaderError::BadMagic));

        let mut bytes = encode_header(None).to_vec();
        bytes[4] = 9;
        assert_eq!(decode_header(&bytes), Err(HeaderError::UnsupportedVersion(9)));

        let mut bytes = encode_header(None).to_vec();
        bytes[5] = FLAG_DEADLINE;
        bytes[6..14].copy_from_slice(&i64::MAX.to_le_bytes());
        assert_eq!(
            decode_header(&bytes),
            Err(HeaderError::DeadlineOutOfRange(i64::MAX))
        );
    }
}
