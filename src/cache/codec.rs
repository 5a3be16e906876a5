//! Entry Serializer
//!
//! The pluggable encode/decode boundary between values and payload bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error produced by a codec.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Turns values into payload bytes and back.
///
/// The cache never inspects payloads; any format that round-trips a value
/// through a byte sequence works.
pub trait Codec: Send + Sync {
    /// Encodes a value into bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decodes bytes into a value of the requested type.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
