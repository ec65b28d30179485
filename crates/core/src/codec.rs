//! Payload codec port

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serializes values to a textual payload and back.
///
/// The cache treats payloads as opaque text; implementations choose the
/// format. `JsonCodec` is the default.
pub trait Codec: Send + Sync {
    /// Encode `value` to its textual payload
    fn encode<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Decode a textual payload into `T`
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T>;
}

/// JSON codec over serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| Error::codec(format!("Failed to encode: {e}")))
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| Error::codec(format!("Failed to decode: {e}")))
    }
}
