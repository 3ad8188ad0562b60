//! Claim payload codec: canonical JSON with optional DEFLATE compression.

use crate::error::TokenError;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde_json::{Map, Value};
use std::io::{Read, Write};

/// Serialize a claim payload, compressing when asked.
///
/// The compression decision belongs to the caller; the flag must travel
/// in the token header so the decoder never guesses.
pub(crate) fn serialize(payload: &Map<String, Value>, compress: bool) -> Result<Vec<u8>, TokenError> {
    let encoded =
        serde_json::to_vec(payload).map_err(|e| TokenError::Serialization(e.to_string()))?;
    if !compress {
        return Ok(encoded);
    }

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&encoded)
        .and_then(|_| encoder.finish())
        .map_err(|e| TokenError::Serialization(e.to_string()))
}

/// Deserialize a claim payload, decompressing first when flagged.
pub(crate) fn deserialize(bytes: &[u8], compressed: bool) -> Result<Map<String, Value>, TokenError> {
    let encoded = if compressed {
        let mut decoder = DeflateDecoder::new(bytes);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| TokenError::Format(format!("failed to decompress payload: {e}")))?;
        decompressed
    } else {
        bytes.to_vec()
    };

    serde_json::from_slice(&encoded)
        .map_err(|e| TokenError::Format(format!("payload is not a JSON mapping: {e}")))
}
