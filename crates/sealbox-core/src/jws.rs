//! Inner signed structure: compact JWS over the serialized claims.

use crate::error::TokenError;
use crate::keys::KeyMaterial;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Signing algorithm identifier bound into every signed structure.
pub(crate) const SIGNING_ALG: &str = "HS256";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct SignedHeader {
    alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Sign a payload, producing the compact `header.payload.signature` form.
///
/// The signature covers the encoded header, so the algorithm identifier
/// and everything under it (including the reserved timing claims in the
/// payload) is integrity-protected.
pub(crate) fn sign(payload: &[u8], key: &KeyMaterial) -> Result<String, TokenError> {
    let header = SignedHeader {
        alg: SIGNING_ALG.into(),
        typ: Some("JWT".into()),
    };
    let header_bytes =
        serde_json::to_vec(&header).map_err(|e| TokenError::Serialization(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_bytes),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Verify a compact signed structure and return its payload bytes.
///
/// Every failure collapses to [`TokenError::Invalid`]: a caller (or
/// attacker) cannot tell a malformed inner structure from a wrong key
/// from a flipped bit.
pub(crate) fn verify(compact: &str, key: &KeyMaterial) -> Result<Vec<u8>, TokenError> {
    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Invalid);
    }
    let (header_b64, payload_b64, signature_b64) = (segments[0], segments[1], segments[2]);

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| TokenError::Invalid)?;
    let header: SignedHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Invalid)?;
    // Pinned algorithm: anything else (notably "none") is a forgery attempt.
    if header.alg != SIGNING_ALG {
        return Err(TokenError::Invalid);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::Invalid)?;

    URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Invalid)
}
