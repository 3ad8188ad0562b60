//! Outer encrypted envelope: compact JWE around the signed structure.

use crate::error::TokenError;
use crate::keys::KeyMaterial;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Key management algorithm: the encryption key is used directly.
pub(crate) const KEY_ALG: &str = "dir";
/// Content encryption algorithm.
pub(crate) const CONTENT_ENC: &str = "A256GCM";
/// Compression method flagged in the header when the payload is deflated.
pub(crate) const COMPRESSION: &str = "DEF";

/// Segments in a compact envelope: header, encrypted key, IV, ciphertext,
/// authentication tag. Direct key agreement leaves the second one empty.
pub(crate) const SEGMENTS: usize = 5;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The protected header of the outer envelope.
///
/// Everything the decoder needs before it can decrypt lives here: the
/// algorithm pair and the compression flag. The header doubles as the
/// AEAD associated data, so it cannot be swapped without detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EnvelopeHeader {
    pub alg: String,
    pub enc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
}

impl EnvelopeHeader {
    fn new(compress: bool) -> Self {
        Self {
            alg: KEY_ALG.into(),
            enc: CONTENT_ENC.into(),
            zip: compress.then(|| COMPRESSION.into()),
            typ: Some("JWT".into()),
            cty: Some("JWT".into()),
        }
    }

    /// Whether the sealed payload was compressed before signing.
    pub fn is_compressed(&self) -> bool {
        self.zip.as_deref() == Some(COMPRESSION)
    }
}

/// Encrypt a signed structure into the compact five-segment token form.
pub(crate) fn seal(
    plaintext: &[u8],
    key: &KeyMaterial,
    compress: bool,
) -> Result<String, TokenError> {
    let header = EnvelopeHeader::new(compress);
    let header_bytes =
        serde_json::to_vec(&header).map_err(|e| TokenError::Serialization(e.to_string()))?;
    let header_b64 = URL_SAFE_NO_PAD.encode(header_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| TokenError::InvalidKey("encryption key must be 256 bits".into()))?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: header_b64.as_bytes(),
            },
        )
        .map_err(|_| TokenError::Serialization("payload encryption failed".into()))?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    Ok(format!(
        "{header_b64}..{}.{}.{}",
        URL_SAFE_NO_PAD.encode(nonce),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// Decrypt a compact token, returning the plaintext and its header.
///
/// Shape problems are [`TokenError::Format`]; everything past the shape
/// check (wrong key, wrong algorithm family, tampering) is the cause-free
/// [`TokenError::Invalid`].
pub(crate) fn open(
    token: &str,
    key: &KeyMaterial,
) -> Result<(Vec<u8>, EnvelopeHeader), TokenError> {
    let (header_b64, encrypted_key, segments) = split(token)?;
    let header = parse_header_segment(header_b64)?;

    if header.alg != KEY_ALG || header.enc != CONTENT_ENC {
        return Err(TokenError::Invalid);
    }
    // Direct key agreement never carries a wrapped key.
    if !encrypted_key.is_empty() {
        return Err(TokenError::Invalid);
    }

    let nonce = decode_segment(segments[2], "initialization vector")?;
    let ciphertext = decode_segment(segments[3], "ciphertext")?;
    let tag = decode_segment(segments[4], "authentication tag")?;
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(TokenError::Invalid);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| TokenError::InvalidKey("encryption key must be 256 bits".into()))?;

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &sealed,
                aad: header_b64.as_bytes(),
            },
        )
        .map_err(|_| TokenError::Invalid)?;

    Ok((plaintext, header))
}

/// Keyless header parse, shared by the structural validator.
pub(crate) fn parse_header(token: &str) -> Result<EnvelopeHeader, TokenError> {
    let (header_b64, _, segments) = split(token)?;
    for (segment, name) in [
        (segments[2], "initialization vector"),
        (segments[3], "ciphertext"),
        (segments[4], "authentication tag"),
    ] {
        if segment.is_empty() {
            return Err(TokenError::Format(format!("empty {name} segment")));
        }
        decode_segment(segment, name)?;
    }
    decode_segment(segments[1], "encrypted key")?;

    let header = parse_header_segment(header_b64)?;
    if header.alg.is_empty() || header.enc.is_empty() {
        return Err(TokenError::Format(
            "header does not name an algorithm pair".into(),
        ));
    }
    if let Some(zip) = &header.zip {
        if zip != COMPRESSION {
            return Err(TokenError::Format(format!(
                "unsupported compression method: {zip}"
            )));
        }
    }
    Ok(header)
}

fn split(token: &str) -> Result<(&str, &str, Vec<&str>), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != SEGMENTS {
        return Err(TokenError::Format(format!(
            "expected {SEGMENTS} segments, found {}",
            segments.len()
        )));
    }
    if segments[0].is_empty() {
        return Err(TokenError::Format("empty header segment".into()));
    }
    Ok((segments[0], segments[1], segments))
}

fn parse_header_segment(header_b64: &str) -> Result<EnvelopeHeader, TokenError> {
    let header_bytes = decode_segment(header_b64, "header")?;
    serde_json::from_slice(&header_bytes)
        .map_err(|e| TokenError::Format(format!("unparseable header: {e}")))
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Format(format!("{name} segment is not URL-safe base64")))
}
