//! Symmetric key material for signing and encrypting tokens.

use crate::error::TokenError;
use rand::RngCore;
use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

/// Smallest accepted key strength in bits.
pub const MIN_KEY_BITS: usize = 128;
/// Largest accepted key strength in bits.
pub const MAX_KEY_BITS: usize = 512;

/// An opaque symmetric key, usable for either signing or encryption.
///
/// Two independent keys are required per manager: one for integrity, one
/// for confidentiality. They must never be derived from each other.
/// Key bytes are wiped from memory on drop.
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Default key strength in bits.
    pub const DEFAULT_BITS: usize = 256;

    /// Generate a key of the requested strength in bits.
    pub fn generate(bits: usize) -> Result<Self, TokenError> {
        if bits == 0 || bits % 8 != 0 {
            return Err(TokenError::InvalidKey(format!(
                "key strength must be a positive multiple of 8 bits, got {bits}"
            )));
        }
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
            return Err(TokenError::InvalidKey(format!(
                "key strength must be between {MIN_KEY_BITS} and {MAX_KEY_BITS} bits, got {bits}"
            )));
        }

        let mut rng = rand::rng();
        let mut bytes = vec![0u8; bits / 8];
        rng.fill_bytes(&mut bytes);

        Ok(Self { bytes })
    }

    /// Create key material from existing raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TokenError::InvalidKey("key must not be empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Create key material from a hex-encoded string.
    pub fn from_hex(encoded: &str) -> Result<Self, TokenError> {
        let bytes =
            hex::decode(encoded.trim()).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Key strength in bits.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex encoding, for persisting the key out of band.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Save the key to a file as hex.
    pub fn save_to_file(&self, path: &Path) -> Result<(), TokenError> {
        std::fs::write(path, self.to_hex())?;
        Ok(())
    }

    /// Load a hex-encoded key from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, TokenError> {
        let encoded = std::fs::read_to_string(path)?;
        Self::from_hex(&encoded)
    }
}

impl Clone for KeyMaterial {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

// Key bytes never appear in logs or debug output.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bits", &self.bit_len())
            .finish_non_exhaustive()
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_default_strength() {
        let key = KeyMaterial::generate(KeyMaterial::DEFAULT_BITS).unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(key.bit_len(), 256);
    }

    #[test]
    fn test_generate_rejects_bad_strengths() {
        assert!(KeyMaterial::generate(0).is_err());
        assert!(KeyMaterial::generate(100).is_err());
        assert!(KeyMaterial::generate(64).is_err());
        assert!(KeyMaterial::generate(1024).is_err());
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = KeyMaterial::generate(256).unwrap();
        let b = KeyMaterial::generate(256).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_hex_roundtrip() {
        let key = KeyMaterial::generate(256).unwrap();
        let restored = KeyMaterial::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(KeyMaterial::from_hex("not hex at all").is_err());
        assert!(KeyMaterial::from_hex("").is_err());
    }

    #[test]
    fn test_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sign.key");

        let key = KeyMaterial::generate(256).unwrap();
        key.save_to_file(&path).unwrap();

        let loaded = KeyMaterial::load_from_file(&path).unwrap();
        assert_eq!(key.as_bytes(), loaded.as_bytes());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let key = KeyMaterial::from_bytes(vec![0xAB; 32]).unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains("ab"));
        assert!(!printed.contains("171"));
        assert!(printed.contains("256"));
    }
}
