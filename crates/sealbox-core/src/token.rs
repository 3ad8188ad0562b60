//! Token sealing, opening, and keyless structural checks.

use crate::claims::{Claims, RegisteredClaims, embed, extract};
use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::error::TokenError;
use crate::jwe;
use crate::jws;
use crate::keys::KeyMaterial;
use std::sync::Arc;

/// Default expiration window for sealed tokens, in seconds.
pub const DEFAULT_EXPIRATION_S: u64 = 3600;
/// Default clock-skew leeway applied to expiration and not-before checks.
pub const DEFAULT_LEEWAY_S: u64 = 60;
/// Whether payloads are compressed by default.
pub const DEFAULT_COMPRESS: bool = true;

/// Seals session claims into confidential tokens and opens them again.
///
/// A manager holds immutable per-instance settings: two independent
/// symmetric keys (signing and encryption), an optional issuer checked
/// against every opened token, a default expiration window, the leeway
/// absorbing clock skew, and the compression toggle. It keeps no mutable
/// state between calls and is safe to share across threads.
///
/// The token layers sign-then-encrypt: the serialized (optionally
/// compressed) claims are signed first, then the whole signed structure
/// is encrypted. A party without the encryption key never even observes
/// the signed structure, and the signature covers the timing fields, so
/// timestamps cannot be forged by a party holding only the encryption
/// key.
pub struct TokenManager {
    issuer: Option<String>,
    sign_key: KeyMaterial,
    encrypt_key: KeyMaterial,
    expiration_s: u64,
    leeway_s: u64,
    compress: bool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.issuer)
            .field("sign_key", &self.sign_key)
            .field("encrypt_key", &self.encrypt_key)
            .field("expiration_s", &self.expiration_s)
            .field("leeway_s", &self.leeway_s)
            .field("compress", &self.compress)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Start building a manager with defaulted settings.
    pub fn builder() -> TokenManagerBuilder {
        TokenManagerBuilder::default()
    }

    /// Create a manager with the given keys and defaults for the rest.
    pub fn new(sign_key: KeyMaterial, encrypt_key: KeyMaterial) -> Result<Self, TokenError> {
        Self::builder()
            .sign_key(sign_key)
            .encrypt_key(encrypt_key)
            .build()
    }

    /// Seal claims into a token.
    ///
    /// `expires_in_s` overrides the manager's default expiration window
    /// for this one token. Repeated calls with identical claims never
    /// produce identical tokens; each one still opens to the original
    /// claims until its expiration instant plus leeway has passed.
    pub fn encrypt(&self, claims: &Claims, expires_in_s: Option<u64>) -> Result<String, TokenError> {
        let window = expires_in_s.unwrap_or(self.expiration_s);
        if window == 0 {
            return Err(TokenError::Config(
                "expiration window must be positive".into(),
            ));
        }

        let now = self.clock.now_epoch_s();
        let registered = RegisteredClaims {
            issued_at: Some(now),
            not_before: Some(now),
            expiration: now + window as i64,
            issuer: self.issuer.clone(),
        };

        let payload = embed(claims, &registered);
        let serialized = codec::serialize(&payload, self.compress)?;
        let signed = jws::sign(&serialized, &self.sign_key)?;
        let token = jwe::seal(signed.as_bytes(), &self.encrypt_key, self.compress)?;

        tracing::debug!(
            claims = claims.len(),
            compressed = self.compress,
            expires_in_s = window,
            "sealed session token"
        );

        Ok(token)
    }

    /// Open a token, returning the claims it was sealed with.
    ///
    /// Order matters: decrypt, verify the signature, decompress and
    /// deserialize, enforce timing, then the issuer. Reserved fields are
    /// stripped before the claims are returned. Failures surface
    /// immediately; partial claim sets are never returned.
    pub fn decrypt(&self, token: &str) -> Result<Claims, TokenError> {
        let (plaintext, header) = jwe::open(token, &self.encrypt_key)?;
        let signed = std::str::from_utf8(&plaintext).map_err(|_| TokenError::Invalid)?;
        let serialized = jws::verify(signed, &self.sign_key)?;

        let payload = codec::deserialize(&serialized, header.is_compressed())?;
        let (claims, registered) = extract(payload)?;

        let now = self.clock.now_epoch_s();
        let leeway = self.leeway_s as i64;
        if now > registered.expiration + leeway {
            return Err(TokenError::Expired {
                expired_at: registered.expiration,
                now,
            });
        }
        if let Some(not_before) = registered.not_before {
            if now < not_before - leeway {
                return Err(TokenError::NotYetValid { not_before, now });
            }
        }

        if let Some(expected) = &self.issuer {
            if registered.issuer.as_deref() != Some(expected.as_str()) {
                return Err(TokenError::IssuerMismatch {
                    expected: expected.clone(),
                    actual: registered.issuer,
                });
            }
        }

        tracing::debug!(claims = claims.len(), "opened session token");

        Ok(claims)
    }
}

/// Builder for [`TokenManager`].
///
/// Every field has a working default; `build()` on an untouched builder
/// produces a manager with fresh ephemeral keys, fit for validate-only
/// or test use (it can never open tokens sealed elsewhere).
pub struct TokenManagerBuilder {
    issuer: Option<String>,
    sign_key: Option<KeyMaterial>,
    encrypt_key: Option<KeyMaterial>,
    expiration_s: u64,
    leeway_s: u64,
    compress: bool,
    clock: Arc<dyn Clock>,
}

impl Default for TokenManagerBuilder {
    fn default() -> Self {
        Self {
            issuer: None,
            sign_key: None,
            encrypt_key: None,
            expiration_s: DEFAULT_EXPIRATION_S,
            leeway_s: DEFAULT_LEEWAY_S,
            compress: DEFAULT_COMPRESS,
            clock: Arc::new(SystemClock),
        }
    }
}

impl TokenManagerBuilder {
    /// Issuer embedded in sealed tokens and required of opened ones.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Key used to sign and verify the inner structure.
    pub fn sign_key(mut self, key: KeyMaterial) -> Self {
        self.sign_key = Some(key);
        self
    }

    /// Key used to encrypt and decrypt the outer envelope.
    pub fn encrypt_key(mut self, key: KeyMaterial) -> Self {
        self.encrypt_key = Some(key);
        self
    }

    /// Default expiration window in seconds. Must be positive.
    pub fn expiration_s(mut self, seconds: u64) -> Self {
        self.expiration_s = seconds;
        self
    }

    /// Clock-skew leeway in seconds, applied symmetrically.
    pub fn leeway_s(mut self, seconds: u64) -> Self {
        self.leeway_s = seconds;
        self
    }

    /// Whether to compress serialized claims before signing.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Replace the wall clock, e.g. with a manual clock in tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the settings and build the manager.
    pub fn build(self) -> Result<TokenManager, TokenError> {
        if self.expiration_s == 0 {
            return Err(TokenError::Config(
                "expiration window must be positive".into(),
            ));
        }

        let sign_key = match self.sign_key {
            Some(key) => key,
            None => KeyMaterial::generate(KeyMaterial::DEFAULT_BITS)?,
        };
        let encrypt_key = match self.encrypt_key {
            Some(key) => key,
            None => KeyMaterial::generate(KeyMaterial::DEFAULT_BITS)?,
        };
        if encrypt_key.bit_len() != 256 {
            return Err(TokenError::Config(format!(
                "encryption key must be 256 bits for {}, got {}",
                jwe::CONTENT_ENC,
                encrypt_key.bit_len()
            )));
        }

        Ok(TokenManager {
            issuer: self.issuer,
            sign_key,
            encrypt_key,
            expiration_s: self.expiration_s,
            leeway_s: self.leeway_s,
            compress: self.compress,
            clock: self.clock,
        })
    }
}

/// Check that a string is shaped like a sealed token, without keys.
///
/// This proves nothing about authenticity: a well-formed token sealed
/// under unknown keys still passes. A string that is not even
/// token-shaped fails with [`TokenError::Format`].
pub fn validate_token(token: &str) -> Result<(), TokenError> {
    jwe::parse_header(token).map(|_| ())
}

/// Inspect a token's public header, without keys (for debugging).
pub fn inspect_token(token: &str) -> Result<TokenInfo, TokenError> {
    let header = jwe::parse_header(token)?;
    Ok(TokenInfo {
        compressed: header.is_compressed(),
        key_algorithm: header.alg,
        encryption: header.enc,
        content_type: header.cty,
    })
}

/// The keyless view of a token: everything its public header declares.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// Key management algorithm identifier.
    pub key_algorithm: String,
    /// Content encryption algorithm identifier.
    pub encryption: String,
    /// Whether the sealed payload is compressed.
    pub compressed: bool,
    /// Declared content type of the ciphertext, if any.
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn session() -> Claims {
        Claims::new()
            .with("user", "jane_doe@anonymous.io")
            .with("name", "Jane Doe")
    }

    fn manager() -> TokenManager {
        TokenManager::builder()
            .sign_key(KeyMaterial::generate(256).unwrap())
            .encrypt_key(KeyMaterial::generate(256).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_seal_open_strips_reserved_fields() {
        let mgr = manager();
        let token = mgr.encrypt(&session(), None).unwrap();

        let decoded = mgr.decrypt(&token).unwrap();
        assert_eq!(decoded, session());
        assert!(!decoded.contains_key("exp"));
        assert!(!decoded.contains_key("iat"));
        assert!(!decoded.contains_key("nbf"));
    }

    #[test]
    fn test_nested_values_roundtrip() {
        let mgr = manager();
        let claims = Claims::new()
            .with("scopes", json!(["read", "write"]))
            .with("profile", json!({"name": "Jane", "tier": 3, "beta": null}));

        let token = mgr.encrypt(&claims, None).unwrap();
        assert_eq!(mgr.decrypt(&token).unwrap(), claims);
    }

    #[test]
    fn test_zero_expiration_rejected() {
        let mgr = manager();
        let err = mgr.encrypt(&session(), Some(0)).unwrap_err();
        assert!(matches!(err, TokenError::Config(_)));

        assert!(TokenManager::builder().expiration_s(0).build().is_err());
    }

    #[test]
    fn test_default_builder_uses_ephemeral_keys() {
        let mgr = manager();
        let token = mgr.encrypt(&session(), None).unwrap();

        let stranger = TokenManager::builder().build().unwrap();
        assert!(stranger.decrypt(&token).unwrap_err().is_invalid());
    }

    #[test]
    fn test_short_encryption_key_rejected() {
        let err = TokenManager::builder()
            .sign_key(KeyMaterial::generate(256).unwrap())
            .encrypt_key(KeyMaterial::generate(128).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, TokenError::Config(_)));
    }

    #[test]
    fn test_expiration_with_manual_clock() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let mgr = TokenManager::builder()
            .sign_key(KeyMaterial::generate(256).unwrap())
            .encrypt_key(KeyMaterial::generate(256).unwrap())
            .leeway_s(1)
            .clock(clock.clone())
            .build()
            .unwrap();

        let token = mgr.encrypt(&session(), Some(10)).unwrap();

        // Inside the window, and inside the leeway past it.
        clock.advance(10);
        assert!(mgr.decrypt(&token).is_ok());
        clock.advance(1);
        assert!(mgr.decrypt(&token).is_ok());

        // One second past expiration + leeway.
        clock.advance(1);
        let err = mgr.decrypt(&token).unwrap_err();
        assert!(err.is_expired());
        assert_eq!(err.expiration_time(), Some(1_000_010));
    }

    #[test]
    fn test_not_yet_valid_with_manual_clock() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let mgr = TokenManager::builder()
            .sign_key(KeyMaterial::generate(256).unwrap())
            .encrypt_key(KeyMaterial::generate(256).unwrap())
            .leeway_s(5)
            .clock(clock.clone())
            .build()
            .unwrap();

        let token = mgr.encrypt(&session(), None).unwrap();

        // Rewind past the leeway: nbf check trips.
        clock.set(1_000_000 - 6);
        assert!(matches!(
            mgr.decrypt(&token).unwrap_err(),
            TokenError::NotYetValid { .. }
        ));

        // Within leeway of nbf: accepted.
        clock.set(1_000_000 - 5);
        assert!(mgr.decrypt(&token).is_ok());
    }

    #[test]
    fn test_validate_and_inspect() {
        let mgr = manager();
        let token = mgr.encrypt(&session(), None).unwrap();

        assert!(validate_token(&token).is_ok());
        let info = inspect_token(&token).unwrap();
        assert_eq!(info.key_algorithm, "dir");
        assert_eq!(info.encryption, "A256GCM");
        assert!(info.compressed);

        assert!(validate_token("asdasdasdasdaasd").unwrap_err().is_format());
    }
}
