//! Session claims and the reserved fields layered over them.

use crate::error::TokenError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved claim names, embedded at encode time and stripped on decode.
pub mod reserved {
    /// Epoch seconds at which the token was issued.
    pub const ISSUED_AT: &str = "iat";
    /// Epoch seconds before which the token must be rejected.
    pub const NOT_BEFORE: &str = "nbf";
    /// Epoch seconds after which the token must be rejected.
    pub const EXPIRATION: &str = "exp";
    /// Issuer identifier, present only when the sealing manager has one.
    pub const ISSUER: &str = "iss";
}

/// A session: an arbitrary mapping of string keys to JSON values.
///
/// Key order is not significant; the key set and values round-trip
/// exactly through a seal/open cycle. Keys named like the reserved
/// fields are overwritten at encode time and stripped on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a claim, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Chainable insert, for building claim sets inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a claim by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consume the claim set, yielding the underlying JSON mapping.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The reserved timing/issuer fields of a token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredClaims {
    /// When the token was issued, if recorded.
    pub issued_at: Option<i64>,
    /// Instant before which the token is not yet valid, if recorded.
    pub not_before: Option<i64>,
    /// Instant after which the token is expired. Always present.
    pub expiration: i64,
    /// Issuer embedded at sealing time, if any.
    pub issuer: Option<String>,
}

/// Layer the reserved fields over the caller's claims.
///
/// Reserved keys win over caller-supplied keys of the same name; they are
/// stripped again on decode, so the collision is invisible to callers.
pub(crate) fn embed(claims: &Claims, registered: &RegisteredClaims) -> Map<String, Value> {
    let mut payload = claims.0.clone();
    if let Some(iat) = registered.issued_at {
        payload.insert(reserved::ISSUED_AT.into(), iat.into());
    }
    if let Some(nbf) = registered.not_before {
        payload.insert(reserved::NOT_BEFORE.into(), nbf.into());
    }
    payload.insert(reserved::EXPIRATION.into(), registered.expiration.into());
    if let Some(issuer) = &registered.issuer {
        payload.insert(reserved::ISSUER.into(), issuer.as_str().into());
    }
    payload
}

/// Pop the reserved fields back out of a decoded payload.
///
/// `exp` is required; `iat` and `nbf` are optional so that tokens sealed
/// by other conforming producers still open.
pub(crate) fn extract(mut payload: Map<String, Value>) -> Result<(Claims, RegisteredClaims), TokenError> {
    let expiration = take_timestamp(&mut payload, reserved::EXPIRATION)?
        .ok_or(TokenError::MissingClaim {
            claim: reserved::EXPIRATION.into(),
        })?;
    let issued_at = take_timestamp(&mut payload, reserved::ISSUED_AT)?;
    let not_before = take_timestamp(&mut payload, reserved::NOT_BEFORE)?;

    let issuer = match payload.remove(reserved::ISSUER) {
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            return Err(TokenError::Format(format!(
                "reserved claim `{}` is not a string",
                reserved::ISSUER
            )));
        }
        None => None,
    };

    Ok((
        Claims(payload),
        RegisteredClaims {
            issued_at,
            not_before,
            expiration,
            issuer,
        },
    ))
}

fn take_timestamp(payload: &mut Map<String, Value>, claim: &str) -> Result<Option<i64>, TokenError> {
    match payload.remove(claim) {
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| TokenError::Format(format!("reserved claim `{claim}` is not a timestamp"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registered(expiration: i64) -> RegisteredClaims {
        RegisteredClaims {
            issued_at: Some(100),
            not_before: Some(100),
            expiration,
            issuer: Some("test".into()),
        }
    }

    #[test]
    fn test_claims_building() {
        let claims = Claims::new()
            .with("user", "jane_doe@anonymous.io")
            .with("admin", true)
            .with("logins", 42);

        assert_eq!(claims.len(), 3);
        assert_eq!(claims.get("user"), Some(&json!("jane_doe@anonymous.io")));
        assert!(claims.get("missing").is_none());
    }

    #[test]
    fn test_embed_extract_roundtrip() {
        let claims = Claims::new()
            .with("user", "jane")
            .with("scopes", json!(["read", "write"]))
            .with("profile", json!({"name": "Jane Doe", "age": 37}));

        let payload = embed(&claims, &registered(200));
        assert_eq!(payload.get(reserved::EXPIRATION), Some(&json!(200)));

        let (restored, reg) = extract(payload).unwrap();
        assert_eq!(restored, claims);
        assert_eq!(reg, registered(200));
    }

    #[test]
    fn test_reserved_keys_overwritten_and_stripped() {
        let claims = Claims::new().with("user", "jane").with("exp", 1);

        let payload = embed(&claims, &registered(9999));
        assert_eq!(payload.get(reserved::EXPIRATION), Some(&json!(9999)));

        let (restored, _) = extract(payload).unwrap();
        assert!(!restored.contains_key("exp"));
        assert_eq!(restored.get("user"), Some(&json!("jane")));
    }

    #[test]
    fn test_extract_requires_expiration() {
        let mut payload = Map::new();
        payload.insert("user".into(), json!("jane"));

        let err = extract(payload).unwrap_err();
        assert!(matches!(err, TokenError::MissingClaim { claim } if claim == "exp"));
    }

    #[test]
    fn test_extract_rejects_non_numeric_expiration() {
        let mut payload = Map::new();
        payload.insert("exp".into(), json!("tomorrow"));

        assert!(extract(payload).unwrap_err().is_format());
    }

    #[test]
    fn test_extract_without_optional_fields() {
        let mut payload = Map::new();
        payload.insert("exp".into(), json!(500));

        let (_, reg) = extract(payload).unwrap();
        assert_eq!(reg.expiration, 500);
        assert!(reg.issued_at.is_none());
        assert!(reg.not_before.is_none());
        assert!(reg.issuer.is_none());
    }
}
