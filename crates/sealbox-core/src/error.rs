//! Error types for token operations.

use thiserror::Error;

/// Errors that can occur while provisioning keys or sealing/opening tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The input string is not even shaped like a token.
    #[error("malformed token: {0}")]
    Format(String),

    /// Decryption or signature verification failed.
    ///
    /// Wrong key, wrong algorithm family, and tampered ciphertext all
    /// surface as this same variant, with no cause attached. Callers
    /// (and attackers) cannot learn which layer refused the token.
    #[error("token failed cryptographic verification")]
    Invalid,

    /// Token expired before it was presented, leeway included.
    #[error("token expired at {expired_at}, current time is {now}")]
    Expired { expired_at: i64, now: i64 },

    /// Token presented before its not-before instant, leeway included.
    #[error("token not valid before {not_before}, current time is {now}")]
    NotYetValid { not_before: i64, now: i64 },

    /// Token embeds a different issuer than the manager expects.
    #[error("token issued by {}, expected '{expected}'", actual.as_deref().map(|a| format!("'{a}'")).unwrap_or_else(|| "no one".to_string()))]
    IssuerMismatch {
        /// Issuer the decoding manager was configured with.
        expected: String,
        /// Issuer embedded in the token, if any.
        actual: Option<String>,
    },

    /// Token payload is missing a required reserved claim.
    #[error("token payload missing required claim: {claim}")]
    MissingClaim { claim: String },

    /// Key material is unusable (bad length, bad encoding).
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Manager configuration is unusable (e.g. non-positive expiration).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Claims could not be serialized for sealing.
    #[error("failed to serialize claims: {0}")]
    Serialization(String),

    /// IO error (reading/writing key files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenError {
    /// Check if this error is due to token expiration.
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired { .. })
    }

    /// Check if this error is a cryptographic-invalidity failure.
    pub fn is_invalid(&self) -> bool {
        matches!(self, TokenError::Invalid)
    }

    /// Check if this error means the input was not token-shaped.
    pub fn is_format(&self) -> bool {
        matches!(self, TokenError::Format(_))
    }

    /// Get the expiration time if this is an expiration error.
    pub fn expiration_time(&self) -> Option<i64> {
        match self {
            TokenError::Expired { expired_at, .. } => Some(*expired_at),
            _ => None,
        }
    }
}
