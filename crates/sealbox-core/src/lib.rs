//! # sealbox-core
//!
//! Tamper-proof, confidential, time-bounded session tokens.
//!
//! This crate provides functionality for:
//! - Generating symmetric key material for signing and encryption
//! - Sealing arbitrary JSON claim sets into compact, URL-safe tokens
//! - Opening tokens back into the original claims, enforcing expiration
//!   with a configurable clock-skew leeway
//! - Keyless structural validation and header inspection
//!
//! ## Token Layout
//!
//! A token is a nested sign-then-encrypt structure in five dot-separated
//! segments (compact JWE form):
//!
//! | Segment | Content |
//! |---------|---------|
//! | 1 | Protected header: `dir` / `A256GCM`, compression flag |
//! | 2 | Encrypted key (empty: direct symmetric encryption) |
//! | 3 | Initialization vector |
//! | 4 | Ciphertext concealing the signed (`HS256`) claim structure |
//! | 5 | Authentication tag |
//!
//! Confidentiality and authenticity are layered, not combined: the claims
//! are signed first, then the whole signed structure is encrypted, so
//! nobody without the encryption key ever observes the signature, and the
//! signature covers the embedded timing fields.
//!
//! ## Example
//!
//! ```
//! use sealbox_core::{Claims, KeyMaterial, TokenManager};
//!
//! # fn main() -> Result<(), sealbox_core::TokenError> {
//! let sign_key = KeyMaterial::generate(256)?;
//! let encrypt_key = KeyMaterial::generate(256)?;
//!
//! let manager = TokenManager::builder()
//!     .issuer("auth-svc")
//!     .sign_key(sign_key)
//!     .encrypt_key(encrypt_key)
//!     .expiration_s(600)
//!     .build()?;
//!
//! let session = Claims::new().with("user", "jane_doe@anonymous.io");
//! let token = manager.encrypt(&session, None)?;
//! assert_eq!(manager.decrypt(&token)?, session);
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod token;

mod codec;
mod jwe;
mod jws;

pub use claims::{Claims, RegisteredClaims, reserved};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TokenConfig;
pub use error::TokenError;
pub use keys::KeyMaterial;
pub use token::{
    DEFAULT_COMPRESS, DEFAULT_EXPIRATION_S, DEFAULT_LEEWAY_S, TokenInfo, TokenManager,
    TokenManagerBuilder, inspect_token, validate_token,
};
