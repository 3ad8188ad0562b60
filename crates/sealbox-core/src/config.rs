//! Manager configuration loadable from files or environment.

use crate::clock::Clock;
use crate::error::TokenError;
use crate::keys::KeyMaterial;
use crate::token::{DEFAULT_COMPRESS, DEFAULT_EXPIRATION_S, DEFAULT_LEEWAY_S, TokenManager};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a [`TokenManager`].
///
/// All fields are optional with documented defaults, so a config
/// deserialized from an empty mapping still builds a working
/// (validate-only) manager. Keys are resolved from the environment
/// first, then from files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Issuer embedded in and required of tokens.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Environment variable containing the signing key (hex-encoded).
    #[serde(default)]
    pub sign_key_env: Option<String>,

    /// Path to the signing key file (hex-encoded).
    #[serde(default)]
    pub sign_key_file: Option<PathBuf>,

    /// Environment variable containing the encryption key (hex-encoded).
    #[serde(default)]
    pub encrypt_key_env: Option<String>,

    /// Path to the encryption key file (hex-encoded).
    #[serde(default)]
    pub encrypt_key_file: Option<PathBuf>,

    /// Default expiration window for sealed tokens, in seconds.
    #[serde(default = "default_expiration_s")]
    pub expiration_s: u64,

    /// Clock-skew leeway in seconds.
    #[serde(default = "default_leeway_s")]
    pub leeway_s: u64,

    /// Whether to compress claims before signing.
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_expiration_s() -> u64 {
    DEFAULT_EXPIRATION_S
}

fn default_leeway_s() -> u64 {
    DEFAULT_LEEWAY_S
}

fn default_compress() -> bool {
    DEFAULT_COMPRESS
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            sign_key_env: None,
            sign_key_file: None,
            encrypt_key_env: None,
            encrypt_key_file: None,
            expiration_s: DEFAULT_EXPIRATION_S,
            leeway_s: DEFAULT_LEEWAY_S,
            compress: DEFAULT_COMPRESS,
        }
    }
}

impl TokenConfig {
    /// Resolve the signing key from environment or file.
    pub fn resolve_sign_key(&self) -> Result<Option<KeyMaterial>, TokenError> {
        resolve_key(self.sign_key_env.as_deref(), self.sign_key_file.as_deref())
    }

    /// Resolve the encryption key from environment or file.
    pub fn resolve_encrypt_key(&self) -> Result<Option<KeyMaterial>, TokenError> {
        resolve_key(
            self.encrypt_key_env.as_deref(),
            self.encrypt_key_file.as_deref(),
        )
    }

    /// Build a manager from this configuration.
    ///
    /// Unresolvable keys fall back to ephemeral random ones, matching the
    /// zero-argument builder: such a manager validates and seals, but can
    /// never open tokens sealed elsewhere.
    pub fn build_manager(&self) -> Result<TokenManager, TokenError> {
        self.build_manager_with_clock(None)
    }

    /// Build a manager with an explicit clock (tests).
    pub fn build_manager_with_clock(
        &self,
        clock: Option<Arc<dyn Clock>>,
    ) -> Result<TokenManager, TokenError> {
        let mut builder = TokenManager::builder()
            .expiration_s(self.expiration_s)
            .leeway_s(self.leeway_s)
            .compress(self.compress);

        if let Some(issuer) = &self.issuer {
            builder = builder.issuer(issuer.clone());
        }
        if let Some(key) = self.resolve_sign_key()? {
            builder = builder.sign_key(key);
        }
        if let Some(key) = self.resolve_encrypt_key()? {
            builder = builder.encrypt_key(key);
        }
        if let Some(clock) = clock {
            builder = builder.clock(clock);
        }

        builder.build()
    }
}

fn resolve_key(
    env_var: Option<&str>,
    file: Option<&std::path::Path>,
) -> Result<Option<KeyMaterial>, TokenError> {
    // Try environment variable first
    if let Some(env_var) = env_var {
        if let Ok(encoded) = std::env::var(env_var) {
            return KeyMaterial::from_hex(&encoded).map(Some);
        }
    }

    // Try file path
    if let Some(path) = file {
        if path.exists() {
            return KeyMaterial::load_from_file(path).map(Some);
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_empty_mapping() {
        let config: TokenConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.expiration_s, DEFAULT_EXPIRATION_S);
        assert_eq!(config.leeway_s, DEFAULT_LEEWAY_S);
        assert!(config.compress);
        assert!(config.issuer.is_none());
        assert!(config.build_manager().is_ok());
    }

    #[test]
    fn test_key_resolution_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sign.key");
        let key = KeyMaterial::generate(256).unwrap();
        key.save_to_file(&path).unwrap();

        let config = TokenConfig {
            sign_key_file: Some(path),
            ..TokenConfig::default()
        };

        let resolved = config.resolve_sign_key().unwrap().unwrap();
        assert_eq!(resolved.as_bytes(), key.as_bytes());
        assert!(config.resolve_encrypt_key().unwrap().is_none());
    }

    #[test]
    fn test_env_takes_precedence_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("encrypt.key");
        let file_key = KeyMaterial::generate(256).unwrap();
        file_key.save_to_file(&path).unwrap();

        let env_key = KeyMaterial::generate(256).unwrap();
        // Unique variable name keeps parallel tests out of each other's way.
        let var = "SEALBOX_TEST_ENCRYPT_KEY_PRECEDENCE";
        unsafe { std::env::set_var(var, env_key.to_hex()) };

        let config = TokenConfig {
            encrypt_key_env: Some(var.into()),
            encrypt_key_file: Some(path),
            ..TokenConfig::default()
        };

        let resolved = config.resolve_encrypt_key().unwrap().unwrap();
        assert_eq!(resolved.as_bytes(), env_key.as_bytes());

        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn test_managers_from_shared_config_interoperate() {
        let dir = tempdir().unwrap();
        let sign_path = dir.path().join("sign.key");
        let encrypt_path = dir.path().join("encrypt.key");
        KeyMaterial::generate(256).unwrap().save_to_file(&sign_path).unwrap();
        KeyMaterial::generate(256).unwrap().save_to_file(&encrypt_path).unwrap();

        let config = TokenConfig {
            issuer: Some("config-test".into()),
            sign_key_file: Some(sign_path),
            encrypt_key_file: Some(encrypt_path),
            ..TokenConfig::default()
        };

        let sealer = config.build_manager().unwrap();
        let opener = config.build_manager().unwrap();

        let claims = crate::Claims::new().with("user", "jane");
        let token = sealer.encrypt(&claims, None).unwrap();
        assert_eq!(opener.decrypt(&token).unwrap(), claims);
    }
}
