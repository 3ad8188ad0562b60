//! Token commands: seal, open, inspect, validate.

use anyhow::{Context, bail};
use sealbox_core::{Claims, KeyMaterial, TokenManager, inspect_token, validate_token};
use std::fs;
use std::path::Path;

/// Seal a claim set read from inline JSON or a file.
pub fn seal(
    claims: Option<String>,
    claims_file: Option<std::path::PathBuf>,
    sign_key: &Path,
    encrypt_key: &Path,
    issuer: Option<String>,
    expires_in: Option<u64>,
    no_compress: bool,
) -> anyhow::Result<()> {
    let raw = match (claims, claims_file) {
        (Some(inline), None) => inline,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read claims file {}", path.display()))?,
        _ => bail!("provide the claims with exactly one of --claims or --claims-file"),
    };
    let claims: Claims = serde_json::from_str(&raw).context("claims must be a JSON mapping")?;

    let manager = build_manager(sign_key, encrypt_key, issuer, None, !no_compress)?;
    let token = manager.encrypt(&claims, expires_in)?;

    println!("{token}");
    Ok(())
}

/// Open a token and print the recovered claims as pretty JSON.
pub fn open(
    token: &str,
    sign_key: &Path,
    encrypt_key: &Path,
    issuer: Option<String>,
    leeway: Option<u64>,
) -> anyhow::Result<()> {
    let manager = build_manager(sign_key, encrypt_key, issuer, leeway, true)?;
    let claims = manager.decrypt(token)?;

    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}

/// Print a token's public header fields without any keys.
pub fn inspect(token: &str) -> anyhow::Result<()> {
    let info = inspect_token(token)?;

    println!("Key algorithm:  {}", info.key_algorithm);
    println!("Encryption:     {}", info.encryption);
    println!("Compressed:     {}", info.compressed);
    if let Some(content_type) = info.content_type {
        println!("Content type:   {content_type}");
    }
    Ok(())
}

/// Keyless shape check; the exit status is the answer.
pub fn validate(token: &str) -> anyhow::Result<()> {
    validate_token(token)?;
    println!("✔ Token is structurally valid (authenticity not checked)");
    Ok(())
}

fn build_manager(
    sign_key: &Path,
    encrypt_key: &Path,
    issuer: Option<String>,
    leeway: Option<u64>,
    compress: bool,
) -> anyhow::Result<TokenManager> {
    let sign_key = KeyMaterial::load_from_file(sign_key)
        .with_context(|| format!("failed to load signing key {}", sign_key.display()))?;
    let encrypt_key = KeyMaterial::load_from_file(encrypt_key)
        .with_context(|| format!("failed to load encryption key {}", encrypt_key.display()))?;

    let mut builder = TokenManager::builder()
        .sign_key(sign_key)
        .encrypt_key(encrypt_key)
        .compress(compress);
    if let Some(issuer) = issuer {
        builder = builder.issuer(issuer);
    }
    if let Some(leeway) = leeway {
        builder = builder.leeway_s(leeway);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_keys(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let sign_path = dir.join("sign.key");
        let encrypt_path = dir.join("encrypt.key");
        KeyMaterial::generate(256).unwrap().save_to_file(&sign_path).unwrap();
        KeyMaterial::generate(256).unwrap().save_to_file(&encrypt_path).unwrap();
        (sign_path, encrypt_path)
    }

    #[test]
    fn test_seal_with_inline_claims() {
        let dir = tempdir().unwrap();
        let (sign_path, encrypt_path) = write_keys(dir.path());

        seal(
            Some(r#"{"user":"jane"}"#.to_string()),
            None,
            &sign_path,
            &encrypt_path,
            Some("cli-test".into()),
            Some(60),
            false,
        )
        .unwrap();
    }

    #[test]
    fn test_seal_requires_exactly_one_claims_source() {
        let dir = tempdir().unwrap();
        let (sign_path, encrypt_path) = write_keys(dir.path());

        assert!(seal(None, None, &sign_path, &encrypt_path, None, None, false).is_err());
    }

    #[test]
    fn test_seal_rejects_non_mapping_claims() {
        let dir = tempdir().unwrap();
        let (sign_path, encrypt_path) = write_keys(dir.path());

        let result = seal(
            Some("[1, 2, 3]".to_string()),
            None,
            &sign_path,
            &encrypt_path,
            None,
            None,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(validate("definitely not a token").is_err());
    }
}
