//! Key management commands.
//!
//! `sealbox keys generate` - Generate an independent signing/encryption
//! key pair.

use sealbox_core::KeyMaterial;
use std::fs;
use std::path::PathBuf;

/// Generate a signing key and an encryption key of the given strength.
///
/// The two keys are independent random values; one is never derived from
/// the other.
pub fn generate(bits: usize, output: Option<PathBuf>) -> anyhow::Result<()> {
    let sign_key = KeyMaterial::generate(bits)?;
    let encrypt_key = KeyMaterial::generate(bits)?;

    if let Some(output_dir) = output {
        // Create output directory if it doesn't exist
        fs::create_dir_all(&output_dir)?;

        let sign_path = output_dir.join("sign.key");
        let encrypt_path = output_dir.join("encrypt.key");

        sign_key.save_to_file(&sign_path)?;
        encrypt_key.save_to_file(&encrypt_path)?;

        println!("✔ Generated {bits}-bit key pair:");
        println!("  Signing key:    {}", sign_path.display());
        println!("  Encryption key: {}", encrypt_path.display());
        println!();
        println!("⚠️  Keep both keys secure! Never commit them to version control.");
        println!();
        println!("Set as environment variables:");
        println!("  export SEALBOX_SIGN_KEY_FILE={}", sign_path.display());
        println!("  export SEALBOX_ENCRYPT_KEY_FILE={}", encrypt_path.display());
    } else {
        // Print to stdout
        println!("Signing key (keep secure!):");
        println!("{}", sign_key.to_hex());
        println!();
        println!("Encryption key (keep secure!):");
        println!("{}", encrypt_key.to_hex());
        println!();
        println!("Use --output <dir> to save keys to files.");
    }

    Ok(())
}
