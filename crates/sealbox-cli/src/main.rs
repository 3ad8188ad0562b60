use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sealbox", version, about = "Sealbox CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Key management (generate)
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Token operations (seal/open/inspect/validate)
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate an independent signing/encryption key pair
    Generate {
        /// Key strength in bits
        #[arg(long, default_value_t = 256)]
        bits: usize,

        /// Directory to write sign.key and encrypt.key into
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Seal a JSON claim set into a token
    Seal {
        /// Claims as inline JSON, e.g. '{"user":"jane"}'
        #[arg(long, conflicts_with = "claims_file")]
        claims: Option<String>,

        /// Path to a JSON file holding the claims
        #[arg(long)]
        claims_file: Option<PathBuf>,

        /// Path to the hex-encoded signing key
        #[arg(long, env = "SEALBOX_SIGN_KEY_FILE")]
        sign_key: PathBuf,

        /// Path to the hex-encoded encryption key
        #[arg(long, env = "SEALBOX_ENCRYPT_KEY_FILE")]
        encrypt_key: PathBuf,

        /// Issuer to embed in the token
        #[arg(long)]
        issuer: Option<String>,

        /// Expiration window in seconds (defaults to one hour)
        #[arg(long)]
        expires_in: Option<u64>,

        /// Disable payload compression
        #[arg(long, default_value_t = false)]
        no_compress: bool,
    },

    /// Open a token and print its claims as JSON
    Open {
        token: String,

        /// Path to the hex-encoded signing key
        #[arg(long, env = "SEALBOX_SIGN_KEY_FILE")]
        sign_key: PathBuf,

        /// Path to the hex-encoded encryption key
        #[arg(long, env = "SEALBOX_ENCRYPT_KEY_FILE")]
        encrypt_key: PathBuf,

        /// Required issuer; tokens from other issuers are rejected
        #[arg(long)]
        issuer: Option<String>,

        /// Clock-skew leeway in seconds
        #[arg(long)]
        leeway: Option<u64>,
    },

    /// Print a token's public header without keys
    Inspect { token: String },

    /// Check that a string is shaped like a token (keyless)
    Validate { token: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { bits, output } => commands::keys::generate(bits, output)?,
        },

        Command::Token { cmd } => match cmd {
            TokenCommand::Seal {
                claims,
                claims_file,
                sign_key,
                encrypt_key,
                issuer,
                expires_in,
                no_compress,
            } => commands::token::seal(
                claims,
                claims_file,
                &sign_key,
                &encrypt_key,
                issuer,
                expires_in,
                no_compress,
            )?,

            TokenCommand::Open {
                token,
                sign_key,
                encrypt_key,
                issuer,
                leeway,
            } => commands::token::open(&token, &sign_key, &encrypt_key, issuer, leeway)?,

            TokenCommand::Inspect { token } => commands::token::inspect(&token)?,

            TokenCommand::Validate { token } => commands::token::validate(&token)?,
        },
    }

    Ok(())
}
