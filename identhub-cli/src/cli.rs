//! Command-line surface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "identhub")]
#[command(author, version, about = "Operator tool for identhub identities", long_about = None)]
pub struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file; environment variables are used when absent
    #[arg(short, long, env = "IDENTHUB_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Identity selection shared by commands that need a loaded keypair
#[derive(clap::Args, Debug, Clone)]
pub struct IdentityArgs {
    /// Alias of the stored identity; defaults to the configured one
    #[arg(short, long)]
    pub alias: Option<String>,

    /// Keystore password
    #[arg(long, env = "IDENTHUB_KEYSTORE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage stored identities
    #[command(subcommand)]
    Identity(IdentityCommand),

    /// Sign a message with a stored identity
    Sign {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Message to sign
        message: String,

        /// Treat the message as base64-encoded bytes
        #[arg(long)]
        base64: bool,
    },

    /// Verify a signature under a public key
    Verify {
        /// Message that was signed
        message: String,

        /// Signature to check
        #[arg(short, long)]
        signature: String,

        /// Signer's public key
        #[arg(short, long)]
        public_key: String,

        /// Treat the message as base64-encoded bytes
        #[arg(long)]
        base64: bool,
    },

    /// Issue and verify authentication tokens
    #[command(subcommand)]
    Token(TokenCommand),

    /// SAML identity provider helpers
    #[command(subcommand)]
    Saml(SamlCommand),

    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommand {
    /// Generate an identity and seal it in the keystore
    Create {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Print the public half of a stored identity
    Show {
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Issue a signed token
    Issue {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Claims as a JSON object
        #[arg(long, default_value = "{}")]
        claims: String,

        /// Lifetime in seconds; defaults to the configured token lifetime
        #[arg(long, allow_hyphen_values = true)]
        ttl: Option<i64>,
    },

    /// Verify a JSON-encoded token
    Verify {
        /// The token, or `-` to read it from stdin
        token: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SamlCommand {
    /// Print IdP metadata for a stored identity
    Metadata {
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default configuration file
    Init {
        /// Destination file
        #[arg(short, long, default_value = "identhub.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> anyhow::Result<PathBuf> {
    Ok(PathBuf::from(shellexpand::full(path)?.into_owned()))
}
