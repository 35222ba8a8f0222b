use anyhow::Result;
use clap::Parser;
use identhub_cli::cli::{Args, Command, ConfigCommand, IdentityCommand, SamlCommand, TokenCommand};
use identhub_cli::commands;
use identhub_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use std::io::Read;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse::<LogLevel>().unwrap_or_else(|e| {
        eprintln!("{}; using 'warn'", e);
        LogLevel::Warn
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;
    debug!(command = ?args.command, "identhub CLI started");

    // Config init must work before any configuration exists
    if let Command::Config(ConfigCommand::Init { output, force }) = &args.command {
        println!("{}", commands::config_init(output, *force)?);
        return Ok(());
    }

    let config = commands::load_config(args.config.as_deref())?;

    match args.command {
        Command::Identity(IdentityCommand::Create { identity }) => {
            println!("{}", commands::identity_create(&config, &identity).await?);
        }
        Command::Identity(IdentityCommand::Show { identity }) => {
            println!("{}", commands::identity_show(&config, &identity)?);
        }
        Command::Sign { identity, message, base64 } => {
            println!("{}", commands::sign(&config, &identity, &message, base64)?);
        }
        Command::Verify { message, signature, public_key, base64 } => {
            let valid = commands::verify(&message, &signature, &public_key, base64)?;
            println!("{}", if valid { "valid" } else { "invalid" });
            if !valid {
                std::process::exit(1);
            }
        }
        Command::Token(TokenCommand::Issue { identity, claims, ttl }) => {
            println!("{}", commands::token_issue(&config, &identity, &claims, ttl)?);
        }
        Command::Token(TokenCommand::Verify { token }) => {
            let token = if token == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                token
            };
            let (report, valid) = commands::token_verify(&token)?;
            println!("{}", report);
            if !valid {
                warn!("Token rejected");
                std::process::exit(1);
            }
        }
        Command::Saml(SamlCommand::Metadata { identity }) => {
            println!("{}", commands::saml_metadata(&config, &identity)?);
        }
        Command::Config(ConfigCommand::Init { .. }) => {}
    }

    Ok(())
}
