//! `mimeseal` - compose, verify and unpack PGP/MIME mail.
//!
//! Built on `mimeseal-core` with GnuPG as the crypto backend.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod compose;
mod settings;
#[cfg(test)]
mod testing;
mod unpack;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "mimeseal")]
#[command(about = "Sign, encrypt, verify and unpack PGP/MIME (RFC 3156) messages")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to <config dir>/mimeseal/settings.json)
    #[arg(long, value_name = "PATH", global = true, env = "MIMESEAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a signed and/or encrypted message from a header file, a body
    /// and attachments
    Compose(compose::ComposeArgs),
    /// Decrypt and verify a received message, then write out its parts
    Unpack(unpack::UnpackArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("mimeseal={level},mimeseal_core={level},mimeseal_mime={level}").into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Compose(args) => compose::run(args, &settings),
        Command::Unpack(args) => unpack::run(args, &settings),
    }
}
