//! `mimeseal unpack`: verify a received message and write out its parts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mimeseal_core::{
    CryptoProvider, DecryptParams, Destination, Directory, GpgProvider, Recovered, Stream,
    UnpackedPart, read, unpack_all,
};
use mimeseal_mime::Message;

use crate::settings::Settings;

/// Arguments of `mimeseal unpack`.
#[derive(Debug, Args)]
pub struct UnpackArgs {
    /// The message to verify and unpack
    #[arg(short = 'f', long, value_name = "FILE")]
    pub message_file: PathBuf,

    /// Directory for the unpacked files (defaults to tmp<pid>)
    #[arg(short, long, value_name = "DIRECTORY", conflicts_with = "stdout")]
    pub directory: Option<PathBuf>,

    /// Passphrase for decryption
    #[arg(short, long, env = "MIMESEAL_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Print the parts to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,
}

/// Runs the command.
pub fn run(args: UnpackArgs, settings: &Settings) -> Result<()> {
    let raw = std::fs::read(&args.message_file)
        .with_context(|| format!("Failed to read {}", args.message_file.display()))?;
    let message = Message::parse(&raw)?;

    let params = args
        .passphrase
        .map_or_else(DecryptParams::new, DecryptParams::with_passphrase);
    let provider = GpgProvider::new(settings.gpg_config());

    if args.stdout {
        let stdout = std::io::stdout().lock();
        open_and_unpack(&message, &provider, &params, Stream::new(stdout))?;
        return Ok(());
    }

    let directory = args
        .directory
        .unwrap_or_else(|| PathBuf::from(format!("tmp{}", std::process::id())));
    let destination = Directory::create(&directory)
        .with_context(|| format!("Failed to create {}", directory.display()))?;
    let parts = open_and_unpack(&message, &provider, &params, destination)?;
    println!("Unpacked {} part(s) into {}", parts.len(), directory.display());
    Ok(())
}

/// Recovers `message` and writes its parts. Nothing is written unless the
/// message decrypts, any signature verifies and every part decodes.
fn open_and_unpack<P, D>(
    message: &Message,
    provider: &P,
    params: &DecryptParams,
    destination: D,
) -> Result<Vec<UnpackedPart>>
where
    P: CryptoProvider + ?Sized,
    D: Destination,
{
    let Recovered {
        message,
        verification,
    } = read(message, provider, params).context("Failed to open message")?;

    match &verification {
        Some(verification) => {
            println!("Message signed by {} is verified OK.", verification.signer_label());
        }
        None => tracing::warn!("Message was encrypted but not signed"),
    }

    let parts = unpack_all(&message, destination)?;
    for part in &parts {
        tracing::info!(
            filename = %part.filename,
            content_type = %part.content_type,
            bytes = part.data.len(),
            "Unpacked part"
        );
    }
    Ok(parts)
}
