//! `mimeseal compose`: build an outgoing message.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use mimeseal_core::{
    CryptoProvider, EncryptParams, GpgProvider, SignParams, encrypt, encrypt_symmetric, sign,
    sign_and_encrypt, sign_and_encrypt_symmetric,
};
use mimeseal_mime::encoding::encode_rfc2047;
use mimeseal_mime::mime_types::guess_type;
use mimeseal_mime::{ContentType, Headers, Message, split_outside_quotes};

use crate::settings::Settings;

/// Name given to the body text when it is unpacked.
const BODY_FILENAME: &str = "MailBody.txt";

/// Protection applied to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Detached signature (`multipart/signed`).
    #[default]
    Sign,
    /// Public-key encryption to the `To` recipients.
    Encrypt,
    /// Signature, then public-key encryption.
    SignEncrypt,
    /// Passphrase-only encryption.
    Symmetric,
    /// Signature, then passphrase-only encryption.
    SignSymmetric,
    /// No protection.
    Plain,
}

impl Mode {
    const fn signs(self) -> bool {
        matches!(self, Self::Sign | Self::SignEncrypt | Self::SignSymmetric)
    }

    const fn needs_passphrase(self) -> bool {
        !matches!(self, Self::Encrypt | Self::Plain)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sign => "sign",
            Self::Encrypt => "encrypt",
            Self::SignEncrypt => "sign-encrypt",
            Self::Symmetric => "symmetric",
            Self::SignSymmetric => "sign-symmetric",
            Self::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// Charset for text parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    /// UTF-8, carried in Base64.
    #[value(name = "utf-8")]
    Utf8,
    /// US-ASCII, switching to UTF-8 for text that is not ASCII.
    #[value(name = "us-ascii")]
    UsAscii,
}

impl Encoding {
    fn charset(self, text: &str) -> &'static str {
        match self {
            Self::UsAscii if text.is_ascii() => "us-ascii",
            _ => "utf-8",
        }
    }
}

/// Arguments of `mimeseal compose`.
#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// File holding the message headers (From and To are required)
    #[arg(short = 'H', long, value_name = "FILE")]
    pub header_file: PathBuf,

    /// File holding the message text
    #[arg(short = 'B', long, value_name = "FILE")]
    pub body_file: Option<PathBuf>,

    /// Files to attach
    #[arg(short = 'a', long = "attachment", value_name = "FILE", num_args = 1..)]
    pub attachments: Vec<PathBuf>,

    /// Protection to apply
    #[arg(short, long, value_enum, default_value_t = Mode::Sign)]
    pub mode: Mode,

    /// Key to sign with (defaults to the settings, then to the From address)
    #[arg(short, long, value_name = "KEY")]
    pub sign_as: Option<String>,

    /// Subject, replacing the one in the header file
    #[arg(short = 'S', long)]
    pub subject: Option<String>,

    /// Signing key passphrase, or the passphrase for symmetric modes
    #[arg(short, long, env = "MIMESEAL_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Charset for text parts
    #[arg(short, long, value_enum)]
    pub encoding: Option<Encoding>,

    /// Write the message here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// How the draft is protected.
#[derive(Debug, Clone, Default)]
struct SealOptions {
    mode: Mode,
    sign_as: Option<String>,
    subject: Option<String>,
    passphrase: Option<String>,
}

/// Runs the command.
pub fn run(args: ComposeArgs, settings: &Settings) -> Result<()> {
    let headers = load_headers(&args.header_file)?;
    let body = load_body(
        args.body_file.as_deref(),
        &args.attachments,
        args.encoding,
    )?;

    let options = SealOptions {
        mode: args.mode,
        sign_as: args.sign_as.or_else(|| settings.default_signing_key.clone()),
        subject: args.subject,
        passphrase: args.passphrase,
    };
    let provider = GpgProvider::new(settings.gpg_config());
    let message = seal(&headers, &body, &options, &provider)?;
    let bytes = message.to_bytes()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), mode = %args.mode, "Message written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn load_headers(path: &Path) -> Result<Headers> {
    let raw = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&raw);
    let headers = Headers::parse(text.trim().as_bytes())
        .with_context(|| format!("Invalid headers in {}", path.display()))?;
    Ok(headers)
}

/// Builds the content to protect: the body text, the attachments, or a
/// `multipart/mixed` of both.
fn load_body(
    body_file: Option<&Path>,
    attachments: &[PathBuf],
    encoding: Option<Encoding>,
) -> Result<Message> {
    let body = body_file
        .map(|path| -> Result<Message> {
            let raw = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = String::from_utf8(raw).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), "Body is not UTF-8, replacing invalid bytes");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            });
            Ok(body_part(&text, encoding.unwrap_or(Encoding::Utf8)))
        })
        .transpose()?;

    if attachments.is_empty() {
        return body.context("Nothing to send: give --body-file or --attachment");
    }

    let mut parts: Vec<Message> = body.into_iter().collect();
    for path in attachments {
        parts.push(attachment_part(path, encoding.unwrap_or(Encoding::UsAscii))?);
    }
    Ok(Message::multipart(ContentType::multipart("mixed"), parts))
}

fn body_part(text: &str, encoding: Encoding) -> Message {
    let mut part = Message::text(text, "plain", encoding.charset(text));
    part.headers.add(
        "Content-Disposition",
        format!("inline; filename=\"{BODY_FILENAME}\""),
    );
    part
}

fn attachment_part(path: &Path, encoding: Encoding) -> Result<Message> {
    if !path.is_file() {
        bail!("Attachment {} is not a file", path.display());
    }
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = ContentType::parse(guess_type(path).unwrap_or("application/octet-stream"))?;

    let mut part = match String::from_utf8(data) {
        Ok(text) if content_type.is_text() => {
            Message::text(&text, &content_type.sub_type, encoding.charset(&text))
        }
        Ok(text) => Message::binary(&content_type, text.as_bytes()),
        Err(err) => Message::binary(&content_type, err.as_bytes()),
    };

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    part.headers.add(
        "Content-Disposition",
        format!("attachment; filename=\"{}\"", quote_filename(&name)?),
    );
    tracing::debug!(path = %path.display(), content_type = %content_type.essence(), "Attached file");
    Ok(part)
}

fn quote_filename(name: &str) -> Result<String> {
    if name.is_ascii() {
        Ok(name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        Ok(encode_rfc2047(name, "utf-8")?)
    }
}

/// Protects `body` according to `options` and puts the headers on the
/// outermost part.
fn seal<P>(
    headers: &Headers,
    body: &Message,
    options: &SealOptions,
    provider: &P,
) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    let from = headers
        .get("From")
        .filter(|from| !from.trim().is_empty())
        .context("Header file has no From address")?;
    let to = headers
        .get("To")
        .filter(|to| !to.trim().is_empty())
        .context("Header file has no To address")?;
    let recipients: Vec<String> = split_outside_quotes(to, ',')
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    let mode = options.mode;
    let passphrase = options.passphrase.as_deref();
    if mode.needs_passphrase() && passphrase.is_none() {
        bail!("--passphrase is required in {mode} mode");
    }

    let mut sign_params = SignParams::new();
    if mode.signs() {
        let key = options.sign_as.as_deref().unwrap_or(from).trim();
        tracing::debug!(key, "Signing");
        sign_params = sign_params.key_id(key);
        if let Some(passphrase) = passphrase {
            sign_params = sign_params.passphrase(passphrase);
        }
    }
    let passphrase = passphrase.unwrap_or_default();

    let mut message = match mode {
        Mode::Sign => sign(body, provider, &sign_params),
        Mode::Encrypt => encrypt(body, &recipients, provider, &EncryptParams::public_key()),
        Mode::SignEncrypt => sign_and_encrypt(
            body,
            &recipients,
            provider,
            &sign_params,
            &EncryptParams::public_key(),
        ),
        Mode::Symmetric => encrypt_symmetric(body, provider, passphrase),
        Mode::SignSymmetric => sign_and_encrypt_symmetric(body, provider, &sign_params, passphrase),
        Mode::Plain => Ok(body.clone()),
    }
    .with_context(|| format!("Failed to {mode} message"))?;

    copy_headers(headers, &mut message);

    let subject = options
        .subject
        .as_deref()
        .or_else(|| headers.get("Subject"))
        .unwrap_or_default();
    message
        .headers
        .add("Subject", format!("{subject} {mode}").trim_start().to_string());

    if !message.headers.contains("Date") {
        message
            .headers
            .add("Date", chrono::Local::now().to_rfc2822());
    }

    tracing::info!(%mode, recipients = recipients.len(), "Composed message");
    Ok(message)
}

/// Copies envelope headers onto `message`, leaving its MIME structure
/// headers and the subject alone.
fn copy_headers(headers: &Headers, message: &mut Message) {
    for (name, value) in headers.iter() {
        let lower = name.to_ascii_lowercase();
        if lower == "subject" || lower == "mime-version" || lower.starts_with("content-") {
            continue;
        }
        message.headers.add(name, value);
    }
}
