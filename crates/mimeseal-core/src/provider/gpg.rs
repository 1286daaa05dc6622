//! [`CryptoProvider`] backed by the GnuPG command-line tool.

use super::params::{DecryptParams, EncryptParams, EncryptionMode, SignParams};
use super::process;
use super::{CryptoError, CryptoOperation, CryptoProvider, Verification};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;

/// GnuPG invocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgConfig {
    /// Path or name of the `gpg` executable.
    pub program: PathBuf,
    /// Alternative GnuPG home directory (`--homedir`).
    pub homedir: Option<PathBuf>,
    /// Skip the web-of-trust check for recipients (`--trust-model always`).
    pub always_trust: bool,
    /// Digest for signatures; matches the `micalg` declared on the message.
    pub digest_algo: Option<String>,
    /// Additional arguments placed before the operation.
    pub extra_args: Vec<String>,
}

impl Default for GpgConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gpg"),
            homedir: None,
            always_trust: false,
            digest_algo: Some("SHA1".to_string()),
            extra_args: Vec::new(),
        }
    }
}

impl GpgConfig {
    /// Creates the default configuration (`gpg` from `PATH`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> GpgConfigBuilder {
        GpgConfigBuilder::new()
    }
}

/// Builder for [`GpgConfig`].
#[derive(Debug, Clone, Default)]
pub struct GpgConfigBuilder {
    config: GpgConfig,
}

impl GpgConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the executable.
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.program = program.into();
        self
    }

    /// Sets the GnuPG home directory.
    #[must_use]
    pub fn homedir(mut self, homedir: impl Into<PathBuf>) -> Self {
        self.config.homedir = Some(homedir.into());
        self
    }

    /// Trusts all recipient keys.
    #[must_use]
    pub const fn always_trust(mut self, always_trust: bool) -> Self {
        self.config.always_trust = always_trust;
        self
    }

    /// Sets the signature digest, or `None` for the GnuPG default.
    #[must_use]
    pub fn digest_algo(mut self, digest_algo: Option<String>) -> Self {
        self.config.digest_algo = digest_algo;
        self
    }

    /// Appends an extra argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> GpgConfig {
        self.config
    }
}

/// Runs `gpg` for every provider call.
///
/// Passphrases are written to the child's stdin ahead of the payload
/// (`--passphrase-fd 0`) and never appear on the command line.
#[derive(Debug, Clone, Default)]
pub struct GpgProvider {
    config: GpgConfig,
}

impl GpgProvider {
    /// Creates a provider with the given settings.
    #[must_use]
    pub const fn new(config: GpgConfig) -> Self {
        Self { config }
    }

    /// The active settings.
    #[must_use]
    pub const fn config(&self) -> &GpgConfig {
        &self.config
    }

    fn base_args(&self, passphrase: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["--batch", "--no-tty", "--yes"]
            .into_iter()
            .map(OsString::from)
            .collect();
        if let Some(homedir) = &self.config.homedir {
            args.push("--homedir".into());
            args.push(homedir.into());
        }
        args.extend(self.config.extra_args.iter().map(OsString::from));
        if passphrase.is_some() {
            args.extend(
                ["--pinentry-mode", "loopback", "--passphrase-fd", "0"]
                    .into_iter()
                    .map(OsString::from),
            );
        }
        args
    }

    fn sign_args(&self, params: &SignParams) -> Vec<OsString> {
        let mut args = self.base_args(params.passphrase.as_deref());
        args.push("--armor".into());
        args.push("--detach-sign".into());
        if let Some(digest) = &self.config.digest_algo {
            args.push("--digest-algo".into());
            args.push(digest.into());
        }
        if let Some(key_id) = &params.key_id {
            args.push("--local-user".into());
            args.push(key_id.into());
        }
        args
    }

    fn encrypt_args(&self, recipients: &[String], params: &EncryptParams) -> Vec<OsString> {
        let mut args = self.base_args(params.passphrase.as_deref());
        args.push("--armor".into());
        match params.mode {
            EncryptionMode::PublicKey => {
                args.push("--encrypt".into());
                if self.config.always_trust {
                    args.push("--trust-model".into());
                    args.push("always".into());
                }
                for recipient in recipients {
                    args.push("--recipient".into());
                    args.push(recipient.into());
                }
            }
            EncryptionMode::Symmetric => args.push("--symmetric".into()),
        }
        args
    }

    fn decrypt_args(&self, params: &DecryptParams) -> Vec<OsString> {
        let mut args = self.base_args(params.passphrase.as_deref());
        args.push("--decrypt".into());
        args
    }

    fn verify_args(&self, signature_path: &Path) -> Vec<OsString> {
        let mut args = self.base_args(None);
        args.extend(["--status-fd", "1", "--verify"].into_iter().map(OsString::from));
        args.push(signature_path.into());
        args.push("-".into());
        args
    }

    fn execute(
        &self,
        operation: CryptoOperation,
        args: &[OsString],
        input: Vec<u8>,
    ) -> Result<Output, CryptoError> {
        process::run(&self.config.program, args, input).map_err(|err| {
            CryptoError::with_source(
                operation,
                format!("cannot run {}", self.config.program.display()),
                err,
            )
        })
    }

    fn execute_checked(
        &self,
        operation: CryptoOperation,
        args: &[OsString],
        input: Vec<u8>,
    ) -> Result<Vec<u8>, CryptoError> {
        let output = self.execute(operation, args, input)?;
        if !output.status.success() {
            return Err(CryptoError::new(
                operation,
                failure_reason(&output.stderr, &output.status.to_string()),
            ));
        }
        Ok(output.stdout)
    }
}

impl CryptoProvider for GpgProvider {
    fn sign(&self, data: &[u8], params: &SignParams) -> Result<Vec<u8>, CryptoError> {
        let args = self.sign_args(params);
        let input = with_passphrase(params.passphrase.as_deref(), data);
        let signature = self.execute_checked(CryptoOperation::Sign, &args, input)?;
        if signature.is_empty() {
            return Err(CryptoError::new(CryptoOperation::Sign, "gpg produced no signature"));
        }
        Ok(signature)
    }

    fn encrypt(
        &self,
        data: &[u8],
        recipients: &[String],
        params: &EncryptParams,
    ) -> Result<Vec<u8>, CryptoError> {
        let args = self.encrypt_args(recipients, params);
        let input = with_passphrase(params.passphrase.as_deref(), data);
        self.execute_checked(CryptoOperation::Encrypt, &args, input)
    }

    fn decrypt(&self, data: &[u8], params: &DecryptParams) -> Result<Vec<u8>, CryptoError> {
        let args = self.decrypt_args(params);
        let input = with_passphrase(params.passphrase.as_deref(), data);
        self.execute_checked(CryptoOperation::Decrypt, &args, input)
    }

    fn verify(&self, signature: &[u8], signed_data: &[u8]) -> Result<Verification, CryptoError> {
        let io_error = |err: std::io::Error| {
            CryptoError::with_source(CryptoOperation::Verify, "cannot stage signature file", err)
        };
        let mut signature_file = tempfile::NamedTempFile::new().map_err(io_error)?;
        signature_file.write_all(signature).map_err(io_error)?;
        signature_file.flush().map_err(io_error)?;

        let args = self.verify_args(signature_file.path());
        let output = self.execute(CryptoOperation::Verify, &args, signed_data.to_vec())?;

        let status = String::from_utf8_lossy(&output.stdout);
        match parse_verify_status(&status) {
            Some(verification) => Ok(verification),
            None => Err(CryptoError::new(
                CryptoOperation::Verify,
                failure_reason(&output.stderr, &output.status.to_string()),
            )),
        }
    }
}

fn with_passphrase(passphrase: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(data.len() + 64);
    if let Some(passphrase) = passphrase {
        input.extend_from_slice(passphrase.as_bytes());
        input.push(b'\n');
    }
    input.extend_from_slice(data);
    input
}

fn failure_reason(stderr: &[u8], status: &str) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let last = stderr.lines().rev().find(|line| !line.trim().is_empty());
    last.map_or_else(|| format!("gpg {status}"), |line| format!("{} ({status})", line.trim()))
}

/// Interprets `--status-fd` output of `gpg --verify`.
///
/// Returns `None` when no signature-related status line was printed at all.
fn parse_verify_status(status: &str) -> Option<Verification> {
    let mut verification = Verification::default();
    let mut seen = false;
    let mut good = false;
    let mut failure: Option<String> = None;

    for line in status.lines() {
        let Some(rest) = line.strip_prefix("[GNUPG:] ") else {
            continue;
        };
        let mut fields = rest.splitn(3, ' ');
        let keyword = fields.next().unwrap_or_default();
        let first = fields.next().map(str::to_string);
        let remainder = fields.next().map(str::to_string);

        match keyword {
            "GOODSIG" => {
                seen = true;
                good = true;
                verification.key_id = first;
                verification.signer = remainder;
            }
            "BADSIG" | "EXPSIG" | "EXPKEYSIG" | "REVKEYSIG" => {
                seen = true;
                verification.key_id = first;
                verification.signer = remainder;
                failure.get_or_insert_with(|| keyword.to_string());
            }
            "ERRSIG" | "NO_PUBKEY" => {
                seen = true;
                verification.key_id = verification.key_id.take().or(first);
                failure.get_or_insert_with(|| keyword.to_string());
            }
            "NODATA" => {
                seen = true;
                failure.get_or_insert_with(|| "NODATA".to_string());
            }
            "VALIDSIG" => {
                seen = true;
                verification.fingerprint = first;
            }
            _ => {}
        }
    }

    if !seen {
        return None;
    }

    verification.valid = good && failure.is_none();
    verification.status = Some(failure.unwrap_or_else(|| "GOODSIG".to_string()));
    Some(verification)
}
