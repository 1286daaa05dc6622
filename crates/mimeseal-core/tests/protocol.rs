//! End-to-end tests of the PGP/MIME builders, readers and unpacker.
//!
//! A deterministic in-memory provider stands in for GnuPG so the framing
//! can be checked without any keys.

#![allow(clippy::unwrap_used)]

use std::cell::Cell;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mimeseal_core::{
    CryptoError, CryptoOperation, CryptoProvider, DecryptParams, Directory, EncryptParams,
    EncryptionMode, Error, SignParams, Stream, Verification, canonicalize, decrypt, encrypt,
    encrypt_symmetric, read, sign, sign_and_encrypt, sign_and_encrypt_symmetric, unpack, verify,
};
use mimeseal_mime::{Body, ContentType, Headers, Message};
use proptest::prelude::*;

const ALICE: &str = "Alice <alice@example.com>";

/// Armored, reversible and fully deterministic.
///
/// Signatures are an FNV-1a digest of the data; "ciphertext" is the data
/// XORed with a per-mode key byte, which leads the packet.
struct FakeProvider {
    /// When false, `verify` reports every signature as bad.
    accept: bool,
    verify_calls: Cell<usize>,
}

impl FakeProvider {
    fn new() -> Self {
        Self {
            accept: true,
            verify_calls: Cell::new(0),
        }
    }

    fn rejecting() -> Self {
        Self {
            accept: false,
            ..Self::new()
        }
    }

    fn digest(data: &[u8]) -> u64 {
        data.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
            (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
    }

    fn armor(label: &str, payload: &[u8]) -> Vec<u8> {
        format!(
            "-----BEGIN PGP {label}-----\n\n{}\n-----END PGP {label}-----\n",
            STANDARD.encode(payload)
        )
        .into_bytes()
    }

    fn dearmor(data: &[u8]) -> Option<Vec<u8>> {
        let text = std::str::from_utf8(data).ok()?;
        let payload = text.lines().nth(2)?;
        STANDARD.decode(payload).ok()
    }

    fn xor(data: &[u8], key: u8) -> Vec<u8> {
        data.iter().map(|b| b ^ key).collect()
    }
}

impl CryptoProvider for FakeProvider {
    fn sign(&self, data: &[u8], _: &SignParams) -> Result<Vec<u8>, CryptoError> {
        Ok(Self::armor("SIGNATURE", &Self::digest(data).to_be_bytes()))
    }

    fn encrypt(
        &self,
        data: &[u8],
        _: &[String],
        params: &EncryptParams,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = match params.mode {
            EncryptionMode::PublicKey => 0x5a,
            EncryptionMode::Symmetric => 0x3c,
        };
        let mut payload = vec![key];
        payload.extend(Self::xor(data, key));
        Ok(Self::armor("MESSAGE", &payload))
    }

    fn decrypt(&self, data: &[u8], _: &DecryptParams) -> Result<Vec<u8>, CryptoError> {
        let payload = Self::dearmor(data).ok_or_else(|| {
            CryptoError::new(CryptoOperation::Decrypt, "no valid OpenPGP data found")
        })?;
        let (&key, rest) = payload
            .split_first()
            .ok_or_else(|| CryptoError::new(CryptoOperation::Decrypt, "empty packet"))?;
        Ok(Self::xor(rest, key))
    }

    fn verify(&self, signature: &[u8], signed_data: &[u8]) -> Result<Verification, CryptoError> {
        self.verify_calls.set(self.verify_calls.get() + 1);
        let expected = Self::digest(signed_data).to_be_bytes();
        let matches = Self::dearmor(signature).is_some_and(|sig| sig == expected);
        if self.accept && matches {
            Ok(Verification::good(ALICE))
        } else {
            Ok(Verification {
                signer: Some(ALICE.to_string()),
                ..Verification::bad("BADSIG")
            })
        }
    }
}

fn text(body: &str) -> Message {
    let mut headers = Headers::new();
    headers.add("Content-Type", "text/plain; charset=\"us-ascii\"");
    headers.add("Content-Disposition", "inline; filename=\"MailBody.txt\"");
    Message::leaf(headers, body.as_bytes().to_vec())
}

fn attachment(content_type: &str, filename: Option<&str>, data: &[u8]) -> Message {
    let ct = ContentType::parse(content_type).unwrap();
    let mut part = Message::binary(&ct, data);
    if let Some(filename) = filename {
        part.headers
            .add("Content-Disposition", format!("attachment; filename=\"{filename}\""));
    }
    part
}

fn mail() -> Message {
    Message::multipart(
        ContentType::multipart("mixed"),
        vec![
            text("Hello Bob,\n\nsee attached.\n"),
            attachment("application/pdf", Some("report.pdf"), b"%PDF-1.4\x00\x01\x02"),
        ],
    )
}

fn key() -> SignParams {
    SignParams::new().key_id("alice@example.com").passphrase("secret")
}

fn bob() -> Vec<String> {
    vec!["bob@example.com".to_string()]
}

fn leaf(content_type: &str, body: &str) -> Message {
    let mut headers = Headers::new();
    headers.add("Content-Type", content_type);
    Message::leaf(headers, body.as_bytes().to_vec())
}

fn reparse(message: &Message) -> Message {
    Message::parse(&message.to_bytes().unwrap()).unwrap()
}

#[test]
fn signed_round_trip() {
    let provider = FakeProvider::new();
    let original = mail();
    let signed = reparse(&sign(&original, &provider, &key()).unwrap());

    let (body, verification) = verify(&signed, &provider, &DecryptParams::new()).unwrap();
    assert!(verification.valid);
    assert_eq!(verification.signer.as_deref(), Some(ALICE));
    assert_eq!(canonicalize(&body).unwrap(), canonicalize(&original).unwrap());
}

#[test]
fn encrypted_round_trip() {
    let provider = FakeProvider::new();
    let original = mail();
    let encrypted = reparse(
        &encrypt(&original, &bob(), &provider, &EncryptParams::public_key()).unwrap(),
    );

    let plain = decrypt(&encrypted, &provider, &DecryptParams::new()).unwrap();
    assert_eq!(plain.to_bytes().unwrap(), original.to_bytes().unwrap());

    let recovered = read(&encrypted, &provider, &DecryptParams::new()).unwrap();
    assert!(recovered.verification.is_none());
    assert_eq!(recovered.message, plain);
}

#[test]
fn signed_then_encrypted_round_trip() {
    let provider = FakeProvider::new();
    let original = mail();
    let protected = reparse(
        &sign_and_encrypt(&original, &bob(), &provider, &key(), &EncryptParams::public_key())
            .unwrap(),
    );
    assert!(protected.content_type().unwrap().is("multipart", "encrypted"));

    let (body, verification) = verify(&protected, &provider, &DecryptParams::new()).unwrap();
    assert!(verification.valid);
    assert_eq!(canonicalize(&body).unwrap(), canonicalize(&original).unwrap());

    let recovered = read(&protected, &provider, &DecryptParams::new()).unwrap();
    assert!(recovered.is_verified());
    assert_eq!(recovered.message, body);
}

#[test]
fn symmetric_variants_round_trip() {
    let provider = FakeProvider::new();
    let original = mail();
    let params = DecryptParams::with_passphrase("correct horse");

    let signed = sign_and_encrypt_symmetric(&original, &provider, &key(), "correct horse").unwrap();
    let recovered = read(&reparse(&signed), &provider, &params).unwrap();
    assert!(recovered.is_verified());
    assert_eq!(
        canonicalize(&recovered.message).unwrap(),
        canonicalize(&original).unwrap()
    );

    let unsigned = encrypt_symmetric(&original, &provider, "correct horse").unwrap();
    let recovered = read(&reparse(&unsigned), &provider, &params).unwrap();
    assert!(recovered.verification.is_none());
    assert_eq!(
        recovered.message.to_bytes().unwrap(),
        original.to_bytes().unwrap()
    );
}

#[test]
fn trailing_newline_canonical_symmetry() {
    let provider = FakeProvider::new();
    let without = text("last line");
    let with = text("last line\n");
    assert_ne!(canonicalize(&without).unwrap(), canonicalize(&with).unwrap());

    for original in [without, with] {
        let at_signing = canonicalize(&original).unwrap();
        let signed = reparse(&sign(&original, &provider, &key()).unwrap());
        let (body, _) = verify(&signed, &provider, &DecryptParams::new()).unwrap();
        assert_eq!(canonicalize(&body).unwrap(), at_signing);
    }
}

#[test]
fn signed_message_survives_crlf_transport() {
    let provider = FakeProvider::new();
    let signed = sign(&mail(), &provider, &key()).unwrap();
    let wire = canonicalize(&signed).unwrap();
    assert!(wire.windows(2).any(|w| w == b"\r\n"));

    let received = Message::parse(&wire).unwrap();
    let (_, verification) = verify(&received, &provider, &DecryptParams::new()).unwrap();
    assert!(verification.valid);
}

/// A signed message as another mail client would put it on the wire, with
/// `body_part` signed exactly as given.
fn foreign_signed(body_part: &[u8]) -> Vec<u8> {
    let signature = FakeProvider::armor("SIGNATURE", &FakeProvider::digest(body_part).to_be_bytes());
    let mut wire = b"Content-Type: multipart/signed; boundary=\"B\"; micalg=\"pgp-sha1\";\r\n \
        protocol=\"application/pgp-signature\"\r\n\r\n--B\r\n"
        .to_vec();
    wire.extend_from_slice(body_part);
    wire.extend_from_slice(b"\r\n--B\r\nContent-Type: application/pgp-signature\r\n\r\n");
    wire.extend_from_slice(&signature);
    wire.extend_from_slice(b"\r\n--B--\r\n");
    wire
}

#[test]
fn foreign_header_spacing_verifies() {
    let provider = FakeProvider::new();
    let received = Message::parse(&foreign_signed(b"Content-Type:text/plain\r\n\r\nhi")).unwrap();

    let (body, verification) = verify(&received, &provider, &DecryptParams::new()).unwrap();
    assert!(verification.valid);
    assert_eq!(body.content_type().unwrap().essence(), "text/plain");
    assert_eq!(canonicalize(&body).unwrap(), b"Content-Type:text/plain\r\n\r\nhi");
}

#[test]
fn foreign_8bit_header_verifies() {
    let provider = FakeProvider::new();
    let part: &[u8] = b"Content-Type: text/plain\r\n\
        Content-Disposition: attachment; filename=\"caf\xe9.txt\"\r\n\r\nhi";
    let received = Message::parse(&foreign_signed(part)).unwrap();

    let (body, verification) = verify(&received, &provider, &DecryptParams::new()).unwrap();
    assert!(verification.valid);
    assert_eq!(canonicalize(&body).unwrap(), part);
}

#[test]
fn tampered_body_fails_verification() {
    let provider = FakeProvider::new();
    let mut signed = sign(&text("pay 10 EUR\n"), &provider, &key()).unwrap();
    if let Body::Multipart(multipart) = &mut signed.body {
        multipart.parts[0].body = Body::Leaf(b"pay 1000 EUR\n".to_vec());
    }

    let err = read(&signed, &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Verification { .. }));
}

#[test]
fn invalid_signature_returns_no_body() {
    let provider = FakeProvider::rejecting();
    let signed = sign(&mail(), &provider, &key()).unwrap();

    let result = verify(&signed, &provider, &DecryptParams::new());
    match result {
        Err(Error::Verification { signer, reason }) => {
            assert_eq!(signer.as_deref(), Some(ALICE));
            assert_eq!(reason, "BADSIG");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("a rejected signature must not yield a body"),
    }
    assert_eq!(provider.verify_calls.get(), 1);
}

#[test]
fn invalid_signature_inside_encryption_aborts_read() {
    let provider = FakeProvider::rejecting();
    let protected =
        sign_and_encrypt(&mail(), &bob(), &provider, &key(), &EncryptParams::public_key()).unwrap();
    let err = read(&protected, &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Verification { .. }));
}

fn encrypted_with(parts: Vec<Message>) -> Message {
    let ct = ContentType::multipart("encrypted").with_parameter("protocol", "application/pgp-encrypted");
    Message::multipart(ct, parts)
}

fn signed_with(parts: Vec<Message>) -> Message {
    let ct = ContentType::multipart("signed")
        .with_parameter("micalg", "pgp-sha1")
        .with_parameter("protocol", "application/pgp-signature");
    Message::multipart(ct, parts)
}

#[test]
fn encrypted_with_two_ciphertexts_is_rejected() {
    let provider = FakeProvider::new();
    let message = encrypted_with(vec![
        leaf("application/pgp-encrypted", "Version: 1\n"),
        leaf("application/octet-stream", "A"),
        leaf("application/octet-stream", "B"),
    ]);
    let err = read(&reparse(&message), &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Structure(_)));
}

#[test]
fn encrypted_without_control_is_rejected() {
    let provider = FakeProvider::new();
    let message = encrypted_with(vec![
        leaf("application/octet-stream", "A"),
        leaf("application/octet-stream", "B"),
    ]);
    let err = read(&reparse(&message), &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Structure(_)));

    let message = encrypted_with(vec![leaf("application/octet-stream", "A")]);
    let err = decrypt(&message, &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Structure(_)));
}

#[test]
fn signed_with_two_signatures_is_rejected() {
    let provider = FakeProvider::new();
    let message = signed_with(vec![
        leaf("text/plain", "hello"),
        leaf("application/pgp-signature", "one"),
        leaf("application/pgp-signature", "two"),
    ]);
    let err = read(&reparse(&message), &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Structure(_)));
    assert_eq!(provider.verify_calls.get(), 0);
}

#[test]
fn signed_without_signature_is_rejected() {
    let provider = FakeProvider::new();
    let message = signed_with(vec![leaf("text/plain", "hello"), leaf("text/plain", "again")]);
    let err = verify(&reparse(&message), &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Structure(_)));
}

#[test]
fn plain_message_is_unsupported() {
    let provider = FakeProvider::new();
    let err = read(&mail(), &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Unsupported(ref ct) if ct == "multipart/mixed"));
}

#[test]
fn undecryptable_ciphertext_is_a_crypto_error() {
    let provider = FakeProvider::new();
    let message = encrypted_with(vec![
        leaf("application/pgp-encrypted", "Version: 1\n"),
        leaf("application/octet-stream", "not armored"),
    ]);
    let err = read(&message, &provider, &DecryptParams::new()).unwrap_err();
    assert!(matches!(err, Error::Crypto(ref e) if e.operation == CryptoOperation::Decrypt));
}

#[test]
fn unpack_strips_directory_components() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out");
    let message = Message::multipart(
        ContentType::multipart("mixed"),
        vec![
            text("body\n"),
            attachment("text/plain", Some("../../etc/passwd"), b"root:x:0:0\n"),
        ],
    );

    let parts: Vec<_> = unpack(&message, Directory::create(&target).unwrap())
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(parts[1].filename, "passwd");
    assert_eq!(parts[1].path.as_deref(), Some(target.join("passwd").as_path()));
    assert_eq!(std::fs::read(target.join("passwd")).unwrap(), b"root:x:0:0\n");
    assert!(!dir.path().join("etc").exists());

    let mut written: Vec<_> = std::fs::read_dir(&target)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    written.sort();
    assert_eq!(written, vec!["MailBody.txt", "passwd"]);
}

#[test]
fn unpack_names_anonymous_parts_in_walk_order() {
    let dir = tempfile::tempdir().unwrap();
    let message = Message::multipart(
        ContentType::multipart("mixed"),
        vec![
            attachment("application/octet-stream", None, b"first"),
            Message::multipart(
                ContentType::multipart("mixed"),
                vec![attachment("application/octet-stream", None, b"second")],
            ),
        ],
    );

    let names: Vec<_> = unpack(&message, Directory::create(dir.path()).unwrap())
        .map(|part| part.unwrap().filename)
        .collect();
    assert_eq!(names, vec!["part-001.bin", "part-002.bin"]);
    assert_eq!(std::fs::read(dir.path().join("part-002.bin")).unwrap(), b"second");
}

#[test]
fn unpack_after_verification_to_stream() {
    let provider = FakeProvider::new();
    let protected =
        sign_and_encrypt(&mail(), &bob(), &provider, &key(), &EncryptParams::public_key()).unwrap();
    let recovered = read(&protected, &provider, &DecryptParams::new()).unwrap();

    let mut stream = Stream::new(Vec::new());
    let parts: Vec<_> = unpack(&recovered.message, &mut stream)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1].data, b"%PDF-1.4\x00\x01\x02");

    let out = stream.into_inner();
    let out = String::from_utf8_lossy(&out);
    assert!(out.contains("Attached file MailBody.txt with content:\nHello Bob,"));
    assert!(out.contains("Attached file report.pdf with content:\n%PDF-1.4"));
}

fn body_strategy() -> impl Strategy<Value = Message> {
    (
        "[a-zA-Z0-9 .,!?]{0,40}(\n[a-zA-Z0-9 .,!?]{0,40}){0,5}\n?",
        prop::collection::vec(
            (
                prop::option::of("[a-z]{1,8}\\.[a-z]{3}"),
                prop::collection::vec(any::<u8>(), 0..64),
            ),
            0..3,
        ),
    )
        .prop_map(|(body, files)| {
            if files.is_empty() {
                return text(&body);
            }
            let mut parts = vec![text(&body)];
            parts.extend(files.iter().map(|(name, data)| {
                attachment("application/octet-stream", name.as_deref(), data)
            }));
            Message::multipart(ContentType::multipart("mixed"), parts)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_builder_round_trips(original in body_strategy()) {
        let provider = FakeProvider::new();
        let params = DecryptParams::with_passphrase("pw");
        let expected = canonicalize(&original).unwrap();

        let built = [
            sign(&original, &provider, &key()).unwrap(),
            encrypt(&original, &bob(), &provider, &EncryptParams::public_key()).unwrap(),
            sign_and_encrypt(&original, &bob(), &provider, &key(), &EncryptParams::public_key()).unwrap(),
            sign_and_encrypt_symmetric(&original, &provider, &key(), "pw").unwrap(),
            encrypt_symmetric(&original, &provider, "pw").unwrap(),
        ];

        for message in built {
            let recovered = read(&reparse(&message), &provider, &params).unwrap();
            prop_assert_eq!(canonicalize(&recovered.message).unwrap(), expected.clone());
        }
    }
}
