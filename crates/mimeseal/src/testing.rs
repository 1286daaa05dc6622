//! In-memory provider for command tests.

use std::cell::RefCell;

use mimeseal_core::{
    CryptoError, CryptoOperation, CryptoProvider, DecryptParams, EncryptParams, SignParams,
    Verification,
};

const SIGNATURE_HEADER: &str = "-----BEGIN PGP SIGNATURE-----\n";
const MESSAGE_HEADER: &str = "-----BEGIN PGP MESSAGE-----\n";

/// Signs with the length of the data and "encrypts" by prefixing a header.
#[derive(Debug, Default)]
pub struct FakeProvider {
    /// Key ids passed to `sign`.
    pub sign_keys: RefCell<Vec<Option<String>>>,
    /// Recipient lists passed to `encrypt`.
    pub recipients: RefCell<Vec<Vec<String>>>,
}

impl CryptoProvider for FakeProvider {
    fn sign(&self, data: &[u8], params: &SignParams) -> Result<Vec<u8>, CryptoError> {
        self.sign_keys.borrow_mut().push(params.key_id.clone());
        Ok(format!("{SIGNATURE_HEADER}{}\n", data.len()).into_bytes())
    }

    fn encrypt(
        &self,
        data: &[u8],
        recipients: &[String],
        _: &EncryptParams,
    ) -> Result<Vec<u8>, CryptoError> {
        self.recipients.borrow_mut().push(recipients.to_vec());
        let mut out = MESSAGE_HEADER.as_bytes().to_vec();
        out.extend_from_slice(data);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8], _: &DecryptParams) -> Result<Vec<u8>, CryptoError> {
        data.strip_prefix(MESSAGE_HEADER.as_bytes())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CryptoError::new(CryptoOperation::Decrypt, "not encrypted"))
    }

    fn verify(&self, signature: &[u8], signed_data: &[u8]) -> Result<Verification, CryptoError> {
        let expected = format!("{SIGNATURE_HEADER}{}\n", signed_data.len());
        if signature == expected.as_bytes() {
            Ok(Verification::good("Alice <alice@example.com>"))
        } else {
            Ok(Verification::bad("BADSIG"))
        }
    }
}
