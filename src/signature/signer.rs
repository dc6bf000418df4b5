//! Detached request signing for the HTTP-Redirect binding.

use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;

use crate::error::{SpError, SpResult};

/// Signs outgoing query strings with the SP private key.
///
/// The input bytes are signed exactly as given; the caller is responsible
/// for assembling the query string in its final encoded form first.
pub struct RequestSigner<'a> {
    key: &'a PKey<Private>,
}

impl<'a> RequestSigner<'a> {
    /// Creates a signer over an already-parsed private key.
    #[must_use]
    pub fn new(key: &'a PKey<Private>) -> Self {
        Self { key }
    }

    /// Computes an RSA-SHA1 signature over `data`.
    pub fn sign(&self, data: &[u8]) -> SpResult<Vec<u8>> {
        let mut signer = Signer::new(MessageDigest::sha1(), self.key)
            .map_err(|e| SpError::Signing(format!("signer init failed: {e}")))?;
        signer
            .update(data)
            .map_err(|e| SpError::Signing(format!("signing failed: {e}")))?;
        signer
            .sign_to_vec()
            .map_err(|e| SpError::Signing(format!("signing failed: {e}")))
    }
}
