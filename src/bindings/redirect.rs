//! HTTP-Redirect binding.
//!
//! Serializes a SAML message into the signed query-string form
//! `SAMLRequest=<b64(deflate(xml))>&SigAlg=<uri>&Signature=<b64(sig)>`
//! and wraps the destination URL in a [`Redirect`] effect value. The
//! signature covers the exact query-string bytes up to and excluding the
//! `Signature` parameter; nothing is re-encoded or re-ordered afterwards.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SpError, SpResult};
use crate::signature::RequestSigner;
use crate::types::RSA_SHA1;

/// A pending HTTP redirect.
///
/// Issuing the redirect terminates the current request: the caller sends
/// the Location header and stops processing. The protocol components never
/// terminate anything themselves; they only return this value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a redirect only takes effect when the caller sends it"]
pub struct Redirect {
    /// Absolute URL to send the user agent to.
    pub url: String,
}

/// Encodes a message for the redirect binding: raw deflate, then base64.
pub fn encode_message(xml: &str) -> SpResult<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .map_err(|e| SpError::Signing(format!("deflate failed: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| SpError::Signing(format!("deflate failed: {e}")))?;
    Ok(STANDARD.encode(compressed))
}

/// Decodes a redirect-binding message parameter back to XML.
pub fn decode_message(param: &str) -> SpResult<String> {
    let compressed = STANDARD
        .decode(param)
        .map_err(|e| SpError::MalformedResponse(format!("base64 decode failed: {e}")))?;
    let mut decoder = DeflateDecoder::new(compressed.as_slice());
    let mut xml = String::new();
    decoder
        .read_to_string(&mut xml)
        .map_err(|e| SpError::MalformedResponse(format!("inflate failed: {e}")))?;
    Ok(xml)
}

/// Builds a signed redirect to `destination` carrying `xml` as SAMLRequest.
pub fn signed_request_redirect(
    xml: &str,
    destination: &str,
    signer: &RequestSigner<'_>,
) -> SpResult<Redirect> {
    let message = encode_message(xml)?;
    let query = format!(
        "SAMLRequest={}&SigAlg={}",
        urlencoding::encode(&message),
        urlencoding::encode(RSA_SHA1),
    );
    let signature = signer.sign(query.as_bytes())?;
    let url = format!(
        "{destination}?{query}&Signature={}",
        urlencoding::encode(&STANDARD.encode(signature)),
    );
    Ok(Redirect { url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roundtrip() {
        let xml = r#"<samlp:AuthnRequest ID="_x">payload</samlp:AuthnRequest>"#;
        let encoded = encode_message(xml).unwrap();
        assert_eq!(decode_message(&encoded).unwrap(), xml);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_message("!!not base64!!"),
            Err(SpError::MalformedResponse(_))
        ));
        // Valid base64 of bytes that are not a deflate stream.
        let bogus = STANDARD.encode(b"\xff\xff\xff\xff");
        assert!(matches!(
            decode_message(&bogus),
            Err(SpError::MalformedResponse(_))
        ));
    }
}
