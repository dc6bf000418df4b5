//! Enveloped XML signature verification.
//!
//! Verification follows the reference-then-signature structure of XML-DSig:
//! first the digest in `ds:Reference` must match the canonicalized signed
//! subtree with the `ds:Signature` element removed, then the RSA signature
//! over the canonicalized `ds:SignedInfo` must verify against the IdP
//! certificate. Both checks must pass; either failure is reported as a
//! signature verification error without detail leaking to the caller's
//! users.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openssl::hash::{hash, MessageDigest};
use openssl::sign::Verifier;
use openssl::x509::X509;

use crate::error::{SpError, SpResult};
use crate::types::{DS_NS, SAML_NS};
use crate::xml::c14n::canonicalize;
use crate::xml::XmlElement;

/// Which signed subtree of a response to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyScope {
    /// The enveloped signature on the `samlp:Response` root.
    Response,
    /// The enveloped signature on the first `saml:Assertion`.
    Assertion,
}

/// Verifies enveloped signatures against the configured IdP certificate.
pub struct SignatureVerifier<'a> {
    idp_certificate: &'a X509,
}

impl<'a> SignatureVerifier<'a> {
    /// Creates a verifier bound to the IdP certificate.
    #[must_use]
    pub fn new(idp_certificate: &'a X509) -> Self {
        Self { idp_certificate }
    }

    /// Verifies the enveloped signature on the given scope of `response`.
    ///
    /// Succeeds only when the reference digest matches the signed subtree
    /// and the RSA-SHA1 signature over `SignedInfo` verifies.
    pub fn verify(&self, response: &XmlElement, scope: VerifyScope) -> SpResult<()> {
        let target = match scope {
            VerifyScope::Response => response,
            VerifyScope::Assertion => response.child(SAML_NS, "Assertion").ok_or_else(|| {
                SpError::SignatureVerification("response carries no assertion".into())
            })?,
        };

        let signature = target.child(DS_NS, "Signature").ok_or_else(|| {
            SpError::SignatureVerification(format!("{} is not signed", target.local))
        })?;
        let signed_info = signature.child(DS_NS, "SignedInfo").ok_or_else(|| {
            SpError::SignatureVerification("signature has no SignedInfo".into())
        })?;

        let digest_value = decode_base64_text(
            signed_info
                .descendant(&[(DS_NS, "Reference"), (DS_NS, "DigestValue")])
                .ok_or_else(|| {
                    SpError::SignatureVerification("signature has no DigestValue".into())
                })?,
        )?;
        let signature_value = decode_base64_text(
            signature.child(DS_NS, "SignatureValue").ok_or_else(|| {
                SpError::SignatureVerification("signature has no SignatureValue".into())
            })?,
        )?;

        // The digest covers the signed subtree with the Signature element
        // itself removed, canonicalized in its inherited namespace context.
        let mut unsigned = target.clone();
        unsigned.remove_child(DS_NS, "Signature");
        let digested = canonicalize(&unsigned);
        let computed = hash(MessageDigest::sha1(), digested.as_bytes())
            .map_err(|e| SpError::SignatureVerification(format!("digest failed: {e}")))?;
        if !constant_time_eq(&computed, &digest_value) {
            tracing::warn!(scope = ?scope, "reference digest mismatch");
            return Err(SpError::SignatureVerification(
                "reference digest mismatch".into(),
            ));
        }

        let public_key = self.idp_certificate.public_key().map_err(|e| {
            SpError::SignatureVerification(format!("certificate has no usable key: {e}"))
        })?;
        let mut verifier = Verifier::new(MessageDigest::sha1(), &public_key)
            .map_err(|e| SpError::SignatureVerification(format!("verifier init failed: {e}")))?;
        verifier
            .update(canonicalize(signed_info).as_bytes())
            .map_err(|e| SpError::SignatureVerification(format!("verification failed: {e}")))?;
        let valid = verifier
            .verify(&signature_value)
            .map_err(|e| SpError::SignatureVerification(format!("verification failed: {e}")))?;
        if !valid {
            tracing::warn!(scope = ?scope, "SignedInfo signature invalid");
            return Err(SpError::SignatureVerification(
                "SignedInfo signature invalid".into(),
            ));
        }
        Ok(())
    }
}

/// Decodes the base64 text content of an element, tolerating the line
/// breaks and indentation signing toolkits insert into long values.
fn decode_base64_text(element: &XmlElement) -> SpResult<Vec<u8>> {
    let compact: String = element
        .text()
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| SpError::SignatureVerification(format!("bad base64 in signature: {e}")))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn missing_signature_is_rejected() {
        let response = parse(concat!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" "#,
            r#"xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">"#,
            r#"<saml:Assertion ID="_a"></saml:Assertion></samlp:Response>"#
        ))
        .unwrap();
        let cert = test_certificate();
        let verifier = SignatureVerifier::new(&cert);
        assert!(matches!(
            verifier.verify(&response, VerifyScope::Assertion),
            Err(SpError::SignatureVerification(_))
        ));
        assert!(matches!(
            verifier.verify(&response, VerifyScope::Response),
            Err(SpError::SignatureVerification(_))
        ));
    }

    #[test]
    fn base64_text_decodes_across_line_breaks() {
        let element = parse("<v>aGVs\n  bG8=</v>").unwrap();
        assert_eq!(decode_base64_text(&element).unwrap(), b"hello");
    }

    #[test]
    fn constant_time_eq_compares_content_and_length() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    fn test_certificate() -> X509 {
        use openssl::pkey::PKey;
        use openssl::rsa::Rsa;
        use openssl::x509::X509NameBuilder;

        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "test-idp").unwrap();
        let name = name.build();

        let mut builder = openssl::x509::X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&openssl::asn1::Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&openssl::asn1::Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder
            .sign(&key, openssl::hash::MessageDigest::sha256())
            .unwrap();
        builder.build()
    }
}
