//! Inbound SAML response processing.
//!
//! A response is trusted only after every gate passes: base64 and XML
//! decoding, IdP status, assertion signature, and temporal validation.
//! The gates run in that order and any failure aborts processing before
//! identity attributes or session identifiers are extracted. Temporal
//! violations are accumulated into one issue list rather than reported
//! one at a time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use openssl::x509::X509;

use crate::error::{SpError, SpResult};
use crate::session::SamlSession;
use crate::signature::{SignatureVerifier, VerifyScope};
use crate::types::{SAMLP_NS, SAML_NS, STATUS_SUCCESS};
use crate::xml::{parse, XmlElement};

/// Clock difference tolerated between the SP and the IdP.
const CLOCK_SKEW: i64 = 60;

/// One asserted attribute: a name with one or more string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlAttribute {
    /// The attribute's `Name`.
    pub name: String,
    /// All values, in document order.
    pub values: Vec<String>,
}

/// The output of a fully verified response.
#[derive(Debug, Clone)]
pub struct ProcessedResponse {
    /// Asserted attributes in document order.
    pub attributes: Vec<SamlAttribute>,
    /// The decoded response document, as received.
    pub raw_response: Vec<u8>,
}

impl ProcessedResponse {
    /// Values of the named attribute, if asserted.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.values.as_slice())
    }
}

/// Runs the verification gates over a base64-encoded SAMLResponse.
pub struct ResponseProcessor<'a> {
    idp_certificate: &'a X509,
    acs_url: &'a str,
}

impl<'a> ResponseProcessor<'a> {
    /// Creates a processor bound to the IdP certificate and the SP's own
    /// assertion consumer service URL.
    #[must_use]
    pub fn new(idp_certificate: &'a X509, acs_url: &'a str) -> Self {
        Self {
            idp_certificate,
            acs_url,
        }
    }

    /// Processes a response against the current clock.
    pub fn process(&self, encoded: &str) -> SpResult<(ProcessedResponse, SamlSession)> {
        self.process_at(encoded, Utc::now())
    }

    /// Processes a response against an explicit verification instant.
    pub fn process_at(
        &self,
        encoded: &str,
        now: DateTime<Utc>,
    ) -> SpResult<(ProcessedResponse, SamlSession)> {
        let raw = STANDARD.decode(encoded.trim())?;
        let text = std::str::from_utf8(&raw)
            .map_err(|e| SpError::MalformedResponse(format!("response is not UTF-8: {e}")))?;
        let response = parse(text)?;
        if !response.is(SAMLP_NS, "Response") {
            return Err(SpError::MalformedResponse(format!(
                "expected a samlp:Response document, got {}",
                response.local
            )));
        }

        check_status(&response)?;

        let verifier = SignatureVerifier::new(self.idp_certificate);
        verifier.verify(&response, VerifyScope::Assertion)?;

        let assertion = response
            .child(SAML_NS, "Assertion")
            .ok_or_else(|| SpError::MalformedResponse("response has no Assertion".into()))?;

        let issues = validate_temporal(&response, assertion, self.acs_url, now);
        if !issues.is_empty() {
            tracing::warn!(?issues, "response failed temporal validation");
            return Err(SpError::ResponseValidation { issues });
        }

        let session = extract_session(assertion)?;
        let attributes = extract_attributes(assertion)?;
        tracing::debug!(
            attributes = attributes.len(),
            "response verified and extracted"
        );

        Ok((
            ProcessedResponse {
                attributes,
                raw_response: raw,
            },
            session,
        ))
    }
}

fn check_status(response: &XmlElement) -> SpResult<()> {
    let status = response
        .child(SAMLP_NS, "Status")
        .ok_or_else(|| SpError::MalformedResponse("response has no Status".into()))?;
    let code = status
        .child(SAMLP_NS, "StatusCode")
        .and_then(|el| el.attr("Value"))
        .ok_or_else(|| SpError::MalformedResponse("response has no StatusCode".into()))?;
    if code == STATUS_SUCCESS {
        return Ok(());
    }
    let message = status
        .child(SAMLP_NS, "StatusMessage")
        .map(XmlElement::text);
    Err(SpError::IdpStatus {
        status: code.to_string(),
        message,
    })
}

/// Checks every time bound present in the document against `now` with the
/// fixed skew tolerance, returning all violations instead of the first.
fn validate_temporal(
    response: &XmlElement,
    assertion: &XmlElement,
    acs_url: &str,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut issues = Vec::new();
    let skew = Duration::seconds(CLOCK_SKEW);

    if let Some(destination) = response.attr("Destination") {
        if destination != acs_url {
            issues.push(format!(
                "Destination {destination} does not match the assertion consumer service"
            ));
        }
    }

    let confirmation = assertion.descendant(&[
        (SAML_NS, "Subject"),
        (SAML_NS, "SubjectConfirmation"),
        (SAML_NS, "SubjectConfirmationData"),
    ]);
    if let Some(data) = confirmation {
        if let Some(not_before) = parse_bound(data, "NotBefore", &mut issues) {
            if not_before > now + skew {
                issues.push("SubjectConfirmationData NotBefore is in the future".into());
            }
        }
        if let Some(not_on_or_after) = parse_bound(data, "NotOnOrAfter", &mut issues) {
            if not_on_or_after <= now + skew {
                issues.push("SubjectConfirmationData NotOnOrAfter has passed".into());
            }
        }
    }

    if let Some(conditions) = assertion.child(SAML_NS, "Conditions") {
        if let Some(not_before) = parse_bound(conditions, "NotBefore", &mut issues) {
            if not_before > now - skew {
                issues.push("Conditions NotBefore is in the future".into());
            }
        }
        if let Some(not_on_or_after) = parse_bound(conditions, "NotOnOrAfter", &mut issues) {
            if not_on_or_after <= now - skew {
                issues.push("Conditions NotOnOrAfter has passed".into());
            }
        }
    }

    if let Some(statement) = assertion.child(SAML_NS, "AuthnStatement") {
        if let Some(expiry) = parse_bound(statement, "SessionNotOnOrAfter", &mut issues) {
            if expiry <= now - skew {
                issues.push("SessionNotOnOrAfter has passed".into());
            }
        }
    }

    issues
}

/// Parses an optional timestamp attribute. An attribute that is present
/// but unparseable counts as a validation issue, never as absence.
fn parse_bound(
    element: &XmlElement,
    attribute: &str,
    issues: &mut Vec<String>,
) -> Option<DateTime<Utc>> {
    let value = element.attr(attribute)?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(instant) => Some(instant.with_timezone(&Utc)),
        Err(_) => {
            issues.push(format!("unparseable {attribute} timestamp: {value}"));
            None
        }
    }
}

fn extract_session(assertion: &XmlElement) -> SpResult<SamlSession> {
    let name_id = assertion
        .descendant(&[(SAML_NS, "Subject"), (SAML_NS, "NameID")])
        .ok_or_else(|| SpError::MalformedResponse("assertion has no NameID".into()))?
        .text();
    let session_index = assertion
        .child(SAML_NS, "AuthnStatement")
        .and_then(|el| el.attr("SessionIndex"))
        .ok_or_else(|| SpError::MalformedResponse("assertion has no SessionIndex".into()))?
        .to_string();
    Ok(SamlSession {
        name_id,
        session_index,
    })
}

fn extract_attributes(assertion: &XmlElement) -> SpResult<Vec<SamlAttribute>> {
    let mut attributes: Vec<SamlAttribute> = Vec::new();
    let Some(statement) = assertion.child(SAML_NS, "AttributeStatement") else {
        return Ok(attributes);
    };
    for attribute in statement.children_named(SAML_NS, "Attribute") {
        let name = attribute
            .attr("Name")
            .ok_or_else(|| SpError::MalformedResponse("Attribute without a Name".into()))?;
        let values = attribute
            .children_named(SAML_NS, "AttributeValue")
            .map(XmlElement::text);
        match attributes.iter().position(|existing| existing.name == name) {
            Some(index) => attributes[index].values.extend(values),
            None => attributes.push(SamlAttribute {
                name: name.to_string(),
                values: values.collect(),
            }),
        }
    }
    Ok(attributes)
}
