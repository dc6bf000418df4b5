//! SAML SP error types.
//!
//! One variant per failure class in the protocol flow. Everything is
//! recovered at the controller boundary into a generic user-facing
//! login failure; none of the detail carried here should reach the
//! browser.

use thiserror::Error;

/// Result type for SAML SP operations.
pub type SpResult<T> = Result<T, SpError>;

/// SAML Service Provider errors.
#[derive(Debug, Error)]
pub enum SpError {
    /// Unusable key or certificate material. Fatal: raised at client
    /// construction, before any network-visible action.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The inbound SAMLResponse could not be decoded or parsed as XML.
    #[error("malformed SAML response: {0}")]
    MalformedResponse(String),

    /// The IdP reported a non-Success status. The status message is kept
    /// for diagnostics only; surface a generic login failure to the user.
    #[error("identity provider returned status {status}")]
    IdpStatus {
        /// The StatusCode value reported by the IdP.
        status: String,
        /// The StatusMessage text, if the IdP sent one.
        message: Option<String>,
    },

    /// Digest or RSA check failed. Always a security event: the response
    /// is discarded and no attributes are ever extracted.
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    /// One or more temporal bounds were violated. All issues are
    /// accumulated, not just the first, to aid diagnosis.
    #[error("response validation failed: {}", issues.join("; "))]
    ResponseValidation {
        /// Every validation problem found in the response.
        issues: Vec<String>,
    },

    /// Local signing of an outgoing request failed. Fatal: aborts before
    /// any redirect is issued.
    #[error("request signing failed: {0}")]
    Signing(String),
}

impl SpError {
    /// Returns true for failures that should be logged as security events.
    #[must_use]
    pub const fn is_security_event(&self) -> bool {
        matches!(self, Self::SignatureVerification(_))
    }

    /// Generic message safe to show to an end user.
    ///
    /// Deliberately leaks nothing about the IdP or the failure detail.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) | Self::Signing(_) => "Login is currently unavailable",
            _ => "Login failed",
        }
    }
}

impl From<base64::DecodeError> for SpError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

impl From<crate::xml::XmlError> for SpError {
    fn from(err: crate::xml::XmlError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_event_classification() {
        assert!(SpError::SignatureVerification("digest mismatch".into()).is_security_event());
        assert!(!SpError::MalformedResponse("not xml".into()).is_security_event());
    }

    #[test]
    fn user_messages_are_generic() {
        let err = SpError::IdpStatus {
            status: "urn:oasis:names:tc:SAML:2.0:status:Responder".into(),
            message: Some("internal IdP detail".into()),
        };
        assert_eq!(err.user_message(), "Login failed");
        assert!(!err.user_message().contains("IdP detail"));
    }

    #[test]
    fn validation_error_lists_all_issues() {
        let err = SpError::ResponseValidation {
            issues: vec!["Conditions too old".into(), "Session too old".into()],
        };
        let text = err.to_string();
        assert!(text.contains("Conditions too old"));
        assert!(text.contains("Session too old"));
    }
}
