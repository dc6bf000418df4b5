//! The SAML SP client facade.
//!
//! Ties configuration, the injected session store, and the protocol
//! components together into the three user-visible flows: login, response
//! processing, and logout. Key material is parsed once here, at
//! construction, so every later operation works with ready-to-use OpenSSL
//! objects.

use chrono::{DateTime, Utc};
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::bindings::{signed_request_redirect, Redirect};
use crate::config::SpConfig;
use crate::error::SpResult;
use crate::metadata;
use crate::response::{ProcessedResponse, ResponseProcessor};
use crate::session::{SamlSession, SessionStore};
use crate::signature::RequestSigner;
use crate::types::{AuthnRequest, LogoutRequest};

/// A SAML 2.0 Service Provider client for a single IdP.
pub struct SpClient<S: SessionStore> {
    config: SpConfig,
    private_key: PKey<Private>,
    idp_certificate: X509,
    store: S,
}

impl<S: SessionStore> SpClient<S> {
    /// Builds a client, parsing the configured key material.
    ///
    /// Fails with a configuration error when the SP private key or the
    /// IdP certificate is unusable, before any flow can run.
    pub fn new(config: SpConfig, store: S) -> SpResult<Self> {
        let private_key = config.parse_private_key()?;
        let idp_certificate = config.parse_idp_certificate()?;
        Ok(Self {
            config,
            private_key,
            idp_certificate,
            store,
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &SpConfig {
        &self.config
    }

    /// Starts a login: returns the redirect carrying a signed AuthnRequest
    /// to the IdP SSO endpoint. `scoping` lists the IdP entity IDs to put
    /// in the Scoping/IDPList block; pass an empty list for none.
    pub fn login(&self, scoping: Vec<String>) -> SpResult<Redirect> {
        let request = AuthnRequest::new(
            &self.config.entity_id,
            &self.config.sso_url,
            &self.config.acs_url,
            scoping,
        );
        tracing::info!(request_id = %request.id, "starting login");
        let signer = RequestSigner::new(&self.private_key);
        signed_request_redirect(&request.to_xml()?, &self.config.sso_url, &signer)
    }

    /// Verifies a base64-encoded SAMLResponse and, on success, persists
    /// the asserted session identifiers in the store.
    pub fn process_response(&self, encoded: &str) -> SpResult<ProcessedResponse> {
        self.process_response_at(encoded, Utc::now())
    }

    /// Like [`process_response`](Self::process_response), but validates
    /// temporal bounds against an explicit instant.
    pub fn process_response_at(
        &self,
        encoded: &str,
        now: DateTime<Utc>,
    ) -> SpResult<ProcessedResponse> {
        let processor = ResponseProcessor::new(&self.idp_certificate, &self.config.acs_url);
        let (processed, session) = processor.process_at(encoded, now).inspect_err(|err| {
            if err.is_security_event() {
                tracing::warn!(%err, "rejected SAML response");
            }
        })?;
        session.save(&self.store);
        tracing::info!(session_index = %session.session_index, "login completed");
        Ok(processed)
    }

    /// True when a verified SAML session is present in the store.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        SamlSession::load(&self.store).is_some()
    }

    /// Starts a logout.
    ///
    /// Returns `Ok(None)` when no session is stored; the user is already
    /// logged out and there is nothing to send. Otherwise the session is
    /// cleared immediately and the redirect carries a signed LogoutRequest
    /// to the IdP SLO endpoint. Clearing before the IdP confirms is
    /// best-effort: if the redirect is never followed, the local session
    /// is gone but the IdP's may linger.
    pub fn logout(&self) -> SpResult<Option<Redirect>> {
        let Some(session) = SamlSession::load(&self.store) else {
            tracing::debug!("logout requested without a session");
            return Ok(None);
        };
        let request = LogoutRequest::new(&self.config.entity_id, &self.config.slo_url, session);
        tracing::info!(request_id = %request.id, "starting logout");
        SamlSession::clear(&self.store);
        let signer = RequestSigner::new(&self.private_key);
        let redirect = signed_request_redirect(&request.to_xml()?, &self.config.slo_url, &signer)?;
        Ok(Some(redirect))
    }

    /// Renders this SP's metadata document.
    pub fn metadata(&self) -> SpResult<String> {
        metadata::generate(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Contact, Organization};
    use crate::error::SpError;
    use crate::session::MemorySessionStore;

    fn test_key_pem_body() -> String {
        use openssl::rsa::Rsa;
        let pem = Rsa::generate(2048)
            .unwrap()
            .private_key_to_pem()
            .unwrap();
        let pem = String::from_utf8(pem).unwrap();
        pem.lines()
            .filter(|line| !line.starts_with("-----"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn test_config() -> SpConfig {
        SpConfig {
            entity_id: "https://sp.example.org".into(),
            acs_url: "https://sp.example.org/acs".into(),
            sso_url: "https://idp.example.org/sso".into(),
            slo_url: "https://idp.example.org/slo".into(),
            logout_url: "https://sp.example.org/logout".into(),
            private_key: test_key_pem_body(),
            certificate: "TUlJQ2NlcnQ=".into(),
            idp_certificate: String::new(),
            organization: Organization {
                name: "Example".into(),
                display_name: "Example Org".into(),
                url: "https://example.org".into(),
                language: "en".into(),
            },
            contact: Contact {
                given_name: "Ops".into(),
                email: "ops@example.org".into(),
            },
        }
    }

    #[test]
    fn construction_fails_on_missing_idp_certificate() {
        let config = test_config();
        assert!(matches!(
            SpClient::new(config, MemorySessionStore::new()),
            Err(SpError::Configuration(_))
        ));
    }

    #[test]
    fn construction_fails_on_bad_private_key() {
        let mut config = test_config();
        config.private_key = "broken".into();
        assert!(matches!(
            SpClient::new(config, MemorySessionStore::new()),
            Err(SpError::Configuration(_))
        ));
    }
}
