//! SAML AuthnRequest construction.
//!
//! The authentication request sent to the IdP's Single Sign-On endpoint.
//! Built with the quick-xml writer so every configuration value is escaped
//! correctly on its way into the document.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::SpResult;

use super::{format_instant, generate_message_id, write_event, HTTP_POST_BINDING, SAMLP_NS, SAML_NS};

/// An ephemeral SAML authentication request.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    /// Unpredictable request ID.
    pub id: String,
    /// UTC instant the request was issued.
    pub issue_instant: DateTime<Utc>,
    /// SP entity ID.
    pub issuer: String,
    /// The IdP SSO endpoint this request is destined for.
    pub destination: String,
    /// Where the IdP should post the response.
    pub acs_url: String,
    /// Ordered IdP entity IDs for the Scoping/IDPList block. May be empty.
    pub scoping: Vec<String>,
}

impl AuthnRequest {
    /// Creates a request with a fresh ID and the current UTC instant.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        destination: impl Into<String>,
        acs_url: impl Into<String>,
        scoping: Vec<String>,
    ) -> Self {
        Self {
            id: generate_message_id(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: destination.into(),
            acs_url: acs_url.into(),
            scoping,
        }
    }

    /// Serializes the request to XML.
    pub fn to_xml(&self) -> SpResult<String> {
        let mut writer = Writer::new(Vec::new());

        let mut root = BytesStart::new("samlp:AuthnRequest");
        root.push_attribute(("xmlns:samlp", SAMLP_NS));
        root.push_attribute(("ID", self.id.as_str()));
        root.push_attribute(("Version", "2.0"));
        root.push_attribute(("IssueInstant", format_instant(self.issue_instant).as_str()));
        root.push_attribute(("Destination", self.destination.as_str()));
        root.push_attribute(("AssertionConsumerServiceURL", self.acs_url.as_str()));
        root.push_attribute(("ProtocolBinding", HTTP_POST_BINDING));
        write_event(&mut writer, Event::Start(root))?;

        let mut issuer = BytesStart::new("saml:Issuer");
        issuer.push_attribute(("xmlns:saml", SAML_NS));
        write_event(&mut writer, Event::Start(issuer))?;
        write_event(&mut writer, Event::Text(BytesText::new(&self.issuer)))?;
        write_event(&mut writer, Event::End(BytesEnd::new("saml:Issuer")))?;

        if !self.scoping.is_empty() {
            write_event(&mut writer, Event::Start(BytesStart::new("samlp:Scoping")))?;
            write_event(&mut writer, Event::Start(BytesStart::new("samlp:IDPList")))?;
            for provider in &self.scoping {
                let mut entry = BytesStart::new("samlp:IDPEntry");
                entry.push_attribute(("ProviderID", provider.as_str()));
                write_event(&mut writer, Event::Empty(entry))?;
            }
            write_event(&mut writer, Event::End(BytesEnd::new("samlp:IDPList")))?;
            write_event(&mut writer, Event::End(BytesEnd::new("samlp:Scoping")))?;
        }

        write_event(&mut writer, Event::End(BytesEnd::new("samlp:AuthnRequest")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| crate::error::SpError::Signing(format!("request is not UTF-8: {e}")))
    }
}
