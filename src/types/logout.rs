//! SAML LogoutRequest construction.
//!
//! Mirrors the AuthnRequest ID/timestamp scheme and embeds the NameID and
//! SessionIndex captured when the user's response was verified.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::SpResult;
use crate::session::SamlSession;

use super::{format_instant, generate_message_id, write_event, NAMEID_TRANSIENT, SAMLP_NS, SAML_NS};

/// An ephemeral SAML logout request.
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    /// Unpredictable request ID.
    pub id: String,
    /// UTC instant the request was issued.
    pub issue_instant: DateTime<Utc>,
    /// SP entity ID.
    pub issuer: String,
    /// The IdP SLO endpoint this request is destined for.
    pub destination: String,
    /// The session identifiers the IdP issued at login.
    pub session: SamlSession,
}

impl LogoutRequest {
    /// Creates a request with a fresh ID and the current UTC instant.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        destination: impl Into<String>,
        session: SamlSession,
    ) -> Self {
        Self {
            id: generate_message_id(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: destination.into(),
            session,
        }
    }

    /// Serializes the request to XML.
    pub fn to_xml(&self) -> SpResult<String> {
        let mut writer = Writer::new(Vec::new());

        let mut root = BytesStart::new("samlp:LogoutRequest");
        root.push_attribute(("xmlns:samlp", SAMLP_NS));
        root.push_attribute(("xmlns:saml", SAML_NS));
        root.push_attribute(("ID", self.id.as_str()));
        root.push_attribute(("Version", "2.0"));
        root.push_attribute(("Destination", self.destination.as_str()));
        root.push_attribute(("IssueInstant", format_instant(self.issue_instant).as_str()));
        write_event(&mut writer, Event::Start(root))?;

        write_event(&mut writer, Event::Start(BytesStart::new("saml:Issuer")))?;
        write_event(&mut writer, Event::Text(BytesText::new(&self.issuer)))?;
        write_event(&mut writer, Event::End(BytesEnd::new("saml:Issuer")))?;

        let mut name_id = BytesStart::new("saml:NameID");
        name_id.push_attribute(("SPNameQualifier", self.issuer.as_str()));
        name_id.push_attribute(("Format", NAMEID_TRANSIENT));
        write_event(&mut writer, Event::Start(name_id))?;
        write_event(&mut writer, Event::Text(BytesText::new(&self.session.name_id)))?;
        write_event(&mut writer, Event::End(BytesEnd::new("saml:NameID")))?;

        write_event(&mut writer, Event::Start(BytesStart::new("samlp:SessionIndex")))?;
        write_event(
            &mut writer,
            Event::Text(BytesText::new(&self.session.session_index)),
        )?;
        write_event(&mut writer, Event::End(BytesEnd::new("samlp:SessionIndex")))?;

        write_event(&mut writer, Event::End(BytesEnd::new("samlp:LogoutRequest")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| crate::error::SpError::Signing(format!("request is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogoutRequest {
        LogoutRequest::new(
            "https://sp.example.org",
            "https://idp.example.org/slo",
            SamlSession {
                name_id: "_transient-abc".into(),
                session_index: "sess-123".into(),
            },
        )
    }

    #[test]
    fn embeds_session_identifiers() {
        let xml = sample().to_xml().unwrap();
        assert!(xml.contains("_transient-abc</saml:NameID>"));
        assert!(xml.contains("<samlp:SessionIndex>sess-123</samlp:SessionIndex>"));
        assert!(xml.contains(&format!(r#"Format="{NAMEID_TRANSIENT}""#)));
        assert!(xml.contains(r#"Destination="https://idp.example.org/slo""#));
    }

    #[test]
    fn issuer_doubles_as_sp_name_qualifier() {
        let xml = sample().to_xml().unwrap();
        assert!(xml.contains(r#"SPNameQualifier="https://sp.example.org""#));
        assert!(xml.contains("https://sp.example.org</saml:Issuer>"));
    }
}
