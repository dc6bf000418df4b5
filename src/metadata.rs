//! SP metadata document generation.
//!
//! Pure templating over the configuration: emits the `EntityDescriptor`
//! the IdP operator registers for this SP. Values are copied from the
//! configuration as-is; registration is where mistakes surface, not here.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::SpConfig;
use crate::error::{SpError, SpResult};
use crate::types::{DS_NS, HTTP_POST_BINDING, HTTP_REDIRECT_BINDING, MD_NS, PROTOCOL_SUPPORT};

/// Renders the SP `EntityDescriptor` metadata document.
pub fn generate(config: &SpConfig) -> SpResult<String> {
    let mut writer = Writer::new(Vec::new());

    let mut entity = BytesStart::new("md:EntityDescriptor");
    entity.push_attribute(("xmlns:md", MD_NS));
    entity.push_attribute(("entityID", config.entity_id.as_str()));
    write(&mut writer, Event::Start(entity))?;

    let mut descriptor = BytesStart::new("md:SPSSODescriptor");
    descriptor.push_attribute(("protocolSupportEnumeration", PROTOCOL_SUPPORT));
    write(&mut writer, Event::Start(descriptor))?;

    // The same certificate serves both uses; the IdP picks per message.
    for key_use in ["signing", "encryption"] {
        write_key_descriptor(&mut writer, key_use, &config.certificate)?;
    }

    let mut slo = BytesStart::new("md:SingleLogoutService");
    slo.push_attribute(("Binding", HTTP_REDIRECT_BINDING));
    slo.push_attribute(("Location", config.logout_url.as_str()));
    write(&mut writer, Event::Empty(slo))?;

    let mut acs = BytesStart::new("md:AssertionConsumerService");
    acs.push_attribute(("Binding", HTTP_POST_BINDING));
    acs.push_attribute(("Location", config.acs_url.as_str()));
    acs.push_attribute(("index", "0"));
    write(&mut writer, Event::Empty(acs))?;

    write(&mut writer, Event::End(BytesEnd::new("md:SPSSODescriptor")))?;

    write_organization(&mut writer, config)?;
    write_contact(&mut writer, config)?;

    write(&mut writer, Event::End(BytesEnd::new("md:EntityDescriptor")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| SpError::Configuration(format!("metadata is not UTF-8: {e}")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SpResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SpError::Configuration(format!("metadata serialization failed: {e}")))
}

fn write_key_descriptor(
    writer: &mut Writer<Vec<u8>>,
    key_use: &str,
    certificate: &str,
) -> SpResult<()> {
    let mut descriptor = BytesStart::new("md:KeyDescriptor");
    descriptor.push_attribute(("use", key_use));
    write(writer, Event::Start(descriptor))?;

    let mut key_info = BytesStart::new("ds:KeyInfo");
    key_info.push_attribute(("xmlns:ds", DS_NS));
    write(writer, Event::Start(key_info))?;
    write(writer, Event::Start(BytesStart::new("ds:X509Data")))?;
    write(writer, Event::Start(BytesStart::new("ds:X509Certificate")))?;
    write(writer, Event::Text(BytesText::new(certificate)))?;
    write(writer, Event::End(BytesEnd::new("ds:X509Certificate")))?;
    write(writer, Event::End(BytesEnd::new("ds:X509Data")))?;
    write(writer, Event::End(BytesEnd::new("ds:KeyInfo")))?;

    write(writer, Event::End(BytesEnd::new("md:KeyDescriptor")))?;
    Ok(())
}

fn write_organization(writer: &mut Writer<Vec<u8>>, config: &SpConfig) -> SpResult<()> {
    let organization = &config.organization;
    write(writer, Event::Start(BytesStart::new("md:Organization")))?;
    for (tag, value) in [
        ("md:OrganizationName", &organization.name),
        ("md:OrganizationDisplayName", &organization.display_name),
        ("md:OrganizationURL", &organization.url),
    ] {
        let mut element = BytesStart::new(tag);
        element.push_attribute(("xml:lang", organization.language.as_str()));
        write(writer, Event::Start(element))?;
        write(writer, Event::Text(BytesText::new(value)))?;
        write(writer, Event::End(BytesEnd::new(tag)))?;
    }
    write(writer, Event::End(BytesEnd::new("md:Organization")))?;
    Ok(())
}

fn write_contact(writer: &mut Writer<Vec<u8>>, config: &SpConfig) -> SpResult<()> {
    let mut contact = BytesStart::new("md:ContactPerson");
    contact.push_attribute(("contactType", "technical"));
    write(writer, Event::Start(contact))?;

    write(writer, Event::Start(BytesStart::new("md:GivenName")))?;
    write(writer, Event::Text(BytesText::new(&config.contact.given_name)))?;
    write(writer, Event::End(BytesEnd::new("md:GivenName")))?;

    write(writer, Event::Start(BytesStart::new("md:EmailAddress")))?;
    write(writer, Event::Text(BytesText::new(&config.contact.email)))?;
    write(writer, Event::End(BytesEnd::new("md:EmailAddress")))?;

    write(writer, Event::End(BytesEnd::new("md:ContactPerson")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Contact, Organization};
    use crate::xml::parse;

    fn sample_config() -> SpConfig {
        SpConfig {
            entity_id: "https://sp.example.org".into(),
            acs_url: "https://sp.example.org/acs".into(),
            sso_url: "https://idp.example.org/sso".into(),
            slo_url: "https://idp.example.org/slo".into(),
            logout_url: "https://sp.example.org/logout".into(),
            private_key: String::new(),
            certificate: "TUlJQ2NlcnQ=".into(),
            idp_certificate: String::new(),
            organization: Organization {
                name: "Example".into(),
                display_name: "Example & Co".into(),
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
    fn metadata_describes_both_endpoints() {
        let xml = generate(&sample_config()).unwrap();
        let doc = parse(&xml).unwrap();
        assert!(doc.is(MD_NS, "EntityDescriptor"));
        assert_eq!(doc.attr("entityID"), Some("https://sp.example.org"));

        let sso = doc.child(MD_NS, "SPSSODescriptor").unwrap();
        let acs = sso.child(MD_NS, "AssertionConsumerService").unwrap();
        assert_eq!(acs.attr("Binding"), Some(HTTP_POST_BINDING));
        assert_eq!(acs.attr("Location"), Some("https://sp.example.org/acs"));
        assert_eq!(acs.attr("index"), Some("0"));

        let slo = sso.child(MD_NS, "SingleLogoutService").unwrap();
        assert_eq!(slo.attr("Binding"), Some(HTTP_REDIRECT_BINDING));
        assert_eq!(slo.attr("Location"), Some("https://sp.example.org/logout"));
    }

    #[test]
    fn certificate_is_published_for_signing_and_encryption() {
        let xml = generate(&sample_config()).unwrap();
        let doc = parse(&xml).unwrap();
        let sso = doc.child(MD_NS, "SPSSODescriptor").unwrap();
        let uses: Vec<_> = sso
            .children_named(MD_NS, "KeyDescriptor")
            .map(|kd| {
                let cert = kd
                    .descendant(&[(DS_NS, "KeyInfo"), (DS_NS, "X509Data"), (DS_NS, "X509Certificate")])
                    .unwrap();
                assert_eq!(cert.text(), "TUlJQ2NlcnQ=");
                kd.attr("use").unwrap().to_string()
            })
            .collect();
        assert_eq!(uses, vec!["signing", "encryption"]);
    }

    #[test]
    fn organization_values_are_escaped() {
        let xml = generate(&sample_config()).unwrap();
        assert!(xml.contains("Example &amp; Co"));
        let doc = parse(&xml).unwrap();
        let organization = doc.child(MD_NS, "Organization").unwrap();
        let display = organization
            .child(MD_NS, "OrganizationDisplayName")
            .unwrap();
        assert_eq!(display.text(), "Example & Co");
    }
}
