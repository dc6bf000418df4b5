//! SAML 2.0 protocol types.
//!
//! Outgoing request messages and the constants shared across the crate.
//! Requests are ephemeral: they exist only long enough to be serialized,
//! deflated, and signed into a redirect URL.

mod authn_request;
mod constants;
mod logout;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;

use chrono::{DateTime, Utc};
use openssl::hash::{hash, MessageDigest};
use quick_xml::events::Event;
use quick_xml::Writer;

use crate::error::{SpError, SpResult};

/// Writes one event into an outgoing request document. Serialization
/// failures here happen before any signature attempt and belong to the
/// signing path, not to response handling.
pub(crate) fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SpResult<()> {
    writer.write_event(event).map_err(serialization_error)
}

pub(crate) fn serialization_error(err: quick_xml::Error) -> SpError {
    SpError::Signing(format!("request serialization failed: {err}"))
}

/// Generates an unpredictable SAML message ID: `_` followed by the SHA-1
/// hex digest of a random token. IDs must not be guessable, or an attacker
/// could correlate or pre-compute InResponseTo values.
pub(crate) fn generate_message_id() -> String {
    let token = uuid::Uuid::new_v4();
    // SHA-1 of 16 random bytes; hashing cannot fail for an in-memory buffer.
    let digest = hash(MessageDigest::sha1(), token.as_bytes())
        .map(|d| d.to_vec())
        .unwrap_or_else(|_| token.as_bytes().to_vec());
    let mut id = String::with_capacity(1 + digest.len() * 2);
    id.push('_');
    for byte in digest {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

/// Formats an instant in the SAML wire form `YYYY-MM-DDThh:mm:ssZ`.
pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
