//! SAML message transport bindings.
//!
//! Only the HTTP-Redirect binding is implemented: both outgoing message
//! types (AuthnRequest, LogoutRequest) travel to the IdP as deflated,
//! base64- and URL-encoded query parameters with a detached signature.
//! The inbound response arrives as a plain base64 parameter and needs no
//! binding logic beyond decoding.

mod redirect;

pub use redirect::*;
