//! Minimal SAML 2.0 Service Provider client for a single-IdP federation.
//!
//! The crate covers the three flows an SP embedded in a web application
//! needs: issuing signed AuthnRequests over the HTTP-Redirect binding,
//! verifying signed responses (exclusive canonicalization, enveloped
//! XML-DSig, clock-skew-tolerant temporal bounds) before extracting
//! identity attributes, and issuing signed LogoutRequests for the stored
//! session. Everything outside the protocol core stays with the embedding
//! application: HTTP routing, session storage (injected through
//! [`SessionStore`]), and redirect delivery (returned as [`Redirect`]
//! values, never performed here).
//!
//! Signatures use RSA with SHA-1 throughout. That is the algorithm the
//! federation hub speaks and is preserved as a compatibility contract;
//! see the `signature` module docs before changing it.
//!
//! ```no_run
//! use saml_sp::{MemorySessionStore, SpClient, SpConfig};
//!
//! # fn run(config: SpConfig) -> saml_sp::SpResult<()> {
//! let sp = SpClient::new(config, MemorySessionStore::new())?;
//! let redirect = sp.login(vec!["https://idp.example.org".into()])?;
//! // Send `redirect.url` as the Location header and stop processing.
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod error;
pub mod metadata;
pub mod response;
pub mod session;
pub mod signature;
pub mod sp;
pub mod types;
pub mod xml;

pub use bindings::Redirect;
pub use config::{Contact, Organization, SpConfig};
pub use error::{SpError, SpResult};
pub use response::{ProcessedResponse, SamlAttribute};
pub use session::{MemorySessionStore, SamlSession, SessionStore, SESSION_KEY};
pub use signature::VerifyScope;
pub use sp::SpClient;
