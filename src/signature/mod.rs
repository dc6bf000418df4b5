//! Request signing and XML signature verification.
//!
//! Both directions use RSA with SHA-1 (PKCS#1 v1.5). SHA-1 is deprecated
//! for new deployments; it remains here because it is the algorithm the
//! configured IdP speaks, and changing it unilaterally would break the
//! federation. Coordinate any upgrade with the IdP operator.

mod signer;
mod verifier;

pub use signer::*;
pub use verifier::*;
