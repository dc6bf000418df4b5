//! SAML session state.
//!
//! The SP keeps exactly two identifiers per logged-in user: the NameID and
//! the SessionIndex asserted by the IdP. Both are needed later to build a
//! LogoutRequest. They live in the embedding application's session store,
//! which this crate only sees as an opaque key-value service injected at
//! construction time.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Session store key under which the SAML session is kept.
pub const SESSION_KEY: &str = "saml_sp_session";

/// Abstract key-value session store supplied by the embedding application.
///
/// The store's own concurrency guarantees govern; no locking happens in
/// this crate beyond what an implementation provides.
pub trait SessionStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);
    /// Removes the value stored under `key`.
    fn remove(&self, key: &str);
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) {
        (**self).set(key, value);
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// Per-user SAML session identifiers.
///
/// Written only after a response has passed full verification, and consumed
/// by the logout flow. Its presence is used as a proxy for "provisionally
/// SAML-authenticated" -- that is not a cryptographic guarantee, merely the
/// best signal available without a back-channel to the IdP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamlSession {
    /// The NameID asserted by the IdP (transient format).
    pub name_id: String,
    /// The SessionIndex from the assertion's AuthnStatement.
    pub session_index: String,
}

impl SamlSession {
    /// Loads the session from the store, if present and well-formed.
    pub fn load<S: SessionStore>(store: &S) -> Option<Self> {
        let raw = store.get(SESSION_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Persists the session to the store.
    pub fn save<S: SessionStore>(&self, store: &S) {
        // Serialization of two plain strings cannot fail.
        if let Ok(raw) = serde_json::to_string(self) {
            store.set(SESSION_KEY, raw);
        }
    }

    /// Removes any stored session.
    pub fn clear<S: SessionStore>(store: &S) {
        store.remove(SESSION_KEY);
    }
}

/// In-memory session store backed by a mutex-guarded map.
///
/// Suitable for tests and single-process deployments; production embeddings
/// will usually adapt their framework's session service instead.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.remove(key);
        }
    }
}
